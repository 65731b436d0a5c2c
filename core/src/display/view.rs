use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::{
    clock::PlaybackClockReader, engine::SamplerParameters, sample::SampleBuffer,
    voice::AdsrParameters,
};

use super::{DisplayWaveform, WaveformProjector};

/// The sample the display should show. Cloning the slot shares it.
#[derive(Debug, Clone, Default)]
pub struct SampleSlot {
    sample: Arc<ArcSwapOption<SampleBuffer>>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, sample: Option<Arc<SampleBuffer>>) {
        self.sample.store(sample);
    }

    pub fn current(&self) -> Option<Arc<SampleBuffer>> {
        self.sample.load_full()
    }
}

/// Everything the display needs to draw one frame.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub waveform: Arc<DisplayWaveform>,
    /// Column of the playhead, `None` while no sample is loaded.
    pub playhead: Option<usize>,
    pub envelope: AdsrParameters,
    pub sample_name: Option<String>,
}

/// Display side state. Pulls the latest sample, position and envelope values
/// every time a frame is requested.
pub struct WaveformView {
    projector: WaveformProjector,
    sample: SampleSlot,
    clock: PlaybackClockReader,
    parameters: SamplerParameters,
}

impl WaveformView {
    pub fn new(sample: SampleSlot, clock: PlaybackClockReader, parameters: SamplerParameters) -> Self {
        WaveformView {
            projector: WaveformProjector::new(),
            sample,
            clock,
            parameters,
        }
    }

    pub fn frame(&mut self, width: usize) -> DisplayFrame {
        let envelope = self.parameters.snapshot();

        match self.sample.current() {
            Some(sample) => {
                let waveform = self.projector.waveform(&sample, width);
                // Mapped onto the projected columns, which are fewer than
                // `width` when the sample is shorter than the display
                let playhead = WaveformProjector::map_position(
                    self.clock.read(),
                    sample.frames(),
                    waveform.len(),
                );

                DisplayFrame {
                    waveform,
                    playhead: Some(playhead),
                    envelope,
                    sample_name: sample.name().map(str::to_owned),
                }
            }
            None => {
                self.projector.invalidate();
                DisplayFrame {
                    waveform: Arc::default(),
                    playhead: None,
                    envelope,
                    sample_name: None,
                }
            }
        }
    }
}
