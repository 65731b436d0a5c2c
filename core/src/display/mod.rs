use std::sync::Arc;

use crate::sample::{SampleBuffer, SampleId};

mod view;
pub use view::*;

/// A sample reduced to one peak value per display column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayWaveform {
    peaks: Vec<f32>,
}

impl DisplayWaveform {
    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.peaks.iter().copied()
    }

    /// Plot points for a surface `height` units tall: `x` is the column,
    /// `y` maps `1.0` to the top edge and `-1.0` to the bottom edge.
    pub fn to_line_points(&self, height: f32) -> Vec<[f32; 2]> {
        self.iter()
            .enumerate()
            .map(|(x, peak)| [x as f32, (1.0 - peak) * height * 0.5])
            .collect()
    }
}

/// The sample with the largest magnitude in a run of frames across all
/// channels, sign kept. The earliest one wins a tie.
fn window_peak(buffer: &SampleBuffer, start: usize, end: usize) -> f32 {
    let mut peak = 0.0f32;
    for channel in 0..buffer.channel_count() {
        let Some(data) = buffer.channel(channel) else {
            continue;
        };
        for &value in &data[start..end] {
            if value.abs() > peak.abs() {
                peak = value;
            }
        }
    }
    peak
}

/// Reduces sample buffers to display width and maps playback positions to
/// display columns.
///
/// Holds on to the last projection and only recomputes when the sample or the
/// requested width changes, so it can be queried on every display tick.
#[derive(Debug, Default)]
pub struct WaveformProjector {
    cached: Option<(SampleId, usize, Arc<DisplayWaveform>)>,
}

impl WaveformProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits the buffer into `width` windows of `frames / width` frames each
    /// and keeps the peak of each. Trailing frames that don't fill a whole
    /// window are dropped. When there are fewer frames than columns, every
    /// frame gets its own entry.
    pub fn project(buffer: &SampleBuffer, width: usize) -> DisplayWaveform {
        let frames = buffer.frames();
        if frames == 0 || width == 0 {
            return DisplayWaveform::default();
        }

        let window = (frames / width).max(1);
        let columns = width.min(frames);

        let peaks = (0..columns)
            .map(|column| {
                let start = column * window;
                window_peak(buffer, start, start + window)
            })
            .collect();

        DisplayWaveform { peaks }
    }

    /// Cached version of [`WaveformProjector::project`].
    pub fn waveform(&mut self, buffer: &SampleBuffer, width: usize) -> Arc<DisplayWaveform> {
        if let Some((id, cached_width, waveform)) = &self.cached {
            if *id == buffer.id() && *cached_width == width {
                return waveform.clone();
            }
        }

        let waveform = Arc::new(Self::project(buffer, width));
        self.cached = Some((buffer.id(), width, waveform.clone()));
        waveform
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Maps a playback position in frames to a column in `[0, width)`.
    /// Returns 0 if either `frames` or `width` is 0.
    pub fn map_position(position: u64, frames: usize, width: usize) -> usize {
        if frames == 0 || width == 0 {
            return 0;
        }

        let column = position as u128 * width as u128 / frames as u128;
        column.min(width as u128 - 1) as usize
    }
}
