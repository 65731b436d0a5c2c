use std::sync::Arc;

use cpal::{FromSample, SizedSample};
use crossbeam_channel::{Receiver, Sender};

use sampler_core::{
    engine::{SamplerEvent, VoiceEngine},
    AudioPipe, SampleBuffer,
};

/// Frames rendered per engine block. The playback clock advances in steps of
/// at most this many frames.
const RENDER_CHUNK_FRAMES: usize = 256;

pub(crate) enum SamplerCommand {
    Event(SamplerEvent),
    LoadSample(Arc<SampleBuffer>),
    UnloadSample,
}

/// State owned by the audio callback.
///
/// Everything it needs is allocated up front; `render` only touches
/// preallocated buffers and non-blocking queue operations.
pub(crate) struct StreamRenderer {
    engine: VoiceEngine,
    commands: Receiver<SamplerCommand>,
    commands_per_block: usize,

    reclaim: Sender<Arc<SampleBuffer>>,
    // Samples that didn't fit into the reclaim queue, retried next callback.
    // Never grows past `pending_limit`.
    pending_reclaim: Vec<Arc<SampleBuffer>>,
    pending_limit: usize,

    scratch: Vec<f32>,
    engine_channels: usize,
    device_channels: usize,
}

impl StreamRenderer {
    pub fn new(
        engine: VoiceEngine,
        commands: Receiver<SamplerCommand>,
        reclaim: Sender<Arc<SampleBuffer>>,
        device_channels: usize,
    ) -> Self {
        let engine_channels = engine.stream_params().channels.count() as usize;
        let commands_per_block = commands.capacity().unwrap_or(1024).max(1);
        let reclaim_capacity = reclaim.capacity().unwrap_or(16).max(1);

        StreamRenderer {
            engine,
            commands,
            commands_per_block,
            reclaim,
            pending_reclaim: Vec::with_capacity(reclaim_capacity),
            pending_limit: reclaim_capacity,
            scratch: vec![0.0; RENDER_CHUNK_FRAMES * engine_channels],
            engine_channels,
            device_channels: device_channels.max(1),
        }
    }

    /// Hands a replaced sample to the reclaim thread. If that isn't possible
    /// right now the sample is parked, so it is never freed on this thread.
    fn reclaim_sample(&mut self, sample: Arc<SampleBuffer>) {
        if let Err(err) = self.reclaim.try_send(sample) {
            self.pending_reclaim.push(err.into_inner());
        }
    }

    fn flush_reclaim(&mut self) {
        while let Some(sample) = self.pending_reclaim.pop() {
            if let Err(err) = self.reclaim.try_send(sample) {
                self.pending_reclaim.push(err.into_inner());
                break;
            }
        }
    }

    fn process_commands(&mut self) {
        for _ in 0..self.commands_per_block {
            // A command can replace at most one sample. With no room left to
            // park it, the rest of the queue waits for the next callback.
            if self.pending_reclaim.len() >= self.pending_limit {
                break;
            }

            let Ok(command) = self.commands.try_recv() else {
                break;
            };

            match command {
                SamplerCommand::Event(event) => self.engine.send_event(event),
                SamplerCommand::LoadSample(sample) => {
                    if let Some(old) = self.engine.load_sample(sample) {
                        self.reclaim_sample(old);
                    }
                }
                SamplerCommand::UnloadSample => {
                    if let Some(old) = self.engine.unload_sample() {
                        self.reclaim_sample(old);
                    }
                }
            }
        }
    }

    /// Fills a device buffer. Engine channels are spread over the device
    /// channels, extra device channels repeat the last engine channel.
    pub fn render<T: SizedSample + FromSample<f32>>(&mut self, data: &mut [T]) {
        self.flush_reclaim();
        self.process_commands();

        data.fill(T::EQUILIBRIUM);

        let engine_channels = self.engine_channels;
        let device_channels = self.device_channels;

        for out in data.chunks_mut(RENDER_CHUNK_FRAMES * device_channels) {
            let frames = out.len() / device_channels;
            let scratch = &mut self.scratch[..frames * engine_channels];
            self.engine.render_block(scratch);

            for (out_frame, frame) in out
                .chunks_exact_mut(device_channels)
                .zip(scratch.chunks_exact(engine_channels))
            {
                for (channel, sample) in out_frame.iter_mut().enumerate() {
                    *sample = T::from_sample(frame[channel.min(engine_channels - 1)]);
                }
            }
        }
    }
}
