use std::sync::{atomic::Ordering, Arc};

use crate::{
    clock::{PlaybackClock, PlaybackClockReader},
    sample::SampleBuffer,
    voice::{AdsrParameters, EnvelopeParameters, ReleaseType, SampleVoice},
    AudioPipe, AudioStreamParams,
};

use self::voice_buffer::VoiceBuffer;

mod params;
pub use params::*;

mod voice_buffer;

mod event;
pub use event::*;

/// Options for initializing a new VoiceEngine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VoiceEngineConfig {
    /// Maximum number of voices sounding at once. When a note on arrives and
    /// all voices are in use, the oldest voice is replaced.
    ///
    /// Default: `8`
    pub voice_limit: usize,
}

impl Default for VoiceEngineConfig {
    fn default() -> Self {
        Self { voice_limit: 8 }
    }
}

/// Plays the loaded sample for incoming notes, shaped by an ADSR envelope.
///
/// `render_block` is the real-time entry point: it does not allocate, lock or
/// block, and its cost is bounded by the block length times the voice count.
/// Everything that takes `&mut self` is serialized with rendering by the
/// borrow checker, which is how a sample replacement is kept from ever
/// overlapping a block.
pub struct VoiceEngine {
    stream_params: AudioStreamParams,
    sample: Option<Arc<SampleBuffer>>,
    voices: VoiceBuffer,

    parameters: SamplerParameters,
    applied_parameters: AdsrParameters,
    envelope: EnvelopeParameters,

    clock: PlaybackClock,
    stats: VoiceEngineStats,
}

impl VoiceEngine {
    pub fn new(
        stream_params: AudioStreamParams,
        config: VoiceEngineConfig,
        parameters: SamplerParameters,
    ) -> Self {
        let applied_parameters = parameters.snapshot();
        let envelope = applied_parameters.to_envelope_params(stream_params.sample_rate);

        VoiceEngine {
            stream_params,
            sample: None,
            voices: VoiceBuffer::new(config.voice_limit),
            parameters,
            applied_parameters,
            envelope,
            clock: PlaybackClock::new(),
            stats: VoiceEngineStats::new(),
        }
    }

    /// Replaces the active sample and drops all voices without a fade.
    ///
    /// Returns the previous sample so the caller can choose where it gets
    /// dropped; the render thread should hand it back to a non-real-time thread.
    pub fn load_sample(&mut self, sample: Arc<SampleBuffer>) -> Option<Arc<SampleBuffer>> {
        self.voices.kill_all_voices();
        self.publish_state();
        self.sample.replace(sample)
    }

    /// Removes the active sample. Notes are ignored until a new one is loaded.
    pub fn unload_sample(&mut self) -> Option<Arc<SampleBuffer>> {
        self.voices.kill_all_voices();
        self.publish_state();
        self.sample.take()
    }

    pub fn sample(&self) -> Option<&Arc<SampleBuffer>> {
        self.sample.as_ref()
    }

    pub fn note_on(&mut self, key: u8, vel: u8) {
        if key > 127 {
            return;
        }
        if vel == 0 {
            self.note_off(key);
            return;
        }
        let Some(sample) = self.sample.as_deref() else {
            return;
        };

        match self.voices.find_voice_mut(key) {
            Some(voice) => voice.retrigger(vel),
            None => self
                .voices
                .push_voice(SampleVoice::new(key, vel, sample, self.envelope)),
        }
    }

    pub fn note_off(&mut self, key: u8) {
        self.voices.release_key(key, ReleaseType::Standard);
    }

    pub fn send_event(&mut self, event: SamplerEvent) {
        match event {
            SamplerEvent::NoteOn { key, vel } => self.note_on(key, vel),
            SamplerEvent::NoteOff { key } => self.note_off(key),
            SamplerEvent::AllNotesOff => self.voices.release_all_voices(ReleaseType::Standard),
            SamplerEvent::AllNotesKilled => self.voices.release_all_voices(ReleaseType::Kill),
        }
    }

    pub fn push_events_iter<T: Iterator<Item = SamplerEvent>>(&mut self, iter: T) {
        for e in iter {
            self.send_event(e);
        }
    }

    /// Picks up the latest parameter snapshot. Called once at the start of each block.
    fn refresh_parameters(&mut self) {
        let snapshot = **self.parameters.load();
        if snapshot == self.applied_parameters {
            return;
        }

        self.applied_parameters = snapshot;
        self.envelope = snapshot.to_envelope_params(self.stream_params.sample_rate);
        for voice in self.voices.iter_voices_mut() {
            voice.process_params(self.envelope);
        }
    }

    fn publish_state(&mut self) {
        self.clock.publish(self.voices.max_position() as u64);
        self.stats
            .voice_counter
            .store(self.voices.voice_count() as u64, Ordering::Relaxed);
    }

    /// Renders one interleaved block, overwriting `out`.
    ///
    /// A trailing partial frame (when `out` isn't a multiple of the channel
    /// count) is left silent.
    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.refresh_parameters();

        let channels = self.stream_params.channels.count() as usize;
        if let Some(sample) = self.sample.as_deref() {
            for voice in self.voices.iter_voices_mut() {
                voice.render_to(sample, out, channels);
            }
        }

        self.voices.remove_ended_voices();
        self.publish_state();
    }

    pub fn clock(&self) -> PlaybackClockReader {
        self.clock.reader()
    }

    pub fn parameters(&self) -> &SamplerParameters {
        &self.parameters
    }

    pub fn voice_count(&self) -> usize {
        self.voices.voice_count()
    }

    pub fn voices(&self) -> impl Iterator<Item = &SampleVoice> {
        self.voices.iter_voices()
    }

    pub fn get_stats(&self) -> VoiceEngineStatsReader {
        VoiceEngineStatsReader::new(self.stats.clone())
    }
}

impl AudioPipe for VoiceEngine {
    fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    fn read_samples_unchecked(&mut self, out: &mut [f32]) {
        self.render_block(out);
    }
}
