use crate::sample::SampleBuffer;

use super::{EnvelopeGenerator, EnvelopeParameters, ReleaseType, VoiceGeneratorBase};

/// One sounding instance of the loaded sample.
///
/// The voice only keeps a read position; the sample data itself is passed in
/// on every render call, so replacing the sample never leaves a voice pointing
/// at a freed buffer.
#[derive(Debug, Clone)]
pub struct SampleVoice {
    key: u8,
    velocity: u8,
    position: usize,
    frames: usize,
    envelope: EnvelopeGenerator,
}

impl SampleVoice {
    pub fn new(key: u8, velocity: u8, sample: &SampleBuffer, params: EnvelopeParameters) -> Self {
        let mut envelope = EnvelopeGenerator::new(params);
        envelope.note_on();

        SampleVoice {
            key,
            velocity,
            position: 0,
            frames: sample.frames(),
            envelope,
        }
    }

    /// Restarts the sample from the beginning. The envelope attack continues
    /// from the current gain.
    pub fn retrigger(&mut self, velocity: u8) {
        self.velocity = velocity;
        self.position = 0;
        self.envelope.note_on();
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Read position in frames from the start of the sample.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    pub fn process_params(&mut self, params: EnvelopeParameters) {
        self.envelope.configure(params);
    }

    /// Adds this voice's output to an interleaved block with `channels` channels.
    #[inline(always)]
    pub fn render_to(&mut self, sample: &SampleBuffer, out: &mut [f32], channels: usize) {
        let amplitude = self.velocity as f32 / 127.0;

        for frame in out.chunks_exact_mut(channels) {
            if self.ended() {
                break;
            }

            let gain = self.envelope.next_gain() * amplitude;
            for (channel, value) in frame.iter_mut().enumerate() {
                *value += sample.get(channel, self.position) * gain;
            }
            self.position += 1;
        }
    }
}

impl VoiceGeneratorBase for SampleVoice {
    #[inline(always)]
    fn ended(&self) -> bool {
        self.position >= self.frames || self.envelope.ended()
    }

    #[inline(always)]
    fn signal_release(&mut self, rel_type: ReleaseType) {
        self.envelope.signal_release(rel_type);
    }
}

#[cfg(test)]
mod tests {
    use crate::voice::EnvelopeDescriptor;

    use super::*;

    fn ramp(frames: usize) -> SampleBuffer {
        let data = (0..frames).map(|i| i as f32 / frames as f32).collect();
        SampleBuffer::from_channels(vec![data], 100).unwrap()
    }

    fn flat() -> EnvelopeParameters {
        EnvelopeDescriptor::new(0.0, 0.0, 1.0, 0.0).to_envelope_params(100)
    }

    #[test]
    fn test_mono_is_duplicated() {
        let sample = ramp(4);
        let mut voice = SampleVoice::new(60, 127, &sample, flat());

        let mut out = vec![0.0; 8];
        voice.render_to(&sample, &mut out, 2);
        assert_eq!(out, vec![0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75]);
        assert_eq!(voice.position(), 4);
        assert!(voice.ended());
    }

    #[test]
    fn test_stops_at_end_of_sample() {
        let sample = ramp(3);
        let mut voice = SampleVoice::new(60, 127, &sample, flat());

        let mut out = vec![1.0; 5];
        voice.render_to(&sample, &mut out, 1);
        assert_eq!(voice.position(), 3);
        // Frames after the end are left untouched
        assert_eq!(out[3..], [1.0, 1.0]);
    }

    #[test]
    fn test_velocity_scales_output() {
        let sample = SampleBuffer::from_channels(vec![vec![1.0; 4]], 100).unwrap();
        let mut voice = SampleVoice::new(60, 0, &sample, flat());

        let mut out = vec![0.0; 4];
        voice.render_to(&sample, &mut out, 1);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn test_retrigger_restarts_sample() {
        let sample = ramp(10);
        let mut voice = SampleVoice::new(60, 127, &sample, flat());

        let mut out = vec![0.0; 6];
        voice.render_to(&sample, &mut out, 1);
        voice.signal_release(ReleaseType::Standard);
        assert!(voice.is_releasing());

        voice.retrigger(100);
        assert_eq!(voice.position(), 0);
        assert_eq!(voice.velocity(), 100);
        assert!(!voice.is_releasing());
    }
}
