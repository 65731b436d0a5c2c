use std::collections::VecDeque;

use crate::voice::{ReleaseType, SampleVoice, VoiceGeneratorBase};

/// Fixed capacity voice storage. Never reallocates after construction, so it
/// is safe to use from the render context.
pub struct VoiceBuffer {
    buffer: VecDeque<SampleVoice>,
    limit: usize,
}

impl VoiceBuffer {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        VoiceBuffer {
            buffer: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// The sounding voice for a key, if there is one.
    pub fn find_voice_mut(&mut self, key: u8) -> Option<&mut SampleVoice> {
        self.buffer
            .iter_mut()
            .rev()
            .find(|voice| voice.key() == key && !voice.ended())
    }

    /// Pushes a new voice. When the buffer is full the oldest voice is dropped.
    pub fn push_voice(&mut self, voice: SampleVoice) {
        while self.buffer.len() >= self.limit {
            self.buffer.pop_front();
        }
        self.buffer.push_back(voice);
    }

    /// Releases every voice playing the key. Voices already releasing keep
    /// their current release.
    pub fn release_key(&mut self, key: u8, rel_type: ReleaseType) {
        for voice in self.buffer.iter_mut().filter(|voice| voice.key() == key) {
            voice.signal_release(rel_type);
        }
    }

    pub fn release_all_voices(&mut self, rel_type: ReleaseType) {
        for voice in self.buffer.iter_mut() {
            voice.signal_release(rel_type);
        }
    }

    pub fn kill_all_voices(&mut self) {
        self.buffer.clear();
    }

    pub fn remove_ended_voices(&mut self) {
        self.buffer.retain(|voice| !voice.ended());
    }

    pub fn iter_voices(&self) -> impl Iterator<Item = &SampleVoice> {
        self.buffer.iter()
    }

    pub fn iter_voices_mut(&mut self) -> impl Iterator<Item = &mut SampleVoice> {
        self.buffer.iter_mut()
    }

    pub fn voice_count(&self) -> usize {
        self.buffer.len()
    }

    /// The furthest read position of all stored voices, or 0 when empty.
    pub fn max_position(&self) -> usize {
        self.buffer
            .iter()
            .map(|voice| voice.position())
            .max()
            .unwrap_or(0)
    }
}
