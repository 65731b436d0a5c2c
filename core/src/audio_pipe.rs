use crate::AudioStreamParams;

/// An object to read audio samples from.
pub trait AudioPipe {
    /// The audio stream parameters of the audio pipe.
    fn stream_params(&self) -> &'_ AudioStreamParams;

    /// Reads interleaved samples from the pipe.
    ///
    /// The amount of samples read determines how much time passes for the
    /// active notes. If we send a note on event and read 44100 frames at a
    /// 44.1kHz sample rate, the note will have been audible for 1 second.
    fn read_samples(&mut self, to: &mut [f32]) {
        assert!(to.len() % self.stream_params().channels.count() as usize == 0);
        self.read_samples_unchecked(to);
    }

    /// Reads samples from the pipe without checking the channel count of the output.
    fn read_samples_unchecked(&mut self, to: &mut [f32]);
}
