/// A note or voice event for the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerEvent {
    /// Starts (or retriggers) the voice for a key. A velocity of 0 is treated
    /// as a note off, as in MIDI.
    NoteOn { key: u8, vel: u8 },
    /// Signals off to the voice of a key
    NoteOff { key: u8 },
    /// Signals off to all voices
    AllNotesOff,
    /// Kills all voices with a short fadeout
    AllNotesKilled,
}
