mod envelopes;
pub use envelopes::*;

mod sampler;
pub use sampler::*;

/// How a voice should be released.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReleaseType {
    /// Standard release. Uses the voice's envelope.
    Standard,

    /// Kills the voice with a fadeout of 1ms.
    Kill,
}

pub trait VoiceGeneratorBase: Send + Sync {
    fn ended(&self) -> bool;
    fn signal_release(&mut self, rel_type: ReleaseType);
}

impl VoiceGeneratorBase for EnvelopeGenerator {
    #[inline(always)]
    fn ended(&self) -> bool {
        self.is_idle()
    }

    #[inline(always)]
    fn signal_release(&mut self, rel_type: ReleaseType) {
        self.release(rel_type);
    }
}
