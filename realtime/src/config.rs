use sampler_core::engine::VoiceEngineConfig;

/// Options for initializing a new RealtimeSampler.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RealtimeSamplerConfig {
    /// Options for the voice engine that renders the audio.
    pub engine: VoiceEngineConfig,

    /// Number of events and sample loads that can be waiting for the audio
    /// thread. Sends fail with `RealtimeError::QueueFull` once it is full.
    ///
    /// Default: `1024`
    pub command_queue_size: usize,

    /// Number of replaced samples that can be waiting to be dropped off the
    /// audio thread.
    ///
    /// Default: `16`
    pub reclaim_queue_size: usize,

    /// How often a `DisplayTicker` produces a new frame, in Hz.
    ///
    /// Default: `30.0`
    pub display_refresh_hz: f64,
}

impl Default for RealtimeSamplerConfig {
    fn default() -> Self {
        Self {
            engine: Default::default(),
            command_queue_size: 1024,
            reclaim_queue_size: 16,
            display_refresh_hz: 30.0,
        }
    }
}
