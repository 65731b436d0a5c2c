use thiserror::Error;

/// Errors returned while opening or controlling a realtime sampler.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to read the default output config")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("Output device has no channels")]
    NoOutputChannels,

    #[error("Failed to build the output stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start the output stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause the output stream")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Command queue is full")]
    QueueFull,

    #[error("The audio stream is no longer receiving commands")]
    Disconnected,
}
