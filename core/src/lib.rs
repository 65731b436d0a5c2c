pub mod voice;

pub mod engine;

pub mod display;

mod audio_pipe;
pub use audio_pipe::*;

mod audio_stream;
pub use audio_stream::*;

mod clock;
pub use clock::*;

mod sample;
pub use sample::*;
