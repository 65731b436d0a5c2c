mod config;
pub use config::*;

mod error;
pub use error::*;

mod stream_renderer;

mod realtime_sampler;
pub use realtime_sampler::*;

mod display_ticker;
pub use display_ticker::*;
