pub mod clip;
pub mod config;
pub mod error;
pub mod interactive;
pub mod library;
pub mod media;
pub mod pipeline;

pub use config::Config;
pub use error::{ClipperError, Result};
pub use pipeline::{run_clip, ClipOptions, ClipOutcome, Interrupt};
