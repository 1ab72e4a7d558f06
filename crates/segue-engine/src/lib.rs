//! Streaming drivers over the codec seam: transcode, merge, normalization
//! and atomic write-back.
//!
//! Every operation is a single-threaded cooperative pull loop intended to
//! run on a caller-provided background thread, holds at most one sample
//! batch plus the codec queues in memory, checks its [`CancelToken`] once
//! per iteration and releases codec resources on every exit path.
//!
//! [`CancelToken`]: segue_core::CancelToken

mod driver;
mod error;
mod merge;
mod normalize;
mod params;
mod replace;

pub use driver::transcode;
pub use error::{EngineError, Result};
pub use merge::merge;
pub use normalize::{measure_peak, normalize};
pub use params::{EditParams, OutputFormat, TranscodeStats};
pub use replace::write_replacing;
