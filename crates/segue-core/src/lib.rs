//! # segue-core
//!
//! Data model and sample transform pipeline for the Segue audio edit engine.
//!
//! This crate is pure computation: no files, no codecs, no threads. It
//! defines the track format metadata, the edit primitives (cut ranges and
//! gain), and the composable per-sample transform stages the transcode
//! driver pumps decoded audio through.

mod cancel;
mod edit;
mod error;
mod format;
mod mix;
mod resample;
mod transform;

pub use cancel::CancelToken;
pub use edit::{CutSet, EditRange};
pub use error::{CoreError, Result};
pub use format::TrackFormat;
pub use mix::MonoMix;
pub use resample::LinearResampler;
pub use transform::{apply_gain, CutStage, GainStage, Pipeline, Stage};
