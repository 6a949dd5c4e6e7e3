//! Audio backend: whole-clip decode plus cpal output
//!
//! Pronunciation clips are short, so the backend decodes the entire clip
//! up front (symphonia), converts it to the output device rate (rubato),
//! and plays it from memory through a per-clip cpal stream.

pub mod decoder;
pub mod output;
pub mod resampler;

pub use output::CpalBackend;
