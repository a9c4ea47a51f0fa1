//! Session reconstruction and weekday/time-of-day bucketing.
//!
//! Reads the bot's JSON log, pairs start/end markers into sessions, files
//! them into per-weekday buckets and runs the top-level analysis pipeline.

pub mod analysis;
pub mod bucket;
pub mod builder;
pub mod history;
pub mod reader;
pub mod reconstructor;

pub use lea_core as core;
