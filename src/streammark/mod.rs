//! Streammark core: event-time watermark strategy evaluation.
//!
//! Modules are layered leaves-first: `model` and `error` at the bottom,
//! `config` describing one experiment, `watermark` and `window` as the
//! strategy and aggregation halves of a run, `pipeline` wiring one
//! experiment end to end, `sweep` walking the configuration grid, and
//! `datagen` producing synthetic inputs.

pub mod config;
pub mod datagen;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod sweep;
pub mod watermark;
pub mod window;
