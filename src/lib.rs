#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Real-time monophonic pitch-correction engine.
//!
//! [`Engine`] is the only type the audio thread touches: construct one with
//! the host sample rate, call [`Engine::process`] once per callback, and
//! feed it parameter updates from the control thread through its `set_*`
//! methods. Nothing in [`Engine::process`] allocates, blocks, or locks.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod fft;
pub mod note;
pub mod persist;
pub mod pitch;
pub mod reader;
pub mod resampler;
pub mod ring_buffer;
pub mod tables;

pub use config::RetuneConfig;
pub use control::ParameterSink;
pub use engine::Engine;
pub use error::RetuneError;
pub use persist::PersistedState;
