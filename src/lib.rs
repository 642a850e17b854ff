//! Spectrogram rendering and time-ranged audio labelling.
//!
//! Decoded samples go through the STFT in [`audio`], are projected onto a
//! pixel grid by [`render`], and are annotated through [`annotate`]. The
//! [`view`] controller ties these together for an interactive host.

pub mod annotate;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod render;
pub mod view;

pub use error::{EngineError, Result};
