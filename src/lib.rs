//! Generative face replacement pipeline.
//!
//! This crate takes a host photo, a set of externally detected face regions, and a pretrained
//! generative model, and produces a copy of the photo in which a selected face has been replaced
//! by a freshly synthesized one.
//!
//! The pieces, roughly in data-flow order:
//!
//! - [`asset`] reads a packaged model file into an immutable byte buffer.
//! - [`generator::FaceGenerator`] owns the loaded model and turns random latent vectors into
//!   28×28 face images. GPU execution is probed at load time and silently downgraded to CPU
//!   when unavailable.
//! - [`compositor::composite`] pastes a rescaled replacement image into a rectangular region of
//!   a host image, returning a new image.
//! - [`overlay`] converts face detector output into overlay draw commands and compositing
//!   requests. Face detection itself is *not* part of this crate; any detector that reports
//!   bounding boxes and landmarks in image pixel coordinates can feed it.
//!
//! All operations are blocking and single-threaded; long-running calls (model loading,
//! inference) should be kept off interactive threads by the caller.

use log::LevelFilter;

pub mod asset;
pub mod compositor;
mod error;
pub mod generator;
pub mod image;
pub mod nn;
pub mod overlay;
pub mod resolution;

pub use error::{Error, Result};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this crate log at *debug* level, `wgpu` at *warn* level. `RUST_LOG`
/// overrides these defaults. If a global logger is already registered, this macro does nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
