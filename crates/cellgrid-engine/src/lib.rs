//! Cellgrid engine crate.
//!
//! Draws an N by N grid of colored cells with one instanced draw call. The render
//! core is generic over a small device capability set so the whole construction
//! and frame sequence runs against a recording device in tests.

pub mod device;
pub mod error;
pub mod grid;
pub mod logging;
pub mod render;
pub mod window;

pub use error::{RenderError, Result};
