//! Grid configuration and the CPU mirror of the cell shader.
//!
//! The shader in `render/shaders/grid.wgsl` and the functions in `cell` must agree;
//! tests exercise the CPU side to pin down what the GPU side computes.

mod cell;
mod params;

pub use cell::{cell_clip_rect, cell_color, cell_for_instance, ClipRect};
pub use params::{GridConfig, GridParameters, GRID_SIZE, GRID_SIZE_ENV};
