use bytemuck::{Pod, Zeroable};

use crate::error::{RenderError, Result};

/// Default grid side length.
pub const GRID_SIZE: u32 = 32;

/// Environment variable overriding [`GRID_SIZE`].
pub const GRID_SIZE_ENV: &str = "GRID_SIZE";

/// Uniform block read by both shader stages (`var<uniform> grid: vec2f`).
///
/// Layout is two packed `f32` (8 bytes), matching WGSL `vec2<f32>`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GridParameters {
    pub columns: f32,
    pub rows: f32,
}

impl GridParameters {
    /// Square grid of `n` by `n` cells.
    #[inline]
    pub fn square(n: u32) -> Self {
        Self {
            columns: n as f32,
            rows: n as f32,
        }
    }
}

/// Grid configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GridConfig {
    grid_size: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { grid_size: GRID_SIZE }
    }
}

impl GridConfig {
    /// Creates a config for an `n` by `n` grid.
    ///
    /// `n` must be positive and `n * n` must fit the draw call's instance count.
    pub fn new(grid_size: u32) -> Result<Self> {
        if grid_size == 0 {
            return Err(RenderError::InvalidGridSize {
                value: grid_size.to_string(),
                reason: "must be a positive integer",
            });
        }
        if grid_size.checked_mul(grid_size).is_none() {
            return Err(RenderError::InvalidGridSize {
                value: grid_size.to_string(),
                reason: "instance count (n * n) overflows u32",
            });
        }
        Ok(Self { grid_size })
    }

    /// Parses a raw setting; `None` or blank input yields the default.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        let n: u32 = raw.parse().map_err(|_| RenderError::InvalidGridSize {
            value: raw.to_string(),
            reason: "must be a positive integer",
        })?;

        Self::new(n)
    }

    /// Reads [`GRID_SIZE_ENV`] from the process environment.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(GRID_SIZE_ENV).ok();
        let config = Self::parse(raw.as_deref());
        if let Err(e) = &config {
            log::warn!("rejected {GRID_SIZE_ENV}: {e}");
        }
        config
    }

    #[inline]
    pub fn grid_size(self) -> u32 {
        self.grid_size
    }

    /// Number of instances drawn per frame (one per cell).
    #[inline]
    pub fn instance_count(self) -> u32 {
        // Overflow is rejected in `new`.
        self.grid_size * self.grid_size
    }

    #[inline]
    pub fn parameters(self) -> GridParameters {
        GridParameters::square(self.grid_size)
    }
}
