use anyhow::{Context, Result};
use winit::dpi::LogicalSize;

use cellgrid_engine::device::GpuInit;
use cellgrid_engine::grid::GridConfig;
use cellgrid_engine::logging::{init_logging, LoggingConfig};
use cellgrid_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let grid = GridConfig::from_env().context("invalid GRID_SIZE")?;
    log::info!(
        "drawing a {n}x{n} grid ({} instances)",
        grid.instance_count(),
        n = grid.grid_size()
    );

    let config = RuntimeConfig {
        title: format!("cellgrid {n}x{n}", n = grid.grid_size()),
        initial_size: LogicalSize::new(512.0, 512.0),
    };

    Runtime::run(config, GpuInit::default(), grid)
}
