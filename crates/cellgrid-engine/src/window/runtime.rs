use anyhow::{bail, Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit, SurfaceErrorAction, ViewportMetrics, WgpuDevice};
use crate::grid::GridConfig;
use crate::render::RenderContext;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cellgrid".to_string(),
            initial_size: LogicalSize::new(800.0, 800.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and draws the grid whenever the OS asks for a redraw.
    ///
    /// Returns once the window is closed, or with the first fatal error.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, grid: GridConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, grid);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct GridWindow {
    entry: WindowEntry,
    context: RenderContext<WgpuDevice>,
}

impl GridWindow {
    fn open(
        event_loop: &ActiveEventLoop,
        config: &RuntimeConfig,
        gpu_init: GpuInit,
        grid: GridConfig,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let metrics = ViewportMetrics::from_window(&window);

        let entry = WindowEntry::try_new(window, |w| {
            pollster::block_on(Gpu::new(w, metrics, gpu_init))
        })
        .context("GPU initialization failed for window")?;

        let context = entry
            .with_gpu(|gpu| {
                RenderContext::new(gpu.device().clone(), gpu.surface_format(), grid)
            })
            .context("failed to build the grid pipeline")?;

        Ok(Self { entry, context })
    }

    fn id(&self) -> WindowId {
        self.entry.with_window(|w| w.id())
    }

    fn request_redraw(&self) {
        self.entry.with_window(|w| w.request_redraw());
    }

    /// Acquires the surface texture, renders one grid frame into it and presents.
    fn render(&mut self) -> Result<()> {
        let Self { entry, context } = self;

        entry.with_mut(|fields| -> Result<()> {
            let gpu = fields.gpu;
            let frame = match gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    return match gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured => {
                            fields.window.request_redraw();
                            Ok(())
                        }
                        SurfaceErrorAction::SkipFrame => Ok(()),
                        SurfaceErrorAction::Fatal => bail!("surface is out of memory"),
                    };
                }
            };

            // The surface keeps its initial format, so the pipeline stays valid.
            context.render_frame(&frame.view, gpu.surface_format())?;

            fields.window.pre_present_notify();
            frame.present();
            Ok(())
        })
    }
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    grid: GridConfig,

    window: Option<GridWindow>,
    error: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, grid: GridConfig) -> Self {
        Self {
            config,
            gpu_init,
            grid,
            window: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        match GridWindow::open(event_loop, &self.config, self.gpu_init.clone(), self.grid) {
            Ok(window) => {
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.window = None;
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = window.render() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }
}
