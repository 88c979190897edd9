use crate::device::RenderDevice;
use crate::error::Result;
use crate::grid::{GridConfig, GridParameters};

use super::bind_group::BindGroup;
use super::buffer::{GeometryBuffer, UniformBuffer};
use super::frame::FrameEncoder;
use super::layout::{BindGroupLayoutDesc, BindingLayout};
use super::pipeline::{Pipeline, PipelineBuilder};
use super::shader::{ShaderProgram, GRID_SHADER};
use super::vertex::{Vertex, CELL_QUAD};

/// Background the grid pass clears to.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Parameters of the single instanced draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawParams {
    pub vertex_count: u32,
    pub instance_count: u32,
}

impl DrawParams {
    /// Vertex shader invocations for one frame.
    pub fn vertex_invocations(self) -> u64 {
        self.vertex_count as u64 * self.instance_count as u64
    }
}

/// Binding layout of the grid shader: the `GridParameters` uniform at group 0,
/// binding 0. Both stages read it.
pub fn grid_binding_layout() -> BindingLayout {
    BindingLayout::new().with_group(BindGroupLayoutDesc::new().uniform(
        0,
        wgpu::ShaderStages::VERTEX_FRAGMENT,
        std::mem::size_of::<GridParameters>() as u64,
    ))
}

/// Every resource the grid frame needs, built in order by [`RenderContext::new`].
pub struct RenderContext<D: RenderDevice> {
    device: D,
    grid: GridConfig,
    geometry: GeometryBuffer<D>,
    uniforms: UniformBuffer<D, GridParameters>,
    program: ShaderProgram<D>,
    pipeline: Pipeline<D>,
    bind_group: BindGroup<D>,
}

impl<D: RenderDevice> RenderContext<D> {
    /// Uploads geometry and uniforms, compiles the grid shader, links the
    /// pipeline for `format` and binds the uniforms.
    pub fn new(device: D, format: wgpu::TextureFormat, grid: GridConfig) -> Result<Self> {
        let geometry = GeometryBuffer::upload(&device, "cell vertices", &CELL_QUAD)?;
        let uniforms = UniformBuffer::new(&device, "grid uniforms", &grid.parameters())?;
        let program = ShaderProgram::compile(&device, "cell shader", GRID_SHADER)?;
        let pipeline = build_pipeline(&device, &program, format)?;
        let bind_group = bind_uniforms(&device, &pipeline, &uniforms)?;

        log::info!(
            "grid context ready: {n}x{n} cells, target {format:?}",
            n = grid.grid_size()
        );

        Ok(Self {
            device,
            grid,
            geometry,
            uniforms,
            program,
            pipeline,
            bind_group,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    pub fn pipeline(&self) -> &Pipeline<D> {
        &self.pipeline
    }

    pub fn geometry(&self) -> &GeometryBuffer<D> {
        &self.geometry
    }

    pub fn uniforms(&self) -> &UniformBuffer<D, GridParameters> {
        &self.uniforms
    }

    pub fn bind_group(&self) -> &BindGroup<D> {
        &self.bind_group
    }

    pub fn draw_params(&self) -> DrawParams {
        DrawParams {
            vertex_count: self.geometry.vertex_count(),
            instance_count: self.grid.instance_count(),
        }
    }

    /// Encodes and submits one frame into `target`, whose format is `format`.
    pub fn render_frame(&self, target: &D::TargetView, format: wgpu::TextureFormat) -> Result<()> {
        let params = self.draw_params();

        let mut frame = FrameEncoder::new(&self.device);
        frame.begin()?;
        frame.begin_render_pass(target, format, CLEAR_COLOR)?;
        frame.set_pipeline(&self.pipeline)?;
        frame.set_vertex_buffer(0, &self.geometry)?;
        frame.set_bind_group(0, &self.bind_group)?;
        frame.draw(0..params.vertex_count, 0..params.instance_count)?;
        frame.end_render_pass()?;
        frame.submit()?;

        log::debug!(
            "grid frame: {} vertices x {} instances",
            params.vertex_count,
            params.instance_count
        );
        Ok(())
    }

    /// Rewrites the uniform block in place. The buffer and bind group stay valid.
    pub fn set_grid_size(&mut self, grid: GridConfig) -> Result<()> {
        self.uniforms.write(&self.device, &grid.parameters())?;
        log::info!(
            "grid size {} -> {}",
            self.grid.grid_size(),
            grid.grid_size()
        );
        self.grid = grid;
        Ok(())
    }

    /// Relinks the pipeline for a new target format and rebuilds the bind group
    /// against it.
    pub fn rebuild_pipeline(&mut self, format: wgpu::TextureFormat) -> Result<()> {
        let pipeline = build_pipeline(&self.device, &self.program, format)?;
        let bind_group = bind_uniforms(&self.device, &pipeline, &self.uniforms)?;
        self.pipeline = pipeline;
        self.bind_group = bind_group;
        log::info!("cell pipeline rebuilt for {format:?}");
        Ok(())
    }
}

fn build_pipeline<D: RenderDevice>(
    device: &D,
    program: &ShaderProgram<D>,
    format: wgpu::TextureFormat,
) -> Result<Pipeline<D>> {
    PipelineBuilder::new("cell pipeline", program)
        .vertex_layout(Vertex::layout())
        .binding_layout(grid_binding_layout())
        .target_format(format)
        .build(device)
}

fn bind_uniforms<D: RenderDevice>(
    device: &D,
    pipeline: &Pipeline<D>,
    uniforms: &UniformBuffer<D, GridParameters>,
) -> Result<BindGroup<D>> {
    BindGroup::new(
        device,
        "cell bind group",
        pipeline,
        0,
        &[(0, uniforms.buffer())],
    )
}
