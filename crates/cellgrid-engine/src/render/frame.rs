use std::ops::Range;

use crate::device::{PassCommand, PassDescriptor, RenderDevice};
use crate::error::{RenderError, Result};

use super::bind_group::BindGroup;
use super::buffer::GeometryBuffer;
use super::pipeline::Pipeline;

/// Lifecycle of one frame: `Idle → Encoding → Recording → Finished → Submitted`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameState {
    Idle,
    Encoding,
    Recording,
    Finished,
    Submitted,
}

impl FrameState {
    fn name(self) -> &'static str {
        match self {
            FrameState::Idle => "idle",
            FrameState::Encoding => "encoding",
            FrameState::Recording => "recording",
            FrameState::Finished => "finished",
            FrameState::Submitted => "submitted",
        }
    }
}

struct PassRecording<'a, D: RenderDevice> {
    target: &'a D::TargetView,
    target_format: wgpu::TextureFormat,
    clear: wgpu::Color,
    commands: Vec<PassCommand<'a, D>>,
    pipeline: Option<&'a Pipeline<D>>,
    vertex_buffers: Vec<(u32, &'a GeometryBuffer<D>)>,
    bind_groups: Vec<(u32, &'a BindGroup<D>)>,
    draws: u32,
    instances: u64,
}

impl<'a, D: RenderDevice> PassRecording<'a, D> {
    fn vertex_buffer(&self, slot: u32) -> Option<&'a GeometryBuffer<D>> {
        self.vertex_buffers
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, g)| *g)
    }

    fn bind_group(&self, index: u32) -> Option<&'a BindGroup<D>> {
        self.bind_groups
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, bg)| *bg)
    }
}

enum Stage<'a, D: RenderDevice> {
    Idle,
    Encoding(D::CommandEncoder),
    Recording(D::CommandEncoder, PassRecording<'a, D>),
    Finished(D::CommandEncoder),
    Submitted,
}

impl<D: RenderDevice> Stage<'_, D> {
    fn state(&self) -> FrameState {
        match self {
            Stage::Idle => FrameState::Idle,
            Stage::Encoding(_) => FrameState::Encoding,
            Stage::Recording(..) => FrameState::Recording,
            Stage::Finished(_) => FrameState::Finished,
            Stage::Submitted => FrameState::Submitted,
        }
    }
}

/// Records one render pass and submits it.
///
/// Pass commands are validated as they are recorded and replayed into the
/// device's command encoder when the pass ends. The encoder is single use:
/// after `submit` every operation fails.
pub struct FrameEncoder<'a, D: RenderDevice> {
    device: &'a D,
    stage: Stage<'a, D>,
}

impl<'a, D: RenderDevice> FrameEncoder<'a, D> {
    pub fn new(device: &'a D) -> Self {
        Self {
            device,
            stage: Stage::Idle,
        }
    }

    pub fn state(&self) -> FrameState {
        self.stage.state()
    }

    /// `Idle → Encoding`: obtains a command encoder.
    pub fn begin(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(RenderError::FrameSequence {
                operation: "begin",
                state: self.state().name(),
            });
        }
        let encoder = self.device.create_command_encoder("cell frame encoder");
        self.stage = Stage::Encoding(encoder);
        Ok(())
    }

    /// `Encoding → Recording`: opens a pass that clears `target` to `clear`.
    pub fn begin_render_pass(
        &mut self,
        target: &'a D::TargetView,
        target_format: wgpu::TextureFormat,
        clear: wgpu::Color,
    ) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Submitted) {
            Stage::Encoding(encoder) => {
                let pass = PassRecording {
                    target,
                    target_format,
                    clear,
                    commands: Vec::new(),
                    pipeline: None,
                    vertex_buffers: Vec::new(),
                    bind_groups: Vec::new(),
                    draws: 0,
                    instances: 0,
                };
                self.stage = Stage::Recording(encoder, pass);
                Ok(())
            }
            other => {
                let state = other.state();
                self.stage = other;
                Err(RenderError::FrameSequence {
                    operation: "begin_render_pass",
                    state: state.name(),
                })
            }
        }
    }

    fn pass_mut(&mut self, operation: &'static str) -> Result<&mut PassRecording<'a, D>> {
        match &mut self.stage {
            Stage::Recording(_, pass) => Ok(pass),
            Stage::Finished(_) | Stage::Submitted => Err(RenderError::RenderPassClosed { operation }),
            other => Err(RenderError::FrameSequence {
                operation,
                state: other.state().name(),
            }),
        }
    }

    /// Binds `pipeline`; its color format must match the pass target.
    pub fn set_pipeline(&mut self, pipeline: &'a Pipeline<D>) -> Result<()> {
        let pass = self.pass_mut("set_pipeline")?;
        if pipeline.target_format() != pass.target_format {
            return Err(RenderError::TargetFormatMismatch {
                label: pipeline.label().to_string(),
                pipeline: pipeline.target_format(),
                target: pass.target_format,
            });
        }

        pass.pipeline = Some(pipeline);
        pass.commands.push(PassCommand::SetPipeline(pipeline.raw()));
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, geometry: &'a GeometryBuffer<D>) -> Result<()> {
        let pass = self.pass_mut("set_vertex_buffer")?;
        pass.vertex_buffers.retain(|(s, _)| *s != slot);
        pass.vertex_buffers.push((slot, geometry));
        pass.commands.push(PassCommand::SetVertexBuffer {
            slot,
            buffer: geometry.buffer().raw(),
        });
        Ok(())
    }

    /// Binds `bind_group` at `index`; requires a pipeline with a matching layout.
    pub fn set_bind_group(&mut self, index: u32, bind_group: &'a BindGroup<D>) -> Result<()> {
        let pass = self.pass_mut("set_bind_group")?;
        let pipeline = pass.pipeline.ok_or(RenderError::FrameSequence {
            operation: "set_bind_group",
            state: "recording without a pipeline",
        })?;
        bind_group.check_compatible(pipeline, index)?;

        pass.bind_groups.retain(|(i, _)| *i != index);
        pass.bind_groups.push((index, bind_group));
        pass.commands.push(PassCommand::SetBindGroup {
            index,
            bind_group: bind_group.raw(),
        });
        Ok(())
    }

    /// Instanced, non-indexed draw.
    ///
    /// Every vertex slot and bind group the pipeline declares must be bound, with
    /// layouts matching the pipeline set last.
    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) -> Result<()> {
        let pass = self.pass_mut("draw")?;
        let pipeline = pass.pipeline.ok_or(RenderError::FrameSequence {
            operation: "draw",
            state: "recording without a pipeline",
        })?;

        let unbound = || RenderError::FrameSequence {
            operation: "draw",
            state: "recording with unbound vertex buffers or bind groups",
        };

        // Bindings may predate the current pipeline; check them against it here.
        for (slot, layout) in pipeline.vertex_layouts().iter().enumerate() {
            let geometry = pass.vertex_buffer(slot as u32).ok_or_else(unbound)?;
            if geometry.layout() != layout {
                return Err(RenderError::link(
                    pipeline.label(),
                    format!(
                        "vertex slot {slot}: buffer `{}` has layout {:?}, pipeline expects {:?}",
                        geometry.buffer().label(),
                        geometry.layout(),
                        layout
                    ),
                ));
            }
        }
        for index in 0..pipeline.binding_layout().groups().len() as u32 {
            let bind_group = pass.bind_group(index).ok_or_else(unbound)?;
            bind_group.check_compatible(pipeline, index)?;
        }

        pass.draws += 1;
        pass.instances += instances.len() as u64;
        pass.commands.push(PassCommand::Draw {
            vertices,
            instances,
        });
        Ok(())
    }

    /// `Recording → Finished`: encodes the recorded pass.
    pub fn end_render_pass(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Submitted) {
            Stage::Recording(mut encoder, pass) => {
                self.device.encode_render_pass(
                    &mut encoder,
                    pass.target,
                    &PassDescriptor {
                        label: "cell grid pass",
                        clear: pass.clear,
                    },
                    &pass.commands,
                );
                log::debug!(
                    "grid pass encoded: {} draw(s), {} instance(s)",
                    pass.draws,
                    pass.instances
                );
                self.stage = Stage::Finished(encoder);
                Ok(())
            }
            other @ (Stage::Finished(_) | Stage::Submitted) => {
                self.stage = other;
                Err(RenderError::RenderPassClosed {
                    operation: "end_render_pass",
                })
            }
            other => {
                let state = other.state();
                self.stage = other;
                Err(RenderError::FrameSequence {
                    operation: "end_render_pass",
                    state: state.name(),
                })
            }
        }
    }

    /// `Finished → Submitted`: hands the command buffer to the queue.
    pub fn submit(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Submitted) {
            Stage::Finished(encoder) => {
                self.device.submit(encoder);
                log::debug!("frame submitted");
                Ok(())
            }
            other => {
                let state = other.state();
                self.stage = other;
                Err(RenderError::FrameSequence {
                    operation: "submit",
                    state: state.name(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordedCommand, RecordingDevice};
    use crate::grid::GridParameters;
    use crate::render::{
        BindGroupLayoutDesc, BindingLayout, PipelineBuilder, ShaderProgram, UniformBuffer, Vertex,
        VertexLayout, CELL_QUAD, GRID_SHADER,
    };

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;
    const CLEAR: wgpu::Color = wgpu::Color {
        r: 0.1,
        g: 0.1,
        b: 0.1,
        a: 1.0,
    };

    struct Fixture {
        geometry: GeometryBuffer<RecordingDevice>,
        pipeline: Pipeline<RecordingDevice>,
        bind_group: BindGroup<RecordingDevice>,
    }

    fn grid_pipeline(
        device: &RecordingDevice,
        vertex_layout: VertexLayout,
        min_size: u64,
    ) -> Pipeline<RecordingDevice> {
        let program = ShaderProgram::compile(device, "cell shader", GRID_SHADER).unwrap();
        PipelineBuilder::new("cell pipeline", &program)
            .vertex_layout(vertex_layout)
            .binding_layout(BindingLayout::new().with_group(
                BindGroupLayoutDesc::new().uniform(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    min_size,
                ),
            ))
            .target_format(FORMAT)
            .build(device)
            .unwrap()
    }

    fn fixture(device: &RecordingDevice) -> Fixture {
        let geometry = GeometryBuffer::upload(device, "cell vertices", &CELL_QUAD).unwrap();
        let uniforms = UniformBuffer::new(device, "grid", &GridParameters::square(4)).unwrap();
        let pipeline = grid_pipeline(device, Vertex::layout(), 8);
        let bind_group =
            BindGroup::new(device, "bg", &pipeline, 0, &[(0, uniforms.buffer())]).unwrap();
        device.clear_calls();
        Fixture {
            geometry,
            pipeline,
            bind_group,
        }
    }

    fn record<'a>(
        frame: &mut FrameEncoder<'a, RecordingDevice>,
        f: &'a Fixture,
        target: &'a crate::device::Handle,
    ) {
        frame.begin().unwrap();
        frame.begin_render_pass(target, FORMAT, CLEAR).unwrap();
        frame.set_pipeline(&f.pipeline).unwrap();
        frame.set_vertex_buffer(0, &f.geometry).unwrap();
        frame.set_bind_group(0, &f.bind_group).unwrap();
        frame.draw(0..6, 0..16).unwrap();
    }

    // ── happy path ────────────────────────────────────────────────────────

    #[test]
    fn walks_every_state_once() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        assert_eq!(frame.state(), FrameState::Idle);

        frame.begin().unwrap();
        assert_eq!(frame.state(), FrameState::Encoding);
        frame.begin_render_pass(&target, FORMAT, CLEAR).unwrap();
        assert_eq!(frame.state(), FrameState::Recording);
        frame.set_pipeline(&f.pipeline).unwrap();
        frame.set_vertex_buffer(0, &f.geometry).unwrap();
        frame.set_bind_group(0, &f.bind_group).unwrap();
        frame.draw(0..6, 0..16).unwrap();
        frame.end_render_pass().unwrap();
        assert_eq!(frame.state(), FrameState::Finished);
        frame.submit().unwrap();
        assert_eq!(frame.state(), FrameState::Submitted);

        let calls = device.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], DeviceCall::CreateCommandEncoder { .. }));
        let DeviceCall::RenderPass {
            target: t,
            clear,
            commands,
            ..
        } = &calls[1]
        else {
            panic!("expected a render pass, got {:?}", calls[1]);
        };
        assert_eq!(*t, target);
        assert_eq!(*clear, CLEAR);
        assert_eq!(
            commands.as_slice(),
            &[
                RecordedCommand::SetPipeline(*f.pipeline.raw()),
                RecordedCommand::SetVertexBuffer {
                    slot: 0,
                    buffer: *f.geometry.buffer().raw()
                },
                RecordedCommand::SetBindGroup {
                    index: 0,
                    bind_group: *f.bind_group.raw()
                },
                RecordedCommand::Draw {
                    vertices: 0..6,
                    instances: 0..16
                },
            ]
        );
        assert!(matches!(calls[2], DeviceCall::Submit { .. }));
    }

    // ── closed pass ───────────────────────────────────────────────────────

    #[test]
    fn draw_after_end_fails_with_render_pass_closed() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        record(&mut frame, &f, &target);
        frame.end_render_pass().unwrap();

        assert!(matches!(
            frame.draw(0..6, 0..16),
            Err(RenderError::RenderPassClosed { operation: "draw" })
        ));
        assert!(matches!(
            frame.set_pipeline(&f.pipeline),
            Err(RenderError::RenderPassClosed { .. })
        ));
        assert!(matches!(
            frame.end_render_pass(),
            Err(RenderError::RenderPassClosed { .. })
        ));
        // The failed calls leave the frame submittable.
        assert_eq!(frame.state(), FrameState::Finished);
        frame.submit().unwrap();
    }

    #[test]
    fn nothing_is_allowed_after_submit() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        record(&mut frame, &f, &target);
        frame.end_render_pass().unwrap();
        frame.submit().unwrap();

        assert!(matches!(
            frame.draw(0..6, 0..1),
            Err(RenderError::RenderPassClosed { .. })
        ));
        assert!(matches!(
            frame.submit(),
            Err(RenderError::FrameSequence { .. })
        ));
        assert!(matches!(frame.begin(), Err(RenderError::FrameSequence { .. })));
        assert_eq!(device.submit_count(), 1);
    }

    // ── sequencing ────────────────────────────────────────────────────────

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let device = RecordingDevice::new();
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);

        assert!(matches!(
            frame.begin_render_pass(&target, FORMAT, CLEAR),
            Err(RenderError::FrameSequence { state: "idle", .. })
        ));
        assert!(matches!(
            frame.draw(0..6, 0..1),
            Err(RenderError::FrameSequence { state: "idle", .. })
        ));
        assert!(matches!(frame.submit(), Err(RenderError::FrameSequence { .. })));

        frame.begin().unwrap();
        assert!(matches!(frame.begin(), Err(RenderError::FrameSequence { .. })));
        assert!(matches!(
            frame.end_render_pass(),
            Err(RenderError::FrameSequence { state: "encoding", .. })
        ));

        frame.begin_render_pass(&target, FORMAT, CLEAR).unwrap();
        assert!(matches!(
            frame.submit(),
            Err(RenderError::FrameSequence { state: "recording", .. })
        ));
        assert_eq!(frame.state(), FrameState::Recording);
    }

    #[test]
    fn draw_requires_pipeline_and_bindings() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        frame.begin().unwrap();
        frame.begin_render_pass(&target, FORMAT, CLEAR).unwrap();

        assert!(frame.draw(0..6, 0..1).is_err());
        assert!(frame.set_bind_group(0, &f.bind_group).is_err());

        frame.set_pipeline(&f.pipeline).unwrap();
        assert!(frame.draw(0..6, 0..1).is_err());
        frame.set_vertex_buffer(0, &f.geometry).unwrap();
        assert!(frame.draw(0..6, 0..1).is_err());
        frame.set_bind_group(0, &f.bind_group).unwrap();
        assert!(frame.draw(0..6, 0..1).is_ok());
    }

    // ── target format ─────────────────────────────────────────────────────

    #[test]
    fn pipeline_for_another_format_is_rejected() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        frame.begin().unwrap();
        frame
            .begin_render_pass(&target, wgpu::TextureFormat::Rgba16Float, CLEAR)
            .unwrap();

        assert!(matches!(
            frame.set_pipeline(&f.pipeline),
            Err(RenderError::TargetFormatMismatch {
                pipeline: FORMAT,
                target: wgpu::TextureFormat::Rgba16Float,
                ..
            })
        ));
    }

    // ── bindings under a new pipeline ─────────────────────────────────────

    #[test]
    fn bind_group_is_rechecked_after_pipeline_switch() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let wider = grid_pipeline(&device, Vertex::layout(), 16);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        record(&mut frame, &f, &target);

        frame.set_pipeline(&wider).unwrap();
        assert!(matches!(
            frame.draw(0..6, 0..16),
            Err(RenderError::BindGroupLayoutMismatch { group: 0, .. })
        ));
    }

    #[test]
    fn vertex_buffer_is_rechecked_against_pipeline_layout() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let per_instance = grid_pipeline(
            &device,
            VertexLayout::new(
                8,
                wgpu::VertexStepMode::Instance,
                &wgpu::vertex_attr_array![0 => Float32x2],
            ),
            8,
        );
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        frame.begin().unwrap();
        frame.begin_render_pass(&target, FORMAT, CLEAR).unwrap();
        frame.set_pipeline(&per_instance).unwrap();
        frame.set_vertex_buffer(0, &f.geometry).unwrap();

        assert!(matches!(
            frame.draw(0..6, 0..1),
            Err(RenderError::PipelineLinkError { .. })
        ));
    }

    // ── counters ──────────────────────────────────────────────────────────

    #[test]
    fn instance_totals_beyond_u32_are_fine() {
        let device = RecordingDevice::new();
        let f = fixture(&device);
        let target = device.target_view();
        let mut frame = FrameEncoder::new(&device);
        record(&mut frame, &f, &target);

        let max_cells = 65_535 * 65_535;
        frame.draw(0..6, 0..max_cells).unwrap();
        frame.draw(0..6, 0..max_cells).unwrap();
        frame.end_render_pass().unwrap();
        frame.submit().unwrap();
    }
}
