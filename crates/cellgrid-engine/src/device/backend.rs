//! Minimal device capability set the render core is written against.
//!
//! `WgpuDevice` drives a real GPU; `RecordingDevice` stands in for one in tests.

use std::ops::Range;

use crate::render::{BindingLayout, VertexLayout};

/// Everything a backend needs to link a render pipeline.
///
/// Descriptors reaching the device have already been validated against the
/// shader's reflection.
pub struct PipelineDescriptor<'a, M> {
    pub label: &'a str,
    pub module: &'a M,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub vertex_layouts: &'a [VertexLayout],
    pub binding_layout: &'a BindingLayout,
    pub target_format: wgpu::TextureFormat,
}

/// Single color attachment pass: clear on load, store on end.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassDescriptor<'a> {
    pub label: &'a str,
    pub clear: wgpu::Color,
}

/// Command recorded inside a render pass.
pub enum PassCommand<'a, D: RenderDevice + ?Sized> {
    SetPipeline(&'a D::Pipeline),
    SetVertexBuffer { slot: u32, buffer: &'a D::Buffer },
    SetBindGroup { index: u32, bind_group: &'a D::BindGroup },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

pub trait RenderDevice {
    type Buffer;
    type ShaderModule;
    type Pipeline;
    type BindGroup;
    type CommandEncoder;
    type TargetView;

    /// Allocates `size` bytes of device memory.
    fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> Self::Buffer;

    /// Queue-level upload; ordered before any later submission.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Creates a module from WGSL that has already passed validation.
    fn create_shader_module(&self, label: &str, source: &str) -> Self::ShaderModule;

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_, Self::ShaderModule>,
    ) -> Self::Pipeline;

    /// Binds `(binding, buffer)` pairs to `group` of `pipeline`'s layout.
    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &Self::Pipeline,
        group: u32,
        entries: &[(u32, &Self::Buffer)],
    ) -> Self::BindGroup;

    fn create_command_encoder(&self, label: &str) -> Self::CommandEncoder;

    /// Records one render pass into `encoder`.
    fn encode_render_pass(
        &self,
        encoder: &mut Self::CommandEncoder,
        target: &Self::TargetView,
        pass: &PassDescriptor<'_>,
        commands: &[PassCommand<'_, Self>],
    );

    /// Finishes `encoder` and hands the command buffer to the queue. Does not block.
    fn submit(&self, encoder: Self::CommandEncoder);
}
