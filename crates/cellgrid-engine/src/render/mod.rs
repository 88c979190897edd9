//! Backend-neutral grid render core.
//!
//! Everything here is generic over [`RenderDevice`](crate::device::RenderDevice):
//! buffers, the validated shader program, the pipeline builder, bind groups and
//! the per-frame encoder. Contracts between them are checked on the CPU before a
//! device call is made.

mod bind_group;
mod buffer;
mod context;
mod frame;
mod layout;
mod pipeline;
mod reflect;
mod shader;
mod vertex;

pub use bind_group::BindGroup;
pub use buffer::{GeometryBuffer, GpuBuffer, UniformBuffer};
pub use context::{grid_binding_layout, DrawParams, RenderContext, CLEAR_COLOR};
pub use frame::{FrameEncoder, FrameState};
pub use layout::{BindGroupLayoutDesc, BindingEntry, BindingKind, BindingLayout};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use reflect::{
    EntryPointInfo, InputKind, ResourceInfo, ResourceKind, ShaderReflection, VertexInput,
};
pub use shader::{reflect_wgsl, ShaderProgram, GRID_SHADER};
pub use vertex::{Vertex, VertexLayout, CELL_QUAD};
