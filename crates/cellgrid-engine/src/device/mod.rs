//! Device acquisition + surface configuration.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - configuring the Surface from the host viewport metrics
//! - the `RenderDevice` capability set and its wgpu and recording implementations

mod backend;
mod error;
mod frame;
mod gpu;
mod init;
mod recording;
mod surface;
mod wgpu_device;

pub use backend::{PassCommand, PassDescriptor, PipelineDescriptor, RenderDevice};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use recording::{DeviceCall, Handle, RecordedCommand, RecordingDevice};
pub use surface::ViewportMetrics;
pub use wgpu_device::WgpuDevice;
