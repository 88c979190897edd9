use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Range;

use super::backend::{PassCommand, PassDescriptor, PipelineDescriptor, RenderDevice};
use crate::render::{BindingLayout, VertexLayout};

/// Opaque resource id handed out by [`RecordingDevice`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// Pass command as observed by the recording device.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    SetPipeline(Handle),
    SetVertexBuffer { slot: u32, buffer: Handle },
    SetBindGroup { index: u32, bind_group: Handle },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

/// One call made against the device, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer {
        buffer: Handle,
        label: String,
        size: u64,
        usage: wgpu::BufferUsages,
    },
    WriteBuffer {
        buffer: Handle,
        offset: u64,
        len: u64,
    },
    CreateShaderModule {
        module: Handle,
        label: String,
    },
    CreateRenderPipeline {
        pipeline: Handle,
        label: String,
        module: Handle,
        vertex_entry: String,
        fragment_entry: String,
        vertex_layouts: Vec<VertexLayout>,
        binding_layout: BindingLayout,
        target_format: wgpu::TextureFormat,
    },
    CreateBindGroup {
        bind_group: Handle,
        label: String,
        pipeline: Handle,
        group: u32,
        entries: Vec<(u32, Handle)>,
    },
    CreateCommandEncoder {
        encoder: Handle,
        label: String,
    },
    RenderPass {
        encoder: Handle,
        target: Handle,
        label: String,
        clear: wgpu::Color,
        commands: Vec<RecordedCommand>,
    },
    Submit {
        encoder: Handle,
    },
}

/// Device without a GPU.
///
/// Every call is appended to a log and buffer uploads are kept, so the whole
/// construction and frame sequence can be inspected afterwards.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: Cell<u64>,
    calls: RefCell<Vec<DeviceCall>>,
    contents: RefCell<HashMap<Handle, Vec<u8>>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self) -> Handle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Handle(id)
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }

    /// Stand-in for a surface texture view.
    pub fn target_view(&self) -> Handle {
        self.alloc()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Bytes written to `buffer` so far.
    pub fn buffer_contents(&self, buffer: Handle) -> Option<Vec<u8>> {
        self.contents.borrow().get(&buffer).cloned()
    }

    /// Commands of every encoded render pass, in order.
    pub fn recorded_passes(&self) -> Vec<Vec<RecordedCommand>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::RenderPass { commands, .. } => Some(commands.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submit_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, DeviceCall::Submit { .. }))
            .count()
    }
}

impl RenderDevice for RecordingDevice {
    type Buffer = Handle;
    type ShaderModule = Handle;
    type Pipeline = Handle;
    type BindGroup = Handle;
    type CommandEncoder = Handle;
    type TargetView = Handle;

    fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> Handle {
        let buffer = self.alloc();
        self.contents
            .borrow_mut()
            .insert(buffer, vec![0; size as usize]);
        self.record(DeviceCall::CreateBuffer {
            buffer,
            label: label.to_string(),
            size,
            usage,
        });
        buffer
    }

    fn write_buffer(&self, buffer: &Handle, offset: u64, data: &[u8]) {
        let mut contents = self.contents.borrow_mut();
        let bytes = contents.entry(*buffer).or_default();
        let start = offset as usize;
        let end = start + data.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);

        self.record(DeviceCall::WriteBuffer {
            buffer: *buffer,
            offset,
            len: data.len() as u64,
        });
    }

    fn create_shader_module(&self, label: &str, _source: &str) -> Handle {
        let module = self.alloc();
        self.record(DeviceCall::CreateShaderModule {
            module,
            label: label.to_string(),
        });
        module
    }

    fn create_render_pipeline(&self, desc: &PipelineDescriptor<'_, Handle>) -> Handle {
        let pipeline = self.alloc();
        self.record(DeviceCall::CreateRenderPipeline {
            pipeline,
            label: desc.label.to_string(),
            module: *desc.module,
            vertex_entry: desc.vertex_entry.to_string(),
            fragment_entry: desc.fragment_entry.to_string(),
            vertex_layouts: desc.vertex_layouts.to_vec(),
            binding_layout: desc.binding_layout.clone(),
            target_format: desc.target_format,
        });
        pipeline
    }

    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &Handle,
        group: u32,
        entries: &[(u32, &Handle)],
    ) -> Handle {
        let bind_group = self.alloc();
        self.record(DeviceCall::CreateBindGroup {
            bind_group,
            label: label.to_string(),
            pipeline: *pipeline,
            group,
            entries: entries.iter().map(|(b, h)| (*b, **h)).collect(),
        });
        bind_group
    }

    fn create_command_encoder(&self, label: &str) -> Handle {
        let encoder = self.alloc();
        self.record(DeviceCall::CreateCommandEncoder {
            encoder,
            label: label.to_string(),
        });
        encoder
    }

    fn encode_render_pass(
        &self,
        encoder: &mut Handle,
        target: &Handle,
        pass: &PassDescriptor<'_>,
        commands: &[PassCommand<'_, Self>],
    ) {
        let commands = commands
            .iter()
            .map(|cmd| match cmd {
                PassCommand::SetPipeline(p) => RecordedCommand::SetPipeline(**p),
                PassCommand::SetVertexBuffer { slot, buffer } => RecordedCommand::SetVertexBuffer {
                    slot: *slot,
                    buffer: **buffer,
                },
                PassCommand::SetBindGroup { index, bind_group } => RecordedCommand::SetBindGroup {
                    index: *index,
                    bind_group: **bind_group,
                },
                PassCommand::Draw {
                    vertices,
                    instances,
                } => RecordedCommand::Draw {
                    vertices: vertices.clone(),
                    instances: instances.clone(),
                },
            })
            .collect();

        self.record(DeviceCall::RenderPass {
            encoder: *encoder,
            target: *target,
            label: pass.label.to_string(),
            clear: pass.clear,
            commands,
        });
    }

    fn submit(&self, encoder: Handle) {
        self.record(DeviceCall::Submit { encoder });
    }
}
