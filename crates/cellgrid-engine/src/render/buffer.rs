use std::marker::PhantomData;

use bytemuck::Pod;

use crate::device::RenderDevice;
use crate::error::{RenderError, Result};

use super::vertex::{Vertex, VertexLayout};

/// Device buffer plus the metadata needed to validate later uses.
pub struct GpuBuffer<D: RenderDevice> {
    raw: D::Buffer,
    label: String,
    size: u64,
    usage: wgpu::BufferUsages,
}

impl<D: RenderDevice> GpuBuffer<D> {
    pub fn create(device: &D, label: &str, size: u64, usage: wgpu::BufferUsages) -> Self {
        log::debug!("buffer `{label}`: {size} bytes, {usage:?}");
        Self {
            raw: device.create_buffer(label, size, usage),
            label: label.to_string(),
            size,
            usage,
        }
    }

    /// Queues a write of `data` at `offset`.
    ///
    /// Rejects writes past the end, writes to buffers without `COPY_DST`, and
    /// offsets/lengths that are not multiples of `COPY_BUFFER_ALIGNMENT`.
    pub fn write(&self, device: &D, offset: u64, data: &[u8]) -> Result<()> {
        if !self.usage.contains(wgpu::BufferUsages::COPY_DST) {
            return Err(RenderError::upload(&self.label, "buffer lacks COPY_DST usage"));
        }
        let len = data.len() as u64;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(RenderError::upload(
                &self.label,
                format!("offset {offset} / length {len} not 4-byte aligned"),
            ));
        }
        if offset.checked_add(len).is_none_or(|end| end > self.size) {
            return Err(RenderError::upload(
                &self.label,
                format!("write of {len} bytes at {offset} exceeds size {}", self.size),
            ));
        }

        device.write_buffer(&self.raw, offset, data);
        Ok(())
    }

    pub fn raw(&self) -> &D::Buffer {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }
}

/// Static vertex data, uploaded once.
pub struct GeometryBuffer<D: RenderDevice> {
    buffer: GpuBuffer<D>,
    layout: VertexLayout,
    vertex_count: u32,
}

impl<D: RenderDevice> GeometryBuffer<D> {
    /// Allocates exactly `vertices.len() * stride` bytes and uploads them.
    ///
    /// The buffer keeps its layout; drawing it under a pipeline that expects
    /// another layout fails.
    pub fn upload(device: &D, label: &str, vertices: &[Vertex]) -> Result<Self> {
        if vertices.is_empty() {
            return Err(RenderError::upload(label, "no vertices"));
        }
        let vertex_count = u32::try_from(vertices.len())
            .map_err(|_| RenderError::upload(label, "vertex count exceeds u32"))?;

        let layout = Vertex::layout();
        let bytes: &[u8] = bytemuck::cast_slice(vertices);

        let buffer = GpuBuffer::create(
            device,
            label,
            bytes.len() as u64,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        );
        buffer.write(device, 0, bytes)?;

        Ok(Self {
            buffer,
            layout,
            vertex_count,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer<D> {
        &self.buffer
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Fixed-size parameter block of type `T`, rewritable in place.
pub struct UniformBuffer<D: RenderDevice, T: Pod> {
    buffer: GpuBuffer<D>,
    _marker: PhantomData<T>,
}

impl<D: RenderDevice, T: Pod> UniformBuffer<D, T> {
    pub fn new(device: &D, label: &str, value: &T) -> Result<Self> {
        let size = std::mem::size_of::<T>() as u64;
        if size == 0 {
            return Err(RenderError::upload(label, "uniform type is zero-sized"));
        }

        let buffer = GpuBuffer::create(
            device,
            label,
            size,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        buffer.write(device, 0, bytemuck::bytes_of(value))?;

        Ok(Self {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Replaces the contents; buffer identity stays the same.
    pub fn write(&self, device: &D, value: &T) -> Result<()> {
        self.buffer.write(device, 0, bytemuck::bytes_of(value))
    }

    pub fn buffer(&self) -> &GpuBuffer<D> {
        &self.buffer
    }
}
