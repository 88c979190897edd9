use bytemuck::{Pod, Zeroable};

/// Cell quad vertex: a clip-space corner in `[-1, 1]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    /// Per-vertex layout: stride 8, one `float32x2` at offset 0, location 0.
    pub fn layout() -> VertexLayout {
        VertexLayout::new(
            std::mem::size_of::<Vertex>() as u64,
            wgpu::VertexStepMode::Vertex,
            &Self::ATTRS,
        )
    }
}

/// Unit quad as two triangles, no index buffer.
///
/// Corners sit on the clip-space edges so that a 1x1 grid covers the whole target.
pub const CELL_QUAD: [Vertex; 6] = [
    Vertex { pos: [-1.0, -1.0] },
    Vertex { pos: [1.0, -1.0] },
    Vertex { pos: [1.0, 1.0] },
    Vertex { pos: [-1.0, -1.0] },
    Vertex { pos: [1.0, 1.0] },
    Vertex { pos: [-1.0, 1.0] },
];

/// Owned description of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    pub fn new(
        stride: u64,
        step_mode: wgpu::VertexStepMode,
        attributes: &[wgpu::VertexAttribute],
    ) -> Self {
        Self {
            stride,
            step_mode,
            attributes: attributes.to_vec(),
        }
    }

    /// Byte extent of the attributes when tightly packed (end of the furthest attribute).
    pub fn packed_size(&self) -> u64 {
        self.attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0)
    }

    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}
