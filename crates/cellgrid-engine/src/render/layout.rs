//! Hand-declared binding layouts.
//!
//! Pipelines never infer their layout from shader text. The layout is written out
//! here and checked against the shader's reflected bindings when the pipeline links.

use std::num::NonZeroU64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Uniform buffer of at least `min_size` bytes.
    UniformBuffer { min_size: u64 },
}

/// One slot of a bind group layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindingEntry {
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
    pub kind: BindingKind,
}

impl BindingEntry {
    pub fn to_wgpu(&self) -> wgpu::BindGroupLayoutEntry {
        match self.kind {
            BindingKind::UniformBuffer { min_size } => wgpu::BindGroupLayoutEntry {
                binding: self.binding,
                visibility: self.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(min_size),
                },
                count: None,
            },
        }
    }
}

/// Shape of a single bind group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindGroupLayoutDesc {
    pub entries: Vec<BindingEntry>,
}

impl BindGroupLayoutDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a uniform buffer slot.
    pub fn uniform(mut self, binding: u32, visibility: wgpu::ShaderStages, min_size: u64) -> Self {
        self.entries.push(BindingEntry {
            binding,
            visibility,
            kind: BindingKind::UniformBuffer { min_size },
        });
        self
    }

    pub fn entry(&self, binding: u32) -> Option<&BindingEntry> {
        self.entries.iter().find(|e| e.binding == binding)
    }

    pub fn to_wgpu_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.entries.iter().map(BindingEntry::to_wgpu).collect()
    }
}

/// Pipeline binding layout: bind group shapes indexed by group number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingLayout {
    groups: Vec<BindGroupLayoutDesc>,
}

impl BindingLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next group (group indices are dense, starting at 0).
    pub fn with_group(mut self, group: BindGroupLayoutDesc) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(&self) -> &[BindGroupLayoutDesc] {
        &self.groups
    }

    pub fn group(&self, index: u32) -> Option<&BindGroupLayoutDesc> {
        self.groups.get(index as usize)
    }

    pub fn find(&self, group: u32, binding: u32) -> Option<&BindingEntry> {
        self.group(group)?.entry(binding)
    }
}
