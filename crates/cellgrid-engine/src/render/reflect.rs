//! What the pipeline builder needs to know about a validated WGSL module.

use naga::valid::ModuleInfo;
use naga::{AddressSpace, Binding, FunctionArgument, Module, ScalarKind, TypeInner, VectorSize};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InputKind {
    Float,
    Sint,
    Uint,
}

/// A `@location` input of a vertex entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexInput {
    pub location: u32,
    pub kind: InputKind,
    pub components: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryPointInfo {
    pub name: String,
    pub stage: wgpu::ShaderStages,
    /// Empty for non-vertex stages.
    pub vertex_inputs: Vec<VertexInput>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Uniform,
    Storage,
    Other,
}

/// A `@group/@binding` global.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceInfo {
    pub name: Option<String>,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    /// Byte size of the bound type.
    pub size: u64,
    /// Stages whose entry points read or write it.
    pub used_by: wgpu::ShaderStages,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ShaderReflection {
    pub entry_points: Vec<EntryPointInfo>,
    pub resources: Vec<ResourceInfo>,
}

impl ShaderReflection {
    pub(crate) fn new(module: &Module, info: &ModuleInfo) -> Self {
        let entry_points = module
            .entry_points
            .iter()
            .map(|ep| {
                let stage = stage_flags(ep.stage);
                let vertex_inputs = if stage == wgpu::ShaderStages::VERTEX {
                    vertex_inputs(module, &ep.function.arguments)
                } else {
                    Vec::new()
                };
                EntryPointInfo {
                    name: ep.name.clone(),
                    stage,
                    vertex_inputs,
                }
            })
            .collect();

        let gctx = module.to_ctx();
        let resources = module
            .global_variables
            .iter()
            .filter_map(|(handle, var)| {
                let rb = var.binding.as_ref()?;
                let kind = match var.space {
                    AddressSpace::Uniform => ResourceKind::Uniform,
                    AddressSpace::Storage { .. } => ResourceKind::Storage,
                    _ => ResourceKind::Other,
                };
                let used_by = module
                    .entry_points
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !info.get_entry_point(*i)[handle].is_empty())
                    .fold(wgpu::ShaderStages::NONE, |acc, (_, ep)| {
                        acc | stage_flags(ep.stage)
                    });

                Some(ResourceInfo {
                    name: var.name.clone(),
                    group: rb.group,
                    binding: rb.binding,
                    kind,
                    size: module.types[var.ty].inner.size(gctx) as u64,
                    used_by,
                })
            })
            .collect();

        Self {
            entry_points,
            resources,
        }
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInfo> {
        self.entry_points.iter().find(|ep| ep.name == name)
    }
}

fn stage_flags(stage: naga::ShaderStage) -> wgpu::ShaderStages {
    match stage {
        naga::ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
        naga::ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        naga::ShaderStage::Compute => wgpu::ShaderStages::COMPUTE,
        #[allow(unreachable_patterns)]
        _ => wgpu::ShaderStages::NONE,
    }
}

/// Collects `@location` inputs, flattening struct arguments.
fn vertex_inputs(module: &Module, arguments: &[FunctionArgument]) -> Vec<VertexInput> {
    let mut out = Vec::new();
    for arg in arguments {
        match &arg.binding {
            Some(binding) => push_input(module, binding, arg.ty, &mut out),
            None => {
                if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            push_input(module, binding, member.ty, &mut out);
                        }
                    }
                }
            }
        }
    }
    out.sort_by_key(|i| i.location);
    out
}

fn push_input(
    module: &Module,
    binding: &Binding,
    ty: naga::Handle<naga::Type>,
    out: &mut Vec<VertexInput>,
) {
    let Binding::Location { location, .. } = binding else { return };
    let Some((kind, components)) = input_shape(&module.types[ty].inner) else { return };
    out.push(VertexInput {
        location: *location,
        kind,
        components,
    });
}

fn input_shape(inner: &TypeInner) -> Option<(InputKind, u32)> {
    let (scalar, components) = match inner {
        TypeInner::Scalar(s) => (*s, 1),
        TypeInner::Vector { size, scalar } => {
            let n = match size {
                VectorSize::Bi => 2,
                VectorSize::Tri => 3,
                VectorSize::Quad => 4,
            };
            (*scalar, n)
        }
        _ => return None,
    };
    let kind = match scalar.kind {
        ScalarKind::Float => InputKind::Float,
        ScalarKind::Sint => InputKind::Sint,
        ScalarKind::Uint => InputKind::Uint,
        _ => return None,
    };
    Some((kind, components))
}

/// Shader-side shape of a vertex buffer format.
pub(crate) fn vertex_format_shape(format: wgpu::VertexFormat) -> Option<(InputKind, u32)> {
    use wgpu::VertexFormat as F;
    let shape = match format {
        F::Float32 => (InputKind::Float, 1),
        F::Float32x2 | F::Float16x2 | F::Unorm16x2 | F::Snorm16x2 => (InputKind::Float, 2),
        F::Float32x3 => (InputKind::Float, 3),
        F::Float32x4 | F::Float16x4 | F::Unorm8x4 | F::Snorm8x4 | F::Unorm16x4 | F::Snorm16x4 => {
            (InputKind::Float, 4)
        }
        F::Uint32 => (InputKind::Uint, 1),
        F::Uint32x2 | F::Uint16x2 | F::Uint8x2 => (InputKind::Uint, 2),
        F::Uint32x3 => (InputKind::Uint, 3),
        F::Uint32x4 | F::Uint16x4 | F::Uint8x4 => (InputKind::Uint, 4),
        F::Sint32 => (InputKind::Sint, 1),
        F::Sint32x2 | F::Sint16x2 | F::Sint8x2 => (InputKind::Sint, 2),
        F::Sint32x3 => (InputKind::Sint, 3),
        F::Sint32x4 | F::Sint16x4 | F::Sint8x4 => (InputKind::Sint, 4),
        _ => return None,
    };
    Some(shape)
}
