use crate::device::{PipelineDescriptor, RenderDevice};
use crate::error::{RenderError, Result};

use super::layout::{BindingKind, BindingLayout};
use super::reflect::{vertex_format_shape, ResourceKind, ShaderReflection};
use super::shader::ShaderProgram;
use super::vertex::VertexLayout;

/// Linked, immutable render pipeline and the contracts it was linked against.
pub struct Pipeline<D: RenderDevice> {
    label: String,
    raw: D::Pipeline,
    vertex_layouts: Vec<VertexLayout>,
    binding_layout: BindingLayout,
    target_format: wgpu::TextureFormat,
}

impl<D: RenderDevice> Pipeline<D> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn raw(&self) -> &D::Pipeline {
        &self.raw
    }

    pub fn vertex_layouts(&self) -> &[VertexLayout] {
        &self.vertex_layouts
    }

    pub fn binding_layout(&self) -> &BindingLayout {
        &self.binding_layout
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }
}

/// Links a [`ShaderProgram`], vertex layouts, an explicit binding layout and a
/// color target format.
///
/// Every contract between the descriptors and the shader is checked before the
/// device sees anything; a mismatch is a `PipelineLinkError`.
pub struct PipelineBuilder<'a, D: RenderDevice> {
    label: String,
    program: &'a ShaderProgram<D>,
    vertex_entry: String,
    fragment_entry: String,
    vertex_layouts: Vec<VertexLayout>,
    binding_layout: BindingLayout,
    target_format: Option<wgpu::TextureFormat>,
}

impl<'a, D: RenderDevice> PipelineBuilder<'a, D> {
    pub fn new(label: &str, program: &'a ShaderProgram<D>) -> Self {
        Self {
            label: label.to_string(),
            program,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            vertex_layouts: Vec::new(),
            binding_layout: BindingLayout::new(),
            target_format: None,
        }
    }

    pub fn vertex_entry(mut self, name: &str) -> Self {
        self.vertex_entry = name.to_string();
        self
    }

    pub fn fragment_entry(mut self, name: &str) -> Self {
        self.fragment_entry = name.to_string();
        self
    }

    /// Adds the layout for the next vertex buffer slot.
    pub fn vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layouts.push(layout);
        self
    }

    pub fn binding_layout(mut self, layout: BindingLayout) -> Self {
        self.binding_layout = layout;
        self
    }

    pub fn target_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.target_format = Some(format);
        self
    }

    pub fn build(self, device: &D) -> Result<Pipeline<D>> {
        let target_format = self.validate()?;

        let raw = device.create_render_pipeline(&PipelineDescriptor {
            label: &self.label,
            module: self.program.module(),
            vertex_entry: &self.vertex_entry,
            fragment_entry: &self.fragment_entry,
            vertex_layouts: &self.vertex_layouts,
            binding_layout: &self.binding_layout,
            target_format,
        });
        log::debug!("pipeline `{}` linked for {target_format:?}", self.label);

        Ok(Pipeline {
            label: self.label,
            raw,
            vertex_layouts: self.vertex_layouts,
            binding_layout: self.binding_layout,
            target_format,
        })
    }

    fn validate(&self) -> Result<wgpu::TextureFormat> {
        let label = self.label.as_str();
        let reflection = self.program.reflection();

        let format = self
            .target_format
            .ok_or_else(|| RenderError::link(label, "no color target format"))?;
        if format.is_depth_stencil_format() {
            return Err(RenderError::link(
                label,
                format!("{format:?} is not a color format"),
            ));
        }

        self.check_entry(reflection, &self.vertex_entry, wgpu::ShaderStages::VERTEX)?;
        self.check_entry(reflection, &self.fragment_entry, wgpu::ShaderStages::FRAGMENT)?;
        self.check_vertex_layouts(reflection)?;
        self.check_bindings(reflection)?;

        Ok(format)
    }

    fn check_entry(
        &self,
        reflection: &ShaderReflection,
        name: &str,
        stage: wgpu::ShaderStages,
    ) -> Result<()> {
        match reflection.entry_point(name) {
            Some(ep) if ep.stage == stage => Ok(()),
            Some(ep) => Err(RenderError::link(
                &self.label,
                format!("entry point `{name}` is a {:?} stage, expected {stage:?}", ep.stage),
            )),
            None => Err(RenderError::link(
                &self.label,
                format!(
                    "entry point `{name}` not found in shader `{}`",
                    self.program.label()
                ),
            )),
        }
    }

    fn check_vertex_layouts(&self, reflection: &ShaderReflection) -> Result<()> {
        let label = self.label.as_str();

        let mut seen_locations = Vec::new();
        for (slot, layout) in self.vertex_layouts.iter().enumerate() {
            if layout.attributes.is_empty() {
                return Err(RenderError::link(
                    label,
                    format!("vertex slot {slot} declares no attributes"),
                ));
            }
            let packed = layout.packed_size();
            if layout.stride != packed {
                return Err(RenderError::link(
                    label,
                    format!(
                        "vertex slot {slot}: stride {} does not match attribute size {packed}",
                        layout.stride
                    ),
                ));
            }
            for attr in &layout.attributes {
                if seen_locations.contains(&attr.shader_location) {
                    return Err(RenderError::link(
                        label,
                        format!("@location({}) is supplied twice", attr.shader_location),
                    ));
                }
                seen_locations.push(attr.shader_location);
            }
        }

        let Some(vs) = reflection.entry_point(&self.vertex_entry) else {
            return Ok(());
        };

        for input in &vs.vertex_inputs {
            let attr = self
                .vertex_layouts
                .iter()
                .flat_map(|l| l.attributes.iter())
                .find(|a| a.shader_location == input.location)
                .ok_or_else(|| {
                    RenderError::link(
                        label,
                        format!("shader input @location({}) has no vertex attribute", input.location),
                    )
                })?;

            let matches = vertex_format_shape(attr.format)
                .is_some_and(|(kind, n)| kind == input.kind && n == input.components);
            if !matches {
                return Err(RenderError::link(
                    label,
                    format!(
                        "@location({}): attribute {:?} does not match shader input {:?}x{}",
                        input.location, attr.format, input.kind, input.components
                    ),
                ));
            }
        }

        Ok(())
    }

    fn check_bindings(&self, reflection: &ShaderReflection) -> Result<()> {
        let label = self.label.as_str();

        for res in reflection.resources.iter().filter(|r| !r.used_by.is_empty()) {
            let at = format!("@group({}) @binding({})", res.group, res.binding);

            let entry = self
                .binding_layout
                .find(res.group, res.binding)
                .ok_or_else(|| RenderError::link(label, format!("{at} is not declared in the layout")))?;

            let BindingKind::UniformBuffer { min_size } = entry.kind;
            if res.kind != ResourceKind::Uniform {
                return Err(RenderError::link(
                    label,
                    format!("{at} is declared as a uniform buffer but the shader uses {:?}", res.kind),
                ));
            }
            if min_size < res.size {
                return Err(RenderError::link(
                    label,
                    format!("{at}: declared size {min_size} is smaller than shader type size {}", res.size),
                ));
            }
            if !entry.visibility.contains(res.used_by) {
                return Err(RenderError::link(
                    label,
                    format!(
                        "{at} is visible to {:?} but used by {:?}",
                        entry.visibility, res.used_by
                    ),
                ));
            }
        }

        Ok(())
    }
}
