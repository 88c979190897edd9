use crate::device::RenderDevice;
use crate::error::{RenderError, Result};

use super::buffer::GpuBuffer;
use super::layout::{BindGroupLayoutDesc, BindingKind};
use super::pipeline::Pipeline;

/// Buffers bound to one group of a pipeline's layout.
///
/// Remembers the layout shape it was built for; binding it under a pipeline whose
/// group has a different shape fails with `BindGroupLayoutMismatch`.
pub struct BindGroup<D: RenderDevice> {
    label: String,
    raw: D::BindGroup,
    group: u32,
    layout: BindGroupLayoutDesc,
}

impl<D: RenderDevice> BindGroup<D> {
    pub fn new(
        device: &D,
        label: &str,
        pipeline: &Pipeline<D>,
        group: u32,
        entries: &[(u32, &GpuBuffer<D>)],
    ) -> Result<Self> {
        let mismatch = |reason: String| RenderError::BindGroupLayoutMismatch {
            label: label.to_string(),
            group,
            reason,
        };

        let layout = pipeline.binding_layout().group(group).ok_or_else(|| {
            mismatch(format!("pipeline `{}` declares no such group", pipeline.label()))
        })?;

        for (binding, _) in entries {
            if layout.entry(*binding).is_none() {
                return Err(mismatch(format!("binding {binding} is not in the layout")));
            }
        }

        for slot in &layout.entries {
            let buffer = entries
                .iter()
                .find(|(b, _)| *b == slot.binding)
                .map(|(_, buf)| *buf)
                .ok_or_else(|| mismatch(format!("binding {} is not provided", slot.binding)))?;

            match slot.kind {
                BindingKind::UniformBuffer { min_size } => {
                    if !buffer.usage().contains(wgpu::BufferUsages::UNIFORM) {
                        return Err(mismatch(format!(
                            "buffer `{}` for binding {} lacks UNIFORM usage",
                            buffer.label(),
                            slot.binding
                        )));
                    }
                    if buffer.size() < min_size {
                        return Err(mismatch(format!(
                            "buffer `{}` is {} bytes, binding {} needs {min_size}",
                            buffer.label(),
                            buffer.size(),
                            slot.binding
                        )));
                    }
                }
            }
        }

        let raw_entries: Vec<(u32, &D::Buffer)> =
            entries.iter().map(|(b, buf)| (*b, buf.raw())).collect();
        let raw = device.create_bind_group(label, pipeline.raw(), group, &raw_entries);
        log::debug!("bind group `{label}` created for group {group}");

        Ok(Self {
            label: label.to_string(),
            raw,
            group,
            layout: layout.clone(),
        })
    }

    /// Checks that this bind group can be bound at `index` of `pipeline`.
    pub fn check_compatible(&self, pipeline: &Pipeline<D>, index: u32) -> Result<()> {
        let mismatch = |reason: String| RenderError::BindGroupLayoutMismatch {
            label: self.label.clone(),
            group: index,
            reason,
        };

        match pipeline.binding_layout().group(index) {
            Some(layout) if *layout == self.layout => Ok(()),
            Some(layout) => Err(mismatch(format!(
                "pipeline `{}` expects {:?}, bind group was built for {:?}",
                pipeline.label(),
                layout.entries,
                self.layout.entries
            ))),
            None => Err(mismatch(format!(
                "pipeline `{}` declares no such group",
                pipeline.label()
            ))),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn raw(&self) -> &D::BindGroup {
        &self.raw
    }

    /// Group index this bind group was built for.
    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn layout(&self) -> &BindGroupLayoutDesc {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::grid::GridParameters;
    use crate::render::{
        BindingLayout, PipelineBuilder, ShaderProgram, UniformBuffer, Vertex, GRID_SHADER,
    };

    fn pipeline(
        device: &RecordingDevice,
        program: &ShaderProgram<RecordingDevice>,
        min_size: u64,
    ) -> Pipeline<RecordingDevice> {
        PipelineBuilder::new("cell pipeline", program)
            .vertex_layout(Vertex::layout())
            .binding_layout(BindingLayout::new().with_group(
                BindGroupLayoutDesc::new().uniform(0, wgpu::ShaderStages::VERTEX_FRAGMENT, min_size),
            ))
            .target_format(wgpu::TextureFormat::Rgba8Unorm)
            .build(device)
            .unwrap()
    }

    #[test]
    fn binds_uniform_to_slot_zero() {
        let device = RecordingDevice::new();
        let program = ShaderProgram::compile(&device, "s", GRID_SHADER).unwrap();
        let pipeline = pipeline(&device, &program, 8);
        let uniforms = UniformBuffer::new(&device, "u", &GridParameters::square(2)).unwrap();

        let bg = BindGroup::new(&device, "bg", &pipeline, 0, &[(0, uniforms.buffer())]).unwrap();
        assert_eq!(bg.group(), 0);
        assert!(bg.check_compatible(&pipeline, 0).is_ok());

        assert!(matches!(
            device.calls().last(),
            Some(DeviceCall::CreateBindGroup { group: 0, entries, pipeline: p, .. })
                if entries == &vec![(0, *uniforms.buffer().raw())] && p == pipeline.raw()
        ));
    }

    #[test]
    fn vertex_buffer_cannot_back_a_uniform_slot() {
        let device = RecordingDevice::new();
        let program = ShaderProgram::compile(&device, "s", GRID_SHADER).unwrap();
        let pipeline = pipeline(&device, &program, 8);
        let wrong = GpuBuffer::create(&device, "v", 8, wgpu::BufferUsages::VERTEX);

        assert!(matches!(
            BindGroup::new(&device, "bg", &pipeline, 0, &[(0, &wrong)]),
            Err(RenderError::BindGroupLayoutMismatch { .. })
        ));
    }

    #[test]
    fn missing_or_extra_bindings_are_rejected() {
        let device = RecordingDevice::new();
        let program = ShaderProgram::compile(&device, "s", GRID_SHADER).unwrap();
        let pipeline = pipeline(&device, &program, 8);
        let uniforms = UniformBuffer::new(&device, "u", &GridParameters::square(2)).unwrap();

        assert!(BindGroup::new(&device, "bg", &pipeline, 0, &[]).is_err());
        assert!(
            BindGroup::new(
                &device,
                "bg",
                &pipeline,
                0,
                &[(0, uniforms.buffer()), (1, uniforms.buffer())]
            )
            .is_err()
        );
        assert!(BindGroup::new(&device, "bg", &pipeline, 1, &[(0, uniforms.buffer())]).is_err());
    }

    #[test]
    fn stale_after_rebuild_with_different_layout() {
        let device = RecordingDevice::new();
        let program = ShaderProgram::compile(&device, "s", GRID_SHADER).unwrap();
        let first = pipeline(&device, &program, 8);
        let uniforms = UniformBuffer::new(&device, "u", &GridParameters::square(2)).unwrap();
        let bg = BindGroup::new(&device, "bg", &first, 0, &[(0, uniforms.buffer())]).unwrap();

        let same_shape = pipeline(&device, &program, 8);
        assert!(bg.check_compatible(&same_shape, 0).is_ok());

        let rebuilt = pipeline(&device, &program, 16);
        assert!(matches!(
            bg.check_compatible(&rebuilt, 0),
            Err(RenderError::BindGroupLayoutMismatch { group: 0, .. })
        ));
        assert!(bg.check_compatible(&first, 1).is_err());
    }
}
