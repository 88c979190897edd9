use crate::device::RenderDevice;
use crate::error::{RenderError, Result};

use super::reflect::ShaderReflection;

/// WGSL source of the cell grid program (`vs_main` + `fs_main`).
pub const GRID_SHADER: &str = include_str!("shaders/grid.wgsl");

/// Parses and validates WGSL, returning its reflection.
///
/// Diagnostics are rendered against `source` so they carry line/column context.
pub fn reflect_wgsl(label: &str, source: &str) -> Result<ShaderReflection> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        RenderError::ShaderCompileError {
            label: label.to_string(),
            message: e.emit_to_string(source),
        }
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| RenderError::ShaderCompileError {
            label: label.to_string(),
            message: e.emit_to_string(source),
        })?;

    Ok(ShaderReflection::new(&module, &info))
}

/// Compiled vertex + fragment program sharing one module.
pub struct ShaderProgram<D: RenderDevice> {
    label: String,
    module: D::ShaderModule,
    reflection: ShaderReflection,
}

impl<D: RenderDevice> ShaderProgram<D> {
    /// Validates `source` and creates the device module.
    ///
    /// Invalid source never reaches the device.
    pub fn compile(device: &D, label: &str, source: &str) -> Result<Self> {
        let reflection = reflect_wgsl(label, source)?;
        let module = device.create_shader_module(label, source);

        log::debug!(
            "shader `{label}` compiled: entry points [{}]",
            reflection
                .entry_points
                .iter()
                .map(|ep| ep.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            label: label.to_string(),
            module,
            reflection,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn module(&self) -> &D::ShaderModule {
        &self.module
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::render::reflect::{InputKind, ResourceKind, VertexInput};

    // ── grid shader ───────────────────────────────────────────────────────

    #[test]
    fn grid_shader_declares_both_stages() {
        let r = reflect_wgsl("grid", GRID_SHADER).unwrap();

        let vs = r.entry_point("vs_main").unwrap();
        assert_eq!(vs.stage, wgpu::ShaderStages::VERTEX);
        assert_eq!(
            vs.vertex_inputs,
            vec![VertexInput {
                location: 0,
                kind: InputKind::Float,
                components: 2
            }]
        );

        let fs = r.entry_point("fs_main").unwrap();
        assert_eq!(fs.stage, wgpu::ShaderStages::FRAGMENT);
        assert!(fs.vertex_inputs.is_empty());
    }

    #[test]
    fn grid_uniform_is_group0_binding0() {
        let r = reflect_wgsl("grid", GRID_SHADER).unwrap();
        assert_eq!(r.resources.len(), 1);

        let grid = &r.resources[0];
        assert_eq!(grid.name.as_deref(), Some("grid"));
        assert_eq!((grid.group, grid.binding), (0, 0));
        assert_eq!(grid.kind, ResourceKind::Uniform);
        assert_eq!(grid.size, 8);
        assert!(grid.used_by.contains(wgpu::ShaderStages::VERTEX));
        assert!(grid.used_by.contains(wgpu::ShaderStages::FRAGMENT));
    }

    #[test]
    fn grid_cell_is_computed_in_unsigned_integers() {
        let module = naga::front::wgsl::parse_str(GRID_SHADER).unwrap();
        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap();
        let (index, vs) = module
            .entry_points
            .iter()
            .enumerate()
            .find(|(_, ep)| ep.name == "vs_main")
            .unwrap();
        let fn_info = info.get_entry_point(index);

        let uint_ops: Vec<naga::BinaryOperator> = vs
            .function
            .expressions
            .iter()
            .filter_map(|(_, expr)| match expr {
                naga::Expression::Binary {
                    op: op @ (naga::BinaryOperator::Modulo | naga::BinaryOperator::Divide),
                    left,
                    ..
                } => {
                    let ty = fn_info[*left].ty.inner_with(&module.types);
                    matches!(ty, naga::TypeInner::Scalar(s) if s.kind == naga::ScalarKind::Uint)
                        .then_some(*op)
                }
                _ => None,
            })
            .collect();

        assert!(uint_ops.contains(&naga::BinaryOperator::Modulo), "{uint_ops:?}");
        assert!(uint_ops.contains(&naga::BinaryOperator::Divide), "{uint_ops:?}");
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn syntax_error_is_reported_with_label() {
        let err = reflect_wgsl("broken", "@vertex fn vs_main( -> {").unwrap_err();
        match err {
            RenderError::ShaderCompileError { label, message } => {
                assert_eq!(label, "broken");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn semantic_error_is_reported() {
        let src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4f {
                return vec4f(undefined_name, 0.0, 0.0, 1.0);
            }
        "#;
        assert!(matches!(
            reflect_wgsl("semantic", src),
            Err(RenderError::ShaderCompileError { .. })
        ));
    }

    #[test]
    fn invalid_source_never_reaches_the_device() {
        let device = RecordingDevice::new();
        let result = ShaderProgram::compile(&device, "broken", "fn (");
        assert!(result.is_err());
        assert!(device.calls().is_empty());
    }

    #[test]
    fn compile_creates_one_module() {
        let device = RecordingDevice::new();
        let program = ShaderProgram::compile(&device, "cell shader", GRID_SHADER).unwrap();
        assert_eq!(program.label(), "cell shader");
        assert!(matches!(
            device.calls().as_slice(),
            [DeviceCall::CreateShaderModule { label, .. }] if label == "cell shader"
        ));
    }
}
