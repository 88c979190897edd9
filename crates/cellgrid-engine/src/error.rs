use thiserror::Error;

/// Errors raised while building or submitting the grid pipeline.
///
/// All of them are fatal for the object being built: nothing here is retried.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("graphics is not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    #[error("no suitable graphics adapter found: {0}")]
    NoAdapterFound(String),

    #[error("failed to create logical device: {0}")]
    DeviceRequestFailed(String),

    #[error("surface cannot be configured: {0}")]
    SurfaceUnsupported(String),

    #[error("shader `{label}` failed to compile:\n{message}")]
    ShaderCompileError { label: String, message: String },

    #[error("pipeline `{label}` failed to link: {reason}")]
    PipelineLinkError { label: String, reason: String },

    #[error("bind group `{label}` does not match layout of group {group}: {reason}")]
    BindGroupLayoutMismatch {
        label: String,
        group: u32,
        reason: String,
    },

    #[error("pipeline `{label}` targets {pipeline:?} but the pass renders to {target:?}")]
    TargetFormatMismatch {
        label: String,
        pipeline: wgpu::TextureFormat,
        target: wgpu::TextureFormat,
    },

    #[error("render pass already ended; `{operation}` is not allowed")]
    RenderPassClosed { operation: &'static str },

    #[error("`{operation}` is not allowed while the frame is {state}")]
    FrameSequence {
        operation: &'static str,
        state: &'static str,
    },

    #[error("invalid grid size `{value}`: {reason}")]
    InvalidGridSize { value: String, reason: &'static str },

    #[error("buffer `{label}` upload rejected: {reason}")]
    BufferUpload { label: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    pub(crate) fn link(label: &str, reason: impl Into<String>) -> Self {
        Self::PipelineLinkError {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn upload(label: &str, reason: impl Into<String>) -> Self {
        Self::BufferUpload {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}
