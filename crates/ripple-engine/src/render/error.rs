use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the render components.
///
/// Startup failures (`ResourceLoad`, `ShaderCompile`, `DeviceResource`) are fatal.
/// `DeviceLost` aborts the current frame; recovery is the runtime's reset cycle.
/// `InvalidState` reports a misordered call sequence.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Missing, unreadable or undecodable asset.
    #[error("failed to load `{}`", path.display())]
    ResourceLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Effect source failed to parse, validate, or lacks a required entry point
    /// or parameter. `diagnostics` holds the compiler's rendered report.
    #[error("effect `{}` failed to compile:\n{diagnostics}", path.display())]
    ShaderCompile { path: PathBuf, diagnostics: String },

    /// The device cannot create the requested resource (size/format limits).
    #[error("device rejected `{label}`: {reason}")]
    DeviceResource { label: String, reason: String },

    /// The device became unusable mid-frame.
    #[error("graphics device lost")]
    DeviceLost,

    /// A call was made out of sequence (nested batch, sampling the bound target, …).
    #[error("invalid render call sequence: {0}")]
    InvalidState(&'static str),
}

impl RenderError {
    pub(crate) fn load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn device_resource(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceResource {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a startup asset failure (file or shader).
    pub fn is_resource_load(&self) -> bool {
        matches!(self, Self::ResourceLoad { .. } | Self::ShaderCompile { .. })
    }
}
