use thiserror::Error;

/// Reasons the page cannot run GPU upscaling at all.
///
/// Every variant resolves the capability probe to `Unsupported`; none of them is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("the GPU entry point is not exposed by this environment")]
    EntryPointMissing,
    #[error("no suitable GPU adapter is available")]
    AdapterUnavailable,
    #[error("GPU adapter initialization failed: {0}")]
    AdapterInit(String),
}

/// Failures while finding, waiting on, or attaching to the source media element.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("no playable media element under the player root")]
    NotFound,
    #[error("media element not ready after {attempts} attempt(s)")]
    NotReady { attempts: u32 },
    #[error("media element has no parent to attach the overlay surface to")]
    NoParent,
    #[error("media element has invalid decoded dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("DOM operation failed: {0}")]
    Dom(String),
}

/// Failures of the frame-enhancement pipeline, either while building it or while it runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("failed to construct the upscaling pipeline: {0}")]
    Construction(String),
    #[error("frame processing failed: {0}")]
    Frame(String),
    #[error("the overlay surface was lost")]
    SurfaceLost,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
