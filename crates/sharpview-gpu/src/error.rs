use sharpview_core::{DecodedSize, RenderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request GPU device: {0}")]
    RequestDevice(String),

    #[error("failed to create a surface for the overlay: {0}")]
    CreateSurface(String),

    #[error("surface error: {0:?}")]
    Surface(wgpu::SurfaceError),

    #[error("frame is {actual}, pipeline was built for {expected}")]
    InvalidFrame {
        expected: DecodedSize,
        actual: DecodedSize,
    },

    #[error("{size} exceeds the device texture limit of {max}")]
    UnsupportedSize { size: DecodedSize, max: u32 },

    #[error("buffer map failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("readback channel closed before the buffer was mapped")]
    ReadbackChannelClosed,
}

impl From<wgpu::SurfaceError> for EnhanceError {
    fn from(value: wgpu::SurfaceError) -> Self {
        Self::Surface(value)
    }
}

impl From<wgpu::RequestDeviceError> for EnhanceError {
    fn from(value: wgpu::RequestDeviceError) -> Self {
        Self::RequestDevice(value.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for EnhanceError {
    fn from(value: wgpu::CreateSurfaceError) -> Self {
        Self::CreateSurface(value.to_string())
    }
}

impl From<EnhanceError> for RenderError {
    fn from(value: EnhanceError) -> Self {
        match value {
            EnhanceError::Surface(wgpu::SurfaceError::Lost) => RenderError::SurfaceLost,
            EnhanceError::NoAdapter
            | EnhanceError::RequestDevice(_)
            | EnhanceError::CreateSurface(_)
            | EnhanceError::UnsupportedSize { .. } => RenderError::Construction(value.to_string()),
            EnhanceError::Surface(_)
            | EnhanceError::InvalidFrame { .. }
            | EnhanceError::BufferMap(_)
            | EnhanceError::ReadbackChannelClosed => RenderError::Frame(value.to_string()),
        }
    }
}
