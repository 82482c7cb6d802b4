//! WebGPU side of sharpview.
//!
//! Owns everything that touches `wgpu`: adapter/device acquisition, the staged enhancement
//! pipeline (highlight clamp, detail restore, 2x upscale) and presentation into the overlay
//! surface. The controller in `sharpview-core` never sees a `wgpu` type; failures surface as
//! [`sharpview_core::RenderError`] through the `From<EnhanceError>` conversion.

mod context;
mod enhancer;
mod error;
mod pipeline;
mod preset;
mod shader;
mod surface;
mod upload;

pub use context::{adapter_info, request_adapter_robust, GpuDevice};
pub use enhancer::FrameEnhancer;
pub use error::EnhanceError;
pub use preset::{EnhancementPreset, Stage};
pub use surface::{output_needs_linearize, preferred_surface_format, OverlayPresenter};
pub use upload::FrameUploader;
