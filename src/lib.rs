//! Real-time GPU upscaling for a host page's main video.
//!
//! This umbrella crate re-exports the host-agnostic controller from `sharpview-core` and the
//! `wgpu` enhancement pipeline as [`gpu`]. Browser builds use `sharpview-wasm` directly.

pub use sharpview_core::*;
pub use sharpview_gpu as gpu;
