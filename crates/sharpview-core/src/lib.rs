//! Host-agnostic core of the sharpview video upscaler.
//!
//! This crate decides *when* and *where* to upscale: it probes GPU support, finds the content
//! video among the player's decoys, waits for it to decode, mirrors it with an overlay surface
//! and keeps exactly one enhancement pipeline running while the feature is enabled. It never
//! touches a browser or a GPU itself; see [`platform`] for the seams a host implements.

pub mod cancel;
pub mod capability;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod locator;
pub mod overlay;
pub mod platform;
pub mod readiness;
pub mod session;
pub mod stats;

/// In-memory host for tests.
///
/// Only available to this crate's own tests or with the `test-utils` feature; not part of the
/// stable API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cancel::{CancelToken, RequestClock};
pub use capability::{CapabilityProbe, CapabilityState};
pub use config::ControllerConfig;
pub use error::{CapabilityError, ConfigError, MediaError, RenderError};
pub use lifecycle::{Controller, Phase, SessionInfo};
pub use locator::{locate, MediaCandidate, MediaIdentity};
pub use overlay::{OverlaySurfaces, UPSCALE_FACTOR};
pub use platform::{
    AdapterInfo, DecodedSize, FaultSink, FrameRenderer, GpuAdapterSource, Host, LayoutStyle,
    LocalTask, MediaDom, MediaSignal, MediaSignals, PipelineControl, ReadyLevel, Runtime,
    SurfaceDom, MIRRORED_PROPERTIES,
};
pub use readiness::{await_ready, Readiness, ReadinessPolicy};
pub use session::RenderSession;
pub use stats::{ControllerStats, ControllerStatsSnapshot};
