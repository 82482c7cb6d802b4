//! Host seams.
//!
//! The controller never touches the page directly. DOM queries, media notifications, timers and
//! GPU access all go through the traits below; `sharpview-wasm` implements them over `web-sys`
//! and `test_utils` implements them in memory.
//!
//! Everything here is single-threaded: handles are `Rc`/JS references and futures are not `Send`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{CapabilityError, MediaError, RenderError};

/// `HTMLMediaElement.readyState`, ordered from least to most loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyLevel {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyLevel {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::HaveNothing,
            1 => Self::HaveMetadata,
            2 => Self::HaveCurrentData,
            3 => Self::HaveFutureData,
            _ => Self::HaveEnoughData,
        }
    }

    /// Decoded metadata (and with it the intrinsic size) is available.
    pub fn has_metadata(self) -> bool {
        self >= Self::HaveMetadata
    }
}

/// Intrinsic size of the decoded video, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DecodedSize {
    pub width: u32,
    pub height: u32,
}

impl DecodedSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn scaled(self, factor: u32) -> Self {
        Self {
            width: self.width.saturating_mul(factor),
            height: self.height.saturating_mul(factor),
        }
    }
}

impl fmt::Display for DecodedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// CSS properties mirrored from the source element onto the overlay surface.
pub const MIRRORED_PROPERTIES: &[&str] = &[
    "position",
    "top",
    "left",
    "right",
    "bottom",
    "width",
    "height",
    "margin",
    "object-fit",
    "object-position",
    "transform",
    "transform-origin",
    "z-index",
];

/// Positioning-relevant computed style of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutStyle {
    /// `(property, computed value)` pairs, in [`MIRRORED_PROPERTIES`] order.
    pub properties: Vec<(&'static str, String)>,
    pub class_name: String,
}

impl LayoutStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value.as_str())
    }
}

/// Read access to the media elements of the player, plus the two writes the controller makes to
/// the source element itself.
pub trait MediaDom {
    type Media: Clone + PartialEq + fmt::Debug + 'static;

    /// Media elements under the player root container, in document order.
    fn player_media(&self) -> Vec<Self::Media>;
    /// The current playback source, if any.
    fn media_source(&self, media: &Self::Media) -> Option<String>;
    fn decoded_size(&self, media: &Self::Media) -> DecodedSize;
    fn ready_level(&self, media: &Self::Media) -> ReadyLevel;
    /// Whether the element sits inside one of the advertisement containers.
    fn in_ad_container(&self, media: &Self::Media) -> bool;
    fn is_connected(&self, media: &Self::Media) -> bool;
    fn has_parent(&self, media: &Self::Media) -> bool;
    /// Hides (or restores) the element's own visual output without affecting layout or playback.
    fn set_media_hidden(&self, media: &Self::Media, hidden: bool);
    /// Sets (or clears) the processing marker attribute.
    fn set_upscale_marker(&self, media: &Self::Media, active: bool);
}

/// Management of the overlay surface the upscaled frames are drawn into.
pub trait SurfaceDom: MediaDom {
    type Surface: Clone + PartialEq + fmt::Debug + 'static;

    fn find_surface(&self, id: &str) -> Option<Self::Surface>;
    fn create_surface(&self, id: &str) -> Result<Self::Surface, MediaError>;
    /// Makes `surface` the immediate next sibling of `media`. A no-op if it already is.
    fn insert_surface_after(
        &self,
        surface: &Self::Surface,
        media: &Self::Media,
    ) -> Result<(), MediaError>;
    /// Sets the drawable (backing store) resolution of the surface.
    fn set_surface_resolution(&self, surface: &Self::Surface, size: DecodedSize);
    fn computed_layout(&self, media: &Self::Media) -> LayoutStyle;
    fn apply_surface_layout(&self, surface: &Self::Surface, layout: &LayoutStyle);
    fn remove_surface(&self, surface: &Self::Surface);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSignal {
    MetadataLoaded,
    FirstFrame,
}

pub trait MediaSignals: MediaDom {
    /// Resolves on the next "metadata loaded" or "first frame available" notification.
    ///
    /// Dropping the future unsubscribes.
    fn next_media_signal(&self, media: &Self::Media) -> impl Future<Output = MediaSignal>;
}

pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Timers and task spawning on the page's event loop.
pub trait Runtime {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
    fn spawn_local(&self, task: LocalTask);
}

/// Best-effort description of the GPU adapter, for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub backend: String,
    pub driver: String,
}

pub trait GpuAdapterSource {
    /// Whether the environment exposes a GPU entry point at all.
    fn has_gpu_entry_point(&self) -> bool;
    fn request_adapter(&self) -> impl Future<Output = Result<AdapterInfo, CapabilityError>>;
}

/// Receives failures from a running pipeline.
pub type FaultSink = Rc<dyn Fn(RenderError)>;

/// Handle to a running per-frame pipeline.
pub trait PipelineControl {
    /// Stops the frame loop. Must be idempotent.
    fn halt(&mut self);
    fn is_running(&self) -> bool;
}

pub trait FrameRenderer: SurfaceDom {
    type Pipeline: PipelineControl + 'static;

    /// Builds the enhancement pipeline for `media` -> `surface` and starts its frame loop.
    ///
    /// Failures after this returns are reported through `faults`.
    fn start_pipeline(
        &self,
        media: &Self::Media,
        surface: &Self::Surface,
        source_size: DecodedSize,
        faults: FaultSink,
    ) -> impl Future<Output = Result<Self::Pipeline, RenderError>>;
}

/// Everything the controller needs from its environment.
pub trait Host: FrameRenderer + MediaSignals + Runtime + GpuAdapterSource + 'static {}

impl<T> Host for T where T: FrameRenderer + MediaSignals + Runtime + GpuAdapterSource + 'static {}
