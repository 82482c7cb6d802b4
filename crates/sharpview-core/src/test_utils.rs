//! In-memory host for driving the controller without a browser.
//!
//! `FakeHost` models just enough of a page to exercise the state machine: media elements under
//! a player root, the overlay surface, media signals, a scripted GPU adapter and pipelines that
//! record how they were started and stopped. Timers and task spawning go to tokio, so tests run
//! on a current-thread runtime inside a `LocalSet`, usually with paused time.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::{CapabilityError, MediaError, RenderError};
use crate::platform::{
    AdapterInfo, DecodedSize, FaultSink, FrameRenderer, GpuAdapterSource, LayoutStyle, LocalTask,
    MediaDom, MediaSignal, MediaSignals, PipelineControl, ReadyLevel, Runtime, SurfaceDom,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMedia {
    pub source: Option<String>,
    pub decoded: DecodedSize,
    pub ready: ReadyLevel,
    pub in_ad_container: bool,
    pub connected: bool,
    pub has_parent: bool,
    pub hidden: bool,
    pub marker: bool,
    pub layout: LayoutStyle,
}

impl FakeMedia {
    /// A fully loaded element with a source.
    pub fn playable(source: &str, width: u32, height: u32) -> Self {
        Self {
            source: Some(source.to_owned()),
            decoded: DecodedSize::new(width, height),
            ready: ReadyLevel::HaveEnoughData,
            in_ad_container: false,
            connected: true,
            has_parent: true,
            hidden: false,
            marker: false,
            layout: LayoutStyle {
                properties: vec![
                    ("position", "absolute".to_owned()),
                    ("width", format!("{width}px")),
                    ("height", format!("{height}px")),
                ],
                class_name: "video-stream".to_owned(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSurface {
    pub dom_id: String,
    pub attached: bool,
    pub next_to: Option<MediaId>,
    pub resolution: DecodedSize,
    pub layout: Option<LayoutStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRecord {
    pub media: MediaId,
    pub surface: SurfaceId,
    pub source: Option<String>,
    pub size: DecodedSize,
    pub running: bool,
    pub halts: u32,
}

struct FakeState {
    media: Vec<(MediaId, FakeMedia)>,
    next_media: u32,
    surfaces: Vec<FakeSurface>,
    dom_writes: u32,

    gpu_entry_point: bool,
    adapter_result: Result<AdapterInfo, CapabilityError>,
    adapter_delay: Duration,
    adapter_requests: u32,

    pipelines: Vec<PipelineRecord>,
    fault_sinks: Vec<FaultSink>,
    pipeline_delay: Duration,
    next_pipeline_error: Option<RenderError>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            media: Vec::new(),
            next_media: 0,
            surfaces: Vec::new(),
            dom_writes: 0,
            gpu_entry_point: true,
            adapter_result: Ok(AdapterInfo {
                name: "fake adapter".to_owned(),
                backend: "fake".to_owned(),
                driver: String::new(),
            }),
            adapter_delay: Duration::ZERO,
            adapter_requests: 0,
            pipelines: Vec::new(),
            fault_sinks: Vec::new(),
            pipeline_delay: Duration::ZERO,
            next_pipeline_error: None,
        }
    }
}

impl FakeState {
    fn media(&self, id: MediaId) -> Option<&FakeMedia> {
        self.media.iter().find(|(m, _)| *m == id).map(|(_, media)| media)
    }

    fn media_mut(&mut self, id: MediaId) -> Option<&mut FakeMedia> {
        self.media
            .iter_mut()
            .find(|(m, _)| *m == id)
            .map(|(_, media)| media)
    }
}

/// Cheap to clone; clones share the same page.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<FakeState>>,
    signals: Rc<Notify>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Page scripting
    // ---------------------------------------------------------------------

    /// Appends a media element to the player root.
    pub fn add_media(&self, media: FakeMedia) -> MediaId {
        let mut state = self.state.borrow_mut();
        let id = MediaId(state.next_media);
        state.next_media += 1;
        state.media.push((id, media));
        id
    }

    /// Detaches a media element from the document.
    pub fn remove_media(&self, id: MediaId) {
        let mut state = self.state.borrow_mut();
        if let Some(media) = state.media_mut(id) {
            media.connected = false;
            media.has_parent = false;
        }
    }

    pub fn update_media(&self, id: MediaId, update: impl FnOnce(&mut FakeMedia)) {
        if let Some(media) = self.state.borrow_mut().media_mut(id) {
            update(media);
        }
    }

    pub fn media(&self, id: MediaId) -> Option<FakeMedia> {
        self.state.borrow().media(id).cloned()
    }

    /// Fires "metadata loaded" on every element currently being waited on.
    pub fn emit_media_signal(&self) {
        self.signals.notify_waiters();
    }

    pub fn set_gpu_entry_point(&self, present: bool) {
        self.state.borrow_mut().gpu_entry_point = present;
    }

    pub fn set_adapter_result(&self, result: Result<AdapterInfo, CapabilityError>) {
        self.state.borrow_mut().adapter_result = result;
    }

    pub fn set_adapter_delay(&self, delay: Duration) {
        self.state.borrow_mut().adapter_delay = delay;
    }

    pub fn set_pipeline_delay(&self, delay: Duration) {
        self.state.borrow_mut().pipeline_delay = delay;
    }

    pub fn fail_next_pipeline(&self, err: RenderError) {
        self.state.borrow_mut().next_pipeline_error = Some(err);
    }

    /// Reports `err` through the fault sink handed to pipeline `index`.
    pub fn emit_fault(&self, index: usize, err: RenderError) {
        let sink = self.state.borrow().fault_sinks.get(index).cloned();
        if let Some(sink) = sink {
            sink(err);
        }
    }

    /// A surface that exists but is not in the document.
    pub fn create_detached_surface(&self, dom_id: &str) -> SurfaceId {
        let mut state = self.state.borrow_mut();
        state.surfaces.push(FakeSurface {
            dom_id: dom_id.to_owned(),
            attached: false,
            next_to: None,
            resolution: DecodedSize::default(),
            layout: None,
        });
        SurfaceId(state.surfaces.len() as u32 - 1)
    }

    // ---------------------------------------------------------------------
    // Observations
    // ---------------------------------------------------------------------

    pub fn surface(&self, id: SurfaceId) -> Option<FakeSurface> {
        self.state.borrow().surfaces.get(id.0 as usize).cloned()
    }

    pub fn attached_surface_count(&self) -> usize {
        self.state
            .borrow()
            .surfaces
            .iter()
            .filter(|s| s.attached)
            .count()
    }

    pub fn surfaces_created(&self) -> usize {
        self.state.borrow().surfaces.len()
    }

    /// Number of DOM mutations made through the host traits.
    pub fn dom_writes(&self) -> u32 {
        self.state.borrow().dom_writes
    }

    pub fn adapter_requests(&self) -> u32 {
        self.state.borrow().adapter_requests
    }

    pub fn pipeline(&self, index: usize) -> Option<PipelineRecord> {
        self.state.borrow().pipelines.get(index).cloned()
    }

    pub fn pipelines_started(&self) -> usize {
        self.state.borrow().pipelines.len()
    }

    pub fn running_pipelines(&self) -> usize {
        self.state
            .borrow()
            .pipelines
            .iter()
            .filter(|p| p.running)
            .count()
    }

    fn record_write(&self) {
        self.state.borrow_mut().dom_writes += 1;
    }
}

impl MediaDom for FakeHost {
    type Media = MediaId;

    fn player_media(&self) -> Vec<MediaId> {
        self.state
            .borrow()
            .media
            .iter()
            .filter(|(_, m)| m.connected)
            .map(|(id, _)| *id)
            .collect()
    }

    fn media_source(&self, media: &MediaId) -> Option<String> {
        self.state.borrow().media(*media).and_then(|m| m.source.clone())
    }

    fn decoded_size(&self, media: &MediaId) -> DecodedSize {
        self.state
            .borrow()
            .media(*media)
            .map(|m| m.decoded)
            .unwrap_or_default()
    }

    fn ready_level(&self, media: &MediaId) -> ReadyLevel {
        self.state
            .borrow()
            .media(*media)
            .map(|m| m.ready)
            .unwrap_or_default()
    }

    fn in_ad_container(&self, media: &MediaId) -> bool {
        self.state
            .borrow()
            .media(*media)
            .is_some_and(|m| m.in_ad_container)
    }

    fn is_connected(&self, media: &MediaId) -> bool {
        self.state.borrow().media(*media).is_some_and(|m| m.connected)
    }

    fn has_parent(&self, media: &MediaId) -> bool {
        self.state.borrow().media(*media).is_some_and(|m| m.has_parent)
    }

    fn set_media_hidden(&self, media: &MediaId, hidden: bool) {
        self.update_media(*media, |m| m.hidden = hidden);
        self.record_write();
    }

    fn set_upscale_marker(&self, media: &MediaId, active: bool) {
        self.update_media(*media, |m| m.marker = active);
        self.record_write();
    }
}

impl SurfaceDom for FakeHost {
    type Surface = SurfaceId;

    fn find_surface(&self, id: &str) -> Option<SurfaceId> {
        self.state
            .borrow()
            .surfaces
            .iter()
            .position(|s| s.attached && s.dom_id == id)
            .map(|index| SurfaceId(index as u32))
    }

    fn create_surface(&self, id: &str) -> Result<SurfaceId, MediaError> {
        self.record_write();
        Ok(self.create_detached_surface(id))
    }

    fn insert_surface_after(&self, surface: &SurfaceId, media: &MediaId) -> Result<(), MediaError> {
        if !self.has_parent(media) {
            return Err(MediaError::NoParent);
        }
        self.record_write();
        let mut state = self.state.borrow_mut();
        let record = state
            .surfaces
            .get_mut(surface.0 as usize)
            .ok_or_else(|| MediaError::Dom("unknown surface".to_owned()))?;
        record.attached = true;
        record.next_to = Some(*media);
        Ok(())
    }

    fn set_surface_resolution(&self, surface: &SurfaceId, size: DecodedSize) {
        self.record_write();
        if let Some(record) = self.state.borrow_mut().surfaces.get_mut(surface.0 as usize) {
            record.resolution = size;
        }
    }

    fn computed_layout(&self, media: &MediaId) -> LayoutStyle {
        self.state
            .borrow()
            .media(*media)
            .map(|m| m.layout.clone())
            .unwrap_or_default()
    }

    fn apply_surface_layout(&self, surface: &SurfaceId, layout: &LayoutStyle) {
        self.record_write();
        if let Some(record) = self.state.borrow_mut().surfaces.get_mut(surface.0 as usize) {
            record.layout = Some(layout.clone());
        }
    }

    fn remove_surface(&self, surface: &SurfaceId) {
        self.record_write();
        if let Some(record) = self.state.borrow_mut().surfaces.get_mut(surface.0 as usize) {
            record.attached = false;
            record.next_to = None;
        }
    }
}

impl MediaSignals for FakeHost {
    async fn next_media_signal(&self, _media: &MediaId) -> MediaSignal {
        let signals = Rc::clone(&self.signals);
        signals.notified().await;
        MediaSignal::MetadataLoaded
    }
}

impl Runtime for FakeHost {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn_local(&self, task: LocalTask) {
        tokio::task::spawn_local(task);
    }
}

impl GpuAdapterSource for FakeHost {
    fn has_gpu_entry_point(&self) -> bool {
        self.state.borrow().gpu_entry_point
    }

    async fn request_adapter(&self) -> Result<AdapterInfo, CapabilityError> {
        let delay = {
            let mut state = self.state.borrow_mut();
            state.adapter_requests += 1;
            state.adapter_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.borrow().adapter_result.clone()
    }
}

pub struct FakePipeline {
    index: usize,
    state: Rc<RefCell<FakeState>>,
}

impl PipelineControl for FakePipeline {
    fn halt(&mut self) {
        if let Some(record) = self.state.borrow_mut().pipelines.get_mut(self.index) {
            record.running = false;
            record.halts += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.state
            .borrow()
            .pipelines
            .get(self.index)
            .is_some_and(|p| p.running)
    }
}

impl FrameRenderer for FakeHost {
    type Pipeline = FakePipeline;

    async fn start_pipeline(
        &self,
        media: &MediaId,
        surface: &SurfaceId,
        source_size: DecodedSize,
        faults: FaultSink,
    ) -> Result<FakePipeline, RenderError> {
        let delay = self.state.borrow().pipeline_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let source = self.media_source(media);
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.next_pipeline_error.take() {
            return Err(err);
        }
        state.pipelines.push(PipelineRecord {
            media: *media,
            surface: *surface,
            source,
            size: source_size,
            running: true,
            halts: 0,
        });
        state.fault_sinks.push(faults);
        Ok(FakePipeline {
            index: state.pipelines.len() - 1,
            state: Rc::clone(&self.state),
        })
    }
}
