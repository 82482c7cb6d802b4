//! The upscaling lifecycle state machine.
//!
//! [`Controller`] owns the single active session of a page. It reacts to enable/disable requests,
//! route changes, DOM mutations, media changes, resizes and fullscreen transitions, and drives the
//! asynchronous start sequence (probe -> locate -> wait -> overlay -> pipeline) on the host's
//! event loop.
//!
//! All external notifications are handled synchronously. Anything that has to wait runs as a
//! spawned start sequence carrying a [`CancelToken`]; any notification that invalidates it
//! advances the request clock, and the sequence checks its token after every suspension point
//! before touching shared state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::cancel::{CancelToken, RequestClock};
use crate::capability::{CapabilityProbe, CapabilityState};
use crate::config::ControllerConfig;
use crate::error::{ConfigError, MediaError, RenderError};
use crate::locator::{inspect, locate, MediaIdentity};
use crate::overlay::OverlaySurfaces;
use crate::platform::{DecodedSize, FaultSink, FrameRenderer, Host};
use crate::readiness::{await_ready, Readiness, ReadinessPolicy};
use crate::session::RenderSession;
use crate::stats::{ControllerStats, ControllerStatsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disabled,
    AwaitingCapability,
    AwaitingMedia,
    AwaitingReady,
    Active,
    SuspendedForFullscreen,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Disabled => "disabled",
            Phase::AwaitingCapability => "awaitingCapability",
            Phase::AwaitingMedia => "awaitingMedia",
            Phase::AwaitingReady => "awaitingReady",
            Phase::Active => "active",
            Phase::SuspendedForFullscreen => "suspendedForFullscreen",
        }
    }
}

/// Public view of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo<M, S> {
    pub media: M,
    pub source: Option<String>,
    pub surface: S,
    pub source_size: DecodedSize,
    pub enabled: bool,
}

struct ActiveSession<H: Host> {
    identity: MediaIdentity<H::Media>,
    surface: H::Surface,
    session: RenderSession<<H as FrameRenderer>::Pipeline>,
    /// Ticket of the start sequence that created this session; faults are matched against it.
    ticket: u64,
    enabled: bool,
}

impl<H: Host> ActiveSession<H> {
    fn media(&self) -> &H::Media {
        self.identity.media()
    }
}

struct Machine<H: Host> {
    phase: Phase,
    enabled: bool,
    path: String,
    fullscreen: bool,
    /// Ticket of the start sequence currently running, if any.
    in_flight: Option<u64>,
    active: Option<ActiveSession<H>>,
    /// Set once a miss has been logged; cleared when a session starts or upscaling is disabled.
    miss_logged: bool,
}

struct Shared<H: Host> {
    host: H,
    config: ControllerConfig,
    readiness: ReadinessPolicy,
    overlay: OverlaySurfaces,
    probe: CapabilityProbe,
    requests: RequestClock,
    stats: ControllerStats,
    machine: RefCell<Machine<H>>,
}

/// Page-wide owner of the upscaling session.
///
/// Cheap to clone; clones drive the same state machine.
pub struct Controller<H: Host> {
    shared: Rc<Shared<H>>,
}

impl<H: Host> Clone for Controller<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: Host> Controller<H> {
    pub fn new(host: H, config: ControllerConfig, path: &str) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self {
            shared: Rc::new(Shared {
                readiness: ReadinessPolicy::from(&config),
                overlay: OverlaySurfaces::new(config.surface_id.clone()),
                probe: CapabilityProbe::new(),
                requests: RequestClock::new(),
                stats: ControllerStats::new(),
                machine: RefCell::new(Machine {
                    phase: Phase::Disabled,
                    enabled: false,
                    path: path.to_owned(),
                    fullscreen: false,
                    in_flight: None,
                    active: None,
                    miss_logged: false,
                }),
                host,
                config,
            }),
        })
    }

    pub fn host(&self) -> &H {
        &self.shared.host
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn phase(&self) -> Phase {
        self.shared.machine.borrow().phase
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.machine.borrow().enabled
    }

    pub fn capability(&self) -> CapabilityState {
        self.shared.probe.cached()
    }

    pub fn stats(&self) -> ControllerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn session(&self) -> Option<SessionInfo<H::Media, H::Surface>> {
        let machine = self.shared.machine.borrow();
        machine.active.as_ref().map(|active| SessionInfo {
            media: active.media().clone(),
            source: active.identity.source().map(str::to_owned),
            surface: active.surface.clone(),
            source_size: active.session.source_size(),
            enabled: active.enabled,
        })
    }

    /// Idempotent enable/disable entry point.
    pub fn apply(&self, enabled: bool) {
        let shared = &self.shared;
        let start = {
            let mut machine = shared.machine.borrow_mut();
            machine.enabled = enabled;
            if !enabled {
                if machine.phase != Phase::Disabled {
                    tracing::debug!("upscaling disabled");
                }
                shared.enter_disabled(&mut machine);
                return;
            }
            match machine.phase {
                Phase::Disabled => shared.begin(&mut machine),
                Phase::AwaitingMedia => machine.in_flight.is_none(),
                Phase::Active => shared.restart_if_media_changed(&mut machine),
                Phase::AwaitingCapability | Phase::AwaitingReady | Phase::SuspendedForFullscreen => {
                    false
                }
            }
        };
        if start {
            Shared::spawn_attempt(shared, None);
        }
    }

    /// The page's route changed (same-document navigation included).
    pub fn set_path(&self, path: &str) {
        let shared = &self.shared;
        let start = {
            let mut machine = shared.machine.borrow_mut();
            if machine.path == path {
                return;
            }
            machine.path = path.to_owned();
            if !shared.config.is_watch_route(path) {
                if machine.phase != Phase::Disabled {
                    tracing::debug!(path, "left the watch route; upscaling stopped");
                    shared.enter_disabled(&mut machine);
                }
                false
            } else if machine.enabled && machine.phase == Phase::Disabled {
                shared.begin(&mut machine)
            } else {
                false
            }
        };
        if start {
            Shared::spawn_attempt(shared, None);
        }
    }

    /// The page's content changed.
    pub fn on_dom_mutated(&self) {
        self.recheck();
    }

    /// The active element reported a source-level event (`emptied`, `loadstart`, ...).
    pub fn on_media_changed(&self) {
        self.recheck();
    }

    fn recheck(&self) {
        let shared = &self.shared;
        let start = {
            let mut machine = shared.machine.borrow_mut();
            if !machine.enabled {
                return;
            }
            match machine.phase {
                Phase::AwaitingMedia => machine.in_flight.is_none(),
                Phase::Active => shared.restart_if_media_changed(&mut machine),
                _ => false,
            }
        };
        if start {
            Shared::spawn_attempt(shared, None);
        }
    }

    pub fn on_fullscreen_change(&self, fullscreen: bool) {
        let shared = &self.shared;
        let start = {
            let mut machine = shared.machine.borrow_mut();
            if machine.fullscreen == fullscreen {
                return;
            }
            machine.fullscreen = fullscreen;

            if fullscreen {
                if !matches!(
                    machine.phase,
                    Phase::Disabled | Phase::SuspendedForFullscreen
                ) {
                    // The overlay would cover a black fullscreen render; drop it before the
                    // transition paints.
                    shared.cancel_in_flight(&mut machine);
                    shared.teardown(&mut machine);
                    machine.phase = Phase::SuspendedForFullscreen;
                    tracing::debug!("fullscreen entered; upscaling suspended");
                }
                false
            } else if machine.phase == Phase::SuspendedForFullscreen {
                if machine.enabled && shared.config.is_watch_route(&machine.path) {
                    machine.phase = Phase::AwaitingMedia;
                    tracing::debug!("fullscreen exited; resuming upscaling");
                    true
                } else {
                    machine.phase = Phase::Disabled;
                    false
                }
            } else {
                false
            }
        };
        if start {
            let settle = shared.config.fullscreen_exit_settle();
            Shared::spawn_attempt(shared, Some(settle));
        }
    }

    /// The player was resized or re-laid out.
    pub fn on_resize(&self) {
        let shared = &self.shared;
        let start = {
            let mut machine = shared.machine.borrow_mut();
            let Some(active) = machine.active.as_ref() else {
                return;
            };
            let decoded = shared.host.decoded_size(active.media());
            if decoded != active.session.source_size() {
                tracing::debug!(
                    from = %active.session.source_size(),
                    to = %decoded,
                    "source resolution changed; restarting upscaling"
                );
                shared.restart(&mut machine);
                true
            } else {
                match shared.overlay.create_or_reuse(&shared.host, active.media()) {
                    Ok(_) => false,
                    Err(err) => {
                        tracing::debug!("overlay surface could not be re-synced: {err}");
                        shared.restart(&mut machine);
                        true
                    }
                }
            }
        };
        if start {
            Shared::spawn_attempt(shared, None);
        }
    }
}

impl<H: Host> Shared<H> {
    /// Leaves `Disabled` for an enable request. Returns whether a start sequence should run.
    fn begin(&self, machine: &mut Machine<H>) -> bool {
        if !self.config.is_watch_route(&machine.path) {
            tracing::trace!(path = %machine.path, "not a watch route; upscaling stays off");
            return false;
        }
        if self.probe.cached() == CapabilityState::Unsupported {
            return false;
        }
        if machine.fullscreen {
            machine.phase = Phase::SuspendedForFullscreen;
            return false;
        }
        machine.phase = Phase::AwaitingCapability;
        true
    }

    fn enter_disabled(&self, machine: &mut Machine<H>) {
        self.cancel_in_flight(machine);
        self.teardown(machine);
        machine.phase = Phase::Disabled;
        machine.miss_logged = false;
    }

    fn restart(&self, machine: &mut Machine<H>) {
        self.teardown(machine);
        machine.phase = Phase::AwaitingMedia;
    }

    /// Tears the active session down if its element or source is no longer the one playing.
    ///
    /// A connected element still playing its captured source keeps its session even when another
    /// element would now rank higher; the locator is only consulted once the active element stops
    /// qualifying.
    fn restart_if_media_changed(&self, machine: &mut Machine<H>) -> bool {
        let Some(active) = machine.active.as_ref() else {
            return false;
        };
        let media = active.media();
        let changed = if !self.host.is_connected(media) {
            tracing::debug!("active media element left the document");
            true
        } else if !active.identity.matches(&self.host, media) {
            tracing::debug!("active media element switched sources");
            true
        } else if inspect(&self.host, media.clone()).is_valid() {
            false
        } else {
            match locate(&self.host) {
                Ok(candidate) if candidate.media != *media => {
                    tracing::debug!("player swapped its media element");
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.restart(machine);
        }
        changed
    }

    fn cancel_in_flight(&self, machine: &mut Machine<H>) {
        if machine.in_flight.take().is_some() {
            self.requests.cancel_all();
        }
    }

    /// Idempotent: restores the source element and removes the overlay surface.
    fn teardown(&self, machine: &mut Machine<H>) {
        if let Some(active) = machine.active.take() {
            self.release(active);
        }
        // A superseded start sequence may have attached the surface without activating it.
        self.overlay.remove_any(&self.host);
    }

    fn release(&self, active: ActiveSession<H>) {
        let ActiveSession {
            identity,
            surface,
            mut session,
            ..
        } = active;
        session.stop();
        self.overlay.remove(&self.host, &surface);
        let media = identity.media();
        self.host.set_media_hidden(media, false);
        self.host.set_upscale_marker(media, false);
        self.stats.inc_sessions_torn_down();
        tracing::debug!("upscaling session torn down");
    }

    fn spawn_attempt(shared: &Rc<Self>, settle: Option<Duration>) {
        let token = shared.requests.advance();
        shared.machine.borrow_mut().in_flight = Some(token.ticket());
        let task = Rc::clone(shared);
        shared
            .host
            .spawn_local(Box::pin(async move { task.run_attempt(token, settle).await }));
    }

    fn set_phase(&self, token: &CancelToken, phase: Phase) {
        if !token.is_cancelled() {
            self.machine.borrow_mut().phase = phase;
        }
    }

    /// Ends a start sequence that found nothing to do; the next external trigger retries.
    fn settle_waiting(&self, token: &CancelToken) {
        if token.is_cancelled() {
            return;
        }
        let mut machine = self.machine.borrow_mut();
        machine.phase = Phase::AwaitingMedia;
        machine.in_flight = None;
    }

    /// Logs why a start sequence went back to waiting, once per waiting episode.
    fn log_miss(&self, token: &CancelToken, err: &MediaError) {
        if token.is_cancelled() {
            return;
        }
        let mut machine = self.machine.borrow_mut();
        if !machine.miss_logged {
            machine.miss_logged = true;
            tracing::debug!("{err}; waiting for the next page change");
        }
    }

    fn superseded(&self, token: &CancelToken, stage: &'static str) {
        self.stats.inc_superseded_attempts();
        tracing::debug!(ticket = token.ticket(), stage, "start sequence superseded");
    }

    async fn run_attempt(self: Rc<Self>, token: CancelToken, settle: Option<Duration>) {
        if token.is_cancelled() {
            return self.superseded(&token, "queued");
        }
        if let Some(delay) = settle {
            self.host.sleep(delay).await;
            if token.is_cancelled() {
                return self.superseded(&token, "settle");
            }
        }

        if self.probe.cached() == CapabilityState::Unknown {
            self.set_phase(&token, Phase::AwaitingCapability);
        }
        let capability = self.probe.probe(&self.host).await;
        if token.is_cancelled() {
            return self.superseded(&token, "capability");
        }
        if capability == CapabilityState::Unsupported {
            let mut machine = self.machine.borrow_mut();
            machine.phase = Phase::Disabled;
            machine.in_flight = None;
            return;
        }

        self.set_phase(&token, Phase::AwaitingMedia);
        let candidate = match locate(&self.host) {
            Ok(candidate) => candidate,
            Err(err) => {
                self.stats.inc_locate_misses();
                self.log_miss(&token, &err);
                return self.settle_waiting(&token);
            }
        };

        self.set_phase(&token, Phase::AwaitingReady);
        match await_ready(&self.host, &candidate.media, &self.readiness, &token).await {
            Readiness::Ready => {}
            Readiness::Cancelled => return self.superseded(&token, "readiness"),
            Readiness::TimedOut => {
                self.stats.inc_ready_timeouts();
                let err = MediaError::NotReady {
                    attempts: self.readiness.max_retries,
                };
                self.log_miss(&token, &err);
                return self.settle_waiting(&token);
            }
        }

        let media = candidate.media;
        let surface = match self.overlay.create_or_reuse(&self.host, &media) {
            Ok(surface) => surface,
            Err(err) => {
                tracing::debug!("overlay surface unavailable: {err}");
                return self.settle_waiting(&token);
            }
        };

        let source_size = self.host.decoded_size(&media);
        let faults = self.fault_sink(token.ticket());
        let started = RenderSession::start(&self.host, &media, &surface, source_size, faults).await;
        if token.is_cancelled() {
            if let Ok(mut session) = started {
                session.stop();
            }
            self.discard_stale_surface(&surface);
            return self.superseded(&token, "pipeline");
        }
        let session = match started {
            Ok(session) => session,
            Err(err) => {
                tracing::error!("upscaling pipeline failed to start: {err}");
                self.stats.inc_render_faults();
                self.overlay.remove(&self.host, &surface);
                return self.settle_waiting(&token);
            }
        };

        self.activate(&token, media, surface, session);
    }

    /// Removes a surface built by a superseded sequence unless someone else now owns it.
    fn discard_stale_surface(&self, surface: &H::Surface) {
        let in_use = {
            let machine = self.machine.borrow();
            machine.in_flight.is_some()
                || machine
                    .active
                    .as_ref()
                    .is_some_and(|active| active.surface == *surface)
        };
        if !in_use {
            self.overlay.remove(&self.host, surface);
        }
    }

    fn activate(
        &self,
        token: &CancelToken,
        media: H::Media,
        surface: H::Surface,
        session: RenderSession<<H as FrameRenderer>::Pipeline>,
    ) {
        let mut machine = self.machine.borrow_mut();
        if let Some(previous) = machine.active.take() {
            tracing::warn!("replacing an active session that was not torn down");
            self.release(previous);
        }

        self.host.set_media_hidden(&media, true);
        self.host.set_upscale_marker(&media, true);
        let identity = MediaIdentity::capture(&self.host, &media);
        tracing::info!(
            source = identity.source().unwrap_or_default(),
            size = %session.source_size(),
            "upscaling session started"
        );

        let enabled = machine.enabled;
        machine.active = Some(ActiveSession {
            identity,
            surface,
            session,
            ticket: token.ticket(),
            enabled,
        });
        machine.phase = Phase::Active;
        machine.in_flight = None;
        machine.miss_logged = false;
        self.stats.inc_sessions_started();
    }

    fn fault_sink(self: &Rc<Self>, ticket: u64) -> FaultSink {
        let weak = Rc::downgrade(self);
        Rc::new(move |err| Self::handle_fault(&weak, ticket, err))
    }

    fn handle_fault(weak: &Weak<Self>, ticket: u64, err: RenderError) {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let Ok(mut machine) = shared.machine.try_borrow_mut() else {
            // Reported from inside a controller call; handle it once that call has returned.
            let weak = weak.clone();
            shared.host.spawn_local(Box::pin(async move {
                Self::handle_fault(&weak, ticket, err);
            }));
            return;
        };
        let current = machine
            .active
            .as_ref()
            .is_some_and(|active| active.ticket == ticket);
        if !current {
            tracing::debug!("ignoring fault from a stale pipeline: {err}");
            return;
        }

        tracing::error!("upscaling pipeline failed: {err}");
        shared.stats.inc_render_faults();
        shared.restart(&mut machine);
    }
}
