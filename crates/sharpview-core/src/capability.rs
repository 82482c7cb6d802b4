use std::cell::Cell;
use std::fmt;

use futures_intrusive::sync::LocalManualResetEvent;

use crate::error::CapabilityError;
use crate::platform::{AdapterInfo, GpuAdapterSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilityState {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

/// Resolves GPU support once per page and caches the answer, positive or negative.
///
/// Concurrent callers share a single in-flight probe.
pub struct CapabilityProbe {
    state: Cell<CapabilityState>,
    probing: Cell<bool>,
    resolved: LocalManualResetEvent,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CapabilityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProbe")
            .field("state", &self.state.get())
            .field("probing", &self.probing.get())
            .finish()
    }
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self {
            state: Cell::new(CapabilityState::Unknown),
            probing: Cell::new(false),
            resolved: LocalManualResetEvent::new(false),
        }
    }

    /// The cached result, without probing.
    pub fn cached(&self) -> CapabilityState {
        self.state.get()
    }

    pub async fn probe<A>(&self, source: &A) -> CapabilityState
    where
        A: GpuAdapterSource + ?Sized,
    {
        loop {
            match self.state.get() {
                CapabilityState::Unknown => {}
                resolved => return resolved,
            }
            if !self.probing.get() {
                break;
            }
            self.resolved.wait().await;
        }

        self.probing.set(true);
        self.resolved.reset();
        // Wakes waiters even if this future is dropped before the adapter request completes.
        let _finish = FinishProbe { probe: self };

        let state = match detect(source).await {
            Ok(info) => {
                tracing::info!(
                    adapter = %info.name,
                    backend = %info.backend,
                    "GPU upscaling available"
                );
                CapabilityState::Supported
            }
            Err(err) => {
                tracing::info!("GPU upscaling unavailable on this page: {err}");
                CapabilityState::Unsupported
            }
        };
        self.state.set(state);
        state
    }
}

async fn detect<A>(source: &A) -> Result<AdapterInfo, CapabilityError>
where
    A: GpuAdapterSource + ?Sized,
{
    if !source.has_gpu_entry_point() {
        return Err(CapabilityError::EntryPointMissing);
    }
    source.request_adapter().await
}

struct FinishProbe<'a> {
    probe: &'a CapabilityProbe,
}

impl Drop for FinishProbe<'_> {
    fn drop(&mut self) {
        self.probe.probing.set(false);
        self.probe.resolved.set();
    }
}
