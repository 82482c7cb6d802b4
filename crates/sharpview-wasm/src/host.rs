use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use sharpview_core::{ControllerConfig, MediaError};
use sharpview_gpu::GpuDevice;
use web_sys::{Document, Window};

/// The real page, as seen by the controller.
///
/// Cheap to clone; all clones share the lazily created GPU instance, adapter and device.
#[derive(Clone)]
pub struct WebHost {
    pub(crate) inner: Rc<WebHostInner>,
}

pub(crate) struct WebHostInner {
    pub(crate) window: Window,
    pub(crate) document: Document,
    pub(crate) config: ControllerConfig,
    /// Created on first use; constructing it without `navigator.gpu` is not allowed.
    pub(crate) instance: OnceCell<wgpu::Instance>,
    /// Adapter acquired by the capability probe, consumed when the device is opened.
    pub(crate) adapter: RefCell<Option<wgpu::Adapter>>,
    pub(crate) gpu: RefCell<Option<Rc<GpuDevice>>>,
}

impl WebHost {
    pub fn new(window: Window, config: ControllerConfig) -> Result<Self, MediaError> {
        let document = window
            .document()
            .ok_or_else(|| MediaError::Dom("window has no document".to_owned()))?;
        Ok(Self {
            inner: Rc::new(WebHostInner {
                window,
                document,
                config,
                instance: OnceCell::new(),
                adapter: RefCell::new(None),
                gpu: RefCell::new(None),
            }),
        })
    }

    pub fn window(&self) -> &Window {
        &self.inner.window
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Attribute holding the source element's inline opacity while it is hidden.
    pub(crate) fn saved_opacity_attribute(&self) -> String {
        format!("{}-opacity", self.inner.config.marker_attribute)
    }
}
