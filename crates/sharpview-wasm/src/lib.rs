#![forbid(unsafe_code)]

//! Browser bindings for sharpview.
//!
//! Implements the `sharpview-core` host traits over `web-sys` and exports [`UpscaleController`]
//! to JavaScript. The page script owns the outer plumbing (settings storage, the
//! `MutationObserver`, the `fullscreenchange` listener) and forwards each notification to the
//! matching controller method.

// The full implementation is only meaningful on wasm32.
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod gpu;
#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
pub mod logging;
#[cfg(target_arch = "wasm32")]
mod render;
#[cfg(target_arch = "wasm32")]
mod signals;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use sharpview_core::{Controller, ControllerConfig};
    use wasm_bindgen::prelude::*;

    use crate::host::WebHost;
    use crate::logging;

    fn js_error(err: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&err.to_string())
    }

    /// One per page load.
    #[wasm_bindgen]
    pub struct UpscaleController {
        inner: Controller<WebHost>,
    }

    #[wasm_bindgen]
    impl UpscaleController {
        /// `config` is a partial `ControllerConfig` object; `undefined` or `null` selects the
        /// defaults.
        #[wasm_bindgen(constructor)]
        pub fn new(config: JsValue) -> Result<UpscaleController, JsValue> {
            let config: ControllerConfig = if config.is_undefined() || config.is_null() {
                ControllerConfig::default()
            } else {
                serde_wasm_bindgen::from_value(config).map_err(js_error)?
            };
            logging::init(&config.log_filter);

            let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
            let path = window.location().pathname().unwrap_or_default();
            let host = WebHost::new(window, config.clone()).map_err(js_error)?;
            let inner = Controller::new(host, config, &path).map_err(js_error)?;
            Ok(Self { inner })
        }

        /// Idempotent enable/disable entry point.
        pub fn apply(&self, enabled: bool) {
            self.inner.apply(enabled);
        }

        #[wasm_bindgen(js_name = setPath)]
        pub fn set_path(&self, path: &str) {
            self.inner.set_path(path);
        }

        #[wasm_bindgen(js_name = onDomMutated)]
        pub fn on_dom_mutated(&self) {
            self.inner.on_dom_mutated();
        }

        /// Without an argument the state is read from `document.fullscreenElement`.
        #[wasm_bindgen(js_name = onFullscreenChange)]
        pub fn on_fullscreen_change(&self, fullscreen: Option<bool>) {
            let fullscreen = fullscreen.unwrap_or_else(|| {
                self.inner
                    .host()
                    .document()
                    .fullscreen_element()
                    .is_some()
            });
            self.inner.on_fullscreen_change(fullscreen);
        }

        #[wasm_bindgen(js_name = onMediaChanged)]
        pub fn on_media_changed(&self) {
            self.inner.on_media_changed();
        }

        #[wasm_bindgen(js_name = onResize)]
        pub fn on_resize(&self) {
            self.inner.on_resize();
        }

        pub fn phase(&self) -> String {
            self.inner.phase().as_str().to_owned()
        }

        #[wasm_bindgen(js_name = isEnabled)]
        pub fn is_enabled(&self) -> bool {
            self.inner.is_enabled()
        }

        pub fn stats(&self) -> Result<JsValue, JsValue> {
            serde_wasm_bindgen::to_value(&self.inner.stats()).map_err(js_error)
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use host::WebHost;
#[cfg(target_arch = "wasm32")]
pub use render::FrameLoop;
#[cfg(target_arch = "wasm32")]
pub use wasm::*;
