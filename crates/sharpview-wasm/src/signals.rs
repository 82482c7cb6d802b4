//! Media notifications, timers and task spawning on the page's event loop.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use sharpview_core::{LocalTask, MediaSignal, MediaSignals, Runtime};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, EventTarget, HtmlVideoElement};

use crate::host::WebHost;

/// An event listener that is removed when dropped.
pub(crate) struct EventSubscription {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventSubscription {
    pub(crate) fn new(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

impl MediaSignals for WebHost {
    fn next_media_signal(&self, media: &HtmlVideoElement) -> impl Future<Output = MediaSignal> {
        let target: EventTarget = media.clone().unchecked_into();
        async move {
            let (tx, rx) = futures_channel::oneshot::channel();
            let tx = Rc::new(RefCell::new(Some(tx)));
            let subscribe = |event: &'static str, signal: MediaSignal| {
                let tx = tx.clone();
                EventSubscription::new(&target, event, move |_| {
                    if let Some(tx) = tx.borrow_mut().take() {
                        let _ = tx.send(signal);
                    }
                })
            };

            let subscriptions = (
                subscribe("loadedmetadata", MediaSignal::MetadataLoaded),
                subscribe("loadeddata", MediaSignal::FirstFrame),
            );
            if let (Err(err), _) | (_, Err(err)) = &subscriptions {
                // The caller's attempt timeout still bounds the wait.
                tracing::warn!("failed to subscribe to media events: {err:?}");
            }

            match rx.await {
                Ok(signal) => signal,
                Err(_) => std::future::pending().await,
            }
        }
    }
}

impl Runtime for WebHost {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let window = self.window().clone();
        async move {
            let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
            let promise = js_sys::Promise::new(&mut |resolve, _reject| {
                if let Err(err) =
                    window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                {
                    tracing::warn!("setTimeout failed; resolving immediately: {err:?}");
                    let _ = resolve.call0(&JsValue::UNDEFINED);
                }
            });
            let _ = JsFuture::from(promise).await;
        }
    }

    fn spawn_local(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
