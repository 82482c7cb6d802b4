//! The per-frame enhancement loop, driven by `requestVideoFrameCallback`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use sharpview_core::{
    DecodedSize, FaultSink, FrameRenderer, PipelineControl, RenderError, UPSCALE_FACTOR,
};
use sharpview_gpu::{EnhanceError, FrameEnhancer, GpuDevice, OverlayPresenter};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, HtmlVideoElement};

use crate::host::WebHost;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(method, catch, js_name = requestVideoFrameCallback)]
    fn request_video_frame_callback(
        this: &HtmlVideoElement,
        callback: &js_sys::Function,
    ) -> Result<u32, JsValue>;

    #[wasm_bindgen(method, catch, js_name = cancelVideoFrameCallback)]
    fn cancel_video_frame_callback(this: &HtmlVideoElement, handle: u32) -> Result<(), JsValue>;
}

type FrameCallback = Closure<dyn FnMut(JsValue, JsValue)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStep {
    /// The loop was halted after this callback was queued.
    Skip,
    /// The overlay left the document; the loop ends without a fault.
    Detached,
    Render,
}

/// Halt and reschedule bookkeeping of one frame loop.
#[derive(Debug, Default)]
struct LoopGate {
    halted: bool,
    pending: Option<u32>,
}

impl LoopGate {
    fn scheduled(&mut self, handle: u32) {
        self.pending = Some(handle);
    }

    fn begin_frame(&mut self, canvas_connected: bool) -> FrameStep {
        self.pending = None;
        if self.halted {
            FrameStep::Skip
        } else if !canvas_connected {
            self.halted = true;
            FrameStep::Detached
        } else {
            FrameStep::Render
        }
    }

    /// Returns the callback handle still waiting to be cancelled, at most once.
    fn halt(&mut self) -> Option<u32> {
        self.halted = true;
        self.pending.take()
    }

    /// Halts the loop and returns the error if it is the loop's first failure.
    fn fail(&mut self, err: RenderError) -> Option<RenderError> {
        if self.halted {
            return None;
        }
        self.halted = true;
        Some(err)
    }

    fn is_running(&self) -> bool {
        !self.halted
    }
}

struct LoopState {
    video: HtmlVideoElement,
    canvas: HtmlCanvasElement,
    gpu: Rc<GpuDevice>,
    presenter: OverlayPresenter<'static>,
    enhancer: FrameEnhancer,
    faults: FaultSink,
    gate: LoopGate,
    /// Only ever dropped together with the loop, never from inside its own invocation.
    callback: Option<FrameCallback>,
}

impl LoopState {
    fn schedule(&mut self) -> Result<(), JsValue> {
        let Some(callback) = self.callback.as_ref() else {
            return Ok(());
        };
        let handle = self
            .video
            .request_video_frame_callback(callback.as_ref().unchecked_ref())?;
        self.gate.scheduled(handle);
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), EnhanceError> {
        self.enhancer
            .copy_video_frame(&self.gpu.queue, &self.video)?;
        let Some(frame) = self.presenter.acquire(&self.gpu.device)? else {
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sharpview frame"),
            });
        self.enhancer.encode(&mut encoder, &view);
        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn on_video_frame(state: &Weak<RefCell<LoopState>>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut guard = state.borrow_mut();
    let st = &mut *guard;
    match st.gate.begin_frame(st.canvas.is_connected()) {
        FrameStep::Skip => return,
        FrameStep::Detached => {
            tracing::trace!("overlay detached; frame loop ends");
            return;
        }
        FrameStep::Render => {}
    }

    let result = st
        .render_frame()
        .map_err(RenderError::from)
        .and_then(|()| {
            st.schedule()
                .map_err(|err| RenderError::Frame(format!("requestVideoFrameCallback: {err:?}")))
        });
    if let Some(err) = result.err().and_then(|err| st.gate.fail(err)) {
        let faults = st.faults.clone();
        // Reported after this callback returns; the controller may drop the loop in response.
        wasm_bindgen_futures::spawn_local(async move { faults(err) });
    }
}

/// A running frame loop. Dropping it halts the loop.
pub struct FrameLoop {
    state: Rc<RefCell<LoopState>>,
}

impl FrameLoop {
    fn start(
        video: HtmlVideoElement,
        canvas: HtmlCanvasElement,
        gpu: Rc<GpuDevice>,
        presenter: OverlayPresenter<'static>,
        enhancer: FrameEnhancer,
        faults: FaultSink,
    ) -> Result<Self, RenderError> {
        let state = Rc::new(RefCell::new(LoopState {
            video,
            canvas,
            gpu,
            presenter,
            enhancer,
            faults,
            gate: LoopGate::default(),
            callback: None,
        }));

        let weak = Rc::downgrade(&state);
        let callback = FrameCallback::new(move |_now: JsValue, _metadata: JsValue| {
            on_video_frame(&weak);
        });
        {
            let mut st = state.borrow_mut();
            st.callback = Some(callback);
            st.schedule().map_err(|err| {
                RenderError::Construction(format!("requestVideoFrameCallback: {err:?}"))
            })?;
        }
        Ok(Self { state })
    }
}

impl PipelineControl for FrameLoop {
    fn halt(&mut self) {
        let mut st = self.state.borrow_mut();
        if let Some(handle) = st.gate.halt() {
            let _ = st.video.cancel_video_frame_callback(handle);
        }
    }

    fn is_running(&self) -> bool {
        self.state.borrow().gate.is_running()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.halt();
    }
}

impl FrameRenderer for WebHost {
    type Pipeline = FrameLoop;

    async fn start_pipeline(
        &self,
        media: &HtmlVideoElement,
        surface: &HtmlCanvasElement,
        source_size: DecodedSize,
        faults: FaultSink,
    ) -> Result<FrameLoop, RenderError> {
        let gpu = self.gpu_device().await?;
        let wgpu_surface = self.create_gpu_surface(surface)?;
        let presenter = OverlayPresenter::new(
            wgpu_surface,
            &gpu.adapter,
            &gpu.device,
            source_size.scaled(UPSCALE_FACTOR),
        );
        let enhancer = FrameEnhancer::new(&gpu.device, source_size, presenter.format())?;
        FrameLoop::start(
            media.clone(),
            surface.clone(),
            gpu,
            presenter,
            enhancer,
            faults,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn halt_cancels_the_pending_callback_once() {
        let mut gate = LoopGate::default();
        gate.scheduled(7);
        assert!(gate.is_running());

        assert_eq!(gate.halt(), Some(7));
        assert_eq!(gate.halt(), None);
        assert!(!gate.is_running());

        // A callback the browser had already queued still fires; it must not render.
        assert_eq!(gate.begin_frame(true), FrameStep::Skip);
    }

    #[wasm_bindgen_test]
    fn detached_canvas_ends_the_loop_without_rescheduling() {
        let mut gate = LoopGate::default();
        gate.scheduled(1);
        assert_eq!(gate.begin_frame(false), FrameStep::Detached);
        assert!(!gate.is_running());
        assert_eq!(gate.halt(), None, "nothing left to cancel");
        assert_eq!(gate.fail(RenderError::SurfaceLost), None);
    }

    #[wasm_bindgen_test]
    fn only_the_first_failure_is_reported() {
        let mut gate = LoopGate::default();
        gate.scheduled(1);
        assert_eq!(gate.begin_frame(true), FrameStep::Render);
        assert_eq!(
            gate.fail(RenderError::Frame("copy failed".to_owned())),
            Some(RenderError::Frame("copy failed".to_owned()))
        );
        assert_eq!(gate.fail(RenderError::SurfaceLost), None);
        assert_eq!(gate.begin_frame(true), FrameStep::Skip);
    }

    #[wasm_bindgen_test]
    fn frames_keep_rendering_while_attached() {
        let mut gate = LoopGate::default();
        for handle in 0..3 {
            gate.scheduled(handle);
            assert_eq!(gate.begin_frame(true), FrameStep::Render);
        }
        assert_eq!(gate.halt(), None, "callback already consumed");
    }
}
