use crate::error::RenderError;
use crate::platform::{DecodedSize, FaultSink, FrameRenderer, PipelineControl};

/// One running enhancement pipeline bound to a (media element, overlay surface) pair.
///
/// Stopping is idempotent, and dropping the session stops it.
pub struct RenderSession<P: PipelineControl> {
    pipeline: Option<P>,
    source_size: DecodedSize,
}

impl<P: PipelineControl> RenderSession<P> {
    pub async fn start<R>(
        renderer: &R,
        media: &R::Media,
        surface: &R::Surface,
        source_size: DecodedSize,
        faults: FaultSink,
    ) -> Result<Self, RenderError>
    where
        R: FrameRenderer<Pipeline = P> + ?Sized,
    {
        let pipeline = renderer
            .start_pipeline(media, surface, source_size, faults)
            .await?;
        Ok(Self {
            pipeline: Some(pipeline),
            source_size,
        })
    }

    /// Detaches the frame loop. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.halt();
        }
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.as_ref().is_some_and(PipelineControl::is_running)
    }

    /// Decoded size of the source when the pipeline was built.
    pub fn source_size(&self) -> DecodedSize {
        self.source_size
    }
}

impl<P: PipelineControl> Drop for RenderSession<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
