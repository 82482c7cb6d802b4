use sharpview_core::DecodedSize;

use crate::error::EnhanceError;

/// What to do when acquiring the next surface texture fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SurfaceAcquireErrorAction {
    /// Drop the frame; the next video frame tries again.
    DropFrame,
    /// Reconfigure the surface and retry once.
    ReconfigureAndRetry,
    /// Report a render fault.
    Fatal,
}

pub(crate) fn surface_acquire_error_action(err: &wgpu::SurfaceError) -> SurfaceAcquireErrorAction {
    match err {
        wgpu::SurfaceError::Timeout => SurfaceAcquireErrorAction::DropFrame,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            SurfaceAcquireErrorAction::ReconfigureAndRetry
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceAcquireErrorAction::Fatal,
    }
}

/// Picks the overlay's surface format.
///
/// Video frames are already display-encoded, so a plain `*Unorm` target takes the enhancer output
/// as is. An `*Srgb` target is only used when nothing else is offered; the final stage then
/// linearizes so the store-time encode lands back on the original values.
pub fn preferred_surface_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
    for preferred in [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ] {
        if formats.contains(&preferred) {
            return preferred;
        }
    }
    formats
        .first()
        .copied()
        .unwrap_or(wgpu::TextureFormat::Bgra8Unorm)
}

pub fn output_needs_linearize(format: wgpu::TextureFormat) -> bool {
    format.is_srgb()
}

pub(crate) fn preferred_present_mode(modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    // Fifo is universally supported and paces with the browser's compositor.
    if modes.contains(&wgpu::PresentMode::Fifo) {
        return wgpu::PresentMode::Fifo;
    }
    modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo)
}

pub(crate) fn preferred_composite_alpha_mode(
    modes: &[wgpu::CompositeAlphaMode],
) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        return wgpu::CompositeAlphaMode::Opaque;
    }
    modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque)
}

/// The configured surface the enhancer presents into.
pub struct OverlayPresenter<'a> {
    surface: wgpu::Surface<'a>,
    config: wgpu::SurfaceConfiguration,
}

impl<'a> OverlayPresenter<'a> {
    pub fn new(
        surface: wgpu::Surface<'a>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: DecodedSize,
    ) -> Self {
        let caps = surface.get_capabilities(adapter);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: preferred_surface_format(&caps.formats),
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: preferred_present_mode(&caps.present_modes),
            alpha_mode: preferred_composite_alpha_mode(&caps.alpha_modes),
            desired_maximum_frame_latency: 2,
            view_formats: Vec::new(),
        };
        surface.configure(device, &config);
        tracing::debug!(
            format = ?config.format,
            width = config.width,
            height = config.height,
            "overlay surface configured"
        );
        Self { surface, config }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> DecodedSize {
        DecodedSize::new(self.config.width, self.config.height)
    }

    /// Acquires the next surface texture.
    ///
    /// `Ok(None)` means the frame should be dropped.
    pub fn acquire(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<Option<wgpu::SurfaceTexture>, EnhanceError> {
        let err = match self.surface.get_current_texture() {
            Ok(frame) => return Ok(Some(frame)),
            Err(err) => err,
        };
        match surface_acquire_error_action(&err) {
            SurfaceAcquireErrorAction::DropFrame => {
                tracing::debug!("surface timeout; dropping frame");
                Ok(None)
            }
            SurfaceAcquireErrorAction::Fatal => Err(err.into()),
            SurfaceAcquireErrorAction::ReconfigureAndRetry => {
                self.surface.configure(device, &self.config);
                match self.surface.get_current_texture() {
                    Ok(frame) => Ok(Some(frame)),
                    Err(err) => match surface_acquire_error_action(&err) {
                        SurfaceAcquireErrorAction::Fatal => Err(err.into()),
                        SurfaceAcquireErrorAction::DropFrame
                        | SurfaceAcquireErrorAction::ReconfigureAndRetry => {
                            tracing::warn!(
                                "surface acquire failed after reconfigure; dropping frame: {err:?}"
                            );
                            Ok(None)
                        }
                    },
                }
            }
        }
    }
}
