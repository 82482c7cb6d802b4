//! CPU -> GPU frame uploads for hosts that hand us decoded pixels instead of a video element.

use sharpview_core::DecodedSize;

use crate::error::EnhanceError;

/// Reusable staging for uploading RGBA8 frames into the enhancer's source texture.
///
/// WebGPU requires `bytes_per_row` to be a multiple of 256. Frames whose stride already is are
/// written directly; others are repacked row by row into the staging buffer.
#[derive(Default)]
pub struct FrameUploader {
    staging: Vec<u8>,
}

impl FrameUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads a strided RGBA8 frame of `size` pixels into `texture`.
    ///
    /// `stride_bytes` must be at least `size.width * 4` and `rgba` must hold `size.height` rows.
    pub fn write_rgba8(
        &mut self,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        size: DecodedSize,
        rgba: &[u8],
        stride_bytes: u32,
    ) -> Result<(), EnhanceError> {
        if !size.is_positive() {
            return Ok(());
        }

        let unpadded_bpr = size.width.saturating_mul(4);
        let required_len = stride_bytes as usize * size.height as usize;
        if stride_bytes < unpadded_bpr || rgba.len() < required_len {
            return Err(EnhanceError::InvalidFrame {
                expected: size,
                actual: DecodedSize::new(
                    stride_bytes / 4,
                    (rgba.len() / stride_bytes.max(1) as usize) as u32,
                ),
            });
        }

        let (bytes, bytes_per_row) = if stride_bytes % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT == 0 {
            (&rgba[..required_len], stride_bytes)
        } else {
            let padded_bpr = padded_bytes_per_row(unpadded_bpr);
            pack_rows(rgba, size, stride_bytes, padded_bpr, &mut self.staging);
            (&self.staging[..], padded_bpr)
        };

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size.height),
            },
            extent(size),
        );
        Ok(())
    }
}

pub(crate) fn extent(size: DecodedSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

pub(crate) fn padded_bytes_per_row(unpadded_bytes_per_row: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded_bytes_per_row.div_ceil(align) * align
}

fn pack_rows(rgba: &[u8], size: DecodedSize, src_stride: u32, padded_bpr: u32, out: &mut Vec<u8>) {
    let row_len = size.width as usize * 4;
    out.clear();
    out.resize(padded_bpr as usize * size.height as usize, 0);

    for (y, dst_row) in out
        .chunks_exact_mut(padded_bpr as usize)
        .take(size.height as usize)
        .enumerate()
    {
        let src_off = y * src_stride as usize;
        dst_row[..row_len].copy_from_slice(&rgba[src_off..src_off + row_len]);
    }
}

/// Strips row padding from a readback buffer.
pub(crate) fn unpack_rows(padded: &[u8], size: DecodedSize, padded_bpr: u32) -> Vec<u8> {
    let row_len = size.width as usize * 4;
    let mut rgba = Vec::with_capacity(row_len * size.height as usize);
    for row in padded
        .chunks_exact(padded_bpr as usize)
        .take(size.height as usize)
    {
        rgba.extend_from_slice(&row[..row_len]);
    }
    rgba
}
