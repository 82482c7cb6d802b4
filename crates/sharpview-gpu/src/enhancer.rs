use sharpview_core::DecodedSize;
use wgpu::util::DeviceExt;

use crate::error::EnhanceError;
use crate::pipeline::{create_enhance_shader, create_stage_bind_group_layout, create_stage_pipeline};
use crate::preset::{EnhancementPreset, StageUniforms};
use crate::surface::output_needs_linearize;
use crate::upload::{extent, padded_bytes_per_row, unpack_rows, FrameUploader};

/// Format of the source texture and every intermediate stage target.
const INTERMEDIATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct StageTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl StageTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        size: DecodedSize,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

struct StagePass {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    // Referenced by `bind_group`; kept for the lifetime of the pass.
    _uniforms: wgpu::Buffer,
}

/// Runs the enhancement preset over one video's frames.
///
/// All GPU objects are sized for a single source resolution. A resolution change means building a
/// new enhancer.
pub struct FrameEnhancer {
    source_size: DecodedSize,
    output_size: DecodedSize,
    output_format: wgpu::TextureFormat,
    source: StageTarget,
    intermediates: Vec<StageTarget>,
    passes: Vec<StagePass>,
    uploader: FrameUploader,
}

impl FrameEnhancer {
    pub fn new(
        device: &wgpu::Device,
        source_size: DecodedSize,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, EnhanceError> {
        let preset = EnhancementPreset::STANDARD;
        let output_size = preset.output_size(source_size);
        let max = device.limits().max_texture_dimension_2d;
        if !source_size.is_positive() || output_size.width > max || output_size.height > max {
            return Err(EnhanceError::UnsupportedSize {
                size: output_size,
                max,
            });
        }

        let layout = create_stage_bind_group_layout(device);
        let shader = create_enhance_shader(device);
        let linearize = output_needs_linearize(output_format);

        let source = StageTarget::new(
            device,
            "sharpview source frame",
            source_size,
            INTERMEDIATE_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let stages = preset.stages();
        let mut intermediates: Vec<StageTarget> = Vec::with_capacity(stages.len());
        let mut passes = Vec::with_capacity(stages.len());
        let mut input_size = source_size;

        for (index, stage) in stages.iter().enumerate() {
            let last = index + 1 == stages.len();
            let format = if last { output_format } else { INTERMEDIATE_FORMAT };
            let pipeline = create_stage_pipeline(device, &layout, &shader, stage, format);

            let uniforms = StageUniforms::new(stage, input_size, last && linearize);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(stage.label()),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let input = match index.checked_sub(1) {
                Some(prev) => &intermediates[prev].view,
                None => &source.view,
            };
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(stage.label()),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(input),
                    },
                ],
            });

            passes.push(StagePass {
                label: stage.label(),
                pipeline,
                bind_group,
                _uniforms: buffer,
            });

            input_size = stage.output_size(input_size);
            if !last {
                intermediates.push(StageTarget::new(
                    device,
                    stage.label(),
                    input_size,
                    INTERMEDIATE_FORMAT,
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
                ));
            }
        }

        tracing::debug!(
            source = %source_size,
            output = %output_size,
            format = ?output_format,
            stages = passes.len(),
            "frame enhancer built"
        );

        Ok(Self {
            source_size,
            output_size,
            output_format,
            source,
            intermediates,
            passes,
            uploader: FrameUploader::new(),
        })
    }

    pub fn source_size(&self) -> DecodedSize {
        self.source_size
    }

    pub fn output_size(&self) -> DecodedSize {
        self.output_size
    }

    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    pub fn source_texture(&self) -> &wgpu::Texture {
        &self.source.texture
    }

    /// Uploads a decoded RGBA8 frame as the next source.
    pub fn upload_rgba8(
        &mut self,
        queue: &wgpu::Queue,
        rgba: &[u8],
        stride_bytes: u32,
    ) -> Result<(), EnhanceError> {
        self.uploader
            .write_rgba8(queue, &self.source.texture, self.source_size, rgba, stride_bytes)
    }

    /// Copies the video's current frame into the source texture.
    #[cfg(target_arch = "wasm32")]
    pub fn copy_video_frame(
        &self,
        queue: &wgpu::Queue,
        video: &web_sys::HtmlVideoElement,
    ) -> Result<(), EnhanceError> {
        let actual = DecodedSize::new(video.video_width(), video.video_height());
        if actual != self.source_size {
            return Err(EnhanceError::InvalidFrame {
                expected: self.source_size,
                actual,
            });
        }

        queue.copy_external_image_to_texture(
            &wgpu::ImageCopyExternalImage {
                source: wgpu::ExternalImageSource::HTMLVideoElement(video.clone()),
                origin: wgpu::Origin2d::ZERO,
                flip_y: false,
            },
            wgpu::ImageCopyTextureTagged {
                texture: &self.source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
                color_space: wgpu::PredefinedColorSpace::Srgb,
                premultiplied_alpha: false,
            },
            extent(self.source_size),
        );
        Ok(())
    }

    /// Records every stage; the last one renders into `output`, which must be `output_size` in
    /// `output_format`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        for (index, pass) in self.passes.iter().enumerate() {
            let target = self
                .intermediates
                .get(index)
                .map(|t| &t.view)
                .unwrap_or(output);
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&pass.pipeline);
            rpass.set_bind_group(0, &pass.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
    }

    /// Enhances one RGBA8 frame off-screen and reads the result back as tightly packed RGBA8.
    ///
    /// The enhancer must have been built with a four byte per pixel output format.
    pub async fn enhance_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        stride_bytes: u32,
    ) -> Result<Vec<u8>, EnhanceError> {
        self.upload_rgba8(queue, rgba, stride_bytes)?;

        let output = StageTarget::new(
            device,
            "sharpview readback target",
            self.output_size,
            self.output_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let padded_bpr = padded_bytes_per_row(self.output_size.width * 4);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sharpview readback buffer"),
            size: padded_bpr as u64 * self.output_size.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sharpview enhance readback"),
        });
        self.encode(&mut encoder, &output.view);
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &output.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(self.output_size.height),
                },
            },
            extent(self.output_size),
        );
        queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            sender.send(res).ok();
        });
        #[cfg(not(target_arch = "wasm32"))]
        device.poll(wgpu::Maintain::Wait);

        #[cfg(target_arch = "wasm32")]
        device.poll(wgpu::Maintain::Poll);

        match receiver.receive().await {
            Some(Ok(())) => {}
            Some(Err(err)) => return Err(err.into()),
            None => return Err(EnhanceError::ReadbackChannelClosed),
        }

        let mapped = slice.get_mapped_range();
        let rgba = unpack_rows(&mapped, self.output_size, padded_bpr);
        drop(mapped);
        readback.unmap();
        Ok(rgba)
    }
}
