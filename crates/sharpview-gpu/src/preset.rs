use sharpview_core::{DecodedSize, UPSCALE_FACTOR};

/// One pass of the enhancement chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Pulls isolated highlights down towards their brightest neighbour.
    ClampHighlights { strength: f32 },
    /// Unsharp mask at source resolution.
    RestoreDetail { strength: f32 },
    /// Catmull-Rom resampling by an integer factor.
    Upscale { factor: u32 },
}

impl Stage {
    pub fn fragment_entry_point(&self) -> &'static str {
        match self {
            Stage::ClampHighlights { .. } => "fs_clamp_highlights",
            Stage::RestoreDetail { .. } => "fs_restore_detail",
            Stage::Upscale { .. } => "fs_upscale",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::ClampHighlights { .. } => "sharpview clamp highlights",
            Stage::RestoreDetail { .. } => "sharpview restore detail",
            Stage::Upscale { .. } => "sharpview upscale",
        }
    }

    pub fn strength(&self) -> f32 {
        match *self {
            Stage::ClampHighlights { strength } | Stage::RestoreDetail { strength } => strength,
            Stage::Upscale { .. } => 0.0,
        }
    }

    /// Size of this stage's output for an input of `input`.
    pub fn output_size(&self, input: DecodedSize) -> DecodedSize {
        match *self {
            Stage::Upscale { factor } => input.scaled(factor),
            Stage::ClampHighlights { .. } | Stage::RestoreDetail { .. } => input,
        }
    }
}

/// The fixed enhancement preset applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancementPreset {
    stages: [Stage; 3],
}

impl EnhancementPreset {
    pub const STANDARD: Self = Self {
        stages: [
            Stage::ClampHighlights { strength: 1.0 },
            Stage::RestoreDetail { strength: 0.35 },
            Stage::Upscale {
                factor: UPSCALE_FACTOR,
            },
        ],
    };

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn output_size(&self, source: DecodedSize) -> DecodedSize {
        self.stages
            .iter()
            .fold(source, |size, stage| stage.output_size(size))
    }
}

impl Default for EnhancementPreset {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Per-stage uniform block; layout matches `StageUniforms` in the WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct StageUniforms {
    pub input_size: [f32; 2],
    pub output_size: [f32; 2],
    pub strength: f32,
    /// Non-zero when the render target re-encodes to sRGB on store.
    pub linearize: u32,
    pub _pad: [u32; 2],
}

impl StageUniforms {
    pub fn new(stage: &Stage, input: DecodedSize, linearize: bool) -> Self {
        let output = stage.output_size(input);
        Self {
            input_size: [input.width as f32, input.height as f32],
            output_size: [output.width as f32, output.height as f32],
            strength: stage.strength(),
            linearize: u32::from(linearize),
            _pad: [0; 2],
        }
    }
}
