use sharpview_core::AdapterInfo;

use crate::error::EnhanceError;

/// Requests an adapter, falling back from high-performance to low-power to the fallback adapter.
pub async fn request_adapter_robust(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Option<wgpu::Adapter> {
    for (power, fallback) in [
        (wgpu::PowerPreference::HighPerformance, false),
        (wgpu::PowerPreference::LowPower, false),
        (wgpu::PowerPreference::LowPower, true),
    ] {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface,
                force_fallback_adapter: fallback,
            })
            .await;
        if adapter.is_some() {
            return adapter;
        }
    }
    None
}

pub fn adapter_info(adapter: &wgpu::Adapter) -> AdapterInfo {
    let info = adapter.get_info();
    AdapterInfo {
        // Browsers frequently report an empty name; keep something readable in logs.
        name: if info.name.is_empty() {
            format!("0x{:04x}:0x{:04x}", info.vendor, info.device)
        } else {
            info.name
        },
        backend: format!("{:?}", info.backend),
        driver: info.driver_info,
    }
}

/// An adapter with its device and queue.
pub struct GpuDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuDevice {
    /// Acquires a device able to render to `compatible_surface` (if given).
    pub async fn request(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, EnhanceError> {
        let adapter = request_adapter_robust(instance, compatible_surface)
            .await
            .ok_or(EnhanceError::NoAdapter)?;
        Self::from_adapter(adapter).await
    }

    /// Opens a device on an adapter acquired elsewhere (for example by the capability probe).
    pub async fn from_adapter(adapter: wgpu::Adapter) -> Result<Self, EnhanceError> {
        // Conservative defaults, but let textures grow to whatever the adapter allows: a 4K
        // source doubles to 7680 pixels wide.
        let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("sharpview device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// A device with no surface, for native hosts and tests.
    pub async fn request_headless() -> Result<Self, EnhanceError> {
        let instance = wgpu::Instance::default();
        Self::request(&instance, None).await
    }

    pub fn adapter_info(&self) -> AdapterInfo {
        adapter_info(&self.adapter)
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
