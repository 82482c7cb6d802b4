use std::rc::Rc;

use js_sys::Reflect;
use sharpview_core::{AdapterInfo, CapabilityError, GpuAdapterSource};
use sharpview_gpu::{adapter_info, request_adapter_robust, EnhanceError, GpuDevice};
use wasm_bindgen::JsValue;

use crate::host::WebHost;

impl WebHost {
    fn gpu_instance(&self) -> Result<&wgpu::Instance, EnhanceError> {
        if !self.has_gpu_entry_point() {
            return Err(EnhanceError::NoAdapter);
        }
        Ok(self.inner.instance.get_or_init(|| {
            wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::BROWSER_WEBGPU,
                ..Default::default()
            })
        }))
    }

    /// Creates a WebGPU surface over the overlay canvas.
    pub(crate) fn create_gpu_surface(
        &self,
        canvas: &web_sys::HtmlCanvasElement,
    ) -> Result<wgpu::Surface<'static>, EnhanceError> {
        Ok(self
            .gpu_instance()?
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?)
    }

    /// The page's device, opened on first use and shared by every session after that.
    pub(crate) async fn gpu_device(&self) -> Result<Rc<GpuDevice>, EnhanceError> {
        if let Some(gpu) = self.inner.gpu.borrow().as_ref() {
            return Ok(gpu.clone());
        }

        let probed = self.inner.adapter.borrow_mut().take();
        let adapter = match probed {
            Some(adapter) => adapter,
            None => request_adapter_robust(self.gpu_instance()?, None)
                .await
                .ok_or(EnhanceError::NoAdapter)?,
        };
        let gpu = Rc::new(GpuDevice::from_adapter(adapter).await?);
        tracing::debug!(adapter = %gpu.adapter_info().name, "GPU device opened");
        *self.inner.gpu.borrow_mut() = Some(gpu.clone());
        Ok(gpu)
    }
}

impl GpuAdapterSource for WebHost {
    fn has_gpu_entry_point(&self) -> bool {
        let navigator = self.window().navigator();
        Reflect::get(&navigator, &JsValue::from_str("gpu"))
            .map(|gpu| !gpu.is_undefined() && !gpu.is_null())
            .unwrap_or(false)
    }

    async fn request_adapter(&self) -> Result<AdapterInfo, CapabilityError> {
        let instance = self
            .gpu_instance()
            .map_err(|_| CapabilityError::EntryPointMissing)?;
        let adapter = request_adapter_robust(instance, None)
            .await
            .ok_or(CapabilityError::AdapterUnavailable)?;
        let info = adapter_info(&adapter);
        *self.inner.adapter.borrow_mut() = Some(adapter);
        Ok(info)
    }
}
