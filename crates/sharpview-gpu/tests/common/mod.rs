//! Shared helpers for `sharpview-gpu` integration tests.

use sharpview_gpu::{EnhanceError, GpuDevice};

pub fn require_webgpu() -> bool {
    let Ok(raw) = std::env::var("SHARPVIEW_REQUIRE_WEBGPU") else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

pub fn skip_or_panic(test_name: &str, reason: &str) {
    if require_webgpu() {
        panic!("SHARPVIEW_REQUIRE_WEBGPU is enabled but {test_name} cannot run: {reason}");
    }
    eprintln!("skipping {test_name}: {reason}");
}

/// A headless device, or `None` (after logging the skip) when the machine has no adapter.
pub fn headless_device(test_name: &str) -> Option<GpuDevice> {
    match pollster::block_on(GpuDevice::request_headless()) {
        Ok(gpu) => Some(gpu),
        Err(EnhanceError::NoAdapter) => {
            skip_or_panic(test_name, "wgpu adapter not found");
            None
        }
        Err(err) => {
            skip_or_panic(test_name, &format!("device request failed: {err}"));
            None
        }
    }
}

pub fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    rgba.repeat((width * height) as usize)
}
