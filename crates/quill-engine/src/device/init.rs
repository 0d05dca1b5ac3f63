/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format. Sprite textures are sRGB, so this keeps
    /// blending in linear space.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Alpha compositing with the desktop. Falls back to the first supported
    /// mode when the requested one is unavailable.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Upper bound for any single buffer, the sprite instance buffer included.
    ///
    /// `None` takes whatever the adapter offers. Lowering it makes the batch
    /// renderer report allocation failures earlier.
    pub max_buffer_size: Option<u64>,

    /// Hint for the swapchain depth; support depends on the backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            max_buffer_size: None,
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Device limits to request from an adapter offering `adapter`.
    ///
    /// Starts from the portable defaults, raises buffer and texture sizes to
    /// what the adapter supports, then applies [`max_buffer_size`](Self::max_buffer_size).
    pub fn device_limits(&self, adapter: &wgpu::Limits) -> wgpu::Limits {
        let mut limits = wgpu::Limits::default().using_resolution(adapter.clone());
        limits.max_buffer_size = adapter.max_buffer_size;
        if let Some(cap) = self.max_buffer_size {
            limits.max_buffer_size = limits.max_buffer_size.min(cap);
        }
        limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_cap_never_exceeds_adapter() {
        let adapter = wgpu::Limits {
            max_buffer_size: 1 << 20,
            ..wgpu::Limits::default()
        };

        let init = GpuInit {
            max_buffer_size: Some(4096),
            ..GpuInit::default()
        };
        assert_eq!(init.device_limits(&adapter).max_buffer_size, 4096);

        let init = GpuInit {
            max_buffer_size: Some(1 << 30),
            ..GpuInit::default()
        };
        assert_eq!(init.device_limits(&adapter).max_buffer_size, 1 << 20);
    }

    #[test]
    fn uncapped_uses_adapter_buffer_size() {
        let adapter = wgpu::Limits {
            max_buffer_size: 123_456,
            ..wgpu::Limits::default()
        };
        assert_eq!(GpuInit::default().device_limits(&adapter).max_buffer_size, 123_456);
    }
}
