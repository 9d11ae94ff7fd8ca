use std::collections::HashMap;

/// Adapter capabilities reported before the device is created.
///
/// Passed to `DeviceLifecycleHandlers::is_device_acceptable`.
#[derive(Debug, Clone, Default)]
pub struct DeviceCaps {
    pub adapter_name: String,
    pub backend: String,
    pub device_type: String,

    /// Largest 2D texture edge the device accepts.
    pub max_texture_dimension_2d: u32,

    /// Formats the surface can be configured with.
    pub surface_formats: Vec<wgpu::TextureFormat>,

    /// Adapter support for each queried format.
    pub format_features: HashMap<wgpu::TextureFormat, wgpu::TextureFormatFeatures>,
}

impl DeviceCaps {
    pub(crate) fn query(
        adapter: &wgpu::Adapter,
        surface_caps: &wgpu::SurfaceCapabilities,
        limits: &wgpu::Limits,
        query_formats: &[wgpu::TextureFormat],
    ) -> Self {
        let info = adapter.get_info();
        let format_features = query_formats
            .iter()
            .map(|f| (*f, adapter.get_texture_format_features(*f)))
            .collect();

        Self {
            adapter_name: info.name,
            backend: format!("{:?}", info.backend),
            device_type: format!("{:?}", info.device_type),
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            surface_formats: surface_caps.formats.clone(),
            format_features,
        }
    }

    /// Whether `format` can be rendered into with blending and sampled afterwards.
    ///
    /// Formats that were not queried report `false`.
    pub fn supports_blendable_render_target(&self, format: wgpu::TextureFormat) -> bool {
        self.format_features.get(&format).is_some_and(|f| {
            f.allowed_usages
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
                && f.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE)
        })
    }

    /// Whether a `width` × `height` 2D texture fits the device limits.
    pub fn fits_texture(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_dimension_2d && height <= self.max_texture_dimension_2d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with(format: wgpu::TextureFormat, features: wgpu::TextureFormatFeatures) -> DeviceCaps {
        let mut caps = DeviceCaps {
            max_texture_dimension_2d: 2048,
            ..Default::default()
        };
        caps.format_features.insert(format, features);
        caps
    }

    #[test]
    fn blendable_render_target_requires_all_bits() {
        let full = wgpu::TextureFormatFeatures {
            allowed_usages: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            flags: wgpu::TextureFormatFeatureFlags::BLENDABLE | wgpu::TextureFormatFeatureFlags::FILTERABLE,
        };
        let caps = caps_with(wgpu::TextureFormat::Rgba8Unorm, full);
        assert!(caps.supports_blendable_render_target(wgpu::TextureFormat::Rgba8Unorm));

        let no_blend = wgpu::TextureFormatFeatures {
            allowed_usages: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            flags: wgpu::TextureFormatFeatureFlags::FILTERABLE,
        };
        let caps = caps_with(wgpu::TextureFormat::Rgba8Unorm, no_blend);
        assert!(!caps.supports_blendable_render_target(wgpu::TextureFormat::Rgba8Unorm));
    }

    #[test]
    fn unqueried_format_is_unsupported() {
        let caps = DeviceCaps::default();
        assert!(!caps.supports_blendable_render_target(wgpu::TextureFormat::Rgba16Float));
    }

    #[test]
    fn texture_fit_uses_both_edges() {
        let caps = DeviceCaps {
            max_texture_dimension_2d: 1024,
            ..Default::default()
        };
        assert!(caps.fits_texture(1024, 1024));
        assert!(!caps.fits_texture(1280, 720));
    }
}
