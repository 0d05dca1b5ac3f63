use std::collections::HashMap;
use std::path::PathBuf;

use slotmap::SlotMap;

use crate::coords::Rgba8;

use super::error::RenderError;

slotmap::new_key_type! {
    /// Handle to a GPU texture owned by a [`TextureCache`].
    ///
    /// Batching compares textures by handle identity.
    pub struct TextureId;
}

/// Texture cache configuration.
#[derive(Debug, Clone)]
pub struct TextureCacheConfig {
    /// Directory that relative texture names are resolved against.
    pub asset_root: PathBuf,
}

impl Default for TextureCacheConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
        }
    }
}

struct TextureEntry {
    name: Option<String>,
    width: u32,
    height: u32,
    // Kept alive for the bind group.
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// Owns sprite textures and their bind groups.
///
/// Named textures are decoded once and shared: loading the same name twice
/// returns the same [`TextureId`], which lets adjacent sprites batch together.
pub struct TextureCache {
    config: TextureCacheConfig,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    entries: SlotMap<TextureId, TextureEntry>,
    by_name: HashMap<String, TextureId>,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, config: TextureCacheConfig) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill sprite texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quill sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            config,
            layout,
            sampler,
            entries: SlotMap::with_key(),
            by_name: HashMap::new(),
        }
    }

    /// Layout for group 1 of the sprite pipeline.
    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Loads `name` from the asset root, or returns the cached handle.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
    ) -> Result<TextureId, RenderError> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }

        let path = self.config.asset_root.join(name);
        let bytes = std::fs::read(&path).map_err(|source| RenderError::TextureIo {
            name: name.to_string(),
            source,
        })?;

        log::debug!("loading texture '{}' from {}", name, path.display());
        self.load_from_memory(device, queue, name, &bytes)
    }

    /// Decodes an encoded image (PNG, JPEG, ...) and caches it under `name`.
    pub fn load_from_memory(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        bytes: &[u8],
    ) -> Result<TextureId, RenderError> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }

        let rgba = image::load_from_memory(bytes)
            .map_err(|source| RenderError::TextureDecode {
                name: name.to_string(),
                source,
            })?
            .to_rgba8();

        let (width, height) = rgba.dimensions();
        let id = self.insert(device, queue, Some(name), width, height, rgba.as_raw())?;
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Creates an uncached single-color texture.
    pub fn create_solid(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        color: Rgba8,
    ) -> Result<TextureId, RenderError> {
        let pixels: Vec<u8> = color
            .to_array()
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        self.insert(device, queue, None, width, height, &pixels)
    }

    fn insert(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: Option<&str>,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId, RenderError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::InvalidTextureSize { width, height });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: name.or(Some("quill solid texture")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quill sprite texture bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.entries.insert(TextureEntry {
            name: name.map(str::to_string),
            width,
            height,
            _texture: texture,
            _view: view,
            bind_group,
        });
        log::debug!("created texture {id:?} ({width}x{height}) {}", name.unwrap_or("<solid>"));
        Ok(id)
    }

    /// Pixel size of a live texture.
    #[inline]
    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.entries.get(id).map(|e| (e.width, e.height))
    }

    #[inline]
    pub fn bind_group(&self, id: TextureId) -> Option<&wgpu::BindGroup> {
        self.entries.get(id).map(|e| &e.bind_group)
    }

    #[inline]
    pub fn contains(&self, id: TextureId) -> bool {
        self.entries.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops a texture. Sprites still referencing `id` are skipped at draw time.
    pub fn release(&mut self, id: TextureId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                if let Some(name) = entry.name {
                    self.by_name.remove(&name);
                }
                true
            }
            None => false,
        }
    }
}
