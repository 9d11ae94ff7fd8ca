use std::collections::HashMap;
use std::path::Path;

use super::{RenderCtx, RenderError};

/// Format of every texture in the store. Texels are sampled unmodified.
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Handle to a texture owned by a `TextureStore`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(u32);

impl TextureId {
    /// Rebuilds an id from its raw value (recorded command streams, tests).
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Decoded RGBA8 pixels, tightly packed.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decodes an encoded image (format sniffed from the bytes).
    ///
    /// `path` only labels errors.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self, RenderError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| RenderError::load(path, e))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::load(path, "image has no pixels"));
        }

        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// Reads and decodes an image file.
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::load(path, e))?;
        Self::decode(path, &bytes)
    }
}

/// A sampled GPU texture with its cached size.
pub struct Texture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Owner of all image textures.
///
/// Textures are immutable after upload. Loads happen once after device creation;
/// `release_all` drops everything at device teardown. Dropping a wgpu texture only
/// releases our reference, so release order relative to other components does not
/// matter.
#[derive(Default)]
pub struct TextureStore {
    textures: HashMap<TextureId, Texture>,
    next_id: u32,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an image file into a new texture.
    ///
    /// Fails with `ResourceLoad` if the file is missing or not a decodable image, and
    /// with `DeviceResource` if it exceeds the device's texture limits.
    pub fn load(&mut self, ctx: &RenderCtx<'_>, path: impl AsRef<Path>) -> Result<TextureId, RenderError> {
        let path = path.as_ref();
        let image = DecodedImage::open(path)?;
        let id = self.upload(ctx, &path.display().to_string(), &image)?;

        log::debug!(
            "loaded texture {} ({}x{}) as {:?}",
            path.display(),
            image.width,
            image.height,
            id
        );

        Ok(id)
    }

    /// Uploads already-decoded pixels into a new texture.
    pub fn upload(
        &mut self,
        ctx: &RenderCtx<'_>,
        label: &str,
        image: &DecodedImage,
    ) -> Result<TextureId, RenderError> {
        check_extent(label, image.width, image.height, ctx.max_texture_dimension())?;

        let expected = image.width as usize * image.height as usize * 4;
        if image.rgba.len() != expected {
            return Err(RenderError::device_resource(
                label,
                format!("expected {expected} bytes of RGBA8, got {}", image.rgba.len()),
            ));
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = TextureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.textures.insert(
            id,
            Texture {
                texture,
                view,
                width: image.width,
                height: image.height,
            },
        );

        Ok(id)
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    /// Cached `(width, height)` of a texture.
    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(Texture::size)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Drops every texture. Returns how many were released.
    ///
    /// Ids handed out earlier are never reused, so stale ids resolve to `None`.
    pub fn release_all(&mut self) -> usize {
        let n = self.textures.len();
        self.textures.clear();
        n
    }
}

pub(super) fn check_extent(label: &str, width: u32, height: u32, max: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::device_resource(label, "zero-sized texture"));
    }
    if width > max || height > max {
        return Err(RenderError::device_resource(
            label,
            format!("{width}x{height} exceeds the device limit of {max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([x as u8, y as u8, 0x80, 0xff])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn decode_png_reports_size_and_rgba() {
        let bytes = png_bytes(3, 2);
        let img = DecodedImage::decode(Path::new("mem.png"), &bytes).expect("decode");
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgba.len(), 3 * 2 * 4);
        // Pixel (2, 1).
        let i = (1 * 3 + 2) * 4;
        assert_eq!(&img.rgba[i..i + 4], &[2, 1, 0x80, 0xff]);
    }

    #[test]
    fn corrupt_bytes_are_a_load_error() {
        let err = DecodedImage::decode(Path::new("bad.png"), b"definitely not a png").unwrap_err();
        assert!(err.is_resource_load());
        assert!(err.to_string().contains("bad.png"));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = DecodedImage::open(Path::new("./no/such/Player.png")).unwrap_err();
        match err {
            RenderError::ResourceLoad { path, source } => {
                assert_eq!(path, Path::new("./no/such/Player.png"));
                let io = source.downcast_ref::<std::io::Error>().expect("io error source");
                assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn extent_is_checked_against_device_limit() {
        assert!(check_extent("ok", 1280, 720, 2048).is_ok());
        assert!(matches!(
            check_extent("big", 4096, 16, 2048),
            Err(RenderError::DeviceResource { .. })
        ));
        assert!(matches!(
            check_extent("empty", 0, 16, 2048),
            Err(RenderError::DeviceResource { .. })
        ));
    }

    #[test]
    fn empty_store_releases_nothing() {
        let mut store = TextureStore::new();
        assert!(store.is_empty());
        assert_eq!(store.release_all(), 0);
        assert_eq!(store.size(TextureId(0)), None);
    }
}
