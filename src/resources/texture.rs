//! Texture decoding and the file-backed texture loader

use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::backend::traits::*;
use crate::backend::types::*;

/// Decoded RGBA8 texture data
///
/// Cube data stores the six faces back to back; `width` and `height` are
/// those of one face.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BackendResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| BackendError::TextureLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(img, &name))
    }

    /// Load texture from encoded bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> BackendResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| BackendError::TextureLoadFailed {
            path: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            dimension: TextureDimension::D2,
            data,
            name: name.to_string(),
        }
    }

    /// Reinterpret a vertical strip of six square faces as a cube.
    pub fn into_cube(self) -> BackendResult<Self> {
        if self.dimension == TextureDimension::Cube {
            return Ok(self);
        }
        if self.height != self.width * 6 {
            return Err(BackendError::TextureLoadFailed {
                path: self.name,
                reason: format!(
                    "cube texture must be a vertical strip of six square faces, got {}x{}",
                    self.width, self.height
                ),
            });
        }
        Ok(Self {
            height: self.width,
            dimension: TextureDimension::Cube,
            ..self
        })
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            dimension: TextureDimension::D2,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Default texture of a dimension, bound in its reserved bindless slot
    pub fn white(dimension: TextureDimension) -> Self {
        let layers = dimension.array_layers() as usize;
        Self {
            dimension,
            data: [255u8; 4].repeat(layers),
            ..Self::solid_color([255, 255, 255, 255], "white")
        }
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor {
            label: Some(self.name.clone()),
            width: self.width,
            height: self.height,
            format: self.format,
            dimension: self.dimension,
        }
    }
}

/// Loads textures from image files relative to an asset root.
#[derive(Debug, Default, Clone)]
pub struct ImageTextureLoader {
    root: Option<std::path::PathBuf>,
}

impl ImageTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl TextureLoader for ImageTextureLoader {
    fn load(
        &mut self,
        path: &Path,
        dimension: TextureDimension,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> BackendResult<TextureHandle> {
        let resolved = match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        };
        let data = TextureData::from_file(&resolved)?;
        let data = match dimension {
            TextureDimension::D2 => data,
            TextureDimension::Cube => data.into_cube()?,
        };
        let texture = device.create_texture(&data.descriptor())?;
        ctx.upload_texture(texture, &data.data, data.width, data.height);
        log::info!(
            "loaded texture {} ({}x{}, {:?})",
            resolved.display(),
            data.width,
            data.height,
            data.dimension
        );
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyCommandContext, DummyDevice};

    #[test]
    fn test_load_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        img.save(dir.path().join("tile.png")).unwrap();

        let mut loader = ImageTextureLoader::with_root(dir.path());
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let handle = loader
            .load(Path::new("tile.png"), TextureDimension::D2, &mut device, &mut ctx)
            .unwrap();

        assert_eq!(ctx.uploads, vec![handle]);
        assert_eq!(device.textures[0].width, 2);
        assert_eq!(device.textures[0].height, 3);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let mut loader = ImageTextureLoader::new();
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let err = loader
            .load(
                Path::new("/nonexistent/none.png"),
                TextureDimension::D2,
                &mut device,
                &mut ctx,
            )
            .unwrap_err();
        assert!(matches!(err, BackendError::TextureLoadFailed { .. }));
    }

    #[test]
    fn test_load_cube_strip() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(2, 12, image::Rgba([0, 0, 255, 255]));
        img.save(dir.path().join("sky.png")).unwrap();
        let flat = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]));
        flat.save(dir.path().join("flat.png")).unwrap();

        let mut loader = ImageTextureLoader::with_root(dir.path());
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        loader
            .load(Path::new("sky.png"), TextureDimension::Cube, &mut device, &mut ctx)
            .unwrap();
        assert_eq!(device.textures[0].dimension, TextureDimension::Cube);
        assert_eq!((device.textures[0].width, device.textures[0].height), (2, 2));

        let err = loader
            .load(Path::new("flat.png"), TextureDimension::Cube, &mut device, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, BackendError::TextureLoadFailed { .. }));
    }

    #[test]
    fn test_white_defaults() {
        let white = TextureData::white(TextureDimension::D2);
        assert_eq!(white.data, vec![255; 4]);
        assert_eq!(white.descriptor().width, 1);

        let cube = TextureData::white(TextureDimension::Cube);
        assert_eq!(cube.data.len(), 24);
        assert_eq!(cube.descriptor().dimension, TextureDimension::Cube);
    }
}
