//! Texture loading and GPU textures

use crate::backend::{
    BackendError, BackendResult, GraphicsBackend, ImageExtent, PixelFormat, TextureHandle,
    TextureTarget,
};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::rc::Rc;

/// CPU-side 8-bit pixel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Image {
    /// Create an image, checking the channel count and data length
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
        channels: u32,
        data: Vec<u8>,
    ) -> BackendResult<Self> {
        if PixelFormat::from_channels(channels).is_none() {
            return Err(BackendError::UnsupportedChannelCount(channels));
        }
        let expected = width as usize * height as usize * depth as usize * channels as usize;
        if data.len() != expected {
            return Err(BackendError::ImageSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            depth,
            channels,
            data,
        })
    }

    /// Load a 2D image from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BackendResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)?;
        let (width, height) = img.dimensions();
        log::debug!(
            "Loaded image '{}' ({}x{}, {:?})",
            path.display(),
            width,
            height,
            img.color()
        );
        Self::from_image(img)
    }

    /// Decode a 2D image from encoded bytes
    pub fn from_bytes(bytes: &[u8]) -> BackendResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(img)
    }

    /// Convert a decoded image, keeping 8-bit layouts as they are.
    ///
    /// Rows are flipped so that row 0 is the bottom row, matching texture
    /// coordinates with v pointing up.
    fn from_image(img: DynamicImage) -> BackendResult<Self> {
        let img = img.flipv();
        let (width, height) = img.dimensions();
        let (channels, data) = match img {
            DynamicImage::ImageLuma8(buffer) => (1, buffer.into_raw()),
            DynamicImage::ImageLumaA8(buffer) => (2, buffer.into_raw()),
            DynamicImage::ImageRgb8(buffer) => (3, buffer.into_raw()),
            DynamicImage::ImageRgba8(buffer) => (4, buffer.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self::new(width, height, 1, channels, data)
    }

    /// Create a checkerboard image with 8x8 pixel squares
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            depth: 1,
            channels: 4,
            data,
        }
    }

    pub fn extent(&self) -> ImageExtent {
        ImageExtent {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

/// GPU texture object
pub struct Texture<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: TextureHandle,
    target: TextureTarget,
    extent: Option<ImageExtent>,
}

impl<B: GraphicsBackend> Texture<B> {
    pub fn new(backend: Rc<B>, target: TextureTarget) -> BackendResult<Self> {
        let handle = backend.create_texture()?;
        log::trace!("Created {:?} texture {}", target, handle.raw());
        Ok(Self {
            backend,
            handle,
            target,
            extent: None,
        })
    }

    /// Bind to the currently active texture unit
    pub fn bind(&self) {
        self.backend.bind_texture(self.target, Some(self.handle));
    }

    pub fn unbind(&self) {
        self.backend.bind_texture(self.target, None);
    }

    /// Upload pixel data, optionally generating the mip chain.
    ///
    /// The image is not retained.
    pub fn set_data(&mut self, image: &Image, mipmaps: bool) -> BackendResult<()> {
        let format = PixelFormat::from_channels(image.channels)
            .ok_or(BackendError::UnsupportedChannelCount(image.channels))?;
        let expected = image.width as usize
            * image.height as usize
            * image.depth as usize
            * image.channels as usize;
        if image.data.len() != expected {
            return Err(BackendError::ImageSizeMismatch {
                expected,
                actual: image.data.len(),
            });
        }
        if self.target == TextureTarget::Texture2d && image.depth != 1 {
            return Err(BackendError::InvalidParameter(format!(
                "2D texture cannot hold an image of depth {}",
                image.depth
            )));
        }

        self.bind();
        self.backend
            .tex_image(self.target, image.extent(), format, &image.data);
        if mipmaps {
            self.backend.generate_mipmap(self.target);
        }
        self.unbind();

        self.extent = Some(image.extent());
        log::debug!(
            "Uploaded {}x{}x{} {:?} image to texture {}",
            image.width,
            image.height,
            image.depth,
            format,
            self.handle.raw()
        );
        Ok(())
    }

    /// Dimensions of the last upload
    pub fn extent(&self) -> Option<ImageExtent> {
        self.extent
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl<B: GraphicsBackend> Drop for Texture<B> {
    fn drop(&mut self) {
        log::trace!("Deleting texture {}", self.handle.raw());
        self.backend.delete_texture(self.handle);
    }
}

impl<B: GraphicsBackend> std::fmt::Debug for Texture<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle.raw())
            .field("target", &self.target)
            .field("extent", &self.extent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, DummyBackend};
    use rstest::rstest;

    #[rstest]
    #[case(1, PixelFormat::R8)]
    #[case(2, PixelFormat::Rg8)]
    #[case(3, PixelFormat::Rgb8)]
    #[case(4, PixelFormat::Rgba8)]
    fn test_channels_select_format(#[case] channels: u32, #[case] format: PixelFormat) {
        let backend = Rc::new(DummyBackend::new());
        let mut texture = Texture::new(backend.clone(), TextureTarget::Texture2d).unwrap();
        let image = Image::new(2, 3, 1, channels, vec![0; 6 * channels as usize]).unwrap();

        texture.set_data(&image, false).unwrap();
        assert_eq!(
            backend.calls().last(),
            Some(&Call::TexImage {
                texture: Some(texture.handle()),
                target: TextureTarget::Texture2d,
                extent: image.extent(),
                format,
                len: image.data.len(),
            })
        );
        assert_eq!(backend.bound_texture(0, TextureTarget::Texture2d), None);
    }

    #[test]
    fn test_unsupported_channel_count() {
        assert!(matches!(
            Image::new(1, 1, 1, 5, vec![0; 5]),
            Err(BackendError::UnsupportedChannelCount(5))
        ));

        let backend = Rc::new(DummyBackend::new());
        let mut texture = Texture::new(backend.clone(), TextureTarget::Texture2d).unwrap();
        let image = Image {
            width: 1,
            height: 1,
            depth: 1,
            channels: 0,
            data: Vec::new(),
        };
        assert!(matches!(
            texture.set_data(&image, false),
            Err(BackendError::UnsupportedChannelCount(0))
        ));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(
            Image::new(4, 4, 1, 3, vec![0; 47]),
            Err(BackendError::ImageSizeMismatch {
                expected: 48,
                actual: 47
            })
        ));
    }

    #[test]
    fn test_volume_texture_with_mipmaps() {
        let backend = Rc::new(DummyBackend::new());
        let mut texture = Texture::new(backend.clone(), TextureTarget::Texture3d).unwrap();
        let image = Image::new(4, 4, 4, 1, vec![255; 64]).unwrap();

        texture.set_data(&image, true).unwrap();
        assert_eq!(texture.extent(), Some(image.extent()));
        assert_eq!(
            backend.calls().last(),
            Some(&Call::GenerateMipmap {
                texture: Some(texture.handle())
            })
        );
    }

    #[test]
    fn test_2d_texture_rejects_depth() {
        let backend = Rc::new(DummyBackend::new());
        let mut texture = Texture::new(backend, TextureTarget::Texture2d).unwrap();
        let image = Image::new(2, 2, 2, 4, vec![0; 32]).unwrap();
        assert!(matches!(
            texture.set_data(&image, false),
            Err(BackendError::InvalidParameter(_))
        ));
        assert_eq!(texture.extent(), None);
    }

    #[test]
    fn test_checkerboard() {
        let image = Image::checkerboard(16, [255, 255, 255, 255], [0, 0, 0, 255]);
        assert_eq!(image.data.len(), 16 * 16 * 4);
        assert_eq!(&image.data[0..4], &[255, 255, 255, 255]);
        // Pixel (8, 0) is in the second square
        assert_eq!(&image.data[32..36], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_decode_keeps_channel_layout() {
        let mut encoded = Vec::new();
        let gray = image::GrayImage::from_fn(2, 2, |x, y| image::Luma([(x + 2 * y) as u8 * 10]));
        DynamicImage::ImageLuma8(gray)
            .write_to(
                &mut std::io::Cursor::new(&mut encoded),
                image::ImageOutputFormat::Png,
            )
            .unwrap();

        let image = Image::from_bytes(&encoded).unwrap();
        assert_eq!(image.channels, 1);
        assert_eq!((image.width, image.height), (2, 2));
        // Flipped: the bottom row comes first
        assert_eq!(image.data, vec![20, 30, 0, 10]);
    }

    #[test]
    fn test_texture_drop_releases_handle() {
        let backend = Rc::new(DummyBackend::new());
        let texture = Texture::new(backend.clone(), TextureTarget::Texture2d).unwrap();
        let raw = texture.handle().raw();
        drop(texture);
        assert!(backend.was_deleted(raw));
    }
}
