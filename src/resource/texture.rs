/// Texture — an already-decoded pixel buffer.
///
/// Providers hand over decoded pixels plus a width/height/format triple;
/// the core never parses image file formats. The renderer uploads the
/// pixels to the GPU on first use and re-uploads when the version changes.

use slotmap::new_key_type;
use crate::error::Result;
use crate::engine_bail;

new_key_type! {
    /// Stable key for a Texture stored in the SceneGraph's arena.
    pub struct TextureKey;
}

/// Decoded pixel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Texture creation descriptor.
pub struct TextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

/// Texture resource: decoded pixels + descriptor triple.
pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
    version: u64,
}

impl Texture {
    /// Create a texture from a descriptor, validating the pixel buffer size.
    pub fn from_desc(desc: TextureDesc) -> Result<Self> {
        let expected = desc.width as usize
            * desc.height as usize
            * desc.format.bytes_per_pixel();
        if desc.pixels.len() != expected {
            engine_bail!("aurora3d::Texture",
                "Texture '{}': pixel buffer is {} bytes, expected {} ({}x{} {:?})",
                desc.name, desc.pixels.len(), expected,
                desc.width, desc.height, desc.format);
        }
        Ok(Self {
            name: desc.name,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            pixels: desc.pixels,
            version: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Upload version; the renderer re-uploads when this changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the pixel contents in place (same dimensions and format).
    /// Bumps the version.
    pub fn update_pixels(&mut self, pixels: Vec<u8>) -> Result<()> {
        if pixels.len() != self.pixels.len() {
            engine_bail!("aurora3d::Texture",
                "Texture '{}': update is {} bytes, expected {}",
                self.name, pixels.len(), self.pixels.len());
        }
        self.pixels = pixels;
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
