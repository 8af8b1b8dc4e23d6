//! Decoded RGBA8 pixel data, the input of a texture upload.

/// Tightly packed 8-bit RGBA pixels, first row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes, or `None` when the length does not match.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    /// Decodes any format the `image` crate understands into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self { width, height, pixels: rgba.into_raw() })
    }

    /// 2x2 red/green/blue/white pattern used when an image cannot be loaded.
    pub fn checkerboard() -> Self {
        Self {
            width: 2,
            height: 2,
            pixels: vec![
                255, 0, 0, 255,   0, 255, 0, 255,  // Red, Green
                0, 0, 255, 255,   255, 255, 255, 255,  // Blue, White
            ],
        }
    }

    /// Reverses the row order. Image files store the top row first while GL
    /// samples row 0 at `t = 0`.
    pub fn flip_vertically(&mut self) {
        let row = self.width as usize * 4;
        let height = self.height as usize;
        for y in 0..height / 2 {
            let (top, bottom) = self.pixels.split_at_mut((height - 1 - y) * row);
            top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        u32::BITS - self.width.max(self.height).max(1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_vertically_swaps_rows() {
        let mut buffer = PixelBuffer::from_rgba8(1, 3, vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]).unwrap();
        buffer.flip_vertically();
        assert_eq!(buffer.as_bytes(), [3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn test_rejects_mismatched_length() {
        assert!(PixelBuffer::from_rgba8(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_rgba8(0, 0, vec![]).is_none());
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(PixelBuffer::checkerboard().mip_level_count(), 2);
        let wide = PixelBuffer::from_rgba8(8, 2, vec![0; 64]).unwrap();
        assert_eq!(wide.mip_level_count(), 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(PixelBuffer::decode(b"definitely not a png").is_err());
    }
}
