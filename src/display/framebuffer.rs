// Frame buffer - RGB15 pixel storage for the host display
//
// One visible frame is 256x192 pixels in the 5-bit-per-channel format
// the hardware uses everywhere else. Scan-out applies the per-line
// horizontal offsets latched by the raster, which is what makes the
// special effects visible on the host.

use crate::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Total number of pixels in the frame buffer
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Frame buffer storing one visible frame as RGB15 pixels
pub struct FrameBuffer {
    pixels: Box<[u16; SCREEN_SIZE]>,
}

impl FrameBuffer {
    /// Create a new frame buffer initialized to black
    pub fn new() -> Self {
        Self {
            pixels: Box::new([0; SCREEN_SIZE]),
        }
    }

    /// Set a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u16) {
        assert!(x < SCREEN_WIDTH, "X coordinate {} out of bounds", x);
        assert!(y < SCREEN_HEIGHT, "Y coordinate {} out of bounds", y);

        self.pixels[y * SCREEN_WIDTH + x] = color & 0x7FFF;
    }

    /// Get a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> u16 {
        assert!(x < SCREEN_WIDTH, "X coordinate {} out of bounds", x);
        assert!(y < SCREEN_HEIGHT, "Y coordinate {} out of bounds", y);

        self.pixels[y * SCREEN_WIDTH + x]
    }

    /// Clear the frame buffer to a single color
    pub fn clear(&mut self, color: u16) {
        self.pixels.fill(color & 0x7FFF);
    }

    /// Raw pixel data
    pub fn as_slice(&self) -> &[u16] {
        self.pixels.as_ref()
    }

    /// Mutable raw pixel data
    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        self.pixels.as_mut()
    }

    /// Convert the frame buffer to RGBA for the host surface
    ///
    /// Each line is shifted by its latched horizontal offset, wrapping
    /// within the screen width.
    ///
    /// # Panics
    /// Panics if the output buffer is too small
    pub fn scan_out(&self, line_offsets: &[i16; SCREEN_HEIGHT], output: &mut [u8]) {
        assert!(
            output.len() >= SCREEN_SIZE * 4,
            "Output buffer too small for RGBA conversion"
        );

        for y in 0..SCREEN_HEIGHT {
            let offset = line_offsets[y] as i32;
            for x in 0..SCREEN_WIDTH {
                let src_x =
                    (x as i32 + offset).rem_euclid(SCREEN_WIDTH as i32) as usize;
                let rgba = rgb15_to_rgba(self.pixels[y * SCREEN_WIDTH + src_x]);
                let out = (y * SCREEN_WIDTH + x) * 4;
                output[out..out + 4].copy_from_slice(&rgba);
            }
        }
    }

    /// Convert without any line displacement
    pub fn to_rgba(&self, output: &mut [u8]) {
        self.scan_out(&[0; SCREEN_HEIGHT], output);
    }

    /// Fill with a horizontal gradient, useful for display bring-up
    pub fn gradient_pattern(&mut self) {
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let level = (x * 32 / SCREEN_WIDTH) as u16;
                self.set_pixel(x, y, level | (level << 5) | (level << 10));
            }
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand one RGB15 pixel to 8-bit RGBA
#[inline]
pub fn rgb15_to_rgba(color: u16) -> [u8; 4] {
    let r = (color & 0x1F) as u8;
    let g = ((color >> 5) & 0x1F) as u8;
    let b = ((color >> 10) & 0x1F) as u8;
    // Replicate the top bits so 31 maps to 255
    [
        (r << 3) | (r >> 2),
        (g << 3) | (g >> 2),
        (b << 3) | (b >> 2),
        0xFF,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::rgb15;

    #[test]
    fn test_framebuffer_creation() {
        let fb = FrameBuffer::new();
        assert_eq!(fb.as_slice().len(), SCREEN_SIZE);
    }

    #[test]
    fn test_set_get_pixel() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(100, 100, rgb15(31, 0, 0));
        assert_eq!(fb.get_pixel(100, 100), rgb15(31, 0, 0));
    }

    #[test]
    fn test_clear() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 0, 0x7FFF);
        fb.clear(rgb15(0, 31, 0));
        assert_eq!(fb.get_pixel(0, 0), rgb15(0, 31, 0));
        assert_eq!(fb.get_pixel(255, 191), rgb15(0, 31, 0));
    }

    #[test]
    fn test_rgb15_expansion_covers_full_range() {
        assert_eq!(rgb15_to_rgba(0), [0, 0, 0, 0xFF]);
        assert_eq!(rgb15_to_rgba(0x7FFF), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_scan_out_applies_line_offsets() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(10, 0, rgb15(31, 31, 31));

        let mut offsets = [0i16; SCREEN_HEIGHT];
        offsets[0] = 10;

        let mut rgba = vec![0u8; SCREEN_SIZE * 4];
        fb.scan_out(&offsets, &mut rgba);

        // The bright pixel scrolled from column 10 to column 0
        assert_eq!(rgba[0], 0xFF);
        assert_eq!(rgba[10 * 4], 0);
    }

    #[test]
    fn test_scan_out_wraps_negative_offsets() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 5, rgb15(31, 0, 0));

        let mut offsets = [0i16; SCREEN_HEIGHT];
        offsets[5] = -1;

        let mut rgba = vec![0u8; SCREEN_SIZE * 4];
        fb.scan_out(&offsets, &mut rgba);

        let out = (5 * SCREEN_WIDTH + 1) * 4;
        assert_eq!(rgba[out], 0xFF);
    }

    #[test]
    #[should_panic]
    fn test_set_pixel_out_of_bounds() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(256, 0, 0);
    }
}
