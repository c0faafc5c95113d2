// Frame capture - saves the current frame buffer as a PNG file

use super::framebuffer::{rgb15_to_rgba, FrameBuffer};
use crate::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while saving a capture
#[derive(Debug)]
pub enum CaptureError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Io(e) => write!(f, "I/O error: {}", e),
            CaptureError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<io::Error> for CaptureError {
    fn from(e: io::Error) -> Self {
        CaptureError::Io(e)
    }
}

impl From<png::EncodingError> for CaptureError {
    fn from(e: png::EncodingError) -> Self {
        CaptureError::PngEncoding(e)
    }
}

/// Save the frame buffer to `captures/` with a timestamped filename
///
/// Returns the path of the written file.
pub fn save_capture(frame_buffer: &FrameBuffer) -> Result<PathBuf, CaptureError> {
    let captures_dir = PathBuf::from("captures");
    fs::create_dir_all(&captures_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let file_path = captures_dir.join(format!("capture_{}.png", timestamp));

    save_capture_to(frame_buffer, &file_path)?;
    Ok(file_path)
}

/// Save the frame buffer as a PNG at an explicit path
pub fn save_capture_to(frame_buffer: &FrameBuffer, path: &Path) -> Result<(), CaptureError> {
    let rgb_data = rgb15_to_rgb888(frame_buffer.as_slice());
    save_png(path, &rgb_data, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
}

fn rgb15_to_rgb888(pixels: &[u16]) -> Vec<u8> {
    let mut rgb_data = Vec::with_capacity(pixels.len() * 3);
    for &pixel in pixels {
        let rgba = rgb15_to_rgba(pixel);
        rgb_data.extend_from_slice(&rgba[..3]);
    }
    rgb_data
}

fn save_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<(), CaptureError> {
    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb15_to_rgb888_length() {
        let pixels = vec![0u16, 0x7FFF, 0x1F, 0x3E0];
        let rgb = rgb15_to_rgb888(&pixels);
        assert_eq!(rgb.len(), 12);
        assert_eq!(&rgb[3..6], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_save_capture_to_writes_file() {
        let dir = std::env::temp_dir().join("trigon_capture_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");

        let mut fb = FrameBuffer::new();
        fb.gradient_pattern();
        save_capture_to(&fb, &path).unwrap();

        assert!(path.exists());
        fs::remove_file(&path).unwrap();
    }
}
