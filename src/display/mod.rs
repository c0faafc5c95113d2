// Display module - host presentation layer
//
// This module provides:
// - RGB15 frame buffer (256x192 pixels)
// - Window creation with scaling support (1x-8x)
// - Frame rendering using winit + pixels with scan-out line offsets
// - PNG frame capture

pub mod capture;
pub mod framebuffer;
pub mod window;

pub use capture::{save_capture, save_capture_to, CaptureError};
pub use framebuffer::{rgb15_to_rgba, FrameBuffer, SCREEN_SIZE};
pub use window::{run_display, DisplayWindow, PresentFn, WindowConfig};
