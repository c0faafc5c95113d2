// Window module - host window and frame pacing
//
// Creates the host window with winit, presents frames through pixels
// and translates keyboard/mouse events into the engine's input latch.

use super::framebuffer::FrameBuffer;
use crate::engine::{Engine, UpdateFlags};
use crate::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::input::Buttons;
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Window configuration
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Scale factor (1x-8x)
    pub scale: u32,
    /// Target frame rate in Hz
    pub target_fps: u32,
    /// Whether to enable VSync
    pub vsync: bool,
}

impl WindowConfig {
    /// Create a new window configuration with default values
    pub fn new() -> Self {
        Self {
            scale: 3,
            target_fps: 60,
            vsync: true,
        }
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8);
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set VSync enabled or disabled
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Window width in host pixels
    pub fn window_width(&self) -> u32 {
        SCREEN_WIDTH as u32 * self.scale
    }

    /// Window height in host pixels
    pub fn window_height(&self) -> u32 {
        SCREEN_HEIGHT as u32 * self.scale
    }

    /// Frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.target_fps as u64)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&crate::engine::VideoConfig> for WindowConfig {
    fn from(video: &crate::engine::VideoConfig) -> Self {
        WindowConfig::new()
            .with_scale(video.scale)
            .with_fps(video.fps)
            .with_vsync(video.vsync)
    }
}

/// Per-frame scene presenter
///
/// Runs after the engine frame; fills the frame buffer with whatever the
/// scene produced. Scan-out then applies the latched line offsets.
pub type PresentFn = Box<dyn FnMut(&Engine, &mut FrameBuffer)>;

/// Host window driving one engine
pub struct DisplayWindow {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    config: WindowConfig,
    frame_buffer: FrameBuffer,
    last_frame_time: Instant,
    engine: Engine,
    present: PresentFn,
    buttons: Buttons,
    cursor: (f64, f64),
    touch_down: bool,
}

impl DisplayWindow {
    /// Create a new display window (the window itself is created when the
    /// event loop starts)
    pub fn new(
        config: WindowConfig,
        engine: Engine,
        present: impl FnMut(&Engine, &mut FrameBuffer) + 'static,
    ) -> Self {
        Self {
            window: None,
            pixels: None,
            config,
            frame_buffer: FrameBuffer::new(),
            last_frame_time: Instant::now(),
            engine,
            present: Box::new(present),
            buttons: Buttons::NONE,
            cursor: (0.0, 0.0),
            touch_down: false,
        }
    }

    /// The engine this window drives
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the engine
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Mutable access to the frame buffer
    pub fn frame_buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame_buffer
    }

    /// Map a physical key to an engine button
    fn map_key(key: PhysicalKey) -> Option<Buttons> {
        match key {
            PhysicalKey::Code(KeyCode::KeyX) => Some(Buttons::A),
            PhysicalKey::Code(KeyCode::KeyZ) => Some(Buttons::B),
            PhysicalKey::Code(KeyCode::KeyS) => Some(Buttons::X),
            PhysicalKey::Code(KeyCode::KeyA) => Some(Buttons::Y),
            PhysicalKey::Code(KeyCode::KeyQ) => Some(Buttons::L),
            PhysicalKey::Code(KeyCode::KeyW) => Some(Buttons::R),
            PhysicalKey::Code(KeyCode::Enter) => Some(Buttons::START),
            PhysicalKey::Code(KeyCode::ShiftRight) => Some(Buttons::SELECT),
            PhysicalKey::Code(KeyCode::ArrowUp) => Some(Buttons::UP),
            PhysicalKey::Code(KeyCode::ArrowDown) => Some(Buttons::DOWN),
            PhysicalKey::Code(KeyCode::ArrowLeft) => Some(Buttons::LEFT),
            PhysicalKey::Code(KeyCode::ArrowRight) => Some(Buttons::RIGHT),
            _ => None,
        }
    }

    /// The cursor position in screen coordinates, when inside the screen
    fn touch_position(&self) -> Option<(u8, u8)> {
        if !self.touch_down {
            return None;
        }
        let x = self.cursor.0 / self.config.scale as f64;
        let y = self.cursor.1 / self.config.scale as f64;
        if x < 0.0 || y < 0.0 || x >= SCREEN_WIDTH as f64 || y >= SCREEN_HEIGHT as f64 {
            return None;
        }
        Some((x as u8, y as u8))
    }

    /// Latch host input into the engine
    fn feed_input(&mut self) {
        self.engine.feed_input(self.buttons, self.touch_position());
    }

    /// Run one engine frame and present it
    fn execute_and_render(&mut self) -> Result<(), pixels::Error> {
        self.feed_input();

        if self.engine.run_frame().is_ok() {
            self.engine.wait_for_sync(UpdateFlags::all_updates());
        }

        (self.present)(&self.engine, &mut self.frame_buffer);

        if let Some(pixels) = &mut self.pixels {
            let frame = pixels.frame_mut();
            self.frame_buffer
                .scan_out(self.engine.gpu().line_offsets(), frame);
            pixels.render()?;
        }
        Ok(())
    }

    /// Check if enough time has passed for the next frame
    fn should_render_frame(&mut self) -> bool {
        let elapsed = self.last_frame_time.elapsed();
        if elapsed >= self.config.frame_duration() {
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }
}

impl ApplicationHandler for DisplayWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(format!(
                "trigon - {}x{}",
                self.config.window_width(),
                self.config.window_height()
            ))
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        let window = event_loop
            .create_window(window_attributes)
            .expect("Failed to create window");

        let window = Arc::new(window);
        let window_size = window.inner_size();

        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        let pixels = Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture)
            .expect("Failed to create pixel buffer");

        self.window = Some(window);
        self.pixels = Some(pixels);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.engine.teardown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        ..
                    },
                ..
            } => {
                if let Some(button) = Self::map_key(physical_key) {
                    match state {
                        ElementState::Pressed => self.buttons = self.buttons | button,
                        ElementState::Released => self.buttons = self.buttons & !button,
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.touch_down = state == ElementState::Pressed;
            }
            WindowEvent::RedrawRequested => {
                if self.should_render_frame() {
                    if let Err(err) = self.execute_and_render() {
                        eprintln!("Render error: {}", err);
                        event_loop.exit();
                    }
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Create and run the host window around an engine
pub fn run_display(
    config: WindowConfig,
    engine: Engine,
    present: impl FnMut(&Engine, &mut FrameBuffer) + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;

    if config.vsync {
        event_loop.set_control_flow(ControlFlow::Wait);
    } else {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    let mut display = DisplayWindow::new(config, engine, present);

    println!("Starting display window...");
    println!("  Resolution: {}x{}", SCREEN_WIDTH, SCREEN_HEIGHT);
    println!(
        "  Window size: {}x{}",
        config.window_width(),
        config.window_height()
    );
    println!("  Scale: {}x", config.scale);
    println!("  Target FPS: {}", config.target_fps);
    println!("  VSync: {}", config.vsync);

    event_loop.run_app(&mut display)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_config_defaults() {
        let config = WindowConfig::new();
        assert_eq!(config.scale, 3);
        assert_eq!(config.target_fps, 60);
        assert!(config.vsync);
    }

    #[test]
    fn test_window_config_builder() {
        let config = WindowConfig::new()
            .with_scale(2)
            .with_fps(30)
            .with_vsync(false);

        assert_eq!(config.scale, 2);
        assert_eq!(config.target_fps, 30);
        assert!(!config.vsync);
    }

    #[test]
    fn test_window_dimensions() {
        let config = WindowConfig::new().with_scale(2);
        assert_eq!(config.window_width(), 512);
        assert_eq!(config.window_height(), 384);
    }

    #[test]
    fn test_scale_clamping() {
        let config = WindowConfig::new().with_scale(100);
        assert_eq!(config.scale, 8);

        let config = WindowConfig::new().with_scale(0);
        assert_eq!(config.scale, 1);
    }

    #[test]
    fn test_touch_maps_through_scale() {
        let engine = Engine::new();
        let mut display =
            DisplayWindow::new(WindowConfig::new().with_scale(2), engine, |_, _| {});
        display.cursor = (100.0, 60.0);
        display.touch_down = true;
        assert_eq!(display.touch_position(), Some((50, 30)));

        display.cursor = (600.0, 60.0);
        assert_eq!(display.touch_position(), None);

        display.touch_down = false;
        display.cursor = (100.0, 60.0);
        assert_eq!(display.touch_position(), None);
    }
}
