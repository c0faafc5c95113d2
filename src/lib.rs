// 3D engine library
// Frame scheduling, video memory management and display plumbing for a
// small fixed-function 3D pipeline.

// Public modules
pub mod debug;
pub mod display;
pub mod effects;
pub mod engine;
pub mod gpu;
pub mod input;
pub mod material;
pub mod picking;
pub mod vram;

// Re-export main types for convenience
pub use debug::{LogLevel, Logger};
pub use display::{run_display, DisplayWindow, FrameBuffer, WindowConfig};
pub use effects::{Effects, SpecialEffect};
pub use engine::{Engine, EngineConfig, EngineError, EngineState, UpdateFlags};
pub use gpu::{Gpu, MatrixMode, Perspective, PolyKind, SortMode};
pub use input::{Buttons, InputSnapshot};
pub use material::{rgb15, Material, MaterialSystem, Palette, TextureFormat};
pub use picking::TouchTest;
pub use vram::{Pool, RecordId, VramBanks, VramError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_components() {
        // Test that all components can be instantiated
        let _gpu = Gpu::new();
        let _engine = Engine::new();
        let _effects = Effects::new();
        let _input = InputSnapshot::new();
        let _touch_test = TouchTest::new();
        let _frame_buffer = FrameBuffer::new();
        let _logger = Logger::new(LogLevel::Info);
    }
}
