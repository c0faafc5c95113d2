// Picking module - Touch-test subsystem
//
// A transient rendering mode that answers "which object sits under the
// pointer". The viewport is redirected off-screen, a narrow pick matrix
// is installed around the pointer coordinate, and candidate objects are
// drawn one at a time with a vertex-count mark between them: if the
// count advanced past the mark, the candidate produced geometry inside
// the pick window and the position-test depth identifies it.
//
// Call sequence contract:
// start -> draw -> mark_object -> draw -> mark_object ... -> result -> end
// Violations of the sequence are programmer errors and fail fast.

use crate::gpu::{Gpu, MatrixMode, Perspective, PickWindow, SCREEN_HEIGHT};

/// Side length of the pick window around the pointer, in pixels
const PICK_WINDOW_SIZE: i32 = 3;

/// Touch-test state machine (`Idle -> TestActive -> Idle`)
#[derive(Debug, Default)]
pub struct TouchTest {
    active: bool,
    saved_viewport: u32,
    vertex_mark: u16,
}

impl TouchTest {
    /// Create an idle touch test
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a test is in progress
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a touch test at pointer coordinate `(px, py)`
    ///
    /// Hides the viewport off-screen, saves both matrix stacks and
    /// installs a pick matrix plus the engine's current perspective.
    ///
    /// # Panics
    /// Panics if a test is already active; tests never nest.
    pub fn start(&mut self, gpu: &mut Gpu, px: u8, py: u8, perspective: Perspective) {
        assert!(!self.active, "touch test already active");

        // Hide what the candidates are about to draw
        self.saved_viewport = gpu.viewport_packed();
        gpu.set_viewport_packed(Gpu::pack_viewport(255, 255, 255, 255));

        // Save the current state
        gpu.set_matrix_mode(MatrixMode::Modelview);
        gpu.matrix_push();
        gpu.set_matrix_mode(MatrixMode::Projection);
        gpu.matrix_push();

        // Render only what is below the pointer
        gpu.load_identity();
        gpu.load_pick_window(PickWindow {
            x: px as i32,
            y: SCREEN_HEIGHT as i32 - 1 - py as i32,
            width: PICK_WINDOW_SIZE,
            height: PICK_WINDOW_SIZE,
        });
        gpu.load_perspective(perspective);

        gpu.set_matrix_mode(MatrixMode::Modelview);

        self.active = true;
        self.vertex_mark = gpu.vertex_count();
    }

    /// Record the vertex count after drawing one candidate object
    ///
    /// Blocks until the position test and the geometry pipeline settle.
    ///
    /// # Panics
    /// Panics if no test is active.
    pub fn mark_object(&mut self, gpu: &mut Gpu) {
        assert!(self.active, "no active touch test");

        while gpu.position_test_busy() {
            std::hint::spin_loop();
        }
        gpu.drain();

        self.vertex_mark = gpu.vertex_count();
    }

    /// Check whether geometry was drawn since the last mark
    ///
    /// Blocks like [`TouchTest::mark_object`]. Returns the position-test
    /// w-depth of the hit, or `None` when nothing was drawn.
    ///
    /// # Panics
    /// Panics if no test is active.
    pub fn result(&mut self, gpu: &mut Gpu) -> Option<i32> {
        assert!(self.active, "no active touch test");

        gpu.drain();
        while gpu.position_test_busy() {
            std::hint::spin_loop();
        }

        if gpu.vertex_count() > self.vertex_mark {
            Some(gpu.position_test_result())
        } else {
            None
        }
    }

    /// End the touch test, restoring the viewport and both matrix stacks
    ///
    /// # Panics
    /// Panics if no test is active.
    pub fn end(&mut self, gpu: &mut Gpu) {
        assert!(self.active, "no active touch test");

        self.active = false;

        gpu.set_viewport_packed(self.saved_viewport);

        gpu.set_matrix_mode(MatrixMode::Projection);
        gpu.matrix_pop();
        gpu.set_matrix_mode(MatrixMode::Modelview);
        gpu.matrix_pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::PolyKind;

    fn default_perspective() -> Perspective {
        Perspective {
            fov_y: 70.0,
            aspect: 256.0 / 192.0,
            near: 0.1,
            far: 40.0,
        }
    }

    #[test]
    fn test_result_without_draw_is_no_hit() {
        let mut gpu = Gpu::new();
        let mut test = TouchTest::new();

        test.start(&mut gpu, 128, 96, default_perspective());
        assert_eq!(test.result(&mut gpu), None);
        test.end(&mut gpu);
    }

    #[test]
    fn test_drawn_object_hits_with_depth() {
        let mut gpu = Gpu::new();
        let mut test = TouchTest::new();

        test.start(&mut gpu, 128, 96, default_perspective());

        gpu.begin(PolyKind::Triangles);
        gpu.position_test(0.0, 0.0, 2.5);
        gpu.vertex(-1.0, -1.0, 2.5);
        gpu.vertex(1.0, -1.0, 2.5);
        gpu.vertex(0.0, 1.0, 2.5);
        gpu.end();

        let depth = test.result(&mut gpu);
        assert_eq!(depth, Some((2.5f32 * 4096.0) as i32));
        test.end(&mut gpu);
    }

    #[test]
    fn test_mark_separates_objects() {
        let mut gpu = Gpu::new();
        let mut test = TouchTest::new();

        test.start(&mut gpu, 10, 10, default_perspective());

        gpu.begin(PolyKind::Triangles);
        for _ in 0..3 {
            gpu.vertex(0.0, 0.0, 1.0);
        }
        gpu.end();
        test.mark_object(&mut gpu);

        // No geometry between the mark and the result: no hit
        assert_eq!(test.result(&mut gpu), None);
    }

    #[test]
    fn test_end_restores_viewport_and_stacks() {
        let mut gpu = Gpu::new();
        let viewport = Gpu::pack_viewport(0, 0, 255, 191);
        gpu.set_viewport_packed(viewport);
        gpu.set_matrix_mode(MatrixMode::Projection);
        gpu.load_perspective(default_perspective());

        let mut test = TouchTest::new();
        test.start(&mut gpu, 50, 50, default_perspective());
        assert_ne!(gpu.viewport_packed(), viewport);
        assert!(gpu.pick_window().is_some());

        test.end(&mut gpu);
        assert_eq!(gpu.viewport_packed(), viewport);
        assert_eq!(gpu.projection_depth(), 0);
        assert_eq!(gpu.modelview_depth(), 0);
        assert_eq!(gpu.pick_window(), None);
        assert_eq!(gpu.perspective(), Some(default_perspective()));
    }

    #[test]
    #[should_panic(expected = "touch test already active")]
    fn test_nested_start_panics() {
        let mut gpu = Gpu::new();
        let mut test = TouchTest::new();
        test.start(&mut gpu, 0, 0, default_perspective());
        test.start(&mut gpu, 0, 0, default_perspective());
    }

    #[test]
    #[should_panic(expected = "no active touch test")]
    fn test_end_without_start_panics() {
        let mut gpu = Gpu::new();
        let mut test = TouchTest::new();
        test.end(&mut gpu);
    }
}
