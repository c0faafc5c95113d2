// GPU module - Simulated fixed-function 3D pipeline
//
// Models the hardware the engine programs: a packed viewport register,
// matrix stacks, a geometry port with vertex/polygon RAM counters, a
// position-test unit, display control (LCD swap, capture, sub-screen OAM)
// and the raster position that generates per-scanline events.

pub mod constants;

pub use constants::*;

/// Matrix unit addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixMode {
    /// Projection matrix
    Projection,
    /// Modelview matrix
    Modelview,
    /// Texture matrix
    Texture,
}

/// Primitive kind accepted by the geometry port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyKind {
    /// Separate triangles (3 vertices each)
    Triangles,
    /// Separate quads (4 vertices each)
    Quads,
    /// Triangle strip
    TriangleStrip,
    /// Quad strip
    QuadStrip,
}

/// Translucent polygon sort mode used by the flush command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Hardware sorts translucent polygons automatically
    Auto,
    /// Translucent polygons keep submission order
    Manual,
}

/// Routing of the two capture-capable memory banks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankMode {
    /// Mapped for CPU access only (capture destination)
    Lcd,
    /// Mapped as sub-screen background memory
    SubBackground,
    /// Mapped as sub-screen sprite memory
    SubSprite,
    /// Granted to the texture allocator
    Texture,
}

/// Display capture unit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Destination bank: `false` = bank C, `true` = bank D
    pub bank_d: bool,
    /// Capture enabled for the current frame
    pub enabled: bool,
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Width / height of the viewport
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

/// Pick-matrix window installed around a pointer coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickWindow {
    /// Window center X in viewport coordinates
    pub x: i32,
    /// Window center Y in viewport coordinates (bottom-up)
    pub y: i32,
    /// Window width in pixels
    pub width: i32,
    /// Window height in pixels
    pub height: i32,
}

/// One hardware sprite entry in the sub-screen OAM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteEntry {
    /// Attribute 0 (shape, mode, Y coordinate)
    pub attr0: u16,
    /// Attribute 1 (size, X coordinate)
    pub attr1: u16,
    /// Attribute 2 (alpha, bitmap base)
    pub attr2: u16,
}

impl SpriteEntry {
    /// Attribute 0 value that disables a sprite
    pub const DISABLED: u16 = 0x0200;
}

/// Simulated fixed-function GPU
///
/// Register state mutated by the engine plus the raster position that
/// produces horizontal/vertical blank events. User draw callbacks receive
/// `&mut Gpu` and submit geometry through [`Gpu::begin`], [`Gpu::vertex`]
/// and [`Gpu::end`].
pub struct Gpu {
    // Display control
    viewport: u32,
    swap_lcds: bool,
    main_layers_enabled: bool,
    power_3d: bool,
    bank_c: BankMode,
    bank_d: BankMode,
    capture: CaptureConfig,
    sub_oam: [SpriteEntry; SUB_OAM_SPRITES],

    // Matrix unit
    matrix_mode: MatrixMode,
    projection_depth: u8,
    modelview_depth: u8,
    perspective: Option<Perspective>,
    pick_window: Option<PickWindow>,
    saved_perspective: Option<Perspective>,

    // Geometry port
    poly_format: u32,
    antialias: bool,
    clear_color: u16,
    clear_alpha: u8,
    clear_depth: u16,
    alpha_test: u8,
    vertex_count: u16,
    polygon_count: u16,
    current_primitive: Option<PolyKind>,
    primitive_vertices: u16,
    geometry_busy: bool,
    flushed: Option<SortMode>,

    // Position test unit
    pos_test_busy: bool,
    pos_test_w: i32,

    // Lighting / material registers
    lights_enabled: [bool; 4],
    outline_colors: [u16; 8],
    default_material: [u16; 4],

    // Raster
    vcount: u16,
    bg0_hofs: i16,
    line_offsets: [i16; SCREEN_HEIGHT],
}

impl Gpu {
    /// Create a powered-down GPU with all registers cleared
    pub fn new() -> Self {
        Self {
            viewport: 0,
            swap_lcds: false,
            main_layers_enabled: false,
            power_3d: false,
            bank_c: BankMode::Lcd,
            bank_d: BankMode::Lcd,
            capture: CaptureConfig {
                bank_d: false,
                enabled: false,
            },
            sub_oam: [SpriteEntry::default(); SUB_OAM_SPRITES],
            matrix_mode: MatrixMode::Modelview,
            projection_depth: 0,
            modelview_depth: 0,
            perspective: None,
            pick_window: None,
            saved_perspective: None,
            poly_format: 0,
            antialias: false,
            clear_color: 0,
            clear_alpha: 0,
            clear_depth: 0,
            alpha_test: 0,
            vertex_count: 0,
            polygon_count: 0,
            current_primitive: None,
            primitive_vertices: 0,
            geometry_busy: false,
            flushed: None,
            pos_test_busy: false,
            pos_test_w: 0,
            lights_enabled: [false; 4],
            outline_colors: [0; 8],
            default_material: [0; 4],
            vcount: 0,
            bg0_hofs: 0,
            line_offsets: [0; SCREEN_HEIGHT],
        }
    }

    // ------------------------------------------------------------------
    // Power and display control
    // ------------------------------------------------------------------

    /// Power the 3D core on or off
    pub fn set_power(&mut self, on: bool) {
        self.power_3d = on;
    }

    /// Whether the 3D core is powered
    pub fn is_powered(&self) -> bool {
        self.power_3d
    }

    /// Enable or disable the main-screen layers the engine owns
    pub fn enable_main_layers(&mut self, enabled: bool) {
        self.main_layers_enabled = enabled;
    }

    /// Whether the main-screen layers are enabled
    pub fn main_layers_enabled(&self) -> bool {
        self.main_layers_enabled
    }

    /// Select which physical display shows the main engine output
    pub fn set_swap_lcds(&mut self, swap: bool) {
        self.swap_lcds = swap;
    }

    /// Current LCD swap flag
    pub fn swap_lcds(&self) -> bool {
        self.swap_lcds
    }

    /// Route capture bank C
    pub fn set_bank_c(&mut self, mode: BankMode) {
        self.bank_c = mode;
    }

    /// Route capture bank D
    pub fn set_bank_d(&mut self, mode: BankMode) {
        self.bank_d = mode;
    }

    /// Current routing of bank C
    pub fn bank_c(&self) -> BankMode {
        self.bank_c
    }

    /// Current routing of bank D
    pub fn bank_d(&self) -> BankMode {
        self.bank_d
    }

    /// Program the display capture unit
    pub fn set_capture(&mut self, config: CaptureConfig) {
        self.capture = config;
    }

    /// Current display capture configuration
    pub fn capture(&self) -> CaptureConfig {
        self.capture
    }

    /// Copy a sprite table into the sub-screen OAM
    ///
    /// # Panics
    /// Panics if `sprites` is not exactly [`SUB_OAM_SPRITES`] entries long.
    pub fn write_sub_oam(&mut self, sprites: &[SpriteEntry]) {
        assert_eq!(sprites.len(), SUB_OAM_SPRITES, "OAM table size mismatch");
        self.sub_oam.copy_from_slice(sprites);
    }

    /// Read back the sub-screen OAM
    pub fn sub_oam(&self) -> &[SpriteEntry; SUB_OAM_SPRITES] {
        &self.sub_oam
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Write the packed viewport register (`x1 | y1<<8 | x2<<16 | y2<<24`)
    pub fn set_viewport_packed(&mut self, packed: u32) {
        self.viewport = packed;
    }

    /// Read the packed viewport register
    pub fn viewport_packed(&self) -> u32 {
        self.viewport
    }

    /// Pack viewport corner coordinates into the register format
    pub fn pack_viewport(x1: u8, y1: u8, x2: u8, y2: u8) -> u32 {
        (x1 as u32) | ((y1 as u32) << 8) | ((x2 as u32) << 16) | ((y2 as u32) << 24)
    }

    /// Unpack the viewport register into `(x1, y1, x2, y2)`
    pub fn unpack_viewport(packed: u32) -> (u8, u8, u8, u8) {
        (
            (packed & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 24) & 0xFF) as u8,
        )
    }

    // ------------------------------------------------------------------
    // Matrix unit
    // ------------------------------------------------------------------

    /// Select the matrix the following commands address
    pub fn set_matrix_mode(&mut self, mode: MatrixMode) {
        self.matrix_mode = mode;
    }

    /// Currently addressed matrix
    pub fn matrix_mode(&self) -> MatrixMode {
        self.matrix_mode
    }

    /// Load the identity matrix into the addressed matrix
    ///
    /// In projection mode this also clears any loaded perspective or pick
    /// window, since the projection is being thrown away.
    pub fn load_identity(&mut self) {
        if self.matrix_mode == MatrixMode::Projection {
            self.perspective = None;
            self.pick_window = None;
        }
    }

    /// Push the addressed matrix onto its stack
    ///
    /// Saturates at the hardware stack depth. The projection stack has a
    /// single slot, so a push snapshots the current perspective state.
    pub fn matrix_push(&mut self) {
        match self.matrix_mode {
            MatrixMode::Projection => {
                if self.projection_depth < PROJECTION_STACK_DEPTH {
                    self.projection_depth += 1;
                    self.saved_perspective = self.perspective;
                }
            }
            MatrixMode::Modelview => {
                if self.modelview_depth < MODELVIEW_STACK_DEPTH {
                    self.modelview_depth += 1;
                }
            }
            MatrixMode::Texture => {}
        }
    }

    /// Pop the addressed matrix from its stack
    pub fn matrix_pop(&mut self) {
        match self.matrix_mode {
            MatrixMode::Projection => {
                if self.projection_depth > 0 {
                    self.projection_depth -= 1;
                    self.perspective = self.saved_perspective.take();
                    self.pick_window = None;
                }
            }
            MatrixMode::Modelview => {
                self.modelview_depth = self.modelview_depth.saturating_sub(1);
            }
            MatrixMode::Texture => {}
        }
    }

    /// Current projection stack depth
    pub fn projection_depth(&self) -> u8 {
        self.projection_depth
    }

    /// Current modelview stack depth
    pub fn modelview_depth(&self) -> u8 {
        self.modelview_depth
    }

    /// Reset both matrix stacks to depth zero
    pub fn reset_matrix_stacks(&mut self) {
        self.projection_depth = 0;
        self.modelview_depth = 0;
        self.saved_perspective = None;
    }

    /// Multiply a perspective projection into the projection matrix
    pub fn load_perspective(&mut self, perspective: Perspective) {
        self.perspective = Some(perspective);
    }

    /// Currently loaded perspective, if any
    pub fn perspective(&self) -> Option<Perspective> {
        self.perspective
    }

    /// Install a pick window restricting rendering around one coordinate
    pub fn load_pick_window(&mut self, window: PickWindow) {
        self.pick_window = Some(window);
    }

    /// Currently installed pick window, if any
    pub fn pick_window(&self) -> Option<PickWindow> {
        self.pick_window
    }

    // ------------------------------------------------------------------
    // Geometry port
    // ------------------------------------------------------------------

    /// Write the polygon format register
    pub fn set_poly_format(&mut self, format: u32) {
        self.poly_format = format;
    }

    /// Read the polygon format register
    pub fn poly_format(&self) -> u32 {
        self.poly_format
    }

    /// Enable or disable edge antialiasing in the render control register
    pub fn set_antialias(&mut self, enabled: bool) {
        self.antialias = enabled;
    }

    /// Whether edge antialiasing is enabled
    pub fn antialias_enabled(&self) -> bool {
        self.antialias
    }

    /// Program the rear-plane clear color and alpha
    pub fn set_clear_color(&mut self, color: u16, alpha: u8) {
        self.clear_color = color;
        self.clear_alpha = alpha;
    }

    /// Current rear-plane clear color
    pub fn clear_color(&self) -> u16 {
        self.clear_color
    }

    /// Program the clear depth register
    pub fn set_clear_depth(&mut self, depth: u16) {
        self.clear_depth = depth;
    }

    /// Program the alpha test threshold
    pub fn set_alpha_test(&mut self, threshold: u8) {
        self.alpha_test = threshold;
    }

    /// Begin a primitive
    pub fn begin(&mut self, kind: PolyKind) {
        self.current_primitive = Some(kind);
        self.primitive_vertices = 0;
        self.geometry_busy = true;
    }

    /// Submit one vertex of the current primitive
    ///
    /// Vertex coordinates are ignored by the simulation beyond counting;
    /// the vertex RAM usage counter saturates at its hardware capacity.
    pub fn vertex(&mut self, _x: f32, _y: f32, _z: f32) {
        if self.vertex_count < VERTEX_RAM_SIZE {
            self.vertex_count += 1;
        }
        self.primitive_vertices += 1;
        self.geometry_busy = true;

        let completes = match self.current_primitive {
            Some(PolyKind::Triangles) => self.primitive_vertices % 3 == 0,
            Some(PolyKind::Quads) => self.primitive_vertices % 4 == 0,
            Some(PolyKind::TriangleStrip) => self.primitive_vertices >= 3,
            Some(PolyKind::QuadStrip) => {
                self.primitive_vertices >= 4 && self.primitive_vertices % 2 == 0
            }
            None => false,
        };
        if completes && self.polygon_count < POLYGON_RAM_SIZE {
            self.polygon_count += 1;
        }
    }

    /// End the current primitive
    pub fn end(&mut self) {
        self.current_primitive = None;
        self.primitive_vertices = 0;
    }

    /// Run a position test against the current matrices
    ///
    /// Latches the transformed w-depth of the tested point. Depth is kept
    /// in the hardware's 20.12 fixed-point format.
    pub fn position_test(&mut self, _x: f32, _y: f32, z: f32) {
        self.pos_test_busy = true;
        self.pos_test_w = (z * 4096.0) as i32;
        self.pos_test_busy = false;
    }

    /// Whether the position test unit is busy
    pub fn position_test_busy(&self) -> bool {
        self.pos_test_busy
    }

    /// Latched w-depth result of the last position test
    pub fn position_test_result(&self) -> i32 {
        self.pos_test_w
    }

    /// Block until the geometry engine is idle
    ///
    /// Models the hardware-status busy-poll: no timeout, no cancellation.
    /// The simulation completes all pending work synchronously.
    pub fn drain(&mut self) {
        while self.geometry_busy {
            self.geometry_busy = false;
        }
    }

    /// Vertex RAM usage for the current frame
    pub fn vertex_count(&self) -> u16 {
        self.vertex_count
    }

    /// Polygon RAM usage for the current frame
    pub fn polygon_count(&self) -> u16 {
        self.polygon_count
    }

    /// Issue the flush command, swapping geometry buffers at next vblank
    pub fn flush(&mut self, sort: SortMode) {
        self.flushed = Some(sort);
        self.geometry_busy = true;
    }

    /// Sort mode of the pending flush, if one was issued
    pub fn pending_flush(&self) -> Option<SortMode> {
        self.flushed
    }

    // ------------------------------------------------------------------
    // Lighting / material registers
    // ------------------------------------------------------------------

    /// Enable or disable one of the four hardware lights
    pub fn set_light(&mut self, index: usize, on: bool) {
        if index < 4 {
            self.lights_enabled[index] = on;
        }
    }

    /// Whether a hardware light is enabled
    pub fn light_enabled(&self, index: usize) -> bool {
        index < 4 && self.lights_enabled[index]
    }

    /// Program one outlining color slot
    pub fn set_outline_color(&mut self, index: usize, color: u16) {
        if index < 8 {
            self.outline_colors[index] = color;
        }
    }

    /// Program the default material properties
    /// (ambient, diffuse, specular, emission)
    pub fn set_default_material(&mut self, props: [u16; 4]) {
        self.default_material = props;
    }

    /// Currently programmed default material properties
    pub fn default_material(&self) -> [u16; 4] {
        self.default_material
    }

    // ------------------------------------------------------------------
    // Raster position
    // ------------------------------------------------------------------

    /// Current raster line
    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    /// Write the per-scanline horizontal offset register
    pub fn set_bg0_hofs(&mut self, offset: i16) {
        self.bg0_hofs = offset;
    }

    /// Current horizontal offset register value
    pub fn bg0_hofs(&self) -> i16 {
        self.bg0_hofs
    }

    /// Advance the raster by one scanline
    ///
    /// Latches the horizontal offset register for the line being scanned
    /// out, retires any pending flush at the vblank boundary, and resets
    /// the geometry RAM counters for the next frame. Returns `true` when
    /// this step entered the vertical blank period.
    pub fn step_scanline(&mut self) -> bool {
        if (self.vcount as usize) < SCREEN_HEIGHT {
            self.line_offsets[self.vcount as usize] = self.bg0_hofs;
        }

        self.vcount += 1;
        if self.vcount > VCOUNT_MAX {
            self.vcount = 0;
        }

        if self.vcount == VBLANK_START {
            if self.flushed.take().is_some() {
                self.vertex_count = 0;
                self.polygon_count = 0;
            }
            true
        } else {
            false
        }
    }

    /// Per-line horizontal offsets latched during the last scan-out
    pub fn line_offsets(&self) -> &[i16; SCREEN_HEIGHT] {
        &self.line_offsets
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_packing_round_trip() {
        let packed = Gpu::pack_viewport(0, 0, 255, 191);
        assert_eq!(Gpu::unpack_viewport(packed), (0, 0, 255, 191));
    }

    #[test]
    fn test_vertex_and_polygon_counting() {
        let mut gpu = Gpu::new();
        gpu.begin(PolyKind::Triangles);
        for _ in 0..6 {
            gpu.vertex(0.0, 0.0, 1.0);
        }
        gpu.end();
        assert_eq!(gpu.vertex_count(), 6);
        assert_eq!(gpu.polygon_count(), 2);
    }

    #[test]
    fn test_quad_strip_counting() {
        let mut gpu = Gpu::new();
        gpu.begin(PolyKind::QuadStrip);
        for _ in 0..6 {
            gpu.vertex(0.0, 0.0, 1.0);
        }
        gpu.end();
        // 4 vertices form the first quad, each extra pair forms another
        assert_eq!(gpu.polygon_count(), 2);
    }

    #[test]
    fn test_scanline_stepping_wraps_and_reports_vblank() {
        let mut gpu = Gpu::new();
        let mut vblanks = 0;
        for _ in 0..(SCANLINES_PER_FRAME * 2) {
            if gpu.step_scanline() {
                vblanks += 1;
            }
        }
        assert_eq!(vblanks, 2);
        assert_eq!(gpu.vcount(), 0);
    }

    #[test]
    fn test_flush_retires_at_vblank() {
        let mut gpu = Gpu::new();
        gpu.begin(PolyKind::Triangles);
        for _ in 0..3 {
            gpu.vertex(0.0, 0.0, 1.0);
        }
        gpu.end();
        gpu.flush(SortMode::Manual);

        while !gpu.step_scanline() {}
        assert_eq!(gpu.pending_flush(), None);
        assert_eq!(gpu.vertex_count(), 0);
        assert_eq!(gpu.polygon_count(), 0);
    }

    #[test]
    fn test_projection_push_pop_restores_perspective() {
        let mut gpu = Gpu::new();
        let persp = Perspective {
            fov_y: 70.0,
            aspect: 256.0 / 192.0,
            near: 0.1,
            far: 40.0,
        };
        gpu.set_matrix_mode(MatrixMode::Projection);
        gpu.load_perspective(persp);
        gpu.matrix_push();
        gpu.load_identity();
        gpu.load_pick_window(PickWindow {
            x: 10,
            y: 20,
            width: 3,
            height: 3,
        });
        gpu.matrix_pop();
        assert_eq!(gpu.perspective(), Some(persp));
        assert_eq!(gpu.pick_window(), None);
        assert_eq!(gpu.projection_depth(), 0);
    }

    #[test]
    fn test_hofs_latched_per_visible_line() {
        let mut gpu = Gpu::new();
        gpu.set_bg0_hofs(5);
        gpu.step_scanline();
        gpu.set_bg0_hofs(-3);
        gpu.step_scanline();
        assert_eq!(gpu.line_offsets()[0], 5);
        assert_eq!(gpu.line_offsets()[1], -3);
    }
}
