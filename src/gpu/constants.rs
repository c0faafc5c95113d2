// GPU constants - screen geometry and raster timing
//
// The simulated hardware scans out a 256x192 image and spends the
// remaining scanlines of each frame in the vertical blank period.

/// Screen width in pixels
pub const SCREEN_WIDTH: usize = 256;

/// Screen height in pixels
pub const SCREEN_HEIGHT: usize = 192;

/// Total number of pixels on one screen
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Total scanlines per frame (visible + blanking)
pub const SCANLINES_PER_FRAME: u16 = 263;

/// First scanline of the vertical blank period
pub const VBLANK_START: u16 = 192;

/// Highest raster line counter value before wrapping to 0
pub const VCOUNT_MAX: u16 = 262;

/// Capacity of the vertex RAM (vertices per frame)
pub const VERTEX_RAM_SIZE: u16 = 6144;

/// Capacity of the polygon RAM (polygons per frame)
pub const POLYGON_RAM_SIZE: u16 = 2048;

/// Modelview matrix stack depth
pub const MODELVIEW_STACK_DEPTH: u8 = 32;

/// Projection matrix stack depth (a single save slot, like the hardware)
pub const PROJECTION_STACK_DEPTH: u8 = 1;

/// Number of hardware sprites in the sub-screen OAM
pub const SUB_OAM_SPRITES: usize = 128;
