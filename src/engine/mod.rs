// Engine module - Frame scheduler and lifecycle state machine
//
// Owns every subsystem (GPU, video memory, materials, input, effects,
// picking) and drives one frame of rendering at a time: snapshot input,
// program viewport/projection, invoke the registered draw callback,
// flush. Dual-screen mode renders to the two physical displays on
// alternating ticks using the display-capture unit.
//
// All process-wide engine state lives in this one context object; no
// other component mutates it ambiently.

mod config;
mod error;


pub use config::{EffectsConfig, EngineConfig, ProjectionConfig, VideoConfig, VramConfig};
pub use error::EngineError;

use crate::debug::{LogLevel, Logger};
use crate::effects::{Effects, SpecialEffect};
use crate::gpu::{
    BankMode, CaptureConfig, Gpu, MatrixMode, Perspective, SortMode, SpriteEntry,
    SCANLINES_PER_FRAME, SCREEN_HEIGHT, SCREEN_WIDTH, SUB_OAM_SPRITES, VBLANK_START, VCOUNT_MAX,
};
use crate::input::{Buttons, InputSnapshot};
use crate::material::{rgb15, MaterialProps, MaterialSystem};
use crate::picking::TouchTest;
use crate::vram::VramBanks;

/// Default polygon format: alpha 31, all lights, back-face culling
const DEFAULT_POLY_FORMAT: u32 = 0xF | (2 << 6) | (31 << 16);

/// A per-frame draw callback; receives the shared render target
pub type DrawCallback = Box<dyn FnMut(&mut Gpu)>;

/// A collaborator update hook run by `wait_for_sync`
pub type UpdateHook = Box<dyn FnMut()>;

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Pipeline down, no subsystems live
    #[default]
    Uninitialized,
    /// One 3D scene rendered to one display
    SingleScreen,
    /// Two independent scenes composited to both displays
    DualScreen,
}

/// Flags selecting the collaborator updates `wait_for_sync` runs
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateFlags {
    /// Run the registered GUI hook
    pub update_gui: bool,
    /// Run the registered animation hook
    pub update_animations: bool,
    /// Run the registered physics hook
    pub update_physics: bool,
    /// Do not block when the previous frame already overran
    pub skip_if_late: bool,
}

impl UpdateFlags {
    /// No hooks, always block
    pub fn none() -> Self {
        Self::default()
    }

    /// Run every registered hook, always block
    pub fn all_updates() -> Self {
        Self {
            update_gui: true,
            update_animations: true,
            update_physics: true,
            skip_if_late: false,
        }
    }
}

/// The engine context: lifecycle, per-frame scheduling and subsystems
pub struct Engine {
    state: EngineState,
    config: EngineConfig,
    gpu: Gpu,
    materials: Option<MaterialSystem>,
    input: InputSnapshot,
    effects: Effects,
    picking: TouchTest,
    logger: Logger,

    // Projection / viewport state reprogrammed every frame
    viewport: u32,
    screen_ratio: f32,
    fov: f32,
    znear: f32,
    zfar: f32,

    // Display-swap state
    main_on_top: bool,
    /// Render target selected for the current dual tick; alternates at
    /// every vertical blank. `true` = the main (top-callback) target.
    active_target: bool,

    // Dual-mode auxiliary resources
    dual_sprites: Option<Box<[SpriteEntry; SUB_OAM_SPRITES]>>,

    // CPU-load estimate
    scanline_counter: u32,
    cpu_percent: u32,

    // Registered callbacks
    draw: Option<DrawCallback>,
    draw_top: Option<DrawCallback>,
    draw_bottom: Option<DrawCallback>,
    gui_hook: Option<UpdateHook>,
    animation_hook: Option<UpdateHook>,
    physics_hook: Option<UpdateHook>,
}

impl Engine {
    /// Create an uninitialized engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an uninitialized engine with an explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        let mut effects = Effects::new();
        effects.config_noise(config.effects.noise_mask);
        effects.config_sine(config.effects.sine_mult, config.effects.sine_shift);

        Self {
            state: EngineState::Uninitialized,
            fov: config.projection.fov,
            znear: config.projection.znear,
            zfar: config.projection.zfar,
            config,
            gpu: Gpu::new(),
            materials: None,
            input: InputSnapshot::new(),
            effects,
            picking: TouchTest::new(),
            logger: Logger::new(LogLevel::Info),
            viewport: 0,
            screen_ratio: SCREEN_WIDTH as f32 / SCREEN_HEIGHT as f32,
            main_on_top: true,
            active_target: false,
            dual_sprites: None,
            scanline_counter: 0,
            cpu_percent: 0,
            draw: None,
            draw_top: None,
            draw_bottom: None,
            gui_hook: None,
            animation_hook: None,
            physics_hook: None,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Initialize for single-screen rendering
    ///
    /// An already-initialized engine is torn down first. If any
    /// subordinate reset fails, everything is rolled back and the engine
    /// stays `Uninitialized`.
    pub fn init_single(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            self.teardown();
        }

        let banks = self.config.vram.texture_banks;
        self.materials = Some(MaterialSystem::new(banks).map_err(|e| {
            self.end_subsystems();
            EngineError::from(e)
        })?);

        self.input.snapshot();
        self.init_pipeline();

        self.state = EngineState::SingleScreen;
        self.logger.info("engine initialized in single-screen mode");
        Ok(())
    }

    /// Initialize for dual-screen rendering
    ///
    /// Claims capture banks C and D and the sub-screen sprite table as
    /// auxiliary resources; fails with `OutOfMemory` (leaving the engine
    /// `Uninitialized`) if the configured texture selection already wants
    /// those banks.
    pub fn init_dual(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            self.teardown();
        }

        let banks = self.config.vram.dual_texture_banks;
        if banks.intersects(VramBanks::C | VramBanks::D) {
            self.logger
                .error("capture banks C/D are granted to the texture pool");
            return Err(EngineError::OutOfMemory(
                "dual mode needs banks C and D for display capture".into(),
            ));
        }

        let mut sprites = Box::new([SpriteEntry::default(); SUB_OAM_SPRITES]);
        for sprite in sprites.iter_mut() {
            sprite.attr0 = SpriteEntry::DISABLED;
        }
        // 4x3 grid of 64x64 bitmap sprites covering the sub screen
        let mut index = 0;
        for y in 0..3u16 {
            for x in 0..4u16 {
                sprites[index] = SpriteEntry {
                    attr0: 0x4000 | (64 * y),        // bitmap mode, square
                    attr1: 0xC000 | (64 * x),        // 64x64
                    attr2: (1 << 12) | (8 * 32 * y) | (8 * x),
                };
                index += 1;
            }
        }

        self.materials = match MaterialSystem::new(banks) {
            Ok(system) => Some(system),
            Err(e) => {
                // Roll back the auxiliary claim before reporting
                self.end_subsystems();
                return Err(e.into());
            }
        };
        self.dual_sprites = Some(sprites);

        self.input.snapshot();
        self.init_pipeline();

        self.gpu.set_bank_c(BankMode::SubBackground);
        self.gpu.set_bank_d(BankMode::SubSprite);

        self.state = EngineState::DualScreen;
        self.logger.info("engine initialized in dual-screen mode");
        Ok(())
    }

    /// Tear the engine down to `Uninitialized`
    ///
    /// Disables the display layers the engine owns, releases dual-mode
    /// auxiliary buffers and resets every subordinate subsystem.
    /// Idempotent: a second call is a no-op.
    pub fn teardown(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }

        self.gpu.enable_main_layers(false);

        if self.state == EngineState::DualScreen {
            self.gpu.set_bank_c(BankMode::Lcd);
            self.gpu.set_bank_d(BankMode::Lcd);
            self.dual_sprites = None;
        }

        self.end_subsystems();

        self.gpu.set_power(false);
        self.state = EngineState::Uninitialized;
        self.logger.info("engine disabled");
    }

    /// Drop every subordinate subsystem and quiesce the effect state
    fn end_subsystems(&mut self) {
        self.materials = None;
        self.dual_sprites = None;
        self.effects.set_effect(SpecialEffect::None);
        self.gpu.set_bg0_hofs(0);
    }

    /// Program the pipeline defaults shared by both init paths
    fn init_pipeline(&mut self) {
        self.gpu.set_power(true);
        self.gpu.drain();
        self.gpu.reset_matrix_stacks();

        self.main_on_top = true;
        self.gpu.set_swap_lcds(true);

        self.gpu.set_clear_color(rgb15(0, 0, 0), 31);
        self.gpu.set_clear_depth(0x7FFF);
        self.gpu.set_alpha_test(0);
        self.gpu.set_antialias(true);

        self.gpu.set_matrix_mode(MatrixMode::Texture);
        self.gpu.load_identity();
        self.gpu.set_matrix_mode(MatrixMode::Projection);
        self.gpu.load_identity();

        let props = MaterialProps::default();
        self.gpu
            .set_default_material([props.ambient, props.diffuse, props.specular, props.emission]);

        for i in 0..4 {
            self.gpu.set_light(i, false);
        }
        for i in 0..8 {
            self.gpu.set_outline_color(i, 0);
        }
        self.gpu.set_poly_format(0);

        self.znear = self.config.projection.znear;
        self.zfar = self.config.projection.zfar;
        self.fov = self.config.projection.fov;
        self.program_viewport(0, 0, (SCREEN_WIDTH - 1) as u8, (SCREEN_HEIGHT - 1) as u8);

        self.gpu.set_matrix_mode(MatrixMode::Modelview);
        self.gpu.load_identity();

        self.gpu.enable_main_layers(true);
    }

    // ------------------------------------------------------------------
    // Viewport / projection surface
    // ------------------------------------------------------------------

    /// Set the viewport and reprogram the projection for its aspect ratio
    ///
    /// Valid only while initialized.
    pub fn set_viewport(&mut self, x1: u8, y1: u8, x2: u8, y2: u8) -> Result<(), EngineError> {
        if self.state == EngineState::Uninitialized {
            return Err(EngineError::Uninitialized);
        }
        if x2 <= x1 || y2 <= y1 {
            return Err(EngineError::Config(format!(
                "degenerate viewport ({},{})-({},{})",
                x1, y1, x2, y2
            )));
        }
        self.program_viewport(x1, y1, x2, y2);
        Ok(())
    }

    fn program_viewport(&mut self, x1: u8, y1: u8, x2: u8, y2: u8) {
        self.screen_ratio =
            (x2 as f32 - x1 as f32 + 1.0) / (y2 as f32 - y1 as f32 + 1.0);
        self.viewport = Gpu::pack_viewport(x1, y1, x2, y2);
        self.gpu.set_viewport_packed(self.viewport);

        self.gpu.set_matrix_mode(MatrixMode::Projection);
        self.gpu.load_identity();
        self.gpu.load_perspective(self.perspective());
        self.gpu.set_matrix_mode(MatrixMode::Modelview);
    }

    /// Set the near and far clipping planes
    ///
    /// Fails when `near >= far`.
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<(), EngineError> {
        if near >= far {
            return Err(EngineError::Config(format!(
                "near plane {} must be smaller than far plane {}",
                near, far
            )));
        }
        self.znear = near;
        self.zfar = far;
        Ok(())
    }

    /// Set the vertical field of view in degrees
    pub fn set_field_of_view(&mut self, degrees: f32) {
        self.fov = degrees;
    }

    /// The perspective currently programmed each frame
    pub fn perspective(&self) -> Perspective {
        Perspective {
            fov_y: self.fov,
            aspect: self.screen_ratio,
            near: self.znear,
            far: self.zfar,
        }
    }

    // ------------------------------------------------------------------
    // Display-swap surface
    // ------------------------------------------------------------------

    /// Show the main output on the top physical display
    pub fn main_screen_on_top(&mut self) {
        self.main_on_top = true;
    }

    /// Show the main output on the bottom physical display
    pub fn main_screen_on_bottom(&mut self) {
        self.main_on_top = false;
    }

    /// Whether the main output goes to the top display
    pub fn main_screen_is_on_top(&self) -> bool {
        self.main_on_top
    }

    /// Exchange which physical display shows the main output
    pub fn swap_screens(&mut self) {
        self.main_on_top = !self.main_on_top;
    }

    // ------------------------------------------------------------------
    // Callback registration
    // ------------------------------------------------------------------

    /// Register the single-screen draw callback
    pub fn set_draw_callback(&mut self, callback: impl FnMut(&mut Gpu) + 'static) {
        self.draw = Some(Box::new(callback));
    }

    /// Register the dual-screen draw callbacks (top, bottom)
    pub fn set_dual_callbacks(
        &mut self,
        top: impl FnMut(&mut Gpu) + 'static,
        bottom: impl FnMut(&mut Gpu) + 'static,
    ) {
        self.draw_top = Some(Box::new(top));
        self.draw_bottom = Some(Box::new(bottom));
    }

    /// Register the GUI update hook
    pub fn set_gui_hook(&mut self, hook: impl FnMut() + 'static) {
        self.gui_hook = Some(Box::new(hook));
    }

    /// Register the animation update hook
    pub fn set_animation_hook(&mut self, hook: impl FnMut() + 'static) {
        self.animation_hook = Some(Box::new(hook));
    }

    /// Register the physics update hook
    pub fn set_physics_hook(&mut self, hook: impl FnMut() + 'static) {
        self.physics_hook = Some(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Per-frame surface
    // ------------------------------------------------------------------

    /// Render one single-screen frame
    ///
    /// Snapshots input, programs the display swap, polygon format,
    /// viewport and projection, invokes the registered draw callback
    /// exactly once and issues the flush.
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::SingleScreen {
            return Err(EngineError::Uninitialized);
        }
        let mut callback = self.draw.take().ok_or(EngineError::MissingCallback)?;

        self.input.snapshot();

        self.gpu.set_swap_lcds(self.main_on_top);
        self.gpu.set_poly_format(DEFAULT_POLY_FORMAT);

        self.gpu.set_viewport_packed(self.viewport);
        self.gpu.set_matrix_mode(MatrixMode::Projection);
        self.gpu.load_identity();
        self.gpu.load_perspective(self.perspective());
        self.gpu.set_matrix_mode(MatrixMode::Modelview);
        self.gpu.load_identity();

        callback(&mut self.gpu);
        self.draw = Some(callback);

        self.gpu.flush(SortMode::Manual);
        Ok(())
    }

    /// Render one dual-screen tick
    ///
    /// Invokes exactly one of the two registered callbacks: whichever
    /// corresponds to the render target selected for this tick. The
    /// target alternates at every vertical blank, so both callbacks run
    /// across any two consecutive ticks. The composited output of the
    /// previous tick is captured to the bank belonging to the idle
    /// target, and the sub-screen sprite table is copied into OAM after
    /// the flush.
    pub fn run_frame_dual(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::DualScreen {
            return Err(EngineError::Uninitialized);
        }
        if self.draw_top.is_none() || self.draw_bottom.is_none() {
            return Err(EngineError::MissingCallback);
        }
        // Both checked above; take only the one this tick renders
        let mut callback = if self.active_target {
            self.draw_top.take()
        } else {
            self.draw_bottom.take()
        }
        .ok_or(EngineError::MissingCallback)?;

        self.input.snapshot();

        self.gpu.set_swap_lcds(self.active_target == self.main_on_top);

        if self.active_target {
            // Main target renders; bank C feeds the sub screen while the
            // new frame is captured into bank D
            self.gpu.set_bank_c(BankMode::SubBackground);
            self.gpu.set_bank_d(BankMode::Lcd);
            self.gpu.set_capture(CaptureConfig {
                bank_d: true,
                enabled: true,
            });
        } else {
            self.gpu.set_bank_c(BankMode::Lcd);
            self.gpu.set_bank_d(BankMode::SubSprite);
            self.gpu.set_capture(CaptureConfig {
                bank_d: false,
                enabled: true,
            });
        }

        self.gpu.set_poly_format(DEFAULT_POLY_FORMAT);
        self.program_viewport(0, 0, (SCREEN_WIDTH - 1) as u8, (SCREEN_HEIGHT - 1) as u8);
        self.gpu.load_identity();

        callback(&mut self.gpu);
        if self.active_target {
            self.draw_top = Some(callback);
        } else {
            self.draw_bottom = Some(callback);
        }

        self.gpu.flush(SortMode::Manual);

        if let Some(sprites) = &self.dual_sprites {
            self.gpu.write_sub_oam(sprites.as_ref());
        }
        Ok(())
    }

    /// Run registered hooks, update the CPU-load estimate and block until
    /// the next vertical blank
    ///
    /// With `skip_if_late` set and the previous frame already over
    /// budget, the wait is skipped; the scanline counter is reset either
    /// way so the next measurement starts clean. This is the only
    /// intentionally blocking call in the engine and it cannot be
    /// cancelled.
    pub fn wait_for_sync(&mut self, flags: UpdateFlags) {
        if flags.update_gui {
            if let Some(mut hook) = self.gui_hook.take() {
                hook();
                self.gui_hook = Some(hook);
            }
        }
        if flags.update_animations {
            if let Some(mut hook) = self.animation_hook.take() {
                hook();
                self.animation_hook = Some(hook);
            }
        }
        if flags.update_physics {
            if let Some(mut hook) = self.physics_hook.take() {
                hook();
                self.physics_hook = Some(hook);
            }
        }

        self.cpu_percent = self.scanline_counter * 100 / SCANLINES_PER_FRAME as u32;
        if flags.skip_if_late && self.cpu_percent > 100 {
            self.scanline_counter = 0;
            return;
        }

        while !self.tick_scanline() {}
        self.scanline_counter = 0;
    }

    /// Advance the raster by one scanline, delivering blank events
    ///
    /// Returns `true` when the step crossed into the vertical blank. The
    /// display layer calls this to pace scan-out; `wait_for_sync` loops
    /// on it to block.
    pub fn tick_scanline(&mut self) -> bool {
        let vblank = self.gpu.step_scanline();
        self.on_hblank();
        if vblank {
            self.on_vblank();
        }
        vblank
    }

    /// Horizontal-blank handler
    ///
    /// Interrupt-style: only bumps the CPU-load counter and writes the
    /// effect offset register. Never blocks.
    fn on_hblank(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }

        self.scanline_counter += 1;

        // The wrap line reads as the top line of the next frame
        let mut line = self.gpu.vcount();
        if line == VCOUNT_MAX {
            line = 0;
        }

        if let Some(offset) = self.effects.scanline_offset(line) {
            self.gpu.set_bg0_hofs(offset);
        }
    }

    /// Vertical-blank handler
    ///
    /// Toggles the dual render target and advances the effect phase.
    fn on_vblank(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }

        if self.effects.effect() != SpecialEffect::None {
            self.effects.advance_phase();
        }
        self.active_target = !self.active_target;
    }

    /// CPU-load percentage measured for the previous frame
    pub fn cpu_percent(&self) -> u32 {
        self.cpu_percent
    }

    /// Whether the GPU is currently rasterizing visible lines
    pub fn gpu_is_rendering(&self) -> bool {
        let vcount = self.gpu.vcount();
        !(vcount > (VBLANK_START - 2) && vcount < 214)
    }

    /// Polygon RAM usage after draining the geometry engine
    pub fn polygon_count(&mut self) -> u16 {
        self.gpu.drain();
        self.gpu.polygon_count()
    }

    /// Vertex RAM usage after draining the geometry engine
    pub fn vertex_count(&mut self) -> u16 {
        self.gpu.drain();
        self.gpu.vertex_count()
    }

    /// Enable or disable edge antialiasing
    ///
    /// On at init; polygon edges are smoothed until turned off here.
    pub fn set_antialias(&mut self, enabled: bool) {
        self.gpu.set_antialias(enabled);
    }

    // ------------------------------------------------------------------
    // Effect surface
    // ------------------------------------------------------------------

    /// Select the active special effect
    ///
    /// Switching to `None` resets the horizontal-offset register
    /// immediately instead of waiting for the next scanline.
    pub fn set_effect(&mut self, kind: SpecialEffect) {
        self.effects.set_effect(kind);
        if kind == SpecialEffect::None {
            self.gpu.set_bg0_hofs(0);
        }
    }

    /// Configure the noise effect amplitude mask
    pub fn set_noise_params(&mut self, mask: i16) {
        self.effects.config_noise(mask);
    }

    /// Configure the sine effect multiplier and shift
    pub fn set_sine_params(&mut self, mult: i32, shift: u32) {
        self.effects.config_sine(mult, shift);
    }

    /// Pause or resume the active effect
    pub fn pause_effect(&mut self, pause: bool) {
        self.effects.pause(pause, &mut self.logger);
    }

    /// The effect scheduler state
    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    // ------------------------------------------------------------------
    // Picking surface
    // ------------------------------------------------------------------

    /// Begin a touch test at the given pointer coordinate
    pub fn start_pick(&mut self, px: u8, py: u8) {
        let perspective = self.perspective();
        self.picking.start(&mut self.gpu, px, py, perspective);
    }

    /// Mark the end of one candidate object's geometry
    pub fn mark_object(&mut self) {
        self.picking.mark_object(&mut self.gpu);
    }

    /// Hit depth of the geometry drawn since the last mark, if any
    pub fn pick_result(&mut self) -> Option<i32> {
        self.picking.result(&mut self.gpu)
    }

    /// End the touch test, restoring viewport and matrices
    pub fn end_pick(&mut self) {
        self.picking.end(&mut self.gpu);
    }

    /// Whether a touch test is active
    pub fn pick_active(&self) -> bool {
        self.picking.is_active()
    }

    // ------------------------------------------------------------------
    // Subsystem access
    // ------------------------------------------------------------------

    /// Latch host input state (buttons plus stylus position)
    pub fn feed_input(&mut self, buttons: Buttons, touch: Option<(u8, u8)>) {
        self.input.feed(buttons, touch);
    }

    /// The input snapshot taken at the top of the current frame
    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    /// The material system, while initialized
    pub fn materials(&self) -> Option<&MaterialSystem> {
        self.materials.as_ref()
    }

    /// Mutable material system access, failing when uninitialized
    pub fn materials_mut(&mut self) -> Result<&mut MaterialSystem, EngineError> {
        self.materials.as_mut().ok_or(EngineError::Uninitialized)
    }

    /// The simulated GPU (render target, registers, raster position)
    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Mutable GPU access for the display layer and tests
    pub fn gpu_mut(&mut self) -> &mut Gpu {
        &mut self.gpu
    }

    /// The engine log
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Mutable engine log access
    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// The configuration the engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
