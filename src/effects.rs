// Special effects - per-scanline horizontal displacement
//
// Two built-in variants: pseudo-random noise and sine-wave displacement.
// The offset for a scanline is a pure function of the line index, the
// vblank phase counter and the effect parameters, so the horizontal-blank
// handler stays cheap. Pausing the noise effect freezes it by sampling a
// snapshot buffer instead of re-randomizing every line.

use crate::debug::Logger;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of the pause snapshot buffer (power of two, covers every line)
pub const PAUSE_BUFFER_SIZE: usize = 512;

/// Built-in special effect kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialEffect {
    /// No effect; the offset register stays at zero
    #[default]
    None,
    /// Pseudo-random horizontal jitter
    Noise,
    /// Sine-wave displacement
    Sine,
}

/// Per-scanline effect state
pub struct Effects {
    kind: SpecialEffect,
    paused: bool,
    /// Frozen noise samples; empty unless the pause snapshot succeeded
    pause_buffer: Vec<i16>,
    /// Advances once per vertical blank while un-paused
    phase: u16,
    noise_mask: i16,
    sine_mult: i32,
    sine_shift: u32,
    rng: StdRng,
}

impl Effects {
    /// Default noise amplitude mask
    pub const DEFAULT_NOISE_MASK: i16 = 0xF;
    /// Default sine frequency multiplier
    pub const DEFAULT_SINE_MULT: i32 = 10;
    /// Default sine amplitude shift
    pub const DEFAULT_SINE_SHIFT: u32 = 9;

    /// Create with default parameters and a fixed RNG seed
    pub fn new() -> Self {
        Self::with_seed(0x3D_E46)
    }

    /// Create with a caller-chosen RNG seed (deterministic noise)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            kind: SpecialEffect::None,
            paused: false,
            pause_buffer: Vec::new(),
            phase: 0,
            noise_mask: Self::DEFAULT_NOISE_MASK,
            sine_mult: Self::DEFAULT_SINE_MULT,
            sine_shift: Self::DEFAULT_SINE_SHIFT,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Select the active effect
    pub fn set_effect(&mut self, kind: SpecialEffect) {
        self.kind = kind;
    }

    /// Currently active effect
    pub fn effect(&self) -> SpecialEffect {
        self.kind
    }

    /// Set the noise amplitude mask
    pub fn config_noise(&mut self, mask: i16) {
        self.noise_mask = mask;
    }

    /// Set the sine frequency multiplier and amplitude shift
    pub fn config_sine(&mut self, mult: i32, shift: u32) {
        self.sine_mult = mult;
        self.sine_shift = shift;
    }

    /// Whether the effect is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance the vblank phase counter (no-op while paused)
    pub fn advance_phase(&mut self) {
        if !self.paused {
            self.phase = (self.phase + 1) & (PAUSE_BUFFER_SIZE as u16 - 1);
        }
    }

    /// Pause or resume the effect
    ///
    /// Pausing the noise variant snapshots one buffer of samples so the
    /// distortion appears static. The snapshot allocation is cosmetic: if
    /// it fails, a line is logged and the effect keeps re-randomizing.
    pub fn pause(&mut self, pause: bool, logger: &mut Logger) {
        if self.kind == SpecialEffect::None {
            return;
        }

        if pause {
            let mut buffer = Vec::new();
            if buffer.try_reserve_exact(PAUSE_BUFFER_SIZE).is_err() {
                logger.warning("not enough memory for the effect pause snapshot");
                return;
            }
            for _ in 0..PAUSE_BUFFER_SIZE {
                buffer.push(self.noise_sample());
            }
            self.pause_buffer = buffer;
        } else {
            self.pause_buffer = Vec::new();
        }

        self.paused = pause;
    }

    /// Compute the horizontal offset for one scanline
    ///
    /// Returns `None` when no effect is active, so the caller can leave
    /// the offset register untouched.
    pub fn scanline_offset(&mut self, scanline: u16) -> Option<i16> {
        match self.kind {
            SpecialEffect::None => None,
            SpecialEffect::Noise => {
                if self.paused && !self.pause_buffer.is_empty() {
                    let index = scanline as usize & (PAUSE_BUFFER_SIZE - 1);
                    Some(self.pause_buffer[index])
                } else {
                    Some(self.noise_sample())
                }
            }
            SpecialEffect::Sine => {
                let angle = (scanline as i32 + self.phase as i32) * self.sine_mult;
                // The hardware sine table addresses a 16-bit circle; keep
                // the same wrap and the 4.12 fixed-point amplitude.
                let turns = ((angle << 6) as u16 as f32) / 65536.0;
                let value = (turns * std::f32::consts::TAU).sin() * 4096.0;
                Some(((value as i32) >> self.sine_shift) as i16)
            }
        }
    }

    fn noise_sample(&mut self) -> i16 {
        (self.rng.gen::<u16>() as i16 & self.noise_mask) - (self.noise_mask >> 1)
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}
