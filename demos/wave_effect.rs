// Wave effect demo
//
// Runs the engine headless for a few frames with the sine effect active
// and writes the distorted scan-out of a striped backdrop as a PNG.

use trigon_rs::display::{save_capture_to, FrameBuffer};
use trigon_rs::engine::{Engine, UpdateFlags};
use trigon_rs::material::rgb15;
use trigon_rs::SpecialEffect;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("trigon v0.1.0 - wave effect demo");
    println!("================================");
    println!();

    let mut engine = Engine::new();
    engine.init_single()?;
    engine.set_draw_callback(|_| {});
    engine.set_effect(SpecialEffect::Sine);
    engine.set_sine_params(10, 7);

    // Let the effect phase advance across a few frames
    for _ in 0..30 {
        engine.run_frame()?;
        engine.wait_for_sync(UpdateFlags::none());
    }

    // Vertical stripes make the displacement obvious
    let mut frame_buffer = FrameBuffer::new();
    for y in 0..192 {
        for x in 0..256 {
            let color = if (x / 8) % 2 == 0 {
                rgb15(31, 31, 31)
            } else {
                rgb15(0, 0, 16)
            };
            frame_buffer.set_pixel(x, y, color);
        }
    }

    let mut rgba = vec![0u8; 256 * 192 * 4];
    frame_buffer.scan_out(engine.gpu().line_offsets(), &mut rgba);

    // Bake the displaced image back into a buffer for the capture
    let mut displaced = FrameBuffer::new();
    for y in 0..192 {
        for x in 0..256 {
            let i = (y * 256 + x) * 4;
            let r = (rgba[i] >> 3) as u16;
            let g = (rgba[i + 1] >> 3) as u16;
            let b = (rgba[i + 2] >> 3) as u16;
            displaced.set_pixel(x, y, r | (g << 5) | (b << 10));
        }
    }

    let path = Path::new("wave_effect.png");
    save_capture_to(&displaced, path)?;
    println!("✓ Capture written to {}", path.display());

    engine.teardown();
    Ok(())
}
