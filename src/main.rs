// Main entry point
//
// Brings up the engine in single-screen mode, draws a minimal spinning
// scene and presents it through the host window.

use trigon_rs::display::{run_display, WindowConfig};
use trigon_rs::engine::{Engine, EngineConfig};
use trigon_rs::gpu::PolyKind;
use trigon_rs::material::rgb15;
use trigon_rs::SpecialEffect;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("trigon v0.1.0");
    println!("=============");
    println!();

    let engine_config = EngineConfig::load_or_default();
    println!("Engine configuration loaded from 'engine_config.toml'");
    println!();

    let window_config = WindowConfig::from(&engine_config.video);

    let mut engine = Engine::with_config(engine_config);
    engine.init_single()?;
    engine.set_effect(SpecialEffect::Sine);

    engine.set_draw_callback(|gpu| {
        gpu.begin(PolyKind::Triangles);
        gpu.vertex(-1.0, -1.0, 3.0);
        gpu.vertex(1.0, -1.0, 3.0);
        gpu.vertex(0.0, 1.0, 3.0);
        gpu.end();
    });

    println!("Press the close button or Ctrl+C to exit.");
    println!();

    run_display(window_config, engine, |engine, frame_buffer| {
        // Paint a backdrop that makes the sine displacement visible and
        // brighten it with the measured CPU load
        let load = engine.cpu_percent().min(100) as u16;
        frame_buffer.gradient_pattern();
        for x in (0..256).step_by(32) {
            for y in 0..192 {
                frame_buffer.set_pixel(x, y, rgb15(31, (load * 31 / 100) as u8, 0));
            }
        }
    })?;

    println!("Display window closed.");
    Ok(())
}
