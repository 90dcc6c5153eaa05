//! Scene render demo
//!
//! Builds a small scene and renders a few frames through the headless
//! recording backend, alternating between the main camera and an offscreen
//! overview. Pass a `.toml` or `.ron` renderer config path as the first
//! argument to override the defaults.
//!
//! Run with `RUST_LOG=debug` to see pass boundaries and the queue dump.

mod scene;

use scene_render::foundation::logging;
use scene_render::prelude::*;
use thiserror::Error;

const FRAME_COUNT: u32 = 6;

/// Errors that abort the demo
#[derive(Error, Debug)]
pub enum DemoError {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A render resource could not be created
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The scene could not be assembled
    #[error("Scene setup failed: {0}")]
    Scene(String),
}

fn load_config() -> Result<RendererConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading renderer config from {}", path);
            RendererConfig::load_from_file(&path)?
        }
        None => RendererConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let mut backend = RecordingBackend::new(config.clone());
    let mut demo = scene::build(&mut backend)?;

    let mut manager = RenderManager::new(Box::new(backend), config);
    manager.set_camera(Some(demo.camera));
    manager.set_directional_light(Some(demo.sun));

    let overview = RenderTarget::new(RenderTargetHandle(1), 512, 512);

    for frame in 0..FRAME_COUNT {
        if let Some(cube) = demo.registry.entity_mut(demo.cube) {
            cube.transform_mut().rotate_euler(0.0, 0.25, 0.0);
        }

        // Every third frame goes to the overview target instead
        if frame % 3 == 2 {
            manager.set_rtt_target(Some(overview.clone()), Some(demo.overview_camera));
        } else {
            manager.set_rtt_target(None, None);
        }

        manager.render_scene(&mut demo.registry);

        let stats = manager.stats();
        log::info!(
            "Frame {}{}: {} shadow draws, {} draws, {} shader binds, {} material binds, {} uploads, {} rebinds, {} culled, {} skipped",
            frame,
            if manager.rtt_target().is_some() { " (overview)" } else { "" },
            stats.shadow_draws,
            stats.draws,
            stats.shader_binds,
            stats.material_binds,
            stats.transform_uploads,
            stats.transform_rebinds,
            stats.culled_meshes,
            stats.skipped_draws
        );
    }

    if let Some(recorded) = manager.backend().as_any().downcast_ref::<RecordingBackend>() {
        log::info!(
            "{} backend calls recorded, {} live buffers",
            recorded.calls().len(),
            recorded.live_buffer_count()
        );
    }
    Ok(())
}

fn main() {
    logging::init_with_filter("info");
    log::info!("Starting scene render demo");

    if let Err(err) = run() {
        log::error!("Demo failed: {}", err);
        std::process::exit(1);
    }
}
