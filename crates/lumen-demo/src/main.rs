//! Headless demo that drives the lighting controller through a simulated AR
//! session.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p lumen-demo -- --panorama studio.hdr` to start from a
//! static environment map, or `--light-estimation false` to stay static.

mod sun;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3;
use lumen_config::{CliArgs, Config, default_config_dir};
use lumen_xr::{
    FilePanoramaLoader, GpuTextureHandle, HeadlessBackend, LightingController, LightingEvent,
    PanoramaRequest, SimulatedCapabilities, SimulatedSession,
};
use tracing::{info, warn};

/// Real time to wait for the startup panorama before starting the session.
const PANORAMA_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames between simulated platform cubemap updates.
const CUBEMAP_PERIOD: u32 = 45;

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    lumen_log::init_logging(Some(&log_dir), config.debug.file_logging, Some(&config));

    let mut controller = LightingController::new(
        HeadlessBackend::new(),
        FilePanoramaLoader::new(),
        &config.lighting,
    );

    let env_changes = Rc::new(Cell::new(0u32));
    {
        let env_changes = Rc::clone(&env_changes);
        controller.subscribe(move |event| match event {
            LightingEvent::EnvironmentMapChanged { environment_map } => {
                env_changes.set(env_changes.get() + 1);
                info!(map = ?environment_map, "environment map changed");
            }
            LightingEvent::StateChanged { from, to } => {
                info!(?from, ?to, "lighting state changed");
            }
        });
    }

    if let Some(url) = config.lighting.panorama.clone() {
        let request = controller.load_panorama(&url);
        wait_for_panorama(&mut controller, &request);
    }

    let capabilities = SimulatedCapabilities {
        reflection_binding: config.demo.gpu_binding,
        ..Default::default()
    };
    let session = Rc::new(SimulatedSession::new(1, capabilities));
    controller.set_session(Some(session.clone()));

    let start = Instant::now();
    if session.grant_light_probe().is_some() {
        controller.update(start);
    }

    let frame_interval = Duration::from_millis(config.demo.frame_interval_ms.max(1));
    let mut now = start;
    let mut frames_delivered = 0u32;
    for frame_index in 0..config.demo.frames {
        now += frame_interval;
        controller.update(now);

        if frame_index % CUBEMAP_PERIOD == 0 {
            let handle = GpuTextureHandle(5000 + u64::from(frame_index / CUBEMAP_PERIOD));
            session.set_reflection_cube_map(Some(handle));
        }

        let elapsed = now.duration_since(start);
        let estimate = sun::estimate_at(elapsed.as_secs_f32());
        if let Some(frame) = session.next_frame(Some(estimate)) {
            controller.on_frame(elapsed.as_secs_f64() * 1000.0, &frame);
            frames_delivered += 1;
        }
    }

    log_lighting_summary(&controller, frames_delivered);

    controller.set_session(None);
    info!(
        state = ?controller.state(),
        environment_map = ?controller.environment_map(),
        environment_changes = env_changes.get(),
        live_textures = controller.backend().live_count(),
        "session cleared; static lighting restored"
    );
}

/// Pump the controller in real time until the panorama settles or times out.
fn wait_for_panorama(
    controller: &mut LightingController<HeadlessBackend>,
    request: &PanoramaRequest,
) {
    let deadline = Instant::now() + PANORAMA_TIMEOUT;
    while Instant::now() < deadline {
        controller.update(Instant::now());
        if let Some(outcome) = request.try_take() {
            match outcome {
                Ok(map) => {
                    info!(url = request.url(), texture = map.id().0, "startup panorama ready")
                }
                Err(err) => warn!(%err, "startup panorama failed; continuing without one"),
            }
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    warn!(url = request.url(), "startup panorama timed out");
}

fn log_lighting_summary(controller: &LightingController<HeadlessBackend>, frames: u32) {
    info!(
        state = ?controller.state(),
        frames,
        reflection_binding = controller.has_reflection_binding(),
        environment_map = ?controller.environment_map(),
        "estimation run finished"
    );

    if let Some(light) = controller.directional_light() {
        let uniform = light.to_uniform();
        info!(
            color = ?light.color,
            intensity = light.intensity,
            travel = ?light.travel_direction(),
            uniform_bytes = bytemuck::bytes_of(&uniform).len(),
            "primary light"
        );
    }
    match controller.ambient_probe() {
        Some(probe) => info!(
            irradiance_up = ?probe.irradiance(Vec3::Y),
            irradiance_down = ?probe.irradiance(Vec3::NEG_Y),
            uniform_bytes = bytemuck::bytes_of(&probe.to_uniform()).len(),
            "ambient probe"
        ),
        None => {
            let hemi = controller.hemisphere_light();
            info!(
                irradiance_up = ?hemi.irradiance(Vec3::Y),
                uniform_bytes = bytemuck::bytes_of(&hemi.to_uniform()).len(),
                "hemisphere light"
            );
        }
    }
}
