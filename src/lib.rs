// Solar Orbits - orbital time-simulation engine
// Headless driver: load the catalog, step frames, report the final state

pub mod api_client;
pub mod calendar;
pub mod config;
pub mod error;
pub mod orbit_engine;
pub mod state_manager;
pub mod time_controller;

pub use calendar::{CalendarDate, CalendarMapper};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use orbit_engine::{resolve_all, resolve_transform, BodyTransform, OrbitalBody, Vector3};
pub use state_manager::{AppState, FrameSnapshot, SimulationState};
pub use time_controller::{ResponseCurve, SimulationClock};

use state_manager::{get_notifications, get_simulation_state, load_catalog, run_simulation_loop};

pub async fn run() -> EngineResult<()> {
    let config = EngineConfig::from_env()?;
    tracing::info!(
        source = config.api_base_url.as_deref().unwrap_or("bundled"),
        fps = config.target_fps,
        seconds = config.run_seconds,
        "starting simulation"
    );

    let app_state = AppState::new(&config)?;

    // A failed load leaves an empty scene; the clock still runs
    if let Err(e) = load_catalog(&app_state).await {
        tracing::error!(error = %e, "running without bodies");
    }

    let frames = run_simulation_loop(&app_state, config.target_fps, config.run_seconds).await;
    tracing::info!(frames, "simulation finished");

    for note in get_notifications(&app_state) {
        tracing::info!(title = %note.title, severity = ?note.severity, "notification");
    }

    let frontend = get_simulation_state(&app_state);
    println!("{}", serde_json::to_string_pretty(&frontend)?);
    Ok(())
}
