// State Manager - Simulation State Store and control surface
// Single writer for simulation time, play state and scale; commands for the UI

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api_client::{CatalogCache, CatalogSource};
use crate::calendar::{CalendarDate, CalendarMapper};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::orbit_engine::{resolve_all, resolve_transform, BodyTransform, OrbitalBody};
use crate::time_controller::{clamp_time, sanitize_delta, ResponseCurve, SimulationClock};

/// Wall-clock pause inserted after a date jump during playback (seconds)
pub const DATE_JUMP_HOLD: f64 = 0.5;

// =============================================================================
// SIMULATION STATE
// =============================================================================

/// Everything the renderer needs for one frame, resolved at a single time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub simulation_time: f64,
    pub date: CalendarDate,
    pub transforms: Vec<BodyTransform>,
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub bodies: Vec<OrbitalBody>,
    pub time: f64,
    pub is_playing: bool,
    pub time_scale: f64,
    pub selected: Option<String>,
    clock: SimulationClock,
    calendar: CalendarMapper,
    /// Authoritative time set since the last frame; beats that frame's advance
    pending_resync: Option<f64>,
    /// Wall seconds left before playback resumes after a date jump
    resume_hold: Option<f64>,
    /// Whether the last frame's time had a calendar date
    date_available: bool,
}

impl SimulationState {
    pub fn new(
        bodies: Vec<OrbitalBody>,
        calendar: CalendarMapper,
        curve: ResponseCurve,
        time_scale: f64,
    ) -> Self {
        Self {
            bodies,
            time: 0.0,
            is_playing: true,
            time_scale: curve.clamp_scale(time_scale),
            selected: None,
            clock: SimulationClock::new(curve),
            calendar,
            pending_resync: None,
            resume_hold: None,
            date_available: true,
        }
    }

    pub fn from_config(config: &EngineConfig, bodies: Vec<OrbitalBody>) -> Self {
        Self::new(
            bodies,
            config.calendar(),
            config.response_curve(),
            config.time_scale,
        )
    }

    pub fn calendar(&self) -> &CalendarMapper {
        &self.calendar
    }

    pub fn curve(&self) -> &ResponseCurve {
        self.clock.curve()
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        self.clock.set_running(playing);
        self.resume_hold = None;
    }

    /// Returns the value actually stored after clamping
    pub fn set_time_scale(&mut self, scale: f64) -> f64 {
        self.time_scale = self.curve().clamp_scale(scale);
        self.time_scale
    }

    /// Overwrite simulation time. Takes precedence over the next frame's advance.
    pub fn resync(&mut self, time: f64) {
        let time = clamp_time(time);
        tracing::debug!(from = self.time, to = time, "resync");
        self.time = time;
        self.pending_resync = Some(time);
        self.clock.resync(time);
    }

    /// Fresh body snapshot at time zero
    pub fn reset(&mut self, bodies: Vec<OrbitalBody>) {
        self.bodies = bodies;
        self.selected = None;
        self.resync(0.0);
    }

    /// Jump to `time`; during playback, hold still briefly so the jump is visible
    pub fn jump_to(&mut self, time: f64) {
        self.resync(time);
        if self.is_playing || self.resume_hold.is_some() {
            self.is_playing = false;
            self.clock.pause();
            self.resume_hold = Some(DATE_JUMP_HOLD);
        }
    }

    pub fn jump_to_date(&mut self, year: i32, month: u32, day: u32) -> EngineResult<f64> {
        let time = self.calendar.time_from_date(year, month, day)?;
        self.jump_to(time);
        Ok(self.time)
    }

    pub fn is_holding(&self) -> bool {
        self.resume_hold.is_some()
    }

    /// Step one frame of `wall_dt` seconds and resolve every body
    pub fn advance_frame(&mut self, wall_dt: f64) -> FrameSnapshot {
        match self.pending_resync.take() {
            Some(time) => {
                self.clock.resync(time);
                self.time = time;
            }
            None => {
                self.time = self.clock.tick(self.time, wall_dt, self.time_scale);
            }
        }

        if let Some(left) = self.resume_hold {
            let left = left - sanitize_delta(wall_dt);
            if left <= 0.0 {
                self.set_playing(true);
            } else {
                self.resume_hold = Some(left);
            }
        }

        let frame = self.snapshot();
        self.track_calendar_range(&frame);
        frame
    }

    /// Log once when time leaves the calendar range, and once when it returns
    fn track_calendar_range(&mut self, frame: &FrameSnapshot) {
        let available = frame.date.is_available();
        if available == self.date_available {
            return;
        }
        if available {
            tracing::info!(
                time = frame.simulation_time,
                date = %frame.date.formatted_date,
                "simulation time back inside the calendar"
            );
        } else {
            tracing::warn!(
                time = frame.simulation_time,
                "simulation time left the calendar range"
            );
        }
        self.date_available = available;
    }

    pub fn date_available(&self) -> bool {
        self.date_available
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            simulation_time: self.time,
            date: self.current_date(),
            transforms: resolve_all(self.time, &self.bodies),
        }
    }

    pub fn current_date(&self) -> CalendarDate {
        self.calendar.date_from_time(self.time)
    }

    pub fn find_body(&self, body_id: &str) -> EngineResult<&OrbitalBody> {
        self.bodies
            .iter()
            .find(|b| b.id == body_id)
            .ok_or_else(|| EngineError::UnknownBody(body_id.to_string()))
    }

    pub fn select_body(&mut self, body_id: Option<&str>) -> EngineResult<Option<BodyDetails>> {
        match body_id {
            Some(id) => {
                let details = self.body_details(id)?;
                self.selected = Some(id.to_string());
                Ok(Some(details))
            }
            None => {
                self.selected = None;
                Ok(None)
            }
        }
    }

    pub fn body_details(&self, body_id: &str) -> EngineResult<BodyDetails> {
        let body = self.find_body(body_id)?;
        let transform = resolve_transform(self.time, body);
        Ok(BodyDetails::new(body, &transform))
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            time_scale: self.time_scale,
            scale_label: format!("{:.1}x", self.time_scale),
            rate_description: self.curve().describe(self.time_scale),
            simulation_time: self.time,
            is_playing: self.is_playing,
            date: self.current_date(),
            selected: self
                .selected
                .as_deref()
                .and_then(|id| self.body_details(id).ok()),
        }
    }
}

// =============================================================================
// SERIALIZABLE STATE FOR FRONTEND
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyDetails {
    #[serde(flatten)]
    pub body: OrbitalBody,
    pub orbital_distance_label: String,
    pub orbital_speed_label: String,
    pub distance_from_star: f64,
}

impl BodyDetails {
    fn new(body: &OrbitalBody, transform: &BodyTransform) -> Self {
        let mut body = body.clone();
        body.position = transform.position.to_array();
        Self {
            orbital_distance_label: format!("{:.1} AU", body.orbital_distance),
            orbital_speed_label: format!("{:.4} rad/s", body.orbital_speed),
            distance_from_star: transform.position.magnitude(),
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub time_scale: f64,
    pub scale_label: String,
    pub rate_description: String,
    pub simulation_time: f64,
    pub is_playing: bool,
    pub date: CalendarDate,
    pub selected: Option<BodyDetails>,
}

/// Same shape as the simulation service payload, with live positions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendState {
    pub time_scale: f64,
    pub current_time: f64,
    pub is_playing: bool,
    pub celestial_bodies: Vec<OrbitalBody>,
    pub simulation_date: CalendarDate,
}

impl SimulationState {
    pub fn to_frontend(&self) -> FrontendState {
        let celestial_bodies = self
            .bodies
            .iter()
            .map(|b| {
                let mut body = b.clone();
                body.position = resolve_transform(self.time, b).position.to_array();
                body
            })
            .collect();

        FrontendState {
            time_scale: self.time_scale,
            current_time: self.time,
            is_playing: self.is_playing,
            celestial_bodies,
            simulation_date: self.current_date(),
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Destructive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct NotificationQueue {
    next_id: u64,
    items: Vec<Notification>,
}

impl NotificationQueue {
    pub fn push(
        &mut self,
        title: &str,
        description: Option<&str>,
        severity: Severity,
        duration_ms: Option<u64>,
    ) -> u64 {
        self.next_id += 1;
        self.items.push(Notification {
            id: self.next_id,
            title: title.to_string(),
            description: description.map(str::to_string),
            severity,
            duration_ms,
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn pending(&self) -> Vec<Notification> {
        self.items.clone()
    }
}

// =============================================================================
// GLOBAL STATE
// =============================================================================

pub struct AppState {
    pub simulation: Arc<RwLock<SimulationState>>,
    pub cache: Arc<CatalogCache>,
    pub source: Arc<CatalogSource>,
    pub notifications: Arc<RwLock<NotificationQueue>>,
}

impl AppState {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let source = CatalogSource::from_base_url(config.api_base_url.as_deref())?;
        Ok(Self::with_source(config, source))
    }

    pub fn with_source(config: &EngineConfig, source: CatalogSource) -> Self {
        Self {
            simulation: Arc::new(RwLock::new(SimulationState::from_config(config, Vec::new()))),
            cache: Arc::new(CatalogCache::new()),
            source: Arc::new(source),
            notifications: Arc::new(RwLock::new(NotificationQueue::default())),
        }
    }

    fn notify(&self, title: &str, description: Option<&str>, duration_ms: Option<u64>) {
        self.notifications
            .write()
            .push(title, description, Severity::Info, duration_ms);
    }

    fn notify_error(&self, description: &str) {
        self.notifications
            .write()
            .push("Error", Some(description), Severity::Destructive, None);
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

pub fn get_simulation_state(state: &AppState) -> FrontendState {
    state.simulation.read().to_frontend()
}

pub fn get_display_state(state: &AppState) -> DisplayState {
    state.simulation.read().display_state()
}

pub fn get_cached_bodies(state: &AppState) -> Vec<OrbitalBody> {
    state.cache.get_bodies()
}

/// Load the body catalog once at startup. Failure leaves the state untouched.
pub async fn load_catalog(state: &AppState) -> EngineResult<usize> {
    let bodies = if state.cache.is_cache_valid() {
        state.cache.get_bodies()
    } else {
        match state.source.load().await {
            Ok(bodies) => {
                state.cache.set_bodies(bodies.clone());
                bodies
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch simulation data");
                state.notify_error("Failed to fetch simulation data");
                return Err(e);
            }
        }
    };

    let count = bodies.len();
    state.simulation.write().bodies = bodies;
    tracing::info!(count, "body catalog loaded");
    Ok(count)
}

pub fn set_playing(state: &AppState, playing: bool) {
    state.simulation.write().set_playing(playing);
    let title = if playing {
        "Simulation Resumed"
    } else {
        "Simulation Paused"
    };
    state.notify(title, None, Some(2000));
}

pub fn toggle_playing(state: &AppState) -> bool {
    let playing = !state.simulation.read().is_playing;
    set_playing(state, playing);
    playing
}

/// Store the clamped scale, then mirror it to the service on a best-effort basis
pub async fn set_time_scale(state: &AppState, scale: f64) -> f64 {
    let clamped = state.simulation.write().set_time_scale(scale);
    if let Err(e) = state.source.push_time_scale(clamped).await {
        tracing::warn!(error = %e, "failed to update time scale");
    }
    clamped
}

pub async fn reset_simulation(state: &AppState) -> EngineResult<()> {
    let bodies = match state.source.reload().await {
        Ok(bodies) => bodies,
        Err(e) => {
            tracing::warn!(error = %e, "failed to reset simulation");
            state.notify_error("Failed to reset simulation");
            return Err(e);
        }
    };

    state.cache.set_bodies(bodies.clone());
    state.simulation.write().reset(bodies);
    state.notify(
        "Simulation Reset",
        Some("The solar system has been reset to its initial state"),
        Some(3000),
    );
    tracing::info!("simulation reset");
    Ok(())
}

pub fn jump_to_date(state: &AppState, year: i32, month: u32, day: u32) -> EngineResult<f64> {
    let time = state.simulation.write().jump_to_date(year, month, day)?;
    state.notify(
        "Date Changed",
        Some("The simulation date has been updated"),
        Some(2000),
    );
    Ok(time)
}

pub fn select_body(state: &AppState, body_id: Option<&str>) -> EngineResult<Option<BodyDetails>> {
    let details = state.simulation.write().select_body(body_id)?;
    if let Some(details) = &details {
        let title = format!("Selected {}", details.body.name);
        let description = format!("Viewing information about {}", details.body.name);
        state.notify(&title, Some(&description), Some(3000));
    }
    Ok(details)
}

pub fn get_body_details(state: &AppState, body_id: &str) -> EngineResult<BodyDetails> {
    state.simulation.read().body_details(body_id)
}

pub fn advance_frame(state: &AppState, wall_dt: f64) -> FrameSnapshot {
    state.simulation.write().advance_frame(wall_dt)
}

pub fn get_notifications(state: &AppState) -> Vec<Notification> {
    state.notifications.read().pending()
}

pub fn dismiss_notification(state: &AppState, id: u64) -> bool {
    state.notifications.write().dismiss(id)
}

// =============================================================================
// SIMULATION LOOP
// =============================================================================

/// Drive frames at `fps` on the current task for `run_seconds` of wall time
pub async fn run_simulation_loop(state: &AppState, fps: u32, run_seconds: f64) -> u64 {
    let target_frame_time = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut interval = tokio::time::interval(target_frame_time);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last = started;
    let mut last_report = started;
    let mut frames = 0u64;

    while started.elapsed().as_secs_f64() < run_seconds {
        interval.tick().await;

        let now = Instant::now();
        let wall_dt = now.duration_since(last).as_secs_f64();
        last = now;

        let frame = advance_frame(state, wall_dt);
        frames += 1;

        if now.duration_since(last_report) >= Duration::from_secs(1) {
            last_report = now;
            let earth = frame.transforms.iter().find(|t| t.id == "earth");
            tracing::info!(
                time = frame.simulation_time,
                date = %frame.date.formatted_date,
                earth = ?earth.map(|t| t.position.to_array()),
                "frame {}",
                frames
            );
        }
    }

    frames
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::default_catalog;
    use crate::calendar::UNAVAILABLE_DATE;
    use crate::time_controller::MAX_SIMULATION_TIME;
    use chrono::NaiveDate;

    const FRAME: f64 = 1.0 / 60.0;

    fn config() -> EngineConfig {
        EngineConfig {
            epoch: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..EngineConfig::default()
        }
    }

    fn state() -> SimulationState {
        SimulationState::from_config(&config(), default_catalog())
    }

    fn app() -> AppState {
        let app = AppState::with_source(&config(), CatalogSource::Bundled);
        app.simulation.write().bodies = default_catalog();
        app
    }

    #[test]
    fn test_session_defaults() {
        let sim = state();
        assert!(sim.is_playing);
        assert_eq!(sim.time, 0.0);
        assert_eq!(sim.time_scale, 2.0);
        assert_eq!(sim.current_date().formatted_date, "January 1, 2024");
    }

    #[test]
    fn test_frames_advance_while_playing() {
        let mut sim = state();
        let rate = sim.curve().rate(2.0);
        for _ in 0..60 {
            sim.advance_frame(FRAME);
        }
        assert!((sim.time - rate).abs() < 1e-9);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut sim = state();
        sim.advance_frame(FRAME);
        sim.set_playing(false);
        let frozen = sim.time;
        for _ in 0..600 {
            let frame = sim.advance_frame(FRAME);
            assert_eq!(frame.simulation_time, frozen);
        }
    }

    #[test]
    fn test_resync_beats_pending_frame() {
        let mut sim = state();
        for _ in 0..10 {
            sim.advance_frame(FRAME);
        }
        sim.resync(-12.5);
        let frame = sim.advance_frame(FRAME);
        assert_eq!(frame.simulation_time, -12.5);

        // Playback continues from the resynced value afterwards
        let next = sim.advance_frame(FRAME);
        let expected = -12.5 + sim.curve().rate(2.0) * FRAME;
        assert!((next.simulation_time - expected).abs() < 1e-12);
    }

    #[test]
    fn test_direct_time_write_is_adopted() {
        let mut sim = state();
        sim.advance_frame(FRAME);
        sim.time = 500.0;
        let frame = sim.advance_frame(FRAME);
        assert!((frame.simulation_time - (500.0 + sim.curve().rate(2.0) * FRAME)).abs() < 1e-9);
    }

    #[test]
    fn test_frame_shares_one_time() {
        let mut sim = state();
        let frame = sim.advance_frame(0.2);
        assert_eq!(frame.transforms.len(), 9);
        for (transform, body) in frame.transforms.iter().zip(&sim.bodies) {
            assert_eq!(*transform, resolve_transform(frame.simulation_time, body));
        }
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut sim = state();
        assert_eq!(sim.set_time_scale(5000.0), 1000.0);
        assert_eq!(sim.set_time_scale(0.0), 0.1);
        assert_eq!(sim.set_time_scale(12.5), 12.5);
    }

    #[test]
    fn test_jump_to_date_holds_then_resumes() {
        let mut sim = state();
        let t = sim.jump_to_date(2024, 3, 1).unwrap();
        assert_eq!(t, 60.0 / 20.0);
        assert!(!sim.is_playing);
        assert!(sim.is_holding());

        // 0.5s of frames at the jumped time
        for _ in 0..29 {
            let frame = sim.advance_frame(FRAME);
            assert_eq!(frame.simulation_time, t);
            assert_eq!(frame.date.formatted_date, "March 1, 2024");
        }
        sim.advance_frame(FRAME);
        sim.advance_frame(FRAME);
        assert!(sim.is_playing);
        assert!(!sim.is_holding());

        sim.advance_frame(FRAME);
        assert!(sim.time > t);
    }

    #[test]
    fn test_jump_while_paused_stays_paused() {
        let mut sim = state();
        sim.set_playing(false);
        sim.jump_to_date(1990, 6, 15).unwrap();
        assert!(!sim.is_holding());
        for _ in 0..120 {
            sim.advance_frame(FRAME);
        }
        assert!(!sim.is_playing);
        assert_eq!(
            sim.current_date().date,
            NaiveDate::from_ymd_opt(1990, 6, 15)
        );
    }

    #[test]
    fn test_play_during_hold_cancels_it() {
        let mut sim = state();
        sim.jump_to_date(2030, 1, 1).unwrap();
        sim.set_playing(true);
        assert!(!sim.is_holding());
        let before = sim.time;
        sim.advance_frame(FRAME); // consumes the resync
        sim.advance_frame(FRAME);
        assert!(sim.time > before);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut sim = state();
        for _ in 0..100 {
            sim.advance_frame(FRAME);
        }
        sim.select_body(Some("mars")).unwrap();
        sim.reset(default_catalog());
        assert_eq!(sim.advance_frame(FRAME).simulation_time, 0.0);
        assert_eq!(sim.selected, None);
    }

    #[test]
    fn test_time_cap_keeps_date_sentinel() {
        let mut sim = state();
        sim.set_time_scale(1000.0);
        sim.resync(MAX_SIMULATION_TIME);
        for _ in 0..10 {
            let frame = sim.advance_frame(0.25);
            assert_eq!(frame.simulation_time, MAX_SIMULATION_TIME);
            assert_eq!(frame.date.formatted_date, UNAVAILABLE_DATE);
            assert!(frame.transforms.iter().all(|t| t.position.x.is_finite()));
        }
    }

    #[test]
    fn test_calendar_range_tracked_per_crossing() {
        let mut sim = state();
        sim.advance_frame(FRAME);
        assert!(sim.date_available());

        sim.resync(5.0e6);
        for _ in 0..5 {
            let frame = sim.advance_frame(FRAME);
            assert!(!frame.date.is_available());
            assert!(!sim.date_available());
        }

        sim.resync(0.0);
        let frame = sim.advance_frame(FRAME);
        assert_eq!(frame.date.formatted_date, "January 1, 2024");
        assert!(sim.date_available());
    }

    #[test]
    fn test_select_unknown_body() {
        let mut sim = state();
        let err = sim.select_body(Some("vulcan")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownBody(ref id) if id == "vulcan"));
        assert_eq!(sim.selected, None);
    }

    #[test]
    fn test_display_state() {
        let mut sim = state();
        sim.select_body(Some("earth")).unwrap();
        let display = sim.display_state();
        assert_eq!(display.scale_label, "2.0x");
        assert!(display.rate_description.contains("months/sec"));
        let selected = display.selected.unwrap();
        assert_eq!(selected.orbital_distance_label, "9.3 AU");
        assert_eq!(selected.orbital_speed_label, "0.0200 rad/s");
        assert!((selected.distance_from_star - 9.3).abs() < 1e-9);
    }

    #[test]
    fn test_frontend_state_has_live_positions() {
        let mut sim = state();
        sim.resync(25.0);
        let frontend = sim.to_frontend();
        let earth = frontend
            .celestial_bodies
            .iter()
            .find(|b| b.id == "earth")
            .unwrap();
        assert!((earth.position[0] + 9.3).abs() < 1e-6);

        let json = serde_json::to_value(&frontend).unwrap();
        assert_eq!(json["currentTime"], 25.0);
        assert!(json["celestialBodies"][0]["orbitalDistance"].is_number());
    }

    #[test]
    fn test_commands_emit_notifications() {
        let app = app();
        assert!(!toggle_playing(&app));
        assert!(toggle_playing(&app));
        jump_to_date(&app, 2025, 1, 1).unwrap();
        select_body(&app, Some("saturn")).unwrap();

        let titles: Vec<String> = get_notifications(&app)
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "Simulation Paused",
                "Simulation Resumed",
                "Date Changed",
                "Selected Saturn",
            ]
        );

        let first = get_notifications(&app)[0].id;
        assert!(dismiss_notification(&app, first));
        assert!(!dismiss_notification(&app, first));
        assert_eq!(get_notifications(&app).len(), 3);
    }

    #[test]
    fn test_invalid_date_leaves_time_alone() {
        let app = app();
        advance_frame(&app, FRAME);
        let before = app.simulation.read().time;
        assert!(jump_to_date(&app, 2024, 0, 10).is_err());
        assert_eq!(app.simulation.read().time, before);
        assert!(get_notifications(&app).is_empty());
    }

    #[tokio::test]
    async fn test_load_and_reset_with_bundled_catalog() {
        let app = AppState::with_source(&config(), CatalogSource::Bundled);
        assert_eq!(load_catalog(&app).await.unwrap(), 9);
        assert_eq!(get_cached_bodies(&app).len(), 9);

        for _ in 0..30 {
            advance_frame(&app, FRAME);
        }
        reset_simulation(&app).await.unwrap();
        assert_eq!(advance_frame(&app, FRAME).simulation_time, 0.0);

        assert_eq!(set_time_scale(&app, 2500.0).await, 1000.0);
        assert_eq!(get_display_state(&app).time_scale, 1000.0);
    }

    #[tokio::test]
    async fn test_source_failures_notify_and_keep_state() {
        let source = CatalogSource::from_base_url(Some("http://127.0.0.1:9")).unwrap();
        let app = AppState::with_source(&config(), source);

        assert!(load_catalog(&app).await.is_err());
        assert!(app.simulation.read().bodies.is_empty());

        // The clock keeps running without any bodies
        let frame = advance_frame(&app, FRAME);
        assert!(frame.simulation_time > 0.0);

        assert!(reset_simulation(&app).await.is_err());
        assert_eq!(app.simulation.read().time, frame.simulation_time);

        // Scale changes still apply locally
        assert_eq!(set_time_scale(&app, 4.0).await, 4.0);

        let notes = get_notifications(&app);
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.severity == Severity::Destructive));
    }

    #[tokio::test]
    async fn test_simulation_loop_steps_frames() {
        let app = app();
        let frames = run_simulation_loop(&app, 60, 0.1).await;
        assert!(frames > 0);
        assert!(app.simulation.read().time > 0.0);

        let idle = run_simulation_loop(&app, 60, 0.0).await;
        assert_eq!(idle, 0);
    }
}
