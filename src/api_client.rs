// Simulation API Client
// Loads the body catalog from the simulation service, or from the bundled set

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::calendar::CalendarDate;
use crate::error::{EngineError, EngineResult};
use crate::orbit_engine::{BodyInfo, OrbitalBody};

/// Per-request timeout for the simulation service
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// API RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationData {
    pub time_scale: f64,
    pub current_time: f64,
    pub celestial_bodies: Vec<OrbitalBody>,
    pub simulation_date: CalendarDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub time_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub time_scale: Option<f64>,
}

// =============================================================================
// BUNDLED CATALOG
// =============================================================================

struct CatalogEntry {
    id: &'static str,
    name: &'static str,
    rotation: f64,
    radius: f64,
    color: &'static str,
    orbital_speed: f64,
    orbital_distance: f64,
    orbital_inclination: f64,
    mass: &'static str,
    diameter: &'static str,
    day_length: &'static str,
    year_length: &'static str,
    description: &'static str,
    temperature: &'static str,
    moons: Option<u32>,
}

const BUNDLED_BODIES: [CatalogEntry; 9] = [
    CatalogEntry {
        id: "sun",
        name: "Sun",
        rotation: 0.0,
        radius: 2.0,
        color: "#FDB813",
        orbital_speed: 0.0,
        orbital_distance: 0.0,
        orbital_inclination: 0.0,
        mass: "1.989 × 10^30 kg",
        diameter: "1,392,684 km",
        day_length: "27 Earth days",
        year_length: "N/A",
        description: "The Sun is the star at the center of the Solar System.",
        temperature: "5,778 K (surface)",
        moons: None,
    },
    CatalogEntry {
        id: "mercury",
        name: "Mercury",
        rotation: 0.008,
        radius: 0.38,
        color: "#A9A9A9",
        orbital_speed: 0.08,
        orbital_distance: 3.5,
        orbital_inclination: 0.03,
        mass: "3.3011 × 10^23 kg",
        diameter: "4,879.4 km",
        day_length: "58.7 Earth days",
        year_length: "88 Earth days",
        description: "Mercury is the smallest and innermost planet in the Solar System.",
        temperature: "430°C (day), -180°C (night)",
        moons: Some(0),
    },
    CatalogEntry {
        id: "venus",
        name: "Venus",
        rotation: 0.004,
        radius: 0.95,
        color: "#E8B23C",
        orbital_speed: 0.03,
        orbital_distance: 6.7,
        orbital_inclination: 0.009,
        mass: "4.8675 × 10^24 kg",
        diameter: "12,104 km",
        day_length: "243 Earth days",
        year_length: "225 Earth days",
        description: "Venus is the second planet from the Sun and the hottest planet in our solar system.",
        temperature: "462°C (average)",
        moons: Some(0),
    },
    CatalogEntry {
        id: "earth",
        name: "Earth",
        rotation: 0.02,
        radius: 1.0,
        color: "#4B94D1",
        orbital_speed: 0.02,
        orbital_distance: 9.3,
        orbital_inclination: 0.002,
        mass: "5.9722 × 10^24 kg",
        diameter: "12,742 km",
        day_length: "24 hours",
        year_length: "365.25 days",
        description: "Earth is the third planet from the Sun and the only astronomical object known to harbor life.",
        temperature: "15°C (average)",
        moons: Some(1),
    },
    CatalogEntry {
        id: "mars",
        name: "Mars",
        rotation: 0.018,
        radius: 0.53,
        color: "#C1440E",
        orbital_speed: 0.016,
        orbital_distance: 14.2,
        orbital_inclination: 0.035,
        mass: "6.4169 × 10^23 kg",
        diameter: "6,779 km",
        day_length: "24.6 hours",
        year_length: "687 Earth days",
        description: "Mars is the fourth planet from the Sun and the second-smallest planet in the Solar System.",
        temperature: "-65°C (average)",
        moons: Some(2),
    },
    CatalogEntry {
        id: "jupiter",
        name: "Jupiter",
        rotation: 0.04,
        radius: 11.2,
        color: "#E7B861",
        orbital_speed: 0.008,
        orbital_distance: 48.4,
        orbital_inclination: 0.01,
        mass: "1.8981 × 10^27 kg",
        diameter: "139,820 km",
        day_length: "9.8 hours",
        year_length: "12 Earth years",
        description: "Jupiter is the fifth planet from the Sun and the largest in the Solar System.",
        temperature: "-145°C (cloud tops)",
        moons: Some(79),
    },
    CatalogEntry {
        id: "saturn",
        name: "Saturn",
        rotation: 0.036,
        radius: 9.4,
        color: "#F4D29E",
        orbital_speed: 0.006,
        orbital_distance: 88.9,
        orbital_inclination: 0.023,
        mass: "5.6832 × 10^26 kg",
        diameter: "116,460 km",
        day_length: "10.7 hours",
        year_length: "29 Earth years",
        description: "Saturn is the sixth planet from the Sun and the second-largest in the Solar System.",
        temperature: "-178°C (average)",
        moons: Some(82),
    },
    CatalogEntry {
        id: "uranus",
        name: "Uranus",
        rotation: 0.024,
        radius: 4.0,
        color: "#9AB8E5",
        orbital_speed: 0.0022,
        orbital_distance: 179.0,
        orbital_inclination: 0.057,
        mass: "8.6810 × 10^25 kg",
        diameter: "50,724 km",
        day_length: "17.2 hours",
        year_length: "84 Earth years",
        description: "Uranus is the seventh planet from the Sun and has the third-largest diameter in our solar system.",
        temperature: "-224°C (average)",
        moons: Some(27),
    },
    CatalogEntry {
        id: "neptune",
        name: "Neptune",
        rotation: 0.028,
        radius: 3.9,
        color: "#4968AA",
        orbital_speed: 0.0016,
        orbital_distance: 288.0,
        orbital_inclination: 0.042,
        mass: "1.0241 × 10^26 kg",
        diameter: "49,244 km",
        day_length: "16.1 hours",
        year_length: "165 Earth years",
        description: "Neptune is the eighth planet from the Sun and the farthest known planet in the Solar System.",
        temperature: "-214°C (average)",
        moons: Some(14),
    },
];

impl CatalogEntry {
    fn to_body(&self) -> OrbitalBody {
        OrbitalBody {
            id: self.id.to_string(),
            name: self.name.to_string(),
            position: [self.orbital_distance, 0.0, 0.0],
            rotation_rate: self.rotation,
            radius: self.radius,
            color: self.color.to_string(),
            texture: None,
            orbital_speed: self.orbital_speed,
            orbital_distance: self.orbital_distance,
            orbital_inclination: self.orbital_inclination,
            info: BodyInfo {
                mass: self.mass.to_string(),
                diameter: self.diameter.to_string(),
                day_length: self.day_length.to_string(),
                year_length: self.year_length.to_string(),
                description: self.description.to_string(),
                temperature: Some(self.temperature.to_string()),
                moons: self.moons,
            },
        }
    }
}

/// The star and eight planets shipped with the crate
pub fn default_catalog() -> Vec<OrbitalBody> {
    BUNDLED_BODIES.iter().map(CatalogEntry::to_body).collect()
}

/// Reject catalogs the resolver cannot animate sensibly
pub fn validate_catalog(bodies: &[OrbitalBody]) -> EngineResult<()> {
    if bodies.is_empty() {
        return Err(EngineError::Catalog("no bodies".to_string()));
    }

    let mut seen = HashSet::new();
    for body in bodies {
        if !seen.insert(body.id.as_str()) {
            return Err(EngineError::Catalog(format!("duplicate id {}", body.id)));
        }
        if !(body.orbital_distance.is_finite() && body.orbital_distance >= 0.0) {
            return Err(EngineError::Catalog(format!(
                "{} has invalid orbital distance {}",
                body.id, body.orbital_distance
            )));
        }
        let rates = [
            body.orbital_speed,
            body.rotation_rate,
            body.orbital_inclination,
        ];
        if rates.iter().any(|value| !value.is_finite()) {
            return Err(EngineError::Catalog(format!(
                "{} has non-finite orbital parameters",
                body.id
            )));
        }
    }
    Ok(())
}

// =============================================================================
// API CLIENT
// =============================================================================

pub struct SimulationClient {
    base_url: String,
    client: reqwest::Client,
}

impl SimulationClient {
    pub fn new(base_url: impl Into<String>) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Fetch the body catalog and the service's view of the simulation
    pub async fn fetch_simulation(&self) -> EngineResult<SimulationData> {
        let url = format!("{}/simulation", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Push the time scale to the service
    pub async fn update_settings(&self, time_scale: f64) -> EngineResult<StatusResponse> {
        let url = format!("{}/simulation/settings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&SettingsRequest { time_scale })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EngineError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Ask the service to reset its simulation
    pub async fn reset(&self) -> EngineResult<StatusResponse> {
        let url = format!("{}/simulation/reset", self.base_url);

        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

// =============================================================================
// CATALOG SOURCE
// =============================================================================

pub enum CatalogSource {
    Bundled,
    Remote(SimulationClient),
}

impl CatalogSource {
    pub fn from_base_url(base_url: Option<&str>) -> EngineResult<Self> {
        Ok(match base_url {
            Some(url) => CatalogSource::Remote(SimulationClient::new(url)?),
            None => CatalogSource::Bundled,
        })
    }

    pub async fn load(&self) -> EngineResult<Vec<OrbitalBody>> {
        let bodies = match self {
            CatalogSource::Bundled => default_catalog(),
            CatalogSource::Remote(client) => client.fetch_simulation().await?.celestial_bodies,
        };
        validate_catalog(&bodies)?;
        Ok(bodies)
    }

    /// Reset the remote simulation (if any) and load a fresh snapshot
    pub async fn reload(&self) -> EngineResult<Vec<OrbitalBody>> {
        if let CatalogSource::Remote(client) = self {
            client.reset().await?;
        }
        self.load().await
    }

    pub async fn push_time_scale(&self, time_scale: f64) -> EngineResult<()> {
        if let CatalogSource::Remote(client) = self {
            client.update_settings(time_scale).await?;
        }
        Ok(())
    }
}

// =============================================================================
// CACHE MANAGER
// =============================================================================

pub struct CatalogCache {
    bodies: Arc<RwLock<Vec<OrbitalBody>>>,
    last_fetch: Arc<RwLock<Option<Instant>>>,
    cache_duration: Duration,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::with_duration(Duration::from_secs(3600))
    }

    pub fn with_duration(cache_duration: Duration) -> Self {
        Self {
            bodies: Arc::new(RwLock::new(Vec::new())),
            last_fetch: Arc::new(RwLock::new(None)),
            cache_duration,
        }
    }

    pub fn get_bodies(&self) -> Vec<OrbitalBody> {
        self.bodies.read().clone()
    }

    pub fn set_bodies(&self, bodies: Vec<OrbitalBody>) {
        *self.bodies.write() = bodies;
        *self.last_fetch.write() = Some(Instant::now());
    }

    pub fn is_cache_valid(&self) -> bool {
        if let Some(last) = *self.last_fetch.read() {
            last.elapsed() < self.cache_duration
        } else {
            false
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.read().len()
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
