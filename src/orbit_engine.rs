// Orbit Engine - Kinematic orbital positions
// Circular orbits parametrised directly by simulation time, tilted by inclination

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Self-rotation rate applied to a star whose catalog entry carries none.
/// Revolutions per simulation unit.
pub const STAR_SPIN_RATE: f64 = 0.005;

/// Identifier the catalog uses for the central star
pub const STAR_ID: &str = "sun";

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Distance from the y axis, i.e. the radius in the x-z plane
    pub fn planar_magnitude(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Rotate about the x axis by `angle` radians
    pub fn rotate_x(&self, angle: f64) -> Vector3 {
        let (sin_a, cos_a) = angle.sin_cos();
        Vector3 {
            x: self.x,
            y: self.y * cos_a - self.z * sin_a,
            z: self.y * sin_a + self.z * cos_a,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// =============================================================================
// ORBITAL BODY
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BodyKind {
    Star,
    Planet,
}

/// Descriptive facts shown in the detail panel. Never used by the math.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyInfo {
    pub mass: String,
    pub diameter: String,
    pub day_length: String,
    pub year_length: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moons: Option<u32>,
}

/// One catalog entry. Immutable for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrbitalBody {
    pub id: String,
    pub name: String,
    /// Position reported by the data source at load time; superseded every frame
    #[serde(default)]
    pub position: [f64; 3],
    /// Self-spin coefficient, revolutions per simulation unit
    #[serde(rename = "rotation")]
    pub rotation_rate: f64,
    pub radius: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    /// Revolutions per simulation unit
    pub orbital_speed: f64,
    pub orbital_distance: f64,
    /// Tilt of the orbital plane (radians)
    pub orbital_inclination: f64,
    pub info: BodyInfo,
}

impl OrbitalBody {
    pub fn kind(&self) -> BodyKind {
        if self.id == STAR_ID || (self.orbital_distance == 0.0 && self.orbital_speed == 0.0) {
            BodyKind::Star
        } else {
            BodyKind::Planet
        }
    }

    pub fn is_star(&self) -> bool {
        self.kind() == BodyKind::Star
    }

    /// Spin rate actually used by the resolver
    pub fn effective_rotation_rate(&self) -> f64 {
        if self.is_star() && self.rotation_rate == 0.0 {
            STAR_SPIN_RATE
        } else {
            self.rotation_rate
        }
    }
}

// =============================================================================
// ORBITAL POSITION RESOLVER
// =============================================================================

/// Plain numeric transform handed to the renderer for one body in one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyTransform {
    pub id: String,
    pub position: Vector3,
    /// Angle along the orbit (radians, unwrapped)
    pub orbit_angle: f64,
    /// Spin about the body's own axis (radians, unwrapped)
    pub self_rotation: f64,
    pub inclination: f64,
}

/// Angle along the orbit at `sim_time`: one revolution per `1 / orbital_speed` units
pub fn orbital_angle(sim_time: f64, body: &OrbitalBody) -> f64 {
    sim_time * body.orbital_speed * TAU
}

pub fn self_rotation_angle(sim_time: f64, body: &OrbitalBody) -> f64 {
    sim_time * body.effective_rotation_rate() * TAU
}

/// Position on the circular path, with the orbital plane tilted about the x axis
pub fn orbital_position(sim_time: f64, body: &OrbitalBody) -> Vector3 {
    if body.is_star() || body.orbital_distance == 0.0 {
        return Vector3::zero();
    }

    let angle = orbital_angle(sim_time, body);
    let (sin_a, cos_a) = angle.sin_cos();
    let in_plane = Vector3::new(
        body.orbital_distance * cos_a,
        0.0,
        body.orbital_distance * sin_a,
    );

    in_plane.rotate_x(body.orbital_inclination)
}

/// Resolve the full transform of `body` at `sim_time`.
///
/// Pure: the result depends only on the arguments, never on how many frames
/// were stepped to reach `sim_time`.
pub fn resolve_transform(sim_time: f64, body: &OrbitalBody) -> BodyTransform {
    BodyTransform {
        id: body.id.clone(),
        position: orbital_position(sim_time, body),
        orbit_angle: if body.is_star() {
            0.0
        } else {
            orbital_angle(sim_time, body)
        },
        self_rotation: self_rotation_angle(sim_time, body),
        inclination: body.orbital_inclination,
    }
}

/// Resolve every body against the same simulation time
pub fn resolve_all(sim_time: f64, bodies: &[OrbitalBody]) -> Vec<BodyTransform> {
    bodies
        .iter()
        .map(|body| resolve_transform(sim_time, body))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
