//! Earth-centered inertial state representation
//!
//! Carries the output of a propagation step: a dated position and
//! velocity in the true-equator mean-equinox frame the analytic models
//! work in.

use crate::propagation::constants::XKMPER;
use crate::time::Julian;
use nalgebra::Vector3;

/// Dated position and velocity in an Earth-centered inertial frame
///
/// Position is in kilometers, velocity in kilometers per second.
#[derive(Debug, Clone, PartialEq)]
pub struct Eci {
    /// Date of this state
    pub date: Julian,

    /// Position in km
    pub position: Vector3<f64>,

    /// Velocity in km/s
    pub velocity: Vector3<f64>,
}

impl Eci {
    /// Create a new state
    pub fn new(date: Julian, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            date,
            position,
            velocity,
        }
    }

    /// Distance from the Earth center in km
    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    /// Altitude above the Earth equatorial radius in km
    pub fn altitude(&self) -> f64 {
        self.radius() - XKMPER
    }

    /// Orbital speed in km/s
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}
