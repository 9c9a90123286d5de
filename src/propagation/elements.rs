//! Validated mean-element record
//!
//! Converts a parsed element set into the radians/minutes units the
//! models work in, validates the physical bounds, and recovers the
//! unperturbed Brouwer mean motion and semi-major axis the rest of the
//! initialization is built on.

use super::constants::{self, AE, CK2, TWOPI, TWOTHIRD, XKMPER};
use super::error::PropagationError;
use crate::time::Julian;
use crate::tle::Tle;

/// Largest eccentricity accepted at intake
const ECCENTRICITY_MAX: f64 = 1.0 - 1.0e-3;

/// Mean orbital elements, immutable once built
///
/// Angles are radians, mean motion is radians per minute, distances are
/// Earth radii except where noted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElements {
    mean_anomaly: f64,
    ascending_node: f64,
    argument_perigee: f64,
    eccentricity: f64,
    inclination: f64,
    mean_motion: f64,
    bstar: f64,
    epoch: Julian,

    recovered_mean_motion: f64,
    recovered_semi_major_axis: f64,
    perigee_altitude: f64,
    period: f64,
}

impl OrbitalElements {
    /// Build a validated element record from a parsed element set
    ///
    /// Fails with `OutOfRange` when eccentricity falls outside
    /// [0, 1 - 1e-3) or inclination falls outside [0, pi].
    pub fn from_tle(tle: &Tle) -> Result<Self, PropagationError> {
        let eccentricity = tle.eccentricity;
        if !(0.0..=ECCENTRICITY_MAX).contains(&eccentricity) {
            return Err(PropagationError::OutOfRange {
                element: "eccentricity",
                value: eccentricity,
            });
        }

        let inclination = tle.inclination_deg.to_radians();
        if !(0.0..=std::f64::consts::PI).contains(&inclination) {
            return Err(PropagationError::OutOfRange {
                element: "inclination",
                value: inclination,
            });
        }

        // rev/day to radians/minute
        let mean_motion = tle.mean_motion * TWOPI / constants::MIN_PER_DAY;

        // recover the unperturbed mean motion and semi-major axis from
        // the Brouwer mean elements
        let a1 = (constants::xke() / mean_motion).powf(TWOTHIRD);
        let cosio = inclination.cos();
        let theta2 = cosio * cosio;
        let x3thm1 = 3.0 * theta2 - 1.0;
        let eosq = eccentricity * eccentricity;
        let betao2 = 1.0 - eosq;
        let betao = betao2.sqrt();
        let temp = (1.5 * CK2) * x3thm1 / (betao * betao2);
        let del1 = temp / (a1 * a1);
        let a0 = a1 * (1.0 - del1 * (1.0 / 3.0 + del1 * (1.0 + del1 * 134.0 / 81.0)));
        let del0 = temp / (a0 * a0);

        let recovered_mean_motion = mean_motion / (1.0 + del0);
        let recovered_semi_major_axis = a0 / (1.0 - del0);

        let perigee_altitude =
            (recovered_semi_major_axis * (1.0 - eccentricity) - AE) * XKMPER;
        let period = TWOPI / recovered_mean_motion;

        Ok(Self {
            mean_anomaly: tle.mean_anomaly_deg.to_radians(),
            ascending_node: tle.right_ascension_deg.to_radians(),
            argument_perigee: tle.argument_perigee_deg.to_radians(),
            eccentricity,
            inclination,
            mean_motion,
            bstar: tle.bstar,
            epoch: tle.epoch(),
            recovered_mean_motion,
            recovered_semi_major_axis,
            perigee_altitude,
            period,
        })
    }

    /// Mean anomaly at epoch in radians
    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// Right ascension of the ascending node at epoch in radians
    pub fn ascending_node(&self) -> f64 {
        self.ascending_node
    }

    /// Argument of perigee at epoch in radians
    pub fn argument_perigee(&self) -> f64 {
        self.argument_perigee
    }

    /// Eccentricity at epoch
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Inclination at epoch in radians
    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    /// Mean motion from the element set in radians per minute
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// Drag term B* in reciprocal Earth radii
    pub fn bstar(&self) -> f64 {
        self.bstar
    }

    /// Element set epoch
    pub fn epoch(&self) -> Julian {
        self.epoch
    }

    /// Recovered unperturbed mean motion in radians per minute
    pub fn recovered_mean_motion(&self) -> f64 {
        self.recovered_mean_motion
    }

    /// Recovered unperturbed semi-major axis in Earth radii
    pub fn recovered_semi_major_axis(&self) -> f64 {
        self.recovered_semi_major_axis
    }

    /// Perigee altitude above the Earth surface in km
    pub fn perigee_altitude(&self) -> f64 {
        self.perigee_altitude
    }

    /// Orbital period in minutes
    pub fn period(&self) -> f64 {
        self.period
    }
}
