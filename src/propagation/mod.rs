//! Analytic orbit propagation from mean element sets
//!
//! This module implements the NORAD SGP4/SDP4 orbital models. A
//! `Propagator` is initialized once from a two-line element set and then
//! queried for Earth-centered inertial states at arbitrary offsets from
//! the element epoch.
//!
//! # Architecture
//!
//! Initialization derives every model coefficient up front and selects
//! one of two realized models:
//!
//! - **NearEarthModel**: periods under 225 minutes; secular gravity and
//!   drag, with the drag expansion truncated for very low perigees
//! - **DeepSpaceModel**: longer periods; adds lunar/solar perturbations
//!   and a fixed-step resonance integrator for 12 and 24 hour orbits
//!
//! The coefficient sets are immutable after initialization. The only
//! mutable state is the deep-space resonance integrator position, whose
//! restart rules make propagation results independent of call order.
//!
//! # Example
//!
//! ```
//! use tlekit::{Propagator, Tle};
//!
//! let tle = Tle::parse(
//!     "1 25544U 98067A   20062.59097222  .00016717  00000-0  10270-3 0  9005",
//!     "2 25544  51.6442 147.0064 0004607  95.6506 264.5061 15.49249111  9000",
//! )?;
//!
//! let mut propagator = Propagator::new(&tle)?;
//! let eci = propagator.propagate(90.0)?;
//! assert!(eci.altitude() > 300.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod constants;

mod deep_space;
mod elements;
mod error;
mod kernel;
mod near_earth;

pub use elements::OrbitalElements;
pub use error::PropagationError;

use crate::coordinates::Eci;
use crate::time::Julian;
use crate::tle::Tle;
use constants::{AE, CK2, CK4, S, XJ3, XKMPER};
use deep_space::DeepSpaceModel;
use kernel::ShortPeriodics;
use near_earth::NearEarthModel;

/// Orbital period above which the deep-space model is selected, minutes
const DEEP_SPACE_PERIOD: f64 = 225.0;

/// Coefficients shared by both models, immutable after initialization
#[derive(Debug, Clone)]
pub(crate) struct CommonConstants {
    /// Short-period coefficient set at the epoch inclination
    pub periodics: ShortPeriodics,
    pub eta: f64,
    pub c1: f64,
    pub c4: f64,
    pub a3ovk2: f64,
    pub t2cof: f64,
    pub xnodcf: f64,
    /// Secular rate of the mean anomaly, radians/minute
    pub xmdot: f64,
    /// Secular rate of the argument of perigee, radians/minute
    pub omgdot: f64,
    /// Secular rate of the ascending node, radians/minute
    pub xnodot: f64,
}

/// Initialization intermediates consumed by the model constructors
#[derive(Debug, Clone)]
pub(crate) struct InitContext {
    /// Density boundary in Earth radii, after the low-perigee override
    pub s4: f64,
    pub tsi: f64,
    pub coef: f64,
    pub coef1: f64,
    pub etasq: f64,
    pub eeta: f64,
    pub eosq: f64,
    pub betao: f64,
    pub betao2: f64,
}

impl CommonConstants {
    /// Derive the shared coefficient set from a validated element record
    fn derive(elements: &OrbitalElements) -> (CommonConstants, InitContext) {
        let aodp = elements.recovered_semi_major_axis();
        let xnodp = elements.recovered_mean_motion();
        let eccentricity = elements.eccentricity();
        let perigee = elements.perigee_altitude();

        let eosq = eccentricity * eccentricity;
        let betao2 = 1.0 - eosq;
        let betao = betao2.sqrt();

        let a3ovk2 = -XJ3 / CK2 * AE * AE * AE;
        let periodics = ShortPeriodics::new(a3ovk2, elements.inclination());
        let theta2 = periodics.cosio * periodics.cosio;
        let theta4 = theta2 * theta2;

        // the density function boundary drops for very low perigees
        let mut s4 = S;
        let mut qoms24 = constants::qoms2t();
        if perigee < 156.0 {
            s4 = perigee - 78.0;
            if perigee < 98.0 {
                s4 = 20.0;
            }
            qoms24 = ((120.0 - s4) * AE / XKMPER).powi(4);
            s4 = s4 / XKMPER + AE;
        }

        let pinvsq = 1.0 / (aodp * aodp * betao2 * betao2);
        let tsi = 1.0 / (aodp - s4);
        let eta = aodp * eccentricity * tsi;
        let etasq = eta * eta;
        let eeta = eccentricity * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qoms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);

        let c2 = coef1
            * xnodp
            * (aodp * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.75 * CK2 * tsi / psisq
                    * periodics.x3thm1
                    * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let c1 = elements.bstar() * c2;

        let c4 = 2.0
            * xnodp
            * coef1
            * aodp
            * betao2
            * (eta * (2.0 + 0.5 * etasq) + eccentricity * (0.5 + 2.0 * etasq)
                - 2.0 * CK2 * tsi / (aodp * psisq)
                    * (-3.0 * periodics.x3thm1 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * periodics.x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * elements.argument_perigee()).cos()));

        let temp1 = 3.0 * CK2 * pinvsq * xnodp;
        let temp2 = temp1 * CK2 * pinvsq;
        let temp3 = 1.25 * CK4 * pinvsq * pinvsq * xnodp;

        let xmdot = xnodp
            + 0.5 * temp1 * betao * periodics.x3thm1
            + 0.0625 * temp2 * betao * (13.0 - 78.0 * theta2 + 137.0 * theta4);

        let x1m5th = 1.0 - 5.0 * theta2;
        let omgdot = -0.5 * temp1 * x1m5th
            + 0.0625 * temp2 * (7.0 - 114.0 * theta2 + 395.0 * theta4)
            + temp3 * (3.0 - 36.0 * theta2 + 49.0 * theta4);

        let xhdot1 = -temp1 * periodics.cosio;
        let xnodot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * theta2) + 2.0 * temp3 * (3.0 - 7.0 * theta2))
                * periodics.cosio;
        let xnodcf = 3.5 * betao2 * xhdot1 * c1;

        let common = CommonConstants {
            periodics,
            eta,
            c1,
            c4,
            a3ovk2,
            t2cof: 1.5 * c1,
            xnodcf,
            xmdot,
            omgdot,
            xnodot,
        };

        let context = InitContext {
            s4,
            tsi,
            coef,
            coef1,
            etasq,
            eeta,
            eosq,
            betao,
            betao2,
        };

        (common, context)
    }
}

/// Realized propagation model, selected once at initialization
#[derive(Debug, Clone)]
enum Model {
    NearEarth(NearEarthModel),
    DeepSpace(Box<DeepSpaceModel>),
}

/// SGP4/SDP4 orbit propagator
///
/// Holds the validated element record and the coefficient sets derived
/// from it. Propagation is cheap; initialization does all the heavy
/// lifting once per element set.
#[derive(Debug, Clone)]
pub struct Propagator {
    elements: OrbitalElements,
    model: Model,
}

impl Propagator {
    /// Initialize a propagator from a parsed element set
    ///
    /// Fails with `OutOfRange` when the elements are outside their
    /// physical bounds.
    pub fn new(tle: &Tle) -> Result<Self, PropagationError> {
        let elements = OrbitalElements::from_tle(tle)?;
        Ok(Self::from_elements(elements))
    }

    fn from_elements(elements: OrbitalElements) -> Self {
        let (common, context) = CommonConstants::derive(&elements);

        let model = if elements.period() >= DEEP_SPACE_PERIOD {
            Model::DeepSpace(Box::new(DeepSpaceModel::new(&elements, &context, common)))
        } else {
            Model::NearEarth(NearEarthModel::new(&elements, &context, common))
        };

        Self { elements, model }
    }

    /// Replace the element set, discarding all derived state
    pub fn set_elements(&mut self, tle: &Tle) -> Result<(), PropagationError> {
        *self = Self::new(tle)?;
        Ok(())
    }

    /// Propagate to `tsince` minutes after the element epoch
    ///
    /// Negative times propagate before the epoch. The returned state is
    /// dated `epoch + tsince`.
    pub fn propagate(&mut self, tsince: f64) -> Result<Eci, PropagationError> {
        match &mut self.model {
            Model::NearEarth(model) => model.propagate(&self.elements, tsince),
            Model::DeepSpace(model) => model.propagate(&self.elements, tsince),
        }
    }

    /// Propagate to an absolute date
    pub fn propagate_at(&mut self, date: &Julian) -> Result<Eci, PropagationError> {
        let tsince = date.span_minutes(&self.elements.epoch());
        self.propagate(tsince)
    }

    /// The validated element record backing this propagator
    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    /// Whether the deep-space model is active (period of 225 minutes up)
    pub fn uses_deep_space(&self) -> bool {
        matches!(self.model, Model::DeepSpace(_))
    }

    /// Whether the truncated low-perigee drag model is active
    pub fn uses_simple_model(&self) -> bool {
        match &self.model {
            Model::NearEarth(model) => model.uses_simple_model(),
            Model::DeepSpace(_) => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn deep_space_model(&self) -> Option<&DeepSpaceModel> {
        match &self.model {
            Model::DeepSpace(model) => Some(model),
            Model::NearEarth(_) => None,
        }
    }
}
