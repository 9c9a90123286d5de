//! Near-earth propagation model
//!
//! Handles objects with orbital periods under 225 minutes. Secular
//! gravity and drag act on the mean elements directly; no third-body or
//! resonance effects are modeled. For perigees under 220 km the drag
//! expansion is truncated to linear variation in sqrt(a) and quadratic
//! variation in mean anomaly.

use super::constants::TWOTHIRD;
use super::elements::OrbitalElements;
use super::error::PropagationError;
use super::kernel::{self, Trajectory};
use super::{CommonConstants, InitContext};
use crate::coordinates::Eci;

/// Near-earth coefficient set and propagation path
#[derive(Debug, Clone)]
pub(crate) struct NearEarthModel {
    common: CommonConstants,

    /// Higher-order drag terms, absent for the truncated low-perigee model
    drag: Option<DragExpansion>,
}

/// Drag coefficients beyond the linear model
#[derive(Debug, Clone)]
struct DragExpansion {
    c5: f64,
    omgcof: f64,
    xmcof: f64,
    delmo: f64,
    sinmo: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    t3cof: f64,
    t4cof: f64,
    t5cof: f64,
}

impl DragExpansion {
    fn new(elements: &OrbitalElements, context: &InitContext, common: &CommonConstants) -> Self {
        let aodp = elements.recovered_semi_major_axis();
        let eccentricity = elements.eccentricity();
        let etasq = context.etasq;
        let eeta = context.eeta;
        let tsi = context.tsi;

        // c3 and the mean anomaly coefficient vanish for near-circular sets
        let mut c3 = 0.0;
        let mut xmcof = 0.0;
        if eccentricity > 1.0e-4 {
            c3 = context.coef * tsi * common.a3ovk2 * elements.recovered_mean_motion()
                * common.periodics.sinio
                / eccentricity;
            xmcof = -TWOTHIRD * context.coef * elements.bstar() / eeta;
        }

        let c5 = 2.0
            * context.coef1
            * aodp
            * context.betao2
            * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        let c1sq = common.c1 * common.c1;
        let d2 = 4.0 * aodp * tsi * c1sq;
        let temp = d2 * tsi * common.c1 / 3.0;
        let d3 = (17.0 * aodp + context.s4) * temp;
        let d4 = 0.5 * temp * aodp * tsi * (221.0 * aodp + 31.0 * context.s4) * common.c1;

        Self {
            c5,
            omgcof: elements.bstar() * c3 * elements.argument_perigee().cos(),
            xmcof,
            delmo: (1.0 + common.eta * elements.mean_anomaly().cos()).powi(3),
            sinmo: elements.mean_anomaly().sin(),
            d2,
            d3,
            d4,
            t3cof: d2 + 2.0 * c1sq,
            t4cof: 0.25 * (3.0 * d3 + common.c1 * (12.0 * d2 + 10.0 * c1sq)),
            t5cof: 0.2
                * (3.0 * d4 + 12.0 * common.c1 * d3 + 6.0 * d2 * d2
                    + 15.0 * c1sq * (2.0 * d2 + c1sq)),
        }
    }
}

impl NearEarthModel {
    pub(crate) fn new(
        elements: &OrbitalElements,
        context: &InitContext,
        common: CommonConstants,
    ) -> Self {
        let use_simple_model = elements.perigee_altitude() < 220.0;
        let drag = if use_simple_model {
            None
        } else {
            Some(DragExpansion::new(elements, context, &common))
        };

        Self { common, drag }
    }

    /// Whether the truncated low-perigee drag model is active
    pub(crate) fn uses_simple_model(&self) -> bool {
        self.drag.is_none()
    }

    pub(crate) fn propagate(
        &self,
        elements: &OrbitalElements,
        tsince: f64,
    ) -> Result<Eci, PropagationError> {
        let common = &self.common;
        let tsq = tsince * tsince;

        // secular gravity and atmospheric drag
        let xmdf = elements.mean_anomaly() + common.xmdot * tsince;
        let omgadf = elements.argument_perigee() + common.omgdot * tsince;
        let xnoddf = elements.ascending_node() + common.xnodot * tsince;

        let xnode = xnoddf + common.xnodcf * tsq;
        let mut tempa = 1.0 - common.c1 * tsince;
        let mut tempe = elements.bstar() * common.c4 * tsince;
        let mut templ = common.t2cof * tsq;

        let mut omega = omgadf;
        let mut xmp = xmdf;

        if let Some(drag) = &self.drag {
            let delomg = drag.omgcof * tsince;
            let delm =
                drag.xmcof * ((1.0 + common.eta * xmdf.cos()).powi(3) - drag.delmo);
            let temp = delomg + delm;

            xmp += temp;
            omega -= temp;

            let tcube = tsq * tsince;
            let tfour = tsince * tcube;

            tempa = tempa - drag.d2 * tsq - drag.d3 * tcube - drag.d4 * tfour;
            tempe += elements.bstar() * drag.c5 * (xmp.sin() - drag.sinmo);
            templ += drag.t3cof * tcube + tfour * (drag.t4cof + tsince * drag.t5cof);
        }

        let a = elements.recovered_semi_major_axis() * tempa * tempa;
        let e = elements.eccentricity() - tempe;
        let xl = xmp + omega + xnode + elements.recovered_mean_motion() * templ;

        if xl <= 0.0 {
            return Err(PropagationError::InternalError {
                reason: "mean longitude is not positive",
            });
        }

        if e >= 1.0 || e < -1.0e-3 {
            return Err(PropagationError::EccentricityOutOfRange { eccentricity: e });
        }
        // keep the Kepler stage away from a singular denominator
        let e = e.max(1.0e-6);

        let trajectory = Trajectory {
            eccentricity: e,
            semi_major_axis: a,
            argument_perigee: omega,
            mean_longitude: xl,
            ascending_node: xnode,
            inclination: elements.inclination(),
        };

        kernel::final_position_velocity(
            elements.epoch().add_minutes(tsince),
            &trajectory,
            &common.periodics,
        )
    }
}
