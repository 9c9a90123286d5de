//! Kepler solver and short-period corrections
//!
//! Final stage shared by both models: given the secular-and-periodic
//! perturbed mean elements at the target time, solve Kepler's equation
//! for the eccentric anomaly, apply the J2 short-period corrections, and
//! assemble the Cartesian state.

use super::constants::{self, CK2, TWOPI, XKMPER};
use super::error::PropagationError;
use crate::coordinates::Eci;
use crate::time::Julian;
use nalgebra::Vector3;

/// Kepler iteration cap
const MAX_KEPLER_ITERATIONS: usize = 10;

/// Convergence threshold on the Kepler residual
const KEPLER_TOLERANCE: f64 = 1.0e-12;

/// Guard denominator for the long-period coefficient near cos(i) = -1
const XLCOF_GUARD: f64 = 1.5e-12;

/// Short-period coefficient set tied to one inclination value
///
/// The near-earth model evaluates this once at epoch; the deep-space
/// model rebuilds it each call from the perturbed inclination.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShortPeriodics {
    pub cosio: f64,
    pub sinio: f64,
    pub x3thm1: f64,
    pub x1mth2: f64,
    pub x7thm1: f64,
    pub aycof: f64,
    pub xlcof: f64,
}

impl ShortPeriodics {
    pub(crate) fn new(a3ovk2: f64, inclination: f64) -> Self {
        let cosio = inclination.cos();
        let sinio = inclination.sin();
        let theta2 = cosio * cosio;

        let denominator = if (cosio + 1.0).abs() > XLCOF_GUARD {
            1.0 + cosio
        } else {
            XLCOF_GUARD
        };

        Self {
            cosio,
            sinio,
            x3thm1: 3.0 * theta2 - 1.0,
            x1mth2: 1.0 - theta2,
            x7thm1: 7.0 * theta2 - 1.0,
            aycof: 0.25 * a3ovk2 * sinio,
            xlcof: 0.125 * a3ovk2 * sinio * (3.0 + 5.0 * cosio) / denominator,
        }
    }
}

/// Perturbed osculating-mean elements entering the final stage
#[derive(Debug, Clone)]
pub(crate) struct Trajectory {
    pub eccentricity: f64,
    /// Semi-major axis in Earth radii
    pub semi_major_axis: f64,
    pub argument_perigee: f64,
    /// Mean longitude, the sum of mean anomaly, perigee, and node
    pub mean_longitude: f64,
    pub ascending_node: f64,
    pub inclination: f64,
}

/// Solve Kepler's equation and assemble the Cartesian state
pub(crate) fn final_position_velocity(
    date: Julian,
    trajectory: &Trajectory,
    periodics: &ShortPeriodics,
) -> Result<Eci, PropagationError> {
    let e = trajectory.eccentricity;
    let a = trajectory.semi_major_axis;
    let omega = trajectory.argument_perigee;
    let xnode = trajectory.ascending_node;
    let xke = constants::xke();

    let beta = (1.0 - e * e).sqrt();
    let xn = xke / a.powf(1.5);

    // long period periodics
    let axn = e * omega.cos();
    let temp = 1.0 / (a * beta * beta);
    let xll = temp * periodics.xlcof * axn;
    let aynl = temp * periodics.aycof;
    let xlt = trajectory.mean_longitude + xll;
    let ayn = e * omega.sin() + aynl;
    let elsq = axn * axn + ayn * ayn;

    // Newton-Raphson solution for the eccentric anomaly; the reduction
    // of the angle keeps sin/cos well conditioned
    let capu = (xlt - xnode) % TWOPI;
    let mut epw = capu;

    let mut sinepw = 0.0;
    let mut cosepw = 0.0;
    let mut ecose = 0.0;
    let mut esine = 0.0;

    // clamp for the first correction step
    let max_newton_raphson = 1.25 * elsq.sqrt().abs();

    for iteration in 0..MAX_KEPLER_ITERATIONS {
        sinepw = epw.sin();
        cosepw = epw.cos();
        ecose = axn * cosepw + ayn * sinepw;
        esine = axn * sinepw - ayn * cosepw;

        let f = capu - epw + esine;
        if f.abs() < KEPLER_TOLERANCE {
            break;
        }

        let fdot = 1.0 - ecose;
        let mut delta_epw = f / fdot;

        if iteration == 0 {
            delta_epw = delta_epw.clamp(-max_newton_raphson, max_newton_raphson);
        } else {
            // second order correction, f / (fdot - 0.5 * d2f * f / fdot)
            delta_epw = f / (fdot + 0.5 * esine * delta_epw);
        }

        epw += delta_epw;
    }

    // short period preliminary quantities
    let temp = 1.0 - elsq;
    let pl = a * temp;
    if pl < 0.0 {
        return Err(PropagationError::InternalError {
            reason: "semi-latus rectum is negative",
        });
    }

    let r = a * (1.0 - ecose);
    let temp1 = 1.0 / r;
    let rdot = xke * a.sqrt() * esine * temp1;
    let rfdot = xke * pl.sqrt() * temp1;
    let temp2 = a * temp1;
    let betal = temp.sqrt();
    let temp3 = 1.0 / (1.0 + betal);
    let cosu = temp2 * (cosepw - axn + ayn * esine * temp3);
    let sinu = temp2 * (sinepw - ayn - axn * esine * temp3);
    let u = sinu.atan2(cosu);
    let sin2u = 2.0 * sinu * cosu;
    let cos2u = 2.0 * cosu * cosu - 1.0;

    let temp = 1.0 / pl;
    let temp1 = CK2 * temp;
    let temp2 = temp1 * temp;

    // update for short periodics
    let rk =
        r * (1.0 - 1.5 * temp2 * betal * periodics.x3thm1) + 0.5 * temp1 * periodics.x1mth2 * cos2u;
    let uk = u - 0.25 * temp2 * periodics.x7thm1 * sin2u;
    let xnodek = xnode + 1.5 * temp2 * periodics.cosio * sin2u;
    let xinck = trajectory.inclination + 1.5 * temp2 * periodics.cosio * periodics.sinio * cos2u;
    let rdotk = rdot - xn * temp1 * periodics.x1mth2 * sin2u;
    let rfdotk = rfdot + xn * temp1 * (periodics.x1mth2 * cos2u + 1.5 * periodics.x3thm1);

    if rk < 1.0 {
        return Err(PropagationError::Decayed {
            radius_km: rk * XKMPER,
        });
    }

    // orientation vectors
    let sinuk = uk.sin();
    let cosuk = uk.cos();
    let sinik = xinck.sin();
    let cosik = xinck.cos();
    let sinnok = xnodek.sin();
    let cosnok = xnodek.cos();
    let xmx = -sinnok * cosik;
    let xmy = cosnok * cosik;

    let u_vec = Vector3::new(
        xmx * sinuk + cosnok * cosuk,
        xmy * sinuk + sinnok * cosuk,
        sinik * sinuk,
    );
    let v_vec = Vector3::new(
        xmx * cosuk - cosnok * sinuk,
        xmy * cosuk - sinnok * sinuk,
        sinik * cosuk,
    );

    let position = rk * u_vec * XKMPER;
    let velocity = (rdotk * u_vec + rfdotk * v_vec) * XKMPER / 60.0;

    Ok(Eci::new(date, position, velocity))
}
