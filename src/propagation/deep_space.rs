//! Deep-space propagation model
//!
//! Handles objects with orbital periods of 225 minutes and longer. On
//! top of the shared secular gravity and drag path this adds lunar and
//! solar third-body perturbations (secular rates plus long-period
//! periodics) and, for orbits commensurate with the Earth rotation, a
//! fixed-step numerical integration of the geopotential resonance
//! effects.
//!
//! # Architecture
//!
//! All coefficients are derived once from the element record. The only
//! state that changes across propagation calls is the resonance
//! integrator position (`IntegratorState`); restart rules reset it to
//! epoch whenever the target time cannot be reached by stepping
//! monotonically away from zero, which keeps results independent of the
//! call order.

use super::constants::{wrap_two_pi, THDT, TWOPI, TWOTHIRD};
use super::elements::OrbitalElements;
use super::error::PropagationError;
use super::kernel::{self, ShortPeriodics, Trajectory};
use super::{CommonConstants, InitContext};
use crate::coordinates::Eci;
use std::f64::consts::PI;

// solar perturbation constants
const ZNS: f64 = 1.19459e-5;
const C1SS: f64 = 2.9864797e-6;
const ZES: f64 = 0.01675;

// lunar perturbation constants
const ZNL: f64 = 1.5835218e-4;
const C1L: f64 = 4.7968065e-7;
const ZEL: f64 = 0.05490;

// solar orientation at epoch 1900
const ZCOSIS: f64 = 0.91744867;
const ZSINIS: f64 = 0.39785416;
const ZSINGS: f64 = -0.98088458;
const ZCOSGS: f64 = 0.1945905;

// geopotential resonance roots
const Q22: f64 = 1.7891679e-6;
const Q31: f64 = 2.1460748e-6;
const Q33: f64 = 2.2123015e-7;
const ROOT22: f64 = 1.7891679e-6;
const ROOT32: f64 = 3.7393792e-7;
const ROOT44: f64 = 7.3636953e-9;
const ROOT52: f64 = 1.1428639e-7;
const ROOT54: f64 = 2.1765803e-9;

// resonance argument phase offsets
const G22: f64 = 5.7686396;
const G32: f64 = 0.95240898;
const G44: f64 = 1.8014998;
const G52: f64 = 1.0508330;
const G54: f64 = 4.4108898;
const FASX2: f64 = 0.13130908;
const FASX4: f64 = 2.8843198;
const FASX6: f64 = 0.37448087;

/// Resonance integrator step in minutes
const STEP: f64 = 720.0;

/// Second-order term coefficient, STEP^2 / 2
const STEP2: f64 = 259_200.0;

/// Inclination band (radians) where the node rate term is suppressed to
/// avoid dividing by a vanishing sin(i)
const SHDQ_CUTOFF: f64 = 5.2359877e-2;

/// Synchronous resonance band in radians per minute (about 24 hours)
const SYNCHRONOUS_BAND: (f64, f64) = (0.0034906585, 0.0052359877);

/// Half-day geopotential resonance band in radians per minute
const GEOPOTENTIAL_BAND: (f64, f64) = (8.26e-3, 9.24e-3);

/// Deep-space coefficient sets plus the resonance integrator
#[derive(Debug, Clone)]
pub(crate) struct DeepSpaceModel {
    common: CommonConstants,

    /// Greenwich sidereal time at epoch
    gsto: f64,
    /// Lunar mean anomaly-like phase at epoch
    zmol: f64,
    /// Solar mean anomaly-like phase at epoch
    zmos: f64,

    // combined lunar and solar secular rates
    sse: f64,
    ssi: f64,
    ssl: f64,
    ssg: f64,
    ssh: f64,

    solar: PeriodicTerms,
    lunar: PeriodicTerms,

    resonance: Option<ResonanceIntegrator>,
}

/// Long-period periodic coefficient triple set for one perturbing body
#[derive(Debug, Clone, Default)]
struct PeriodicTerms {
    e2: f64,
    e3: f64,
    i2: f64,
    i3: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    gh2: f64,
    gh3: f64,
    gh4: f64,
    h2: f64,
    h3: f64,
}

/// Evaluated periodic perturbations at one time
#[derive(Debug, Clone, Copy)]
struct Periodics {
    pe: f64,
    pinc: f64,
    pl: f64,
    pgh: f64,
    ph: f64,
}

impl PeriodicTerms {
    /// Evaluate the five perturbations at the body phase `zm`
    fn evaluate(&self, zm: f64, ze: f64) -> Periodics {
        let zf = zm + 2.0 * ze * zm.sin();
        let sinzf = zf.sin();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * zf.cos();

        Periodics {
            pe: self.e2 * f2 + self.e3 * f3,
            pinc: self.i2 * f2 + self.i3 * f3,
            pl: self.l2 * f2 + self.l3 * f3 + self.l4 * sinzf,
            pgh: self.gh2 * f2 + self.gh3 * f3 + self.gh4 * sinzf,
            ph: self.h2 * f2 + self.h3 * f3,
        }
    }
}

/// Secular rate contributions of one perturbing body
struct SecularContribution {
    se: f64,
    si: f64,
    sl: f64,
    sgh: f64,
    shdq: f64,
}

/// Epoch orientation and strength of one perturbing body
struct ThirdBodyGeometry {
    zcosg: f64,
    zsing: f64,
    zcosi: f64,
    zsini: f64,
    zcosh: f64,
    zsinh: f64,
    cc: f64,
    zn: f64,
    ze: f64,
}

/// Resonance-specific geopotential terms
#[derive(Debug, Clone)]
enum ResonanceTerms {
    /// 24 hour orbits, three-term expansion
    Synchronous { del1: f64, del2: f64, del3: f64 },

    /// 12 hour orbits, ten-term tesseral expansion
    Geopotential {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
    },
}

/// Derivatives of the resonance variables at one integrator position
#[derive(Debug, Clone, Copy)]
struct DotTerms {
    xndot: f64,
    xnddt: f64,
    xldot: f64,
}

/// Mutable position of the fixed-step resonance integrator
#[derive(Debug, Clone, Copy)]
struct IntegratorState {
    /// Minutes from epoch of the current integrator position
    atime: f64,
    /// Resonance mean longitude
    xli: f64,
    /// Resonance mean motion
    xni: f64,
    /// Derivatives evaluated at this position
    dots: DotTerms,
}

/// Fixed-step integrator for the resonance variables
#[derive(Debug, Clone)]
struct ResonanceIntegrator {
    terms: ResonanceTerms,
    /// Offset between the resonance and secular rates
    xfact: f64,
    /// Resonance mean longitude at epoch
    xlamo: f64,
    /// Derivatives at epoch, restored on every restart
    epoch_dots: DotTerms,
    state: IntegratorState,
}

/// Mean elements being perturbed through the deep-space stages
struct MeanState {
    xll: f64,
    omega: f64,
    xnode: f64,
    eccentricity: f64,
    inclination: f64,
    xn: f64,
}

impl ResonanceIntegrator {
    /// Evaluate the resonance derivatives at the current position
    fn dots(&self, elements: &OrbitalElements, omgdot: f64) -> DotTerms {
        let xli = self.state.xli;

        let (xndot, xnddt) = match &self.terms {
            ResonanceTerms::Synchronous { del1, del2, del3 } => (
                del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin(),
                del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos(),
            ),
            ResonanceTerms::Geopotential {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            } => {
                // argument of perigee drifts with the integrator clock
                let xomi = elements.argument_perigee() + omgdot * self.state.atime;
                let x2omi = xomi + xomi;
                let x2li = xli + xli;

                let xndot = d2201 * (x2omi + xli - G22).sin()
                    + d2211 * (xli - G22).sin()
                    + d3210 * (xomi + xli - G32).sin()
                    + d3222 * (-xomi + xli - G32).sin()
                    + d4410 * (x2omi + x2li - G44).sin()
                    + d4422 * (x2li - G44).sin()
                    + d5220 * (xomi + xli - G52).sin()
                    + d5232 * (-xomi + xli - G52).sin()
                    + d5421 * (xomi + x2li - G54).sin()
                    + d5433 * (-xomi + x2li - G54).sin();
                let xnddt = d2201 * (x2omi + xli - G22).cos()
                    + d2211 * (xli - G22).cos()
                    + d3210 * (xomi + xli - G32).cos()
                    + d3222 * (-xomi + xli - G32).cos()
                    + d5220 * (xomi + xli - G52).cos()
                    + d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (d4410 * (x2omi + x2li - G44).cos()
                            + d4422 * (x2li - G44).cos()
                            + d5421 * (xomi + x2li - G54).cos()
                            + d5433 * (-xomi + x2li - G54).cos());

                (xndot, xnddt)
            }
        };

        let xldot = self.state.xni + self.xfact;
        DotTerms {
            xndot,
            xnddt: xnddt * xldot,
            xldot,
        }
    }

    /// Reset the integrator to its epoch position
    fn restart(&mut self, elements: &OrbitalElements) {
        self.state = IntegratorState {
            atime: 0.0,
            xli: self.xlamo,
            xni: elements.recovered_mean_motion(),
            dots: self.epoch_dots,
        };
    }
}

impl DeepSpaceModel {
    pub(crate) fn new(
        elements: &OrbitalElements,
        context: &InitContext,
        common: CommonConstants,
    ) -> Self {
        let gsto = elements.epoch().greenwich_sidereal_time();
        let day = elements.epoch().days_from_jan1_1900_12h();

        let sinq = elements.ascending_node().sin();
        let cosq = elements.ascending_node().cos();

        // lunar orbit orientation at epoch
        let xnodce = (4.5236020 - 9.2422029e-4 * day) % TWOPI;
        let stem = xnodce.sin();
        let ctem = xnodce.cos();
        let zcosil = 0.91375164 - 0.03568096 * ctem;
        let zsinil = (1.0 - zcosil * zcosil).sqrt();
        let zsinhl = 0.089683511 * stem / zsinil;
        let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
        let c = 4.7199672 + 0.22997150 * day;
        let gam = 5.8351514 + 0.0019443680 * day;
        let zmol = wrap_two_pi(c - gam);
        let mut zx = 0.39785416 * stem / zsinil;
        let zy = zcoshl * ctem + 0.91744867 * zsinhl * stem;
        zx = zx.atan2(zy);
        zx = (gam + zx - xnodce) % TWOPI;
        let zcosgl = zx.cos();
        let zsingl = zx.sin();
        let zmos = wrap_two_pi(6.2565837 + 0.017201977 * day);

        let solar_geometry = ThirdBodyGeometry {
            zcosg: ZCOSGS,
            zsing: ZSINGS,
            zcosi: ZCOSIS,
            zsini: ZSINIS,
            zcosh: cosq,
            zsinh: sinq,
            cc: C1SS,
            zn: ZNS,
            ze: ZES,
        };
        let lunar_geometry = ThirdBodyGeometry {
            zcosg: zcosgl,
            zsing: zsingl,
            zcosi: zcosil,
            zsini: zsinil,
            zcosh: zcoshl * cosq + zsinhl * sinq,
            zsinh: sinq * zcoshl - cosq * zsinhl,
            cc: C1L,
            zn: ZNL,
            ze: ZEL,
        };

        let (solar_secular, solar) =
            third_body_contributions(elements, context, &common, &solar_geometry);
        let (lunar_secular, lunar) =
            third_body_contributions(elements, context, &common, &lunar_geometry);

        let cosio = common.periodics.cosio;
        let sse = solar_secular.se + lunar_secular.se;
        let ssi = solar_secular.si + lunar_secular.si;
        let ssl = solar_secular.sl + lunar_secular.sl;
        let ssh = solar_secular.shdq + lunar_secular.shdq;
        let ssg = solar_secular.sgh - cosio * solar_secular.shdq + lunar_secular.sgh
            - cosio * lunar_secular.shdq;

        let mut model = Self {
            common,
            gsto,
            zmol,
            zmos,
            sse,
            ssi,
            ssl,
            ssg,
            ssh,
            solar,
            lunar,
            resonance: None,
        };
        model.resonance = model.init_resonance(elements, context);
        model
    }

    /// Classify the orbit and set up the resonance integrator
    fn init_resonance(
        &self,
        elements: &OrbitalElements,
        context: &InitContext,
    ) -> Option<ResonanceIntegrator> {
        let xnodp = elements.recovered_mean_motion();
        let eccentricity = elements.eccentricity();
        let eosq = context.eosq;
        let sinio = self.common.periodics.sinio;
        let cosio = self.common.periodics.cosio;
        let theta2 = cosio * cosio;
        let aqnv = 1.0 / elements.recovered_semi_major_axis();
        let xpidot = self.common.omgdot + self.common.xnodot;

        let (terms, xlamo, bfact) = if xnodp > SYNCHRONOUS_BAND.0 && xnodp < SYNCHRONOUS_BAND.1 {
            let g200 = 1.0 + eosq * (-2.5 + 0.8125 * eosq);
            let g310 = 1.0 + 2.0 * eosq;
            let g300 = 1.0 + eosq * (-6.0 + 6.60937 * eosq);
            let f220 = 0.75 * (1.0 + cosio) * (1.0 + cosio);
            let f311 = 0.9375 * sinio * sinio * (1.0 + 3.0 * cosio) - 0.75 * (1.0 + cosio);
            let f330 = 1.875 * (1.0 + cosio).powi(3);

            let temp = 3.0 * xnodp * xnodp * aqnv * aqnv;
            let terms = ResonanceTerms::Synchronous {
                del1: temp * f311 * g310 * Q31 * aqnv,
                del2: 2.0 * temp * f220 * g200 * Q22,
                del3: 3.0 * temp * f330 * g300 * Q33 * aqnv,
            };

            let xlamo = elements.mean_anomaly() + elements.ascending_node()
                + elements.argument_perigee()
                - self.gsto;
            let bfact =
                self.common.xmdot + xpidot - THDT + self.ssl + self.ssg + self.ssh;

            (terms, xlamo, bfact)
        } else if xnodp < GEOPOTENTIAL_BAND.0
            || xnodp > GEOPOTENTIAL_BAND.1
            || eccentricity < 0.5
        {
            return None;
        } else {
            let eoc = eccentricity * eosq;

            let g201 = -0.306 - (eccentricity - 0.64) * 0.440;

            let (g211, g310, g322, g410, g422, g520) = if eccentricity <= 0.65 {
                (
                    3.616 - 13.247 * eccentricity + 16.290 * eosq,
                    -19.302 + 117.390 * eccentricity - 228.419 * eosq + 156.591 * eoc,
                    -18.9068 + 109.7927 * eccentricity - 214.6334 * eosq + 146.5816 * eoc,
                    -41.122 + 242.694 * eccentricity - 471.094 * eosq + 313.953 * eoc,
                    -146.407 + 841.880 * eccentricity - 1629.014 * eosq + 1083.435 * eoc,
                    -532.114 + 3017.977 * eccentricity - 5740.032 * eosq + 3708.276 * eoc,
                )
            } else {
                let g520 = if eccentricity <= 0.715 {
                    1464.74 - 4664.75 * eccentricity + 3763.64 * eosq
                } else {
                    -5149.66 + 29936.92 * eccentricity - 54087.36 * eosq + 31324.56 * eoc
                };
                (
                    -72.099 + 331.819 * eccentricity - 508.738 * eosq + 266.724 * eoc,
                    -346.844 + 1582.851 * eccentricity - 2415.925 * eosq + 1246.113 * eoc,
                    -342.585 + 1554.908 * eccentricity - 2366.899 * eosq + 1215.972 * eoc,
                    -1052.797 + 4758.686 * eccentricity - 7193.992 * eosq + 3651.957 * eoc,
                    -3581.69 + 16178.11 * eccentricity - 24462.77 * eosq + 12422.52 * eoc,
                    g520,
                )
            };

            let (g533, g521, g532) = if eccentricity < 0.7 {
                (
                    -919.2277 + 4988.61 * eccentricity - 9064.77 * eosq + 5542.21 * eoc,
                    -822.71072 + 4568.6173 * eccentricity - 8491.4146 * eosq + 5337.524 * eoc,
                    -853.666 + 4690.25 * eccentricity - 8624.77 * eosq + 5341.4 * eoc,
                )
            } else {
                (
                    -37995.78 + 161616.52 * eccentricity - 229838.2 * eosq + 109377.94 * eoc,
                    -51752.104 + 218913.95 * eccentricity - 309468.16 * eosq + 146349.42 * eoc,
                    -40023.88 + 170470.89 * eccentricity - 242699.48 * eosq + 115605.82 * eoc,
                )
            };

            let sini2 = sinio * sinio;
            let f220 = 0.75 * (1.0 + 2.0 * cosio + theta2);
            let f221 = 1.5 * sini2;
            let f321 = 1.875 * sinio * (1.0 - 2.0 * cosio - 3.0 * theta2);
            let f322 = -1.875 * sinio * (1.0 + 2.0 * cosio - 3.0 * theta2);
            let f441 = 35.0 * sini2 * f220;
            let f442 = 39.3750 * sini2 * sini2;
            let f522 = 9.84375
                * sinio
                * (sini2 * (1.0 - 2.0 * cosio - 5.0 * theta2)
                    + 0.33333333 * (-2.0 + 4.0 * cosio + 6.0 * theta2));
            let f523 = sinio
                * (4.92187512 * sini2 * (-2.0 - 4.0 * cosio + 10.0 * theta2)
                    + 6.56250012 * (1.0 + 2.0 * cosio - 3.0 * theta2));
            let f542 = 29.53125
                * sinio
                * (2.0 - 8.0 * cosio + theta2 * (-12.0 + 8.0 * cosio + 10.0 * theta2));
            let f543 = 29.53125
                * sinio
                * (-2.0 - 8.0 * cosio + theta2 * (12.0 + 8.0 * cosio - 10.0 * theta2));

            let xno2 = xnodp * xnodp;
            let ainv2 = aqnv * aqnv;

            let mut temp1 = 3.0 * xno2 * ainv2;
            let mut temp = temp1 * ROOT22;
            let d2201 = temp * f220 * g201;
            let d2211 = temp * f221 * g211;
            temp1 *= aqnv;
            temp = temp1 * ROOT32;
            let d3210 = temp * f321 * g310;
            let d3222 = temp * f322 * g322;
            temp1 *= aqnv;
            temp = 2.0 * temp1 * ROOT44;
            let d4410 = temp * f441 * g410;
            let d4422 = temp * f442 * g422;
            temp1 *= aqnv;
            temp = temp1 * ROOT52;
            let d5220 = temp * f522 * g520;
            let d5232 = temp * f523 * g532;
            temp = 2.0 * temp1 * ROOT54;
            let d5421 = temp * f542 * g521;
            let d5433 = temp * f543 * g533;

            let terms = ResonanceTerms::Geopotential {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            };

            let xlamo = elements.mean_anomaly() + 2.0 * elements.ascending_node()
                - 2.0 * self.gsto;
            let bfact = self.common.xmdot + 2.0 * self.common.xnodot - 2.0 * THDT
                + self.ssl
                + 2.0 * self.ssh;

            (terms, xlamo, bfact)
        };

        let placeholder = DotTerms {
            xndot: 0.0,
            xnddt: 0.0,
            xldot: 0.0,
        };
        let mut integrator = ResonanceIntegrator {
            terms,
            xfact: bfact - xnodp,
            xlamo,
            epoch_dots: placeholder,
            state: IntegratorState {
                atime: 0.0,
                xli: xlamo,
                xni: xnodp,
                dots: placeholder,
            },
        };

        let epoch_dots = integrator.dots(elements, self.common.omgdot);
        integrator.epoch_dots = epoch_dots;
        integrator.state.dots = epoch_dots;

        Some(integrator)
    }

    /// Whether the orbit is in a resonance band
    #[cfg(test)]
    pub(crate) fn has_resonance(&self) -> bool {
        self.resonance.is_some()
    }

    /// Whether the orbit sits in the 24 hour synchronous band
    #[cfg(test)]
    pub(crate) fn is_synchronous(&self) -> bool {
        matches!(
            self.resonance,
            Some(ResonanceIntegrator {
                terms: ResonanceTerms::Synchronous { .. },
                ..
            })
        )
    }

    /// Whether the integrator sits exactly at its epoch position
    #[cfg(test)]
    pub(crate) fn integrator_at_epoch(&self, elements: &OrbitalElements) -> bool {
        self.resonance.as_ref().is_some_and(|i| {
            i.state.atime == 0.0
                && i.state.xli == i.xlamo
                && i.state.xni == elements.recovered_mean_motion()
        })
    }

    pub(crate) fn propagate(
        &mut self,
        elements: &OrbitalElements,
        tsince: f64,
    ) -> Result<Eci, PropagationError> {
        let tsq = tsince * tsince;

        // secular gravity and atmospheric drag
        let xmdf = elements.mean_anomaly() + self.common.xmdot * tsince;
        let omgadf = elements.argument_perigee() + self.common.omgdot * tsince;
        let xnoddf = elements.ascending_node() + self.common.xnodot * tsince;

        let xnode = xnoddf + self.common.xnodcf * tsq;
        let tempa = 1.0 - self.common.c1 * tsince;
        let tempe = elements.bstar() * self.common.c4 * tsince;
        let templ = self.common.t2cof * tsq;

        let mut state = MeanState {
            xll: xmdf,
            omega: omgadf,
            xnode,
            eccentricity: elements.eccentricity(),
            inclination: elements.inclination(),
            xn: elements.recovered_mean_motion(),
        };

        self.secular(elements, tsince, &mut state);

        if state.xn <= 0.0 {
            return Err(PropagationError::InternalError {
                reason: "mean motion is not positive",
            });
        }

        let a = (super::constants::xke() / state.xn).powf(TWOTHIRD) * tempa * tempa;
        state.eccentricity -= tempe;

        if state.eccentricity >= 1.0 || state.eccentricity < -1.0e-3 {
            return Err(PropagationError::EccentricityOutOfRange {
                eccentricity: state.eccentricity,
            });
        }
        // keep the Kepler stage away from a singular denominator
        if state.eccentricity < 1.0e-6 {
            state.eccentricity = 1.0e-6;
        }

        state.xll += elements.recovered_mean_motion() * templ;

        self.periodics(tsince, &mut state);

        // a negative inclination from the periodics is the same plane
        // with the node and perigee turned half a revolution
        if state.inclination < 0.0 {
            state.inclination = -state.inclination;
            state.xnode += PI;
            state.omega -= PI;
        }

        let xl = state.xll + state.omega + state.xnode;

        if state.eccentricity < 0.0 || state.eccentricity > 1.0 {
            return Err(PropagationError::EccentricityOutOfRange {
                eccentricity: state.eccentricity,
            });
        }

        // short-period coefficients follow the perturbed inclination
        let periodics = ShortPeriodics::new(self.common.a3ovk2, state.inclination);

        let trajectory = Trajectory {
            eccentricity: state.eccentricity,
            semi_major_axis: a,
            argument_perigee: state.omega,
            mean_longitude: xl,
            ascending_node: state.xnode,
            inclination: state.inclination,
        };

        kernel::final_position_velocity(
            elements.epoch().add_minutes(tsince),
            &trajectory,
            &periodics,
        )
    }

    /// Apply the deep-space secular rates and resonance integration
    fn secular(&mut self, elements: &OrbitalElements, t: f64, state: &mut MeanState) {
        state.xll += self.ssl * t;
        state.omega += self.ssg * t;
        state.xnode += self.ssh * t;
        state.eccentricity += self.sse * t;
        state.inclination += self.ssi * t;

        let omgdot = self.common.omgdot;
        let Some(integrator) = self.resonance.as_mut() else {
            return;
        };

        // restart from epoch when the target is within one step of it,
        // on the opposite side of it, or closer to it than the current
        // integrator position
        if t.abs() < STEP
            || t * integrator.state.atime <= 0.0
            || t.abs() < integrator.state.atime.abs()
        {
            integrator.restart(elements);
        }

        let mut ft = t - integrator.state.atime;
        if ft.abs() >= STEP {
            let delt = if ft >= 0.0 { STEP } else { -STEP };

            loop {
                // advance with the derivatives of the current position,
                // then refresh them at the new one
                let dots = integrator.state.dots;
                integrator.state.xli += dots.xldot * delt + dots.xndot * STEP2;
                integrator.state.xni += dots.xndot * delt + dots.xnddt * STEP2;
                integrator.state.atime += delt;

                integrator.state.dots = integrator.dots(elements, omgdot);

                ft = t - integrator.state.atime;
                if ft.abs() < STEP {
                    break;
                }
            }
        }

        // interpolate to the target without advancing the integrator
        let dots = integrator.state.dots;
        state.xn = integrator.state.xni + dots.xndot * ft + dots.xnddt * ft * ft * 0.5;
        let xl = integrator.state.xli + dots.xldot * ft + dots.xndot * ft * ft * 0.5;

        let theta = -state.xnode + self.gsto + t * THDT;
        state.xll = match integrator.terms {
            ResonanceTerms::Synchronous { .. } => xl + theta - state.omega,
            ResonanceTerms::Geopotential { .. } => xl + theta + theta,
        };
    }

    /// Apply the lunar and solar long-period periodics
    fn periodics(&self, t: f64, state: &mut MeanState) {
        let solar = self.solar.evaluate(self.zmos + ZNS * t, ZES);
        let lunar = self.lunar.evaluate(self.zmol + ZNL * t, ZEL);

        let pe = solar.pe + lunar.pe;
        let pinc = solar.pinc + lunar.pinc;
        let pl = solar.pl + lunar.pl;
        let pgh = solar.pgh + lunar.pgh;
        let ph = solar.ph + lunar.ph;

        state.inclination += pinc;
        state.eccentricity += pe;

        let sinis = state.inclination.sin();
        let cosis = state.inclination.cos();

        if state.inclination >= 0.2 {
            // apply periodics directly
            let ph_over_sin = ph / sinis;
            state.omega += pgh - cosis * ph_over_sin;
            state.xnode += ph_over_sin;
            state.xll += pl;
        } else {
            // apply periodics with the Lyddane modification
            let sinok = state.xnode.sin();
            let cosok = state.xnode.cos();
            let alfdp = sinis * sinok + ph * cosok + pinc * cosis * sinok;
            let betdp = sinis * cosok - ph * sinok + pinc * cosis * cosok;

            state.xnode = wrap_two_pi(state.xnode);

            let xls =
                state.xll + state.omega + cosis * state.xnode + pl + pgh
                    - pinc * state.xnode * sinis;

            let old_xnode = state.xnode;
            state.xnode = alfdp.atan2(betdp);
            if state.xnode < 0.0 {
                state.xnode += TWOPI;
            }

            // keep the perturbed node in the quadrant of the original
            if (old_xnode - state.xnode).abs() > PI {
                if state.xnode < old_xnode {
                    state.xnode += TWOPI;
                } else {
                    state.xnode -= TWOPI;
                }
            }

            state.xll += pl;
            state.omega = xls - state.xll - cosis * state.xnode;
        }
    }
}

/// Compute the secular rates and periodic coefficients contributed by
/// one perturbing body
fn third_body_contributions(
    elements: &OrbitalElements,
    context: &InitContext,
    common: &CommonConstants,
    geometry: &ThirdBodyGeometry,
) -> (SecularContribution, PeriodicTerms) {
    let eccentricity = elements.eccentricity();
    let eosq = context.eosq;
    let betao = context.betao;
    let betao2 = context.betao2;
    let sinio = common.periodics.sinio;
    let cosio = common.periodics.cosio;
    let sing = elements.argument_perigee().sin();
    let cosg = elements.argument_perigee().cos();
    let xnoi = 1.0 / elements.recovered_mean_motion();

    let zcosg = geometry.zcosg;
    let zsing = geometry.zsing;
    let zcosi = geometry.zcosi;
    let zsini = geometry.zsini;
    let zcosh = geometry.zcosh;
    let zsinh = geometry.zsinh;

    let a1 = zcosg * zcosh + zsing * zcosi * zsinh;
    let a3 = -zsing * zcosh + zcosg * zcosi * zsinh;
    let a7 = -zcosg * zsinh + zsing * zcosi * zcosh;
    let a8 = zsing * zsini;
    let a9 = zsing * zsinh + zcosg * zcosi * zcosh;
    let a10 = zcosg * zsini;
    let a2 = cosio * a7 + sinio * a8;
    let a4 = cosio * a9 + sinio * a10;
    let a5 = -sinio * a7 + cosio * a8;
    let a6 = -sinio * a9 + cosio * a10;

    let x1 = a1 * cosg + a2 * sing;
    let x2 = a3 * cosg + a4 * sing;
    let x3 = -a1 * sing + a2 * cosg;
    let x4 = -a3 * sing + a4 * cosg;
    let x5 = a5 * sing;
    let x6 = a6 * sing;
    let x7 = a5 * cosg;
    let x8 = a6 * cosg;

    let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
    let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
    let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
    let mut z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * eosq;
    let mut z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * eosq;
    let mut z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * eosq;
    let z11 = -6.0 * a1 * a5 + eosq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
    let z12 = -6.0 * (a1 * a6 + a3 * a5)
        + eosq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
    let z13 = -6.0 * a3 * a6 + eosq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
    let z21 = 6.0 * a2 * a5 + eosq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
    let z22 = 6.0 * (a4 * a5 + a2 * a6)
        + eosq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
    let z23 = 6.0 * a4 * a6 + eosq * (24.0 * x2 * x6 - 6.0 * x4 * x8);

    z1 = z1 + z1 + betao2 * z31;
    z2 = z2 + z2 + betao2 * z32;
    z3 = z3 + z3 + betao2 * z33;

    let s3 = geometry.cc * xnoi;
    let s2 = -0.5 * s3 / betao;
    let s4 = s3 * betao;
    let s1 = -15.0 * eccentricity * s4;
    let s5 = x1 * x3 + x2 * x4;
    let s6 = x2 * x3 + x1 * x4;
    let s7 = x2 * x4 - x1 * x3;

    let zn = geometry.zn;
    let se = s1 * zn * s5;
    let si = s2 * zn * (z11 + z13);
    let sl = -zn * s3 * (z1 + z3 - 14.0 - 6.0 * eosq);
    let sgh = s4 * zn * (z31 + z33 - 6.0);

    // the node rate divides by sin(i); suppressed where the orbit plane
    // lies close to the equator in either direction
    let inclination = elements.inclination();
    let shdq = if inclination < SHDQ_CUTOFF || inclination > PI - SHDQ_CUTOFF {
        0.0
    } else {
        (-zn * s2 * (z21 + z23)) / sinio
    };

    let periodic = PeriodicTerms {
        e2: 2.0 * s1 * s6,
        e3: 2.0 * s1 * s7,
        i2: 2.0 * s2 * z12,
        i3: 2.0 * s2 * (z13 - z11),
        l2: -2.0 * s3 * z2,
        l3: -2.0 * s3 * (z3 - z1),
        l4: -2.0 * s3 * (-21.0 - 9.0 * eosq) * geometry.ze,
        gh2: 2.0 * s4 * z32,
        gh3: 2.0 * s4 * (z33 - z31),
        gh4: -18.0 * s4 * geometry.ze,
        h2: -2.0 * s2 * z22,
        h3: -2.0 * s2 * (z23 - z21),
    };

    (
        SecularContribution {
            se,
            si,
            sl,
            sgh,
            shdq,
        },
        periodic,
    )
}
