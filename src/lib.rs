//! tlekit - satellite orbit prediction from two-line element sets
//!
//! Implements the NORAD SGP4 analytic orbital model for near-earth
//! objects and its SDP4 deep-space extension, which adds lunar and solar
//! perturbations plus geopotential resonance handling for 12 and 24 hour
//! orbits. Given a published two-line element set, the propagator
//! produces Earth-centered inertial position and velocity at any offset
//! from the element epoch.
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
//!
//! // state one orbit after the element epoch
//! let eci = propagator.propagate(92.0)?;
//! println!("position (km):  {:.3}", eci.position);
//! println!("velocity (km/s): {:.6}", eci.velocity);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Organization
//!
//! - [`tle`]: two-line element text format parsing
//! - [`time`]: Julian date arithmetic and sidereal time
//! - [`coordinates`]: the Earth-centered inertial state carrier
//! - [`propagation`]: the SGP4/SDP4 models themselves

pub mod coordinates;
pub mod propagation;
pub mod time;
pub mod tle;

pub use coordinates::Eci;
pub use propagation::{OrbitalElements, PropagationError, Propagator};
pub use time::Julian;
pub use tle::{Tle, TleError};
