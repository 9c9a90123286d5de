//! End-to-end propagation tests against reference trajectories
//!
//! The reference states were generated with an independent port of the
//! same orbital models and reproduce the published Spacetrack Report #3
//! tables to within a few meters.

use tlekit::{PropagationError, Propagator, Tle};

/// Reference state: minutes from epoch, position km, velocity km/s
type RefState = (f64, [f64; 3], [f64; 3]);

const POSITION_TOLERANCE_KM: f64 = 1.0e-4;
const VELOCITY_TOLERANCE_KMS: f64 = 1.0e-7;

fn propagator(line1: &str, line2: &str) -> Propagator {
    let tle = Tle::parse(line1, line2).expect("reference TLE parses");
    Propagator::new(&tle).expect("reference TLE initializes")
}

fn assert_trajectory(propagator: &mut Propagator, reference: &[RefState]) {
    for (tsince, position, velocity) in reference {
        let eci = propagator
            .propagate(*tsince)
            .unwrap_or_else(|e| panic!("propagation failed at t={}: {}", tsince, e));

        for axis in 0..3 {
            let dp = (eci.position[axis] - position[axis]).abs();
            assert!(
                dp < POSITION_TOLERANCE_KM,
                "t={} axis={} position off by {} km",
                tsince,
                axis,
                dp
            );
            let dv = (eci.velocity[axis] - velocity[axis]).abs();
            assert!(
                dv < VELOCITY_TOLERANCE_KMS,
                "t={} axis={} velocity off by {} km/s",
                tsince,
                axis,
                dv
            );
        }
    }
}

#[test]
fn near_earth_reference_trajectory() {
    // Spacetrack Report #3 near-earth test case (perigee under 220 km,
    // truncated drag expansion)
    let mut propagator = propagator(
        "1 88888U          80275.98708465  .00073094  13844-3  66816-4 0    8",
        "2 88888  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  105",
    );
    assert!(!propagator.uses_deep_space());
    assert!(propagator.uses_simple_model());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [2328.969752622, -5995.220513382, 1719.972971917], [2.912073281, -0.983417956, -7.090816210]),
            (360.0, [2456.107065336, -6071.938555033, 1222.897685539], [2.679390040, -0.448290811, -7.228792155]),
            (720.0, [2567.562296953, -6112.503839226, 713.963744354], [2.440245751, 0.098109002, -7.319959258]),
            (1080.0, [2663.089643523, -6115.482908850, 196.400728666], [2.196121564, 0.652415093, -7.362824152]),
            (1440.0, [2742.553988318, -6079.670091232, -326.390126490], [1.948497651, 1.211072678, -7.356193131]),
        ],
    );
}

#[test]
fn deep_space_reference_trajectory() {
    // Spacetrack Report #3 deep-space test case: 10.5 hour period,
    // e = 0.73, outside both resonance bands
    let mut propagator = propagator(
        "1 11801U          80230.29629788  .01431103  00000-0  14311-1      13",
        "2 11801  46.7916 230.4354 7318036  47.4722  10.4117  2.28537848    13",
    );
    assert!(propagator.uses_deep_space());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [7473.371024914, 428.947483124, 5828.748467827], [5.107155391, 6.444680305, -0.186133297]),
            (360.0, [-3305.221486939, 32410.843233313, -24697.169749545], [-1.301137319, -1.151315600, -0.283335823]),
            (720.0, [14271.290838582, 24110.443090094, -4725.763201432], [-0.320504528, 2.679841539, -2.084054355]),
            (1080.0, [-9990.058000094, 22717.342124476, -23616.885155533], [-1.016674392, -2.290267981, 0.728923337]),
            (1440.0, [9787.878362555, 33753.322496668, -15030.798746254], [-1.094251553, 0.923589906, -1.522311008]),
        ],
    );
}

#[test]
fn molniya_resonance_trajectory() {
    // half-day geopotential resonance: e = 0.69, n = 2.005 rev/day; the
    // fixed-step integrator has to walk out to t in 720 minute steps
    let mut propagator = propagator(
        "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813",
        "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656",
    );
    assert!(propagator.uses_deep_space());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [2349.894833501, -14785.938115615, 0.021193784], [2.721488096, -3.256811655, 4.498416672]),
            (360.0, [19089.297629681, 3107.894950177, 39958.146613699], [-0.410308034, 1.640332277, -0.306873818]),
            (720.0, [2622.132222073, -15125.154649245, 474.510483982], [2.688287199, -3.078426664, 4.494979530]),
            (1440.0, [2890.806382677, -15446.439523001, 948.770101764], [2.654407490, -2.909344895, 4.486437362]),
            (2880.0, [3417.209315865, -16038.795106653, 1894.749340578], [2.585515864, -2.596818146, 4.456882556]),
        ],
    );
}

#[test]
fn near_circular_half_day_trajectory() {
    // GPS-like orbit: half-day period inside the resonance band but the
    // low eccentricity keeps the resonance integrator out of play
    let mut propagator = propagator(
        "1 22779U 93054A   03182.63302117  .00000000  00000-0  00000-0 0  9990",
        "2 22779  53.8943 118.4708 0081407  68.1714 292.7372  2.00562016 71918",
    );
    assert!(propagator.uses_deep_space());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [-12637.123926263, 23268.183741079, 25.117429350], [-1.995531603, -1.121419531, 3.140310125]),
            (720.0, [-12871.214595337, 23131.751516326, 409.163269768], [-1.962385336, -1.181670275, 3.139762189]),
            (1440.0, [-13101.221274915, 22988.075022892, 793.080448918], [-1.928647956, -1.241591228, 3.138196377]),
        ],
    );

    // semi-major axis of the half-day constellation
    let radius = propagator.propagate(0.0).unwrap().radius();
    assert!((radius - 26478.0).abs() < 50.0);
}

#[test]
fn full_drag_model_trajectory() {
    // station-like LEO exercising the complete near-earth drag expansion
    let mut propagator = propagator(
        "1 25544U 98067A   20062.59097222  .00016717  00000-0  10270-3 0  9005",
        "2 25544  51.6442 147.0064 0004607  95.6506 264.5061 15.49249111  9000",
    );
    assert!(!propagator.uses_deep_space());
    assert!(!propagator.uses_simple_model());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [-5701.992854673, 3701.547157987, 0.492326259], [-2.578320266, -3.991115644, 6.008687528]),
            (90.0, [-5125.782894246, 4346.809360566, -1033.684077736], [-3.793003304, -3.085113648, 5.894362501]),
            (1440.0, [5418.402253528, -4102.623661331, -121.648846386], [2.791193931, 3.847958779, -6.007853867]),
        ],
    );
}

#[test]
fn synchronous_orbit_is_periodic() {
    // a geostationary object returns to the same inertial position
    // after one sidereal day
    let mut propagator = propagator(
        "1 40000U 14000A   20001.50000000  .00000000  00000-0  00000-0 0  9990",
        "2 40000   0.4300  80.0000 0002000  60.0000 300.0000  1.00271798100000",
    );
    assert!(propagator.uses_deep_space());

    let start = propagator.propagate(0.0).unwrap();
    assert!((start.radius() - 42160.0).abs() < 20.0);

    let sidereal_day = 1436.0685;
    let after_one_day = propagator.propagate(sidereal_day).unwrap();
    let drift = (after_one_day.position - start.position).norm();
    assert!(drift < 10.0, "drift over one sidereal day: {} km", drift);

    // still bounded after a second revolution
    let after_two_days = propagator.propagate(2.0 * sidereal_day).unwrap();
    let drift = (after_two_days.position - start.position).norm();
    assert!(drift < 20.0, "drift over two sidereal days: {} km", drift);
}

#[test]
fn near_polar_deep_space_stays_finite() {
    // retrograde orbit with the plane close to the equator; the node
    // rate term of the third-body model is suppressed there
    let mut propagator = propagator(
        "1 90001U 90001A   06001.00000000  .00000000  00000-0  00000-0 0  9990",
        "2 90001 177.5000  60.0000 0100000  30.0000 330.0000  2.00000000 10000",
    );
    assert!(propagator.uses_deep_space());

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [12953.991923831, 22979.730550233, -16.669160557], [3.387987172, -1.932508061, 0.170984245]),
            (360.0, [-13655.320860332, -23107.529501826, -7.568746161], [-3.309867935, 1.933750819, -0.168080924]),
            (1440.0, [12980.592113893, 22964.672442292, -13.353080997], [3.385738927, -1.936446633, 0.171088891]),
        ],
    );
}

#[test]
fn low_perigee_override() {
    // perigee below 98 km: the density boundary collapses to its floor
    // and the truncated model is selected; heavy drag eventually drives
    // the eccentricity out of range
    let mut propagator = propagator(
        "1 90002U 90002A   06001.00000000  .00050000  00000-0  30000-3 0  9990",
        "2 90002  28.5000  60.0000 0050000  30.0000 330.0000 16.60000000 10000",
    );
    assert!(propagator.uses_simple_model());
    assert!(propagator.elements().perigee_altitude() < 98.0);

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [3260.774775021, 5578.226718473, -18.880286987], [-5.981371691, 3.481266411, 3.760550146]),
            (45.0, [-2539.990193160, -5929.626612115, -430.881096316], [6.449734829, -2.502459585, -3.712400752]),
        ],
    );

    assert!(propagator.propagate(90.0).is_err());
}

#[test]
fn tiny_eccentricity_is_clamped() {
    // e = 5e-7 exercises the near-circular clamp in front of the
    // Kepler stage
    let mut propagator = propagator(
        "1 90003U 90003A   06001.00000000  .00000000  00000-0  00000-0 0  9990",
        "2 90003  98.0000  60.0000 0000005  30.0000 330.0000 14.50000000 10000",
    );

    assert_trajectory(
        &mut propagator,
        &[
            (0.0, [3551.589339611, 6155.664876155, -14.689639960], [0.906188583, -0.514145144, 7.418042254]),
            (100.0, [3576.041048545, 6135.396431637, 266.062263014], [0.756879908, -0.771933950, 7.412736575]),
        ],
    );
}

#[test]
fn low_inclination_lyddane_path() {
    // nearly equatorial geostationary orbit: the node and perigee
    // updates go through the Lyddane form, which must stay finite as
    // the third-body periodics swing the tiny inclination around
    let mut propagator = propagator(
        "1 90004U 90004A   20001.50000000  .00000000  00000-0  00000-0 0  9990",
        "2 90004   0.0100  80.0000 0002000  60.0000 300.0000  1.00271798100000",
    );
    assert!(propagator.uses_deep_space());

    for hours in 0..120 {
        let eci = propagator.propagate(hours as f64 * 60.0).unwrap();
        assert!(eci.position.iter().all(|c| c.is_finite()));
        assert!(eci.velocity.iter().all(|c| c.is_finite()));
        assert!((eci.radius() - 42164.0).abs() < 100.0);
    }
}

#[test]
fn backward_propagation() {
    // the resonance integrator also walks backwards from epoch
    let mut propagator = propagator(
        "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813",
        "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656",
    );

    assert_trajectory(
        &mut propagator,
        &[(
            -1000.0,
            [16263.962002152, 10381.907204975, 36572.782014156],
            [-0.819488387, 1.480351169, -1.187964252],
        )],
    );
}

#[test]
fn propagation_is_call_order_independent() {
    // the integrator restart rules must make any call sequence
    // reproduce the single-call result exactly
    let line1 = "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813";
    let line2 = "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656";
    let tle = Tle::parse(line1, line2).unwrap();

    let mut fresh = Propagator::new(&tle).unwrap();
    let direct = fresh.propagate(2000.0).unwrap();

    // cross-epoch sequence: backwards first, then far forward
    let mut wandering = Propagator::new(&tle).unwrap();
    wandering.propagate(-1000.0).unwrap();
    let after_wandering = wandering.propagate(2000.0).unwrap();
    assert_eq!(direct.position, after_wandering.position);
    assert_eq!(direct.velocity, after_wandering.velocity);

    // an arbitrary zig-zag sequence must not leave any trace either
    let times = [
        13.0, -2900.0, 2100.0, 350.0, -80.0, 2875.0, 700.0, -1500.0, 60.0, 1441.0,
    ];
    let mut zigzag = Propagator::new(&tle).unwrap();
    for t in times {
        zigzag.propagate(t).unwrap();
    }
    let after_zigzag = zigzag.propagate(2000.0).unwrap();
    assert_eq!(direct.position, after_zigzag.position);
    assert_eq!(direct.velocity, after_zigzag.velocity);
}

#[test]
fn intake_validation() {
    // eccentricity beyond the model bound
    let result = Tle::parse(
        "1 90005U 90005A   06001.00000000  .00000000  00000-0  00000-0 0  9990",
        "2 90005  28.5000  60.0000 9995000  30.0000 330.0000  2.00000000 10000",
    )
    .map(|tle| Propagator::new(&tle));
    assert!(matches!(
        result.unwrap(),
        Err(PropagationError::OutOfRange { element: "eccentricity", .. })
    ));
}
