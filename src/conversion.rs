//! Angular helpers shared by the propagator, the track computer and the whitelist filter.
//!
//! Angles are radians internally; the `_deg` variants exist only for the component
//! boundaries where requests and tracks are expressed in decimal degrees.

use nalgebra::Vector3;

use crate::constants::{Degree, Kilometer, Radian, DPI, RADEG};

/// Reduce an angle to the half-open interval (−π, π].
pub fn wrap_pi(angle: Radian) -> Radian {
    std::f64::consts::PI - (std::f64::consts::PI - angle).rem_euclid(DPI)
}

/// Reduce an angle in degrees to the half-open interval (−180, 180].
pub fn wrap_180(angle: Degree) -> Degree {
    180.0 - (180.0 - angle).rem_euclid(360.0)
}

/// Normalize a right ascension to [0, 2π).
pub fn normalize_ra(ra: Radian) -> Radian {
    let r = ra.rem_euclid(DPI);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if r >= DPI {
        0.0
    } else {
        r
    }
}

/// Normalize a right ascension in degrees to [0, 360).
pub fn normalize_ra_deg(ra: Degree) -> Degree {
    let r = ra.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Great-circle separation given an already reduced RA difference.
///
/// Vincenty's form of the spherical distance: well conditioned both for tiny separations
/// and for nearly antipodal points.
fn separation_from_delta(delta_ra: Radian, dec1: Radian, dec2: Radian) -> Radian {
    let (sin_d1, cos_d1) = dec1.sin_cos();
    let (sin_d2, cos_d2) = dec2.sin_cos();
    let (sin_dra, cos_dra) = delta_ra.sin_cos();

    let num_x = cos_d2 * sin_dra;
    let num_y = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_dra;
    let den = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_dra;

    num_x.hypot(num_y).atan2(den)
}

/// Angular separation between two sky positions, all in radians.
///
/// The RA difference is taken modulo a full turn and reduced to (−π, π] before being
/// combined with the declinations, so positions straddling RA = 0 are not reported as
/// almost a full turn apart.
pub fn angular_separation(ra1: Radian, dec1: Radian, ra2: Radian, dec2: Radian) -> Radian {
    separation_from_delta(wrap_pi(ra2 - ra1), dec1, dec2)
}

/// Angular separation in degrees between two sky positions given in degrees.
pub fn angular_separation_deg(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> Degree {
    let delta_ra = wrap_180(ra2 - ra1) * RADEG;
    separation_from_delta(delta_ra, dec1 * RADEG, dec2 * RADEG) / RADEG
}

/// Unit vector pointing toward (ra, dec), both in radians.
pub fn unit_vector_from_radec(ra: Radian, dec: Radian) -> Vector3<f64> {
    let (sin_ra, cos_ra) = ra.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Unit vector pointing toward (ra, dec), both in degrees.
pub fn unit_vector_from_radec_deg(ra: Degree, dec: Degree) -> Vector3<f64> {
    unit_vector_from_radec(ra * RADEG, dec * RADEG)
}

/// Right ascension in [0, 2π) and declination of a non-zero vector.
pub fn radec_from_unit_vector(v: &Vector3<f64>) -> (Radian, Radian) {
    let ra = normalize_ra(v.y.atan2(v.x));
    let dec = v.z.atan2(v.x.hypot(v.y));
    (ra, dec)
}

/// Split a cartesian vector into (ra, dec, range).
pub fn spherical_from_cartesian(v: &Vector3<Kilometer>) -> (Radian, Radian, Kilometer) {
    let (ra, dec) = radec_from_unit_vector(v);
    (ra, dec, v.norm())
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert_abs_diff_eq!(wrap_pi(0.0), 0.0);
        assert_abs_diff_eq!(wrap_pi(PI), PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(-PI), PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(-DPI), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_180(350.0), -10.0);
        assert_abs_diff_eq!(wrap_180(-180.0), 180.0);
    }

    #[test]
    fn test_normalize_ra() {
        assert_abs_diff_eq!(normalize_ra_deg(-10.0), 350.0);
        assert_abs_diff_eq!(normalize_ra_deg(370.0), 10.0);
        assert_abs_diff_eq!(normalize_ra(-PI / 2.0), 3.0 * PI / 2.0, epsilon = 1e-15);
        assert!(normalize_ra(-1e-18) < DPI);
    }

    #[test]
    fn separation_wraparound() {
        for ra in [0.0, 10.0, 123.4, 359.9] {
            for dec in [-89.0, -30.0, 0.0, 45.0] {
                assert_abs_diff_eq!(
                    angular_separation_deg(ra, dec, ra + 360.0, dec),
                    0.0,
                    epsilon = 1e-12
                );
                assert_abs_diff_eq!(
                    angular_separation_deg(ra, dec, ra - 360.0, dec),
                    0.0,
                    epsilon = 1e-12
                );
            }
        }
        // 359.5° and 0.5° on the equator are one degree apart, not 359
        assert_abs_diff_eq!(
            angular_separation_deg(359.5, 0.0, 0.5, 0.0),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn separation_symmetric() {
        let pairs = [
            ((10.0, 0.0), (10.15, 0.03)),
            ((200.0, -50.0), (10.0, 0.0)),
            ((0.2, 89.9), (180.2, 89.9)),
            ((359.0, -20.0), (1.0, -21.0)),
        ];
        for ((ra1, dec1), (ra2, dec2)) in pairs {
            assert_abs_diff_eq!(
                angular_separation_deg(ra1, dec1, ra2, dec2),
                angular_separation_deg(ra2, dec2, ra1, dec1),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn separation_known_values() {
        assert_abs_diff_eq!(angular_separation_deg(0.0, 0.0, 90.0, 0.0), 90.0, epsilon = 1e-12);
        assert_abs_diff_eq!(angular_separation_deg(0.0, 90.0, 0.0, -90.0), 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(angular_separation_deg(10.0, 0.0, 10.0, 5.0), 5.0, epsilon = 1e-12);
        // Across the pole: same declination, opposite RA
        assert_abs_diff_eq!(angular_separation_deg(0.0, 89.0, 180.0, 89.0), 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(
            angular_separation(0.1, 0.2, 0.1 + DPI, 0.2),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn unit_vector_round_trip() {
        let v = unit_vector_from_radec_deg(200.0, -50.0);
        assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-15);
        let (ra, dec) = radec_from_unit_vector(&v);
        assert_abs_diff_eq!(ra / RADEG, 200.0, epsilon = 1e-10);
        assert_abs_diff_eq!(dec / RADEG, -50.0, epsilon = 1e-10);

        let (ra, dec, range) = spherical_from_cartesian(&(v * 1234.5));
        assert_abs_diff_eq!(ra / RADEG, 200.0, epsilon = 1e-10);
        assert_abs_diff_eq!(dec / RADEG, -50.0, epsilon = 1e-10);
        assert_abs_diff_eq!(range, 1234.5, epsilon = 1e-9);
    }
}
