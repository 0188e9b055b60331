//! # Reference frame rotations
//!
//! The sky propagator obtains topocentric directions referred to the **mean equator and
//! equinox of date** (the frame SGP4 output and GMST live in). Published tracks are referred
//! to **J2000**, so every direction is rotated back with the IAU 1976 precession model.
//! Nutation (≲ 20″) is not applied: it is far below the search radius and the streak
//! half-width.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Radian, RADEG, T2000};

/// Construct a right-handed 3×3 rotation matrix around one of the principal axes (X, Y, or Z).
///
/// The matrix is an **active rotation** of a vector by `alpha` (counter-clockwise when
/// looking down the axis toward the origin), so the rotated vector is `x' = R · x`.
///
/// # Arguments
///
/// * `alpha` - Rotation angle in **radians**.
/// * `k` - Index of the axis of rotation (`0` → X, `1` → Y, `2` → Z).
///
/// # Panics
///
/// Panics if `k > 2`, as only axes 0–2 are valid.
pub fn rotmt(alpha: Radian, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// IAU 1976 precession angles (ζ, z, θ) in radians at the given date.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date in TT scale.
///
/// Returns
/// --------
/// * `(zeta, z, theta)` polynomials in Julian centuries since J2000:
///
/// ```text
/// ζ(T) = (0.6406161 + 0.0000839·T + 0.0000050·T²) · T  [deg]
/// z(T) = (0.6406161 + 0.0003041·T + 0.0000051·T²) · T  [deg]
/// θ(T) = (0.5567530 - 0.0001185·T - 0.0000116·T²) · T  [deg]
/// ```
pub fn precession_angles(tjm: f64) -> (Radian, Radian, Radian) {
    let t = (tjm - T2000) / 36525.0;

    let zeta = ((0.0000050 * t + 0.0000839) * t + 0.6406161) * t;
    let z = ((0.0000051 * t + 0.0003041) * t + 0.6406161) * t;
    let theta = ((-0.0000116 * t - 0.0001185) * t + 0.5567530) * t;

    (zeta * RADEG, z * RADEG, theta * RADEG)
}

/// Precession matrix from the J2000 mean equator to the mean equator and equinox of date.
///
/// `x_date = P · x_J2000`, with `P = R_z(z) · R_y(−θ) · R_z(ζ)` written as active rotations.
pub fn prec(tjm: f64) -> Matrix3<f64> {
    let (zeta, z, theta) = precession_angles(tjm);
    rotmt(z, 2) * rotmt(-theta, 1) * rotmt(zeta, 2)
}

/// Rotation from the mean equator and equinox of `tjm` (MJD TT) back to J2000.
pub fn mean_of_date_to_j2000(tjm: f64) -> Matrix3<f64> {
    prec(tjm).transpose()
}
