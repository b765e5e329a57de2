//! # One-dimensional interpolation
//!
//! Two interpolation schemes are used across the crate:
//!
//! * [`CubicSpline`] – a **not-a-knot cubic spline** through tabulated points. It is used to move
//!   simulated P1D from its native comoving grid onto an observational grid, and to read
//!   tabulated expansion histories. Evaluation outside the tabulated range is an error
//!   ([`FluxPowerError::RangeError`]): it signals a resolution/range mismatch and must never be
//!   silently clamped.
//! * [`linear_interp`] – piecewise-linear interpolation with an explicit [`Extrapolation`] policy,
//!   used by the nearest-grid-point emulator.
//!
//! The spline second derivatives are obtained by solving the dense `n × n` system with an LU
//! factorization from [`nalgebra`]. Tables in this crate hold at most a few hundred points.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::fluxpower_errors::FluxPowerError;

/// Behaviour of an interpolator when a requested abscissa falls outside the tabulated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Extrapolation {
    /// Return the value at the nearest boundary.
    #[default]
    Clamp,
    /// Fail with [`FluxPowerError::RangeError`].
    Fail,
}

fn check_grid(x: &[f64], y: &[f64], min_points: usize) -> Result<(), FluxPowerError> {
    if x.len() != y.len() {
        return Err(FluxPowerError::InconsistentData(format!(
            "abscissa has {} points but ordinate has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < min_points {
        return Err(FluxPowerError::InconsistentData(format!(
            "need at least {min_points} points to interpolate, got {}",
            x.len()
        )));
    }
    if x.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(FluxPowerError::InconsistentData(
            "abscissa must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Not-a-knot cubic spline through `(x, y)`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative of the spline at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build the spline.
    ///
    /// Arguments
    /// -----------------
    /// * `x`: strictly increasing abscissa (at least 4 points).
    /// * `y`: ordinate, same length as `x`.
    ///
    /// Return
    /// ----------
    /// * The spline, or [`FluxPowerError::InconsistentData`] for malformed tables.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, FluxPowerError> {
        check_grid(x, y, 4)?;

        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut rhs = DVector::<f64>::zeros(n);

        // not-a-knot: third derivative continuous across x[1] and x[n-2]
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];
        a[(n - 1, n - 3)] = h[n - 2];
        a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
        a[(n - 1, n - 1)] = h[n - 3];

        for i in 1..n - 1 {
            a[(i, i - 1)] = h[i - 1];
            a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
            a[(i, i + 1)] = h[i];
            rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let m = a.lu().solve(&rhs).ok_or_else(|| {
            FluxPowerError::InconsistentData("singular cubic spline system".into())
        })?;

        Ok(CubicSpline {
            x: x.to_vec(),
            y: y.to_vec(),
            m: m.iter().copied().collect(),
        })
    }

    /// Tabulated range `(x_min, x_max)`.
    pub fn range(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Evaluate the spline at `xv`.
    ///
    /// Return
    /// ----------
    /// * The interpolated value, or [`FluxPowerError::RangeError`] if `xv` lies outside the
    ///   tabulated range.
    pub fn eval(&self, xv: f64) -> Result<f64, FluxPowerError> {
        let (min, max) = self.range();
        if !(xv >= min && xv <= max) {
            return Err(FluxPowerError::RangeError { value: xv, min, max });
        }

        // interval index i such that x[i] <= xv <= x[i+1]
        let i = (self.x.partition_point(|&xi| xi <= xv).max(1) - 1).min(self.x.len() - 2);

        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let dl = xv - x0;
        let dr = x1 - xv;

        Ok(m0 * dr.powi(3) / (6.0 * h)
            + m1 * dl.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * dr
            + (y1 / h - m1 * h / 6.0) * dl)
    }

    /// Evaluate the spline on every point of `xs`, failing on the first out-of-range value.
    pub fn eval_many(&self, xs: &[f64]) -> Result<Vec<f64>, FluxPowerError> {
        xs.iter().map(|&xv| self.eval(xv)).collect()
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` onto `x_new`.
///
/// Arguments
/// -----------------
/// * `x_new`: points where the interpolant is evaluated.
/// * `xp`: strictly increasing abscissa (at least 2 points).
/// * `fp`: ordinate, same length as `xp`.
/// * `policy`: what to do with points outside `[xp[0], xp[n-1]]`.
pub fn linear_interp(
    x_new: &[f64],
    xp: &[f64],
    fp: &[f64],
    policy: Extrapolation,
) -> Result<Vec<f64>, FluxPowerError> {
    check_grid(xp, fp, 2)?;
    let n = xp.len();
    let (min, max) = (xp[0], xp[n - 1]);

    x_new
        .iter()
        .map(|&xv| {
            if xv < min || xv > max || xv.is_nan() {
                return match policy {
                    Extrapolation::Fail => Err(FluxPowerError::RangeError { value: xv, min, max }),
                    Extrapolation::Clamp if xv < min => Ok(fp[0]),
                    Extrapolation::Clamp if xv > max => Ok(fp[n - 1]),
                    Extrapolation::Clamp => Ok(f64::NAN),
                };
            }
            let i = (xp.partition_point(|&xi| xi <= xv).max(1) - 1).min(n - 2);
            let t = (xv - xp[i]) / (xp[i + 1] - xp[i]);
            Ok(fp[i] + t * (fp[i + 1] - fp[i]))
        })
        .collect()
}

#[cfg(test)]
mod interpolation_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_reproduces_cubic() {
        // not-a-knot splines are exact for cubic polynomials
        let f = |x: f64| 2.0 * x.powi(3) - x.powi(2) + 0.5 * x - 3.0;
        let x: Vec<f64> = (0..9).map(|i| 0.3 * i as f64 + 0.1 * (i % 2) as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();

        for &xv in &[0.0, 0.15, 0.77, 1.3, 2.05, x[x.len() - 1]] {
            assert_relative_eq!(spline.eval(xv).unwrap(), f(xv), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spline_hits_knots() {
        let x = [1.0, 2.0, 4.0, 5.0, 7.5];
        let y = [3.0, -1.0, 0.5, 2.0, 1.0];
        let spline = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(spline.eval(*xi).unwrap(), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_spline_out_of_range() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 4.0, 9.0, 16.0];
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_eq!(
            spline.eval(0.5),
            Err(FluxPowerError::RangeError {
                value: 0.5,
                min: 1.0,
                max: 4.0
            })
        );
        assert!(spline.eval_many(&[1.5, 4.01]).is_err());
    }

    #[test]
    fn test_spline_rejects_bad_tables() {
        assert!(CubicSpline::new(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::new(&[1.0, 3.0, 2.0, 4.0], &[1.0, 2.0, 3.0, 4.0]).is_err());
        assert!(CubicSpline::new(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_linear_interp_policies() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 30.0];

        let inside = linear_interp(&[0.5, 1.5, 2.0], &xp, &fp, Extrapolation::Fail).unwrap();
        assert_eq!(inside, vec![5.0, 20.0, 30.0]);

        let clamped = linear_interp(&[-1.0, 3.0], &xp, &fp, Extrapolation::Clamp).unwrap();
        assert_eq!(clamped, vec![0.0, 30.0]);

        let failed = linear_interp(&[3.0], &xp, &fp, Extrapolation::Fail);
        assert_eq!(
            failed,
            Err(FluxPowerError::RangeError {
                value: 3.0,
                min: 0.0,
                max: 2.0
            })
        );
    }
}
