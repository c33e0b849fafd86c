// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::f64::consts::PI;

use crate::error::{FieldError, Result};

/// Parameters shared by every evaluation of a kernel during one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    /// Standard deviation of the Gaussian (must be positive and finite).
    pub sigma: f64,
}

impl KernelParams {
    /// Create validated parameters.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidParameter`] if `sigma` is not positive and finite.
    pub fn new(sigma: f64) -> Result<Self> {
        let params = KernelParams { sigma };
        params.validate()?;
        Ok(params)
    }

    /// Check that every parameter is within its domain.
    pub fn validate(&self) -> Result<()> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(FieldError::InvalidParameter {
                name: "sigma",
                value: self.sigma,
            });
        }
        Ok(())
    }
}

impl Default for KernelParams {
    fn default() -> Self {
        KernelParams { sigma: 1.0 }
    }
}

/// A pointwise scalar kernel evaluated at every grid point.
///
/// Implementations must be pure: the same inputs always give the same value
/// and evaluation has no side effects, so rows can run on any worker in any
/// order.
pub trait Kernel: Sync {
    /// Reject parameters the kernel cannot evaluate. Called once, before any
    /// work is dispatched.
    fn validate(&self, params: &KernelParams) -> Result<()> {
        params.validate()
    }

    /// Kernel value at `(x, y)`.
    fn evaluate(&self, x: f64, y: f64, params: &KernelParams) -> f64;
}

/// Isotropic 2D Gaussian probability density centered at the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaussianKernel;

impl GaussianKernel {
    /// Checked evaluation.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidParameter`] if `sigma <= 0`.
    pub fn density(x: f64, y: f64, sigma: f64) -> Result<f64> {
        KernelParams::new(sigma)?;
        Ok(gaussian_2d(x, y, sigma))
    }
}

impl Kernel for GaussianKernel {
    #[inline]
    fn evaluate(&self, x: f64, y: f64, params: &KernelParams) -> f64 {
        gaussian_2d(x, y, params.sigma)
    }
}

/// `1 / (2 pi sigma^2) * exp(-(x^2 + y^2) / (2 sigma^2))`.
///
/// Unchecked; callers validate `sigma` up front.
#[inline]
pub fn gaussian_2d(x: f64, y: f64, sigma: f64) -> f64 {
    let two_sigma_sq = 2.0 * sigma * sigma;
    let coefficient = 1.0 / (PI * two_sigma_sq);
    coefficient * (-(x * x + y * y) / two_sigma_sq).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_value_at_origin() {
        for sigma in [0.1, 0.5, 1.0, 2.0, 7.5] {
            let v = gaussian_2d(0.0, 0.0, sigma);
            let expected = 1.0 / (2.0 * PI * sigma * sigma);
            assert!(
                (v - expected).abs() < 1e-9,
                "sigma={}: {} vs {}",
                sigma,
                v,
                expected
            );
        }
    }

    #[test]
    fn radial_symmetry() {
        let points = [(0.3, -1.2), (1.0, 1.0), (-2.5, 0.75), (0.0, 3.0)];
        for sigma in [0.5, 1.0, 3.0] {
            for (x, y) in points {
                let v = gaussian_2d(x, y, sigma);
                assert!((v - gaussian_2d(-x, y, sigma)).abs() < 1e-15);
                assert!((v - gaussian_2d(x, -y, sigma)).abs() < 1e-15);
                // swapping axes is also a symmetry of the isotropic kernel
                assert!((v - gaussian_2d(y, x, sigma)).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn known_value_off_center() {
        // x = y = -1, sigma = 1: exp(-1) / (2 pi)
        let v = gaussian_2d(-1.0, -1.0, 1.0);
        assert!((v - 0.058_549_831).abs() < 1e-6, "got {}", v);
    }

    #[test]
    fn decays_with_distance() {
        let mut prev = f64::INFINITY;
        for r in 0..10 {
            let v = gaussian_2d(r as f64 * 0.5, 0.0, 1.0);
            assert!(v < prev);
            assert!(v > 0.0);
            prev = v;
        }
    }

    #[test]
    fn invalid_sigma() {
        for sigma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                KernelParams::new(sigma),
                Err(FieldError::InvalidParameter { name: "sigma", .. })
            ));
            assert!(GaussianKernel::density(0.0, 0.0, sigma).is_err());
        }
    }

    #[test]
    fn trait_matches_free_function() {
        let params = KernelParams::new(0.8).unwrap();
        let k = GaussianKernel;
        assert!(k.validate(&params).is_ok());
        assert_eq!(k.evaluate(0.4, -0.2, &params), gaussian_2d(0.4, -0.2, 0.8));
        assert!(k.validate(&KernelParams { sigma: -2.0 }).is_err());
    }
}
