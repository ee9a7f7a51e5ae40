//! Polynomials of the page model
//!
//! ```text
//! S(u, v) = Σ c_pq · u^p · v^q      p ≥ 1, 1 ≤ p + q ≤ D
//! L(u)    = Σ c_j · u^j            0 ≤ j ≤ D_line
//! ```
//!
//! Every surface term carries at least one power of `u`, so `S(0, v) = 0`:
//! the centre column is never displaced and the surface cannot absorb the
//! vertical offset of a line.

use crate::{DewarpError, DewarpResult};

/// Number of surface coefficients for degree `degree`.
pub fn surface_term_count(degree: u32) -> usize {
    let d = degree as usize;
    d * (d + 1) / 2
}

/// Surface exponents `(p, q)` in coefficient order.
///
/// Grouped by total degree; within a group the power of `u` decreases:
/// degree 2 yields `(1,0), (2,0), (1,1)`.
pub fn surface_terms(degree: u32) -> impl Iterator<Item = (u32, u32)> {
    (1..=degree).flat_map(|s| (1..=s).rev().map(move |p| (p, s - p)))
}

/// Fill `out[k] = x^k` for `k = 0..out.len()`.
#[inline]
fn powers(x: f64, out: &mut [f64]) {
    let mut acc = 1.0;
    for slot in out.iter_mut() {
        *slot = acc;
        acc *= x;
    }
}

/// Bivariate page-surface polynomial
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePolynomial {
    degree: u32,
    coeffs: Vec<f64>,
}

impl SurfacePolynomial {
    /// The flat surface (all coefficients zero).
    pub fn zero(degree: u32) -> Self {
        Self {
            degree,
            coeffs: vec![0.0; surface_term_count(degree)],
        }
    }

    /// Create a surface from coefficients in [`surface_terms`] order.
    ///
    /// # Errors
    ///
    /// Returns [`DewarpError::InvalidArgument`] if the degree is zero or the
    /// coefficient count does not match it.
    pub fn from_coeffs(degree: u32, coeffs: Vec<f64>) -> DewarpResult<Self> {
        let n = surface_term_count(degree);
        if degree == 0 || coeffs.len() != n {
            return Err(DewarpError::InvalidArgument(format!(
                "degree {degree} surface needs {n} coefficients, got {}",
                coeffs.len()
            )));
        }
        Ok(Self { degree, coeffs })
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub(crate) fn coeffs_mut(&mut self) -> &mut [f64] {
        &mut self.coeffs
    }

    /// Coefficient of `u^p v^q`, if that term is part of the model
    pub fn coeff(&self, p: u32, q: u32) -> Option<f64> {
        surface_terms(self.degree)
            .position(|t| t == (p, q))
            .map(|i| self.coeffs[i])
    }

    /// Write every monomial `u^p v^q` into `out`, in coefficient order.
    pub fn monomials(&self, u: f64, v: f64, out: &mut [f64]) {
        let d = self.degree as usize;
        let mut up = [0.0; 16];
        let mut vp = [0.0; 16];
        if d < up.len() {
            powers(u, &mut up[..=d]);
            powers(v, &mut vp[..=d]);
            for (slot, (p, q)) in out.iter_mut().zip(surface_terms(self.degree)) {
                *slot = up[p as usize] * vp[q as usize];
            }
        } else {
            for (slot, (p, q)) in out.iter_mut().zip(surface_terms(self.degree)) {
                *slot = u.powi(p as i32) * v.powi(q as i32);
            }
        }
    }

    /// Restrict the surface to the column `u`.
    ///
    /// Returns `a` with `S(u, v) = Σ a[q] · v^q`.
    pub fn column(&self, u: f64) -> Vec<f64> {
        let mut a = vec![0.0; self.degree as usize];
        for ((p, q), c) in surface_terms(self.degree).zip(&self.coeffs) {
            a[q as usize] += c * u.powi(p as i32);
        }
        a
    }

    /// Evaluate `S(u, v)`
    pub fn eval(&self, u: f64, v: f64) -> f64 {
        surface_terms(self.degree)
            .zip(&self.coeffs)
            .map(|((p, q), c)| c * u.powi(p as i32) * v.powi(q as i32))
            .sum()
    }

    /// Evaluate `∂S/∂v (u, v)`
    pub fn eval_dv(&self, u: f64, v: f64) -> f64 {
        surface_terms(self.degree)
            .zip(&self.coeffs)
            .filter(|((_, q), _)| *q > 0)
            .map(|((p, q), c)| c * q as f64 * u.powi(p as i32) * v.powi(q as i32 - 1))
            .sum()
    }
}

/// Path of one text line on the flat page, `v = L(u)`
#[derive(Debug, Clone, PartialEq)]
pub struct LinePolynomial {
    coeffs: Vec<f64>,
}

impl LinePolynomial {
    /// Create a line from coefficients `c_0..=c_D`.
    ///
    /// # Errors
    ///
    /// Returns [`DewarpError::InvalidArgument`] if `coeffs` is empty.
    pub fn from_coeffs(coeffs: Vec<f64>) -> DewarpResult<Self> {
        if coeffs.is_empty() {
            return Err(DewarpError::InvalidArgument(
                "a line polynomial needs at least one coefficient".to_string(),
            ));
        }
        Ok(Self { coeffs })
    }

    /// A horizontal line `v = v0` of the given degree.
    pub fn constant(degree: u32, v0: f64) -> Self {
        let mut coeffs = vec![0.0; degree as usize + 1];
        coeffs[0] = v0;
        Self { coeffs }
    }

    pub fn degree(&self) -> u32 {
        (self.coeffs.len() - 1) as u32
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub(crate) fn coeffs_mut(&mut self) -> &mut [f64] {
        &mut self.coeffs
    }

    /// Evaluate `L(u)` (Horner)
    pub fn eval(&self, u: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }
}
