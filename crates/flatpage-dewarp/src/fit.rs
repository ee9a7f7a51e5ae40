//! Joint fit of the page surface and the text lines
//!
//! For a point `(u, v)` observed on line `k` the residual is the vertical
//! miss of the model,
//!
//! ```text
//! r = v - (L_k(u) + S(u, L_k(u)))
//! ```
//!
//! plus, for every non-constant line coefficient, a regularization residual
//! `λ · √n_k · c_kj` that keeps the lines straight on the flat page so that
//! curvature shared by all lines ends up in the surface.
//!
//! The sum of squares is minimized with Levenberg-Marquardt. Each data row of
//! the Jacobian touches the surface block and a single line block, so the
//! normal matrix is block-arrow shaped; the line blocks are eliminated with a
//! Schur complement and only a surface-sized system is factored densely.

use crate::config::DewarpConfig;
use crate::poly::{LinePolynomial, SurfacePolynomial, surface_term_count};
use crate::types::{FitResult, NormFrame, TextLine};
use crate::{DewarpError, DewarpResult};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-15;
const MAX_DAMPING: f64 = 1e12;
const STEP_TOLERANCE: f64 = 1e-12;

/// Half-widths of the uniform initial-guess distributions
const SURFACE_INIT_SPREAD: f64 = 0.05;
const OFFSET_INIT_SPREAD: f64 = 0.01;
const SHAPE_INIT_SPREAD: f64 = 0.02;

#[derive(Debug, Clone)]
struct State {
    surface: SurfacePolynomial,
    lines: Vec<LinePolynomial>,
}

impl State {
    fn norm(&self) -> f64 {
        let s: f64 = self.surface.coeffs().iter().map(|c| c * c).sum();
        let l: f64 = self
            .lines
            .iter()
            .flat_map(|l| l.coeffs())
            .map(|c| c * c)
            .sum();
        (s + l).sqrt()
    }

    fn apply(&self, step: &Step) -> State {
        let mut next = self.clone();
        for (c, d) in next.surface.coeffs_mut().iter_mut().zip(step.surface.iter()) {
            *c += d;
        }
        for (line, dl) in next.lines.iter_mut().zip(&step.lines) {
            for (c, d) in line.coeffs_mut().iter_mut().zip(dl.iter()) {
                *c += d;
            }
        }
        next
    }
}

struct Step {
    surface: DVector<f64>,
    lines: Vec<DVector<f64>>,
}

impl Step {
    fn norm(&self) -> f64 {
        let l: f64 = self.lines.iter().map(|d| d.norm_squared()).sum();
        (self.surface.norm_squared() + l).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.surface.iter().all(|d| d.is_finite())
            && self.lines.iter().all(|dl| dl.iter().all(|d| d.is_finite()))
    }
}

/// Normal-equation blocks belonging to one text line
struct LineBlock {
    /// Line-line block of `JᵀJ`
    v: DMatrix<f64>,
    /// Surface-line block of `JᵀJ`
    w: DMatrix<f64>,
    /// Line part of `Jᵀr`
    g: DVector<f64>,
}

/// `JᵀJ` and `Jᵀr` in block-arrow form
struct NormalEquations {
    u: DMatrix<f64>,
    g: DVector<f64>,
    blocks: Vec<LineBlock>,
}

fn singular(what: &str) -> DewarpError {
    DewarpError::SingularSystem(what.to_string())
}

impl NormalEquations {
    /// Marquardt scaling needs a strictly positive diagonal.
    fn check_diagonal(&self) -> DewarpResult<()> {
        let mut diag: Vec<f64> = self.u.diagonal().iter().copied().collect();
        for block in &self.blocks {
            diag.extend(block.v.diagonal().iter().copied());
        }
        let max_diag = diag.iter().copied().fold(0.0f64, f64::max);
        if diag
            .iter()
            .any(|&d| !d.is_finite() || d <= f64::EPSILON * max_diag)
        {
            return Err(singular("normal matrix has a vanishing diagonal entry"));
        }
        Ok(())
    }

    /// Solve `(JᵀJ + μ·diag(JᵀJ)) δ = -Jᵀr`.
    fn solve(&self, mu: f64) -> DewarpResult<Step> {
        let m = self.u.nrows();
        let mut schur = self.u.clone();
        for i in 0..m {
            schur[(i, i)] *= 1.0 + mu;
        }
        let mut rhs = -self.g.clone();

        let mut eliminated = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let mut v = block.v.clone();
            for i in 0..v.nrows() {
                v[(i, i)] *= 1.0 + mu;
            }
            let chol = v
                .cholesky()
                .ok_or_else(|| singular("line block is not positive definite"))?;
            let vinv_wt = chol.solve(&block.w.transpose());
            let vinv_g = chol.solve(&block.g);
            schur -= &block.w * &vinv_wt;
            rhs += &block.w * &vinv_g;
            eliminated.push((vinv_wt, vinv_g));
        }

        let surface = schur
            .cholesky()
            .ok_or_else(|| singular("reduced surface system is not positive definite"))?
            .solve(&rhs);
        let lines = eliminated
            .iter()
            .map(|(vinv_wt, vinv_g)| {
                let mut d = vinv_wt * &surface;
                d += vinv_g;
                -d
            })
            .collect();

        let step = Step { surface, lines };
        if !step.is_finite() {
            return Err(singular("non-finite step"));
        }
        Ok(step)
    }
}

/// Observations in normalized coordinates, grouped by line
struct Problem {
    lines: Vec<Vec<(f64, f64)>>,
    n_points: usize,
    gcs_degree: u32,
    line_degree: u32,
    regularization: f64,
}

impl Problem {
    fn new(lines: &[TextLine], frame: &NormFrame, config: &DewarpConfig) -> Self {
        let lines: Vec<Vec<(f64, f64)>> = lines
            .iter()
            .map(|l| l.points().iter().map(|p| frame.to_norm(p.x, p.y)).collect())
            .collect();
        let n_points = lines.iter().map(Vec::len).sum();
        Self {
            lines,
            n_points,
            gcs_degree: config.gcs_degree(),
            line_degree: config.line_degree(),
            regularization: config.line_regularization(),
        }
    }

    fn line_weight(&self, n: usize) -> f64 {
        self.regularization * (n as f64).sqrt()
    }

    fn initial_guess(&self, seed: u64) -> State {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut surface = SurfacePolynomial::zero(self.gcs_degree);
        for c in surface.coeffs_mut() {
            *c = rng.random_range(-SURFACE_INIT_SPREAD..SURFACE_INIT_SPREAD);
        }
        let mut lines = Vec::with_capacity(self.lines.len());
        for pts in &self.lines {
            let mean_v = pts.iter().map(|p| p.1).sum::<f64>() / pts.len() as f64;
            let offset = rng.random_range(-OFFSET_INIT_SPREAD..OFFSET_INIT_SPREAD);
            let mut line = LinePolynomial::constant(self.line_degree, mean_v + offset);
            for c in &mut line.coeffs_mut()[1..] {
                *c = rng.random_range(-SHAPE_INIT_SPREAD..SHAPE_INIT_SPREAD);
            }
            lines.push(line);
        }
        State { surface, lines }
    }

    fn cost(&self, state: &State) -> f64 {
        let mut cost = 0.0;
        for (pts, line) in self.lines.iter().zip(&state.lines) {
            for &(u, v) in pts {
                let l = line.eval(u);
                let r = v - (l + state.surface.eval(u, l));
                cost += r * r;
            }
            let w = self.line_weight(pts.len());
            cost += line.coeffs()[1..].iter().map(|c| (w * c).powi(2)).sum::<f64>();
        }
        cost
    }

    fn normal_equations(&self, state: &State) -> NormalEquations {
        let m = surface_term_count(self.gcs_degree);
        let nl = self.line_degree as usize + 1;
        let surface = &state.surface;

        let mut u_blk = DMatrix::zeros(m, m);
        let mut g_s = DVector::zeros(m);
        let mut blocks = Vec::with_capacity(self.lines.len());
        let mut js = vec![0.0; m];
        let mut jl = vec![0.0; nl];

        for (pts, line) in self.lines.iter().zip(&state.lines) {
            let mut v_blk = DMatrix::zeros(nl, nl);
            let mut w_blk = DMatrix::zeros(m, nl);
            let mut g_l = DVector::zeros(nl);

            for &(u, v) in pts {
                let l = line.eval(u);
                let r = v - (l + surface.eval(u, l));

                surface.monomials(u, l, &mut js);
                for j in js.iter_mut() {
                    *j = -*j;
                }
                let dl = -(1.0 + surface.eval_dv(u, l));
                let mut up = 1.0;
                for j in jl.iter_mut() {
                    *j = dl * up;
                    up *= u;
                }

                for a in 0..m {
                    g_s[a] += js[a] * r;
                    for b in 0..m {
                        u_blk[(a, b)] += js[a] * js[b];
                    }
                    for b in 0..nl {
                        w_blk[(a, b)] += js[a] * jl[b];
                    }
                }
                for a in 0..nl {
                    g_l[a] += jl[a] * r;
                    for b in 0..nl {
                        v_blk[(a, b)] += jl[a] * jl[b];
                    }
                }
            }

            let w = self.line_weight(pts.len());
            for j in 1..nl {
                v_blk[(j, j)] += w * w;
                g_l[j] += w * w * line.coeffs()[j];
            }
            blocks.push(LineBlock {
                v: v_blk,
                w: w_blk,
                g: g_l,
            });
        }

        NormalEquations {
            u: u_blk,
            g: g_s,
            blocks,
        }
    }
}

/// Fit the surface and one polynomial per line, starting from a random
/// guess drawn from `seed`.
///
/// Reaching the iteration cap is not an error; the residual of the result
/// reports how good the fit is.
///
/// # Errors
///
/// - [`DewarpError::InsufficientEvidence`] if `lines` is empty
/// - [`DewarpError::SingularSystem`] if the damped normal equations cannot
///   be solved
pub fn fit_surface(
    lines: &[TextLine],
    frame: &NormFrame,
    config: &DewarpConfig,
    seed: u64,
) -> DewarpResult<FitResult> {
    if lines.is_empty() {
        return Err(DewarpError::InsufficientEvidence(
            "no text lines to fit".to_string(),
        ));
    }

    let problem = Problem::new(lines, frame, config);
    let mut state = problem.initial_guess(seed);
    let mut cost = problem.cost(&state);
    let mut mu = INITIAL_DAMPING;
    let mut iterations = 0;

    'outer: while iterations < config.max_iterations() && cost > 0.0 {
        iterations += 1;
        let normal = problem.normal_equations(&state);
        normal.check_diagonal()?;

        loop {
            let step = normal.solve(mu)?;
            if step.norm() <= STEP_TOLERANCE * (state.norm() + STEP_TOLERANCE) {
                break 'outer;
            }
            let candidate = state.apply(&step);
            let new_cost = problem.cost(&candidate);
            if new_cost.is_finite() && new_cost < cost {
                let converged = cost - new_cost <= config.tolerance() * cost;
                state = candidate;
                cost = new_cost;
                mu = (mu / 10.0).max(MIN_DAMPING);
                if converged {
                    break 'outer;
                }
                break;
            }
            mu *= 10.0;
            if mu > MAX_DAMPING {
                break 'outer;
            }
        }
    }

    let residual = (cost / problem.n_points as f64).sqrt() * frame.scale();
    Ok(FitResult::new(
        *frame,
        state.surface,
        state.lines,
        residual,
        iterations,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::configure;
    use crate::types::Point;

    /// Lines generated by a known model: flat lines under `S = a·u²`.
    fn curved_lines(frame: &NormFrame, a: f64, rows: &[f64]) -> Vec<TextLine> {
        rows.iter()
            .map(|&v| {
                let points = (0..33)
                    .map(|i| {
                        let u = -0.8 + 0.05 * i as f64;
                        let (x, y) = frame.to_pixel(u, v + a * u * u);
                        Point::new(x, y)
                    })
                    .collect();
                TextLine::new(points).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_recovers_generating_model() {
        let frame = NormFrame::new(400, 300).unwrap();
        let lines = curved_lines(&frame, 0.1, &[-0.6, -0.3, 0.0, 0.3, 0.6]);
        let config = configure(2, 2).unwrap();

        let fit = fit_surface(&lines, &frame, &config, 11).unwrap();
        assert!(fit.residual() < 1e-3, "residual {}", fit.residual());
        let a = fit.surface().coeff(2, 0).unwrap();
        assert!((a - 0.1).abs() < 1e-4, "u^2 coefficient {a}");
        assert!(fit.surface().coeff(1, 0).unwrap().abs() < 1e-4);
        assert!(fit.surface().coeff(1, 1).unwrap().abs() < 1e-4);
        assert!((fit.lines()[1].eval(0.0) + 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_degrees_follow_config() {
        let frame = NormFrame::new(400, 300).unwrap();
        let lines = curved_lines(&frame, 0.05, &[-0.4, 0.0, 0.4]);
        let config = configure(2, 3).unwrap();
        let fit = fit_surface(&lines, &frame, &config, 3).unwrap();
        assert_eq!(fit.surface().degree(), 2);
        assert_eq!(fit.surface().coeffs().len(), 3);
        assert_eq!(fit.lines().len(), 3);
        assert!(fit.lines().iter().all(|l| l.degree() == 3));
        assert!(fit.iterations() >= 1);
    }

    #[test]
    fn test_same_seed_same_fit() {
        let frame = NormFrame::new(300, 300).unwrap();
        let lines = curved_lines(&frame, -0.08, &[-0.5, 0.1, 0.5]);
        let config = configure(3, 2).unwrap();
        let a = fit_surface(&lines, &frame, &config, 99).unwrap();
        let b = fit_surface(&lines, &frame, &config, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_lines_is_insufficient() {
        let frame = NormFrame::new(100, 100).unwrap();
        let config = configure(2, 2).unwrap();
        assert!(matches!(
            fit_surface(&[], &frame, &config, 0),
            Err(DewarpError::InsufficientEvidence(_))
        ));
    }

    #[test]
    fn test_points_on_centre_column_are_singular() {
        // Every surface monomial vanishes at u = 0.
        let frame = NormFrame::new(400, 300).unwrap();
        let (cx, _) = frame.center();
        let lines: Vec<_> = [50.0, 150.0, 250.0]
            .iter()
            .map(|&y| TextLine::new(vec![Point::new(cx, y); 5]).unwrap())
            .collect();
        let config = configure(2, 1).unwrap();
        assert!(matches!(
            fit_surface(&lines, &frame, &config, 0),
            Err(DewarpError::SingularSystem(_))
        ));
    }
}
