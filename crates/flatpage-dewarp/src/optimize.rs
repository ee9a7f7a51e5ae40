//! Best-of-N selection over randomized fits
//!
//! Attempt `i` is a pure function of `attempt_seed(seed, i)`, so the winner
//! depends only on the base seed and the number of attempts, never on the
//! order in which attempts happen to finish.

use crate::config::DewarpConfig;
use crate::fit::fit_surface;
use crate::observer::{AttemptReport, DewarpObserver};
use crate::types::{FitResult, NormFrame, TextLine};
use crate::{DewarpError, DewarpResult};

/// Seed of attempt `index` derived from the base seed (splitmix64).
pub fn attempt_seed(seed: u64, index: usize) -> u64 {
    let step = (index as u64).wrapping_add(1);
    let mut z = seed.wrapping_add(step.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Fit `n_tries` times from independent random starts and keep the fit with
/// the lowest residual.
///
/// # Errors
///
/// - [`DewarpError::InvalidArgument`] if `n_tries <= 0`
/// - [`DewarpError::InsufficientEvidence`] if `lines` is empty
/// - [`DewarpError::NoConvergentFit`] if every attempt was singular
pub fn optimize<'o>(
    lines: &[TextLine],
    frame: &NormFrame,
    config: &DewarpConfig,
    n_tries: i32,
    seed: u64,
    observer: Option<&mut (dyn DewarpObserver + 'o)>,
) -> DewarpResult<FitResult> {
    if lines.is_empty() {
        return Err(DewarpError::InsufficientEvidence(
            "no text lines to fit".to_string(),
        ));
    }
    best_of(n_tries, seed, observer, |_, attempt| {
        fit_surface(lines, frame, config, attempt)
    })
}

/// Run `attempt(i, attempt_seed(seed, i))` for `i in 0..n_tries` and fold
/// the outcomes into the best fit.
///
/// A [`DewarpError::SingularSystem`] outcome is reported to the observer and
/// skipped; any other error is returned immediately. The lowest residual
/// wins and ties keep the earlier attempt.
///
/// With the `parallel` feature the attempts run on the rayon pool; outcomes
/// are still folded, and reported, in attempt order.
pub fn best_of<'o, F>(
    n_tries: i32,
    seed: u64,
    mut observer: Option<&mut (dyn DewarpObserver + 'o)>,
    attempt: F,
) -> DewarpResult<FitResult>
where
    F: Fn(usize, u64) -> DewarpResult<FitResult> + Sync,
{
    if n_tries <= 0 {
        return Err(DewarpError::InvalidArgument(format!(
            "n_tries must be positive, got {n_tries}"
        )));
    }
    let n = n_tries as usize;
    let run = |i: usize| {
        let s = attempt_seed(seed, i);
        (i, s, attempt(i, s))
    };

    let mut best: Option<FitResult> = None;
    let mut fold = |(index, seed, outcome): (usize, u64, DewarpResult<FitResult>)| {
        let fit = match outcome {
            Ok(fit) => Some(fit),
            Err(DewarpError::SingularSystem(_)) => None,
            Err(e) => return Err(e),
        };
        let report = AttemptReport {
            index,
            seed,
            residual: fit.as_ref().map(FitResult::residual),
            iterations: fit.as_ref().map_or(0, FitResult::iterations),
        };
        if let Some(obs) = observer.as_deref_mut() {
            obs.attempt_finished(&report);
        }
        if let Some(fit) = fit
            && best.as_ref().is_none_or(|b| fit.residual() < b.residual())
        {
            best = Some(fit);
        }
        Ok(())
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let outcomes: Vec<_> = (0..n).into_par_iter().map(run).collect();
        for outcome in outcomes {
            fold(outcome)?;
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        for i in 0..n {
            fold(run(i))?;
        }
    }

    best.ok_or(DewarpError::NoConvergentFit { attempts: n })
}
