//! flatpage-dewarp - Page curl and skew correction
//!
//! Photographed book pages are curved: text lines that are straight on
//! paper come out bent. This crate models the page with a polynomial
//! surface and straightens it.
//!
//! # Overview
//!
//! Dewarping works by:
//! 1. Detecting text lines in the image ([`find_textlines`])
//! 2. Jointly fitting a page surface and one curve per line, from several
//!    random starting points ([`optimize`])
//! 3. Resampling the image through the best model ([`rectify`])
//!
//! # Example
//!
//! ```no_run
//! use flatpage_dewarp::{DewarpOptions, configure, dewarp};
//! use flatpage_core::{Pix, PixelDepth};
//!
//! # let pix = Pix::new(800, 600, PixelDepth::Bit8).unwrap();
//! let config = configure(2, 3).unwrap();
//! let options = DewarpOptions::new().with_n_tries(10);
//! match dewarp(&pix, &config, &options, None) {
//!     Ok(out) => {
//!         println!("residual {:.2} px over {} lines", out.fit.residual(), out.n_lines);
//!         // Use out.pix
//!     }
//!     Err(e) => println!("dewarping failed: {e}"),
//! }
//! ```
//!
//! # Configuration
//!
//! [`DewarpConfig`] fixes the model shape and is shared by every stage;
//! [`DewarpOptions`] holds per-call settings:
//!
//! ```
//! use flatpage_dewarp::{DewarpConfig, DewarpOptions};
//!
//! let config = DewarpConfig::new(3, 2)
//!     .unwrap()
//!     .with_max_iterations(50)
//!     .with_line_regularization(0.1);
//! let options = DewarpOptions::new()
//!     .with_n_tries(30)
//!     .with_output_width(1200)
//!     .with_gray_in(255);
//! # let _ = (config, options);
//! ```

mod config;
mod error;
mod fit;
mod observer;
mod optimize;
pub mod poly;
mod rectify;
mod textline;
mod types;

pub use config::{DEFAULT_N_TRIES, DEFAULT_SEED, DewarpConfig, DewarpOptions, configure};
pub use error::{DewarpError, DewarpResult};
pub use fit::fit_surface;
pub use observer::{AttemptReport, DewarpObserver};
pub use optimize::{attempt_seed, best_of, optimize};
pub use poly::{LinePolynomial, SurfacePolynomial};
pub use rectify::{OutputDomain, output_domain, rectify};
pub use textline::{
    binarize, find_textline_centers, find_textlines, remove_short_lines, sort_lines_by_y,
};
pub use types::{FitResult, NormFrame, Point, TextLine};

use flatpage_core::Pix;

/// Lines whose model displacement stays below this many pixels count as
/// straight.
const STRAIGHT_LINE_TOLERANCE: f64 = 5.0;

/// Result of a successful [`dewarp`]
#[derive(Debug, Clone)]
pub struct DewarpOutput {
    /// The dewarped image
    pub pix: Pix,
    /// The model it was resampled through
    pub fit: FitResult,
    /// Number of text lines the model was fitted to
    pub n_lines: usize,
}

/// Dewarp a single page
///
/// This is the main entry point. It detects text lines, keeps the best of
/// `options.n_tries` fits and resamples `pix` at `options.output_width`
/// (default: the input width). The input is not modified.
///
/// # Errors
///
/// - [`DewarpError::InvalidArgument`] for a non-positive `n_tries` or a zero
///   output width
/// - [`DewarpError::InsufficientEvidence`] if no text lines are found
/// - [`DewarpError::NoConvergentFit`] if every attempt was singular
/// - [`DewarpError::DegenerateMapping`] if the best model cannot be inverted
pub fn dewarp(
    pix: &Pix,
    config: &DewarpConfig,
    options: &DewarpOptions,
    mut observer: Option<&mut dyn DewarpObserver>,
) -> DewarpResult<DewarpOutput> {
    if options.n_tries <= 0 {
        return Err(DewarpError::InvalidArgument(format!(
            "n_tries must be positive, got {}",
            options.n_tries
        )));
    }
    let output_width = options.output_width.unwrap_or(pix.width());
    if output_width == 0 {
        return Err(DewarpError::InvalidArgument(
            "output width must be positive".to_string(),
        ));
    }

    let lines = find_textlines(pix)?;
    if lines.is_empty() {
        return Err(DewarpError::InsufficientEvidence(
            "no text lines found".to_string(),
        ));
    }
    if let Some(obs) = observer.as_deref_mut() {
        obs.lines_extracted(&lines);
    }

    let frame = NormFrame::new(pix.width(), pix.height())?;
    let fit = optimize(
        &lines,
        &frame,
        config,
        options.n_tries,
        options.seed,
        observer.as_deref_mut(),
    )?;
    if let Some(obs) = observer.as_deref_mut() {
        obs.model_selected(&fit);
    }

    let out = rectify(pix, &fit, output_width, options.gray_in)?;
    Ok(DewarpOutput {
        pix: out,
        fit,
        n_lines: lines.len(),
    })
}

/// Check if an image likely needs dewarping
///
/// Fits the model once and reports whether it moves any detected line
/// point by more than a few pixels. Pages without text lines, or whose fit
/// is singular, are reported as not needing correction.
pub fn needs_dewarping(pix: &Pix, config: &DewarpConfig) -> DewarpResult<bool> {
    let lines = find_textlines(pix)?;
    if lines.is_empty() {
        return Ok(false);
    }
    let frame = NormFrame::new(pix.width(), pix.height())?;
    let fit = match fit_surface(&lines, &frame, config, DEFAULT_SEED) {
        Ok(fit) => fit,
        Err(DewarpError::SingularSystem(_)) => return Ok(false),
        Err(e) => return Err(e),
    };

    let s = frame.scale();
    let surface = fit.surface();
    let displacement = lines
        .iter()
        .zip(fit.lines())
        .flat_map(|(line, poly)| {
            line.points().iter().map(move |p| {
                let (u, _) = frame.to_norm(p.x, p.y);
                (surface.eval(u, poly.eval(u)) * s).abs()
            })
        })
        .fold(0.0f64, f64::max);
    Ok(displacement > STRAIGHT_LINE_TOLERANCE)
}
