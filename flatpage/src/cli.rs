//! Command line interface definitions

use clap::Parser;
use flatpage::dewarp::{DEFAULT_N_TRIES, DEFAULT_SEED, DewarpError};
use std::path::PathBuf;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Page written
    Success = 0,
    /// I/O or any other unexpected failure
    GeneralError = 1,
    /// Bad polynomial degrees, try count or output width
    InvalidArgs = 2,
    /// No text lines found on the page
    NoTextLines = 3,
    /// Every fitting attempt was singular
    NoConvergentFit = 4,
    /// The fitted model cannot be inverted
    DegenerateMapping = 5,
}

impl ExitCode {
    /// Convert to process exit code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::InvalidArgs => "Invalid arguments",
            ExitCode::NoTextLines => "No text lines found",
            ExitCode::NoConvergentFit => "No fitting attempt converged",
            ExitCode::DegenerateMapping => "Fitted page model folds over itself",
        }
    }

    /// Pick the exit code for a failed run.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<DewarpError>() {
            Some(DewarpError::InvalidArgument(_)) => ExitCode::InvalidArgs,
            Some(DewarpError::InsufficientEvidence(_)) => ExitCode::NoTextLines,
            Some(DewarpError::NoConvergentFit { .. } | DewarpError::SingularSystem(_)) => {
                ExitCode::NoConvergentFit
            }
            Some(DewarpError::DegenerateMapping(_)) => ExitCode::DegenerateMapping,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}

/// Flatten a photographed book page
#[derive(Parser, Debug)]
#[command(name = "flatpage")]
#[command(version)]
#[command(about = "Flatten the curled text of a photographed page", long_about = None)]
pub struct Cli {
    /// Input image (PNG, JPEG or PNM)
    pub img_path: PathBuf,

    /// Output image; the format follows the extension
    pub out_path: PathBuf,

    /// Degree of the page surface polynomial
    #[arg(allow_negative_numbers = true)]
    pub gcs_poly_deg: i32,

    /// Degree of each text line polynomial
    #[arg(allow_negative_numbers = true)]
    pub line_poly_deg: i32,

    /// Number of randomly initialized fits; the best one is kept
    #[arg(long = "n_tries", default_value_t = DEFAULT_N_TRIES, allow_negative_numbers = true)]
    pub n_tries: i32,

    /// Output width in pixels [default: input width]
    #[arg(long)]
    pub output_width: Option<u32>,

    /// Seed for the fit initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Gray level for output pixels that fall outside the input
    #[arg(long, default_value_t = 255)]
    pub background: u8,

    /// Write a text line overlay and the fitted model into this directory
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}
