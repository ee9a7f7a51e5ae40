//! flatpage-test - Regression test framework for flatpage
//!
//! Two modes, selected by the `REGTEST_MODE` environment variable:
//!
//! - **Compare** (default): run checks, write nothing
//! - **Display**: additionally write intermediate images to `tests/regout`
//!   for visual inspection
//!
//! Inputs are synthesized ([`synth`]) rather than loaded from fixtures, so
//! every expected value is known exactly.
//!
//! # Usage
//!
//! ```ignore
//! use flatpage_test::RegParams;
//!
//! let mut rp = RegParams::new("dewarp");
//! rp.compare_values(400.0, out.width() as f64, 0.0);
//! assert!(rp.cleanup());
//! ```

mod error;
mod params;
pub mod synth;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode, mean_abs_diff};
pub use synth::{PageLayout, blank_page, gray_to_rgb, make_text_page, warp_page_vertically};

/// Get the path to the workspace root
fn workspace_root() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    // flatpage-test is at crates/flatpage-test, so go up two directories
    format!("{manifest_dir}/../..")
}

/// Get the path to the regout (regression output) directory
pub fn regout_dir() -> String {
    format!("{}/tests/regout", workspace_root())
}
