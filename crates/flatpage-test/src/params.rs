//! Regression test parameters and operations

use crate::error::{TestError, TestResult};
use crate::regout_dir;
use flatpage_core::{Pix, PixelDepth, color};
use flatpage_io::ImageFormat;
use std::fs;

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Run checks only (default)
    #[default]
    Compare,
    /// Run checks and write images for inspection
    Display,
}

impl RegTestMode {
    /// Parse mode from the `REGTEST_MODE` environment variable
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test parameters
///
/// Tracks the test name, the running check index, and every failure so a
/// single `cleanup()` reports all of them.
pub struct RegParams {
    /// Name of the test (e.g., "dewarp")
    pub test_name: String,
    /// Current check index (incremented before each check)
    index: usize,
    /// Test mode
    pub mode: RegTestMode,
    success: bool,
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();
        if mode == RegTestMode::Display {
            let _ = fs::create_dir_all(regout_dir());
        }

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {test_name}_reg   ///////////////");
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {mode:?}");

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current check index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn fail(&mut self, msg: String) {
        eprintln!("{msg}");
        self.failures.push(msg);
        self.success = false;
    }

    /// Compare two floating-point values
    ///
    /// Returns `true` if `|expected - actual| <= delta`.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();
        // NaN never compares within delta.
        if diff <= delta {
            return true;
        }
        let msg = format!(
            "Failure in {}_reg: value comparison for index {}\n\
             difference = {} but allowed delta = {}\n\
             expected = {}, actual = {}",
            self.test_name, self.index, diff, delta, expected, actual
        );
        self.fail(msg);
        false
    }

    /// Record a boolean check
    pub fn check(&mut self, cond: bool, what: &str) -> bool {
        self.index += 1;
        if !cond {
            let msg = format!(
                "Failure in {}_reg: check for index {} - {what}",
                self.test_name, self.index
            );
            self.fail(msg);
        }
        cond
    }

    /// Compare two Pix images for exact equality
    pub fn compare_pix(&mut self, pix1: &Pix, pix2: &Pix) -> bool {
        self.index += 1;
        if !pix1.sizes_equal(pix2) {
            let msg = format!(
                "Failure in {}_reg: pix comparison for index {} - dimension mismatch",
                self.test_name, self.index
            );
            self.fail(msg);
            return false;
        }
        for y in 0..pix1.height() {
            for x in 0..pix1.width() {
                if pix1.get_pixel(x, y) != pix2.get_pixel(x, y) {
                    let msg = format!(
                        "Failure in {}_reg: pix comparison for index {} - pixel mismatch at ({x}, {y})",
                        self.test_name, self.index
                    );
                    self.fail(msg);
                    return false;
                }
            }
        }
        true
    }

    /// Compare two same-size 8 or 32 bpp images by mean absolute difference
    ///
    /// 32 bpp pixels are compared per channel. Returns `true` if the mean
    /// difference is at most `max_mean`.
    pub fn compare_pix_within(&mut self, pix1: &Pix, pix2: &Pix, max_mean: f64) -> bool {
        self.index += 1;
        match mean_abs_diff(pix1, pix2) {
            Some(mean) if mean <= max_mean => true,
            Some(mean) => {
                let msg = format!(
                    "Failure in {}_reg: pix comparison for index {} - mean difference {mean:.3} > {max_mean}",
                    self.test_name, self.index
                );
                self.fail(msg);
                false
            }
            None => {
                let msg = format!(
                    "Failure in {}_reg: pix comparison for index {} - incomparable images",
                    self.test_name, self.index
                );
                self.fail(msg);
                false
            }
        }
    }

    /// Write a Pix to `tests/regout` in display mode
    ///
    /// Does nothing in compare mode.
    pub fn write_pix(&mut self, pix: &Pix, format: ImageFormat) -> TestResult<()> {
        self.index += 1;
        if !self.display() {
            return Ok(());
        }
        let path = format!(
            "{}/{}.{:02}.{}",
            regout_dir(),
            self.test_name,
            self.index,
            format.extension()
        );
        flatpage_io::write_image(pix, &path, format).map_err(|e| TestError::ImageWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;
        eprintln!("Wrote: {path}");
        Ok(())
    }

    /// Clean up and report results
    ///
    /// Returns `true` if all checks passed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {failure}");
            }
        }
        eprintln!();
        self.success
    }

    /// Check if all checks have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// Mean absolute per-sample difference of two same-size images.
///
/// Returns `None` for mismatched sizes or 1 bpp input.
pub fn mean_abs_diff(pix1: &Pix, pix2: &Pix) -> Option<f64> {
    if !pix1.sizes_equal(pix2) || pix1.depth() == PixelDepth::Bit1 {
        return None;
    }
    let mut total = 0u64;
    let mut n = 0u64;
    for y in 0..pix1.height() {
        for x in 0..pix1.width() {
            let a = pix1.get_pixel_unchecked(x, y);
            let b = pix2.get_pixel_unchecked(x, y);
            if pix1.depth() == PixelDepth::Bit32 {
                let (r1, g1, b1) = color::extract_rgb(a);
                let (r2, g2, b2) = color::extract_rgb(b);
                total += r1.abs_diff(r2) as u64 + g1.abs_diff(g2) as u64 + b1.abs_diff(b2) as u64;
                n += 3;
            } else {
                total += a.abs_diff(b) as u64;
                n += 1;
            }
        }
    }
    Some(total as f64 / n as f64)
}
