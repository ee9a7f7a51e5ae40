//! Progress logging and debug output

use anyhow::Context;
use flatpage::color::pix_convert_to_gray;
use flatpage::dewarp::{AttemptReport, DewarpObserver, FitResult, TextLine};
use flatpage::io::write_image;
use flatpage::{ImageFormat, Pix, PixMut, PixelDepth};
use flatpage_core::color::compose_rgb;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const POINT_COLOR: (u8, u8, u8) = (255, 0, 0);
const CURVE_COLOR: (u8, u8, u8) = (0, 160, 0);

/// Logs each stage of a dewarp and keeps what the debug output needs
#[derive(Default)]
pub struct LoggingObserver {
    lines: Vec<TextLine>,
    fit: Option<FitResult>,
    converged: usize,
}

impl DewarpObserver for LoggingObserver {
    fn lines_extracted(&mut self, lines: &[TextLine]) {
        let points: usize = lines.iter().map(TextLine::len).sum();
        info!(lines = lines.len(), points, "text lines extracted");
        self.lines = lines.to_vec();
    }

    fn attempt_finished(&mut self, report: &AttemptReport) {
        match report.residual {
            Some(residual) => {
                self.converged += 1;
                debug!(
                    attempt = report.index,
                    seed = report.seed,
                    iterations = report.iterations,
                    residual,
                    "attempt finished"
                );
            }
            None => debug!(attempt = report.index, seed = report.seed, "attempt singular"),
        }
    }

    fn model_selected(&mut self, fit: &FitResult) {
        info!(
            residual = fit.residual(),
            iterations = fit.iterations(),
            converged = self.converged,
            "model selected"
        );
        self.fit = Some(fit.clone());
    }
}

impl LoggingObserver {
    /// Write `lines.png` and, once a model was selected, `model.txt`.
    pub fn write_debug(&self, dir: &Path, pix: &Pix) -> anyhow::Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create debug directory {}", dir.display()))?;

        let overlay = render_overlay(pix, &self.lines, self.fit.as_ref())?;
        let path = dir.join("lines.png");
        write_image(&overlay, &path, ImageFormat::Png)
            .with_context(|| format!("cannot write {}", path.display()))?;
        debug!(path = %path.display(), "wrote line overlay");

        if let Some(fit) = &self.fit {
            let path = dir.join("model.txt");
            fs::write(&path, describe_model(fit))
                .with_context(|| format!("cannot write {}", path.display()))?;
            debug!(path = %path.display(), "wrote model");
        }
        Ok(())
    }
}

/// Text dump of a fitted model
pub fn describe_model(fit: &FitResult) -> String {
    let mut out = String::new();
    let frame = fit.frame();
    let (cx, cy) = frame.center();
    let _ = writeln!(
        out,
        "frame {}x{} center ({cx}, {cy}) scale {}",
        frame.width(),
        frame.height(),
        frame.scale()
    );
    let _ = writeln!(out, "residual {:.6} px", fit.residual());
    let _ = writeln!(out, "iterations {}", fit.iterations());
    let surface = fit.surface();
    let _ = writeln!(out, "surface degree {}", surface.degree());
    for ((p, q), c) in flatpage::dewarp::poly::surface_terms(surface.degree()).zip(surface.coeffs())
    {
        let _ = writeln!(out, "  u^{p} v^{q}  {c:+.6e}");
    }
    for (k, line) in fit.lines().iter().enumerate() {
        let coeffs: Vec<String> = line.coeffs().iter().map(|c| format!("{c:+.6e}")).collect();
        let _ = writeln!(out, "line {k}  {}", coeffs.join(" "));
    }
    out
}

/// Draw detected line points and fitted line curves over the page.
pub fn render_overlay(
    pix: &Pix,
    lines: &[TextLine],
    fit: Option<&FitResult>,
) -> anyhow::Result<Pix> {
    let mut out = to_rgb(pix)?;

    if let Some(fit) = fit {
        let frame = fit.frame();
        for line in fit.lines() {
            for x in 0..pix.width() {
                let (u, _) = frame.to_norm(x as f64, 0.0);
                let (px, py) = fit.project(u, line.eval(u));
                plot(&mut out, px, py, 0, CURVE_COLOR);
            }
        }
    }
    for line in lines {
        for p in line.points() {
            plot(&mut out, p.x, p.y, 1, POINT_COLOR);
        }
    }
    Ok(out.into())
}

fn to_rgb(pix: &Pix) -> anyhow::Result<PixMut> {
    if pix.depth() == PixelDepth::Bit32 {
        return Ok(pix.to_mut());
    }
    let gray = pix_convert_to_gray(pix)?;
    let mut out = Pix::new(pix.width(), pix.height(), PixelDepth::Bit32)?.to_mut();
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            let g = gray.get_pixel_unchecked(x, y) as u8;
            out.set_pixel_unchecked(x, y, compose_rgb(g, g, g));
        }
    }
    Ok(out)
}

/// Paint a `(2r+1)`-pixel square centred on `(x, y)`, clipped to the image.
fn plot(out: &mut PixMut, x: f64, y: f64, r: i64, (red, green, blue): (u8, u8, u8)) {
    if !x.is_finite() || !y.is_finite() {
        return;
    }
    let (w, h) = (out.width() as i64, out.height() as i64);
    let (xc, yc) = (x.round() as i64, y.round() as i64);
    let pixel = compose_rgb(red, green, blue);
    for yy in (yc - r)..=(yc + r) {
        for xx in (xc - r)..=(xc + r) {
            if (0..w).contains(&xx) && (0..h).contains(&yy) {
                out.set_pixel_unchecked(xx as u32, yy as u32, pixel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatpage::dewarp::{LinePolynomial, NormFrame, Point, SurfacePolynomial};

    fn gray_page(w: u32, h: u32) -> Pix {
        let mut pm = Pix::new(w, h, PixelDepth::Bit8).unwrap().to_mut();
        for y in 0..h {
            for x in 0..w {
                pm.set_pixel_unchecked(x, y, 200);
            }
        }
        pm.into()
    }

    fn flat_fit(w: u32, h: u32, v0: f64) -> FitResult {
        let frame = NormFrame::new(w, h).unwrap();
        FitResult::new(
            frame,
            SurfacePolynomial::zero(2),
            vec![LinePolynomial::constant(2, v0)],
            0.25,
            7,
        )
    }

    #[test]
    fn test_overlay_marks_points_and_curves() {
        let pix = gray_page(40, 30);
        let line = TextLine::new(vec![Point::new(10.0, 5.0), Point::new(30.0, 5.0)]).unwrap();
        // v = 0 is the centre row, y = 14.5
        let fit = flat_fit(40, 30, 0.0);
        let out = render_overlay(&pix, &[line], Some(&fit)).unwrap();

        assert_eq!(out.depth(), PixelDepth::Bit32);
        assert_eq!((out.width(), out.height()), (40, 30));
        assert_eq!(out.get_rgb(10, 5), Some(POINT_COLOR));
        assert_eq!(out.get_rgb(11, 6), Some(POINT_COLOR));
        assert_eq!(out.get_rgb(20, 15), Some(CURVE_COLOR));
        assert_eq!(out.get_rgb(20, 25), Some((200, 200, 200)));
    }

    #[test]
    fn test_plot_clips_at_border() {
        let mut out = to_rgb(&gray_page(5, 5)).unwrap();
        plot(&mut out, 0.0, 4.0, 2, POINT_COLOR);
        plot(&mut out, f64::NAN, 1.0, 1, POINT_COLOR);
        let out: Pix = out.into();
        assert_eq!(out.get_rgb(0, 4), Some(POINT_COLOR));
        assert_eq!(out.get_rgb(2, 2), Some(POINT_COLOR));
        assert_eq!(out.get_rgb(4, 0), Some((200, 200, 200)));
    }

    #[test]
    fn test_describe_model() {
        let text = describe_model(&flat_fit(40, 30, 0.1));
        assert!(text.starts_with("frame 40x30"));
        assert!(text.contains("residual 0.250000 px"));
        assert!(text.contains("iterations 7"));
        assert!(text.contains("u^1 v^1"));
        assert!(text.contains("line 0"));
    }

    #[test]
    fn test_observer_keeps_lines_and_model() {
        let mut obs = LoggingObserver::default();
        let line = TextLine::new(vec![Point::new(1.0, 2.0)]).unwrap();
        obs.lines_extracted(std::slice::from_ref(&line));
        obs.attempt_finished(&AttemptReport {
            index: 0,
            seed: 1,
            residual: Some(0.5),
            iterations: 4,
        });
        obs.attempt_finished(&AttemptReport {
            index: 1,
            seed: 2,
            residual: None,
            iterations: 0,
        });
        obs.model_selected(&flat_fit(40, 30, 0.0));
        assert_eq!(obs.lines, vec![line]);
        assert_eq!(obs.converged, 1);
        assert!(obs.fit.is_some());
    }
}
