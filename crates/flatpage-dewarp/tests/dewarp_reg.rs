//! Dewarping regression test
//!
//! Synthetic pages with a known vertical warp `disp(x) = A·u²` are
//! dewarped; the fitted surface, the output geometry and the straightness
//! of the recovered lines are checked against the known warp.

use flatpage_core::{FPix, ImageFormat, Pix, PixelDepth};
use flatpage_dewarp::{
    AttemptReport, DewarpError, DewarpObserver, DewarpOptions, FitResult, LinePolynomial,
    NormFrame, Point, SurfacePolynomial, TextLine, configure, dewarp, find_textlines,
    needs_dewarping, optimize, output_domain, rectify,
};
use flatpage_test::{
    PageLayout, RegParams, blank_page, gray_to_rgb, make_text_page, warp_page_vertically,
};
use flatpage_transform::{RemapFill, remap};

/// Peak displacement of the synthetic warp at the page corners, in pixels
const AMPLITUDE: f64 = 12.0;

fn warp_disp(x: f32) -> f32 {
    (AMPLITUDE as f32) * ((x - 199.5) / 200.0).powi(2)
}

/// Largest vertical spread of any detected line
fn max_line_spread(pix: &Pix) -> f64 {
    find_textlines(pix)
        .expect("find_textlines")
        .iter()
        .map(|l| {
            let ys = l.points().iter().map(|p| p.y);
            let lo = ys.clone().fold(f64::INFINITY, f64::min);
            let hi = ys.fold(f64::NEG_INFINITY, f64::max);
            hi - lo
        })
        .fold(0.0, f64::max)
}

#[derive(Default)]
struct Recorder {
    n_lines: usize,
    attempts: Vec<AttemptReport>,
    selected: Option<f64>,
}

impl DewarpObserver for Recorder {
    fn lines_extracted(&mut self, lines: &[TextLine]) {
        self.n_lines = lines.len();
    }

    fn attempt_finished(&mut self, report: &AttemptReport) {
        self.attempts.push(report.clone());
    }

    fn model_selected(&mut self, fit: &FitResult) {
        self.selected = Some(fit.residual());
    }
}

#[test]
fn dewarp_flat_reg() {
    let mut rp = RegParams::new("dewarp_flat");
    let layout = PageLayout::default();
    let page = make_text_page(&layout).expect("make_text_page");
    let config = configure(2, 2).expect("configure");

    // --- Test 1: a flat page is left alone ---
    eprintln!("=== Flat page ===");
    let options = DewarpOptions::new().with_n_tries(5);
    let mut rec = Recorder::default();
    let out = dewarp(&page, &config, &options, Some(&mut rec)).expect("dewarp flat");
    eprintln!(
        "  residual {:.4} px, {} lines, output {}x{}",
        out.fit.residual(),
        out.n_lines,
        out.pix.width(),
        out.pix.height()
    );
    rp.compare_values(0.0, out.fit.residual(), 0.05);
    rp.compare_values(layout.n_lines as f64, out.n_lines as f64, 0.0);
    rp.compare_values(400.0, out.pix.width() as f64, 0.0);
    rp.compare_values(300.0, out.pix.height() as f64, 0.0);
    rp.compare_pix_within(&out.pix, &page, 0.5);
    rp.check(
        !needs_dewarping(&page, &config).expect("needs_dewarping"),
        "flat page does not need dewarping",
    );

    // --- Test 2: observer sees every stage ---
    rp.compare_values(layout.n_lines as f64, rec.n_lines as f64, 0.0);
    rp.compare_values(5.0, rec.attempts.len() as f64, 0.0);
    rp.check(
        rec.attempts.iter().enumerate().all(|(i, r)| r.index == i),
        "attempts reported in order",
    );
    rp.check(
        rec.selected == Some(out.fit.residual()),
        "observer saw the returned model",
    );

    // --- Test 3: same seed, same result ---
    let again = dewarp(&page, &config, &options, None).expect("dewarp again");
    rp.check(again.fit == out.fit, "fixed seed reproduces the fit");
    rp.compare_pix(&again.pix, &out.pix);

    // --- Test 4: requested widths are honoured ---
    for width in [200u32, 400, 650] {
        let options = DewarpOptions::new().with_n_tries(2).with_output_width(width);
        let out = dewarp(&page, &config, &options, None).expect("dewarp width");
        rp.compare_values(width as f64, out.pix.width() as f64, 0.0);
        let expected_h = 300.0 * width as f64 / 400.0;
        rp.compare_values(expected_h, out.pix.height() as f64, 1.0);
    }

    // --- Test 5: configured degrees reach the model ---
    let config23 = configure(2, 3).expect("configure 2,3");
    let out = dewarp(&page, &config23, &options, None).expect("dewarp 2,3");
    rp.compare_values(2.0, out.fit.surface().degree() as f64, 0.0);
    rp.check(
        out.fit.lines().iter().all(|l| l.degree() == 3),
        "line polynomials have degree 3",
    );

    // --- Test 6: RGB input keeps its depth ---
    let rgb = gray_to_rgb(&page).expect("gray_to_rgb");
    let out = dewarp(&rgb, &config, &options, None).expect("dewarp rgb");
    rp.check(out.pix.depth() == PixelDepth::Bit32, "RGB in, RGB out");
    rp.compare_values(400.0, out.pix.width() as f64, 0.0);

    assert!(rp.cleanup(), "dewarp_flat regression test failed");
}

#[test]
fn dewarp_warped_reg() {
    let mut rp = RegParams::new("dewarp_warped");
    let layout = PageLayout::default();
    let page = make_text_page(&layout).expect("make_text_page");
    let warped = warp_page_vertically(&page, warp_disp).expect("warp");
    rp.write_pix(&warped, ImageFormat::Png).expect("write warped");
    let config = configure(2, 2).expect("configure");

    // --- Test 1: the fitted surface matches the warp ---
    eprintln!("=== Warped page ===");
    let options = DewarpOptions::new().with_n_tries(5);
    let out = dewarp(&warped, &config, &options, None).expect("dewarp warped");
    let s20 = out.fit.surface().coeff(2, 0).expect("u^2 term");
    let expected = AMPLITUDE / 200.0;
    eprintln!(
        "  residual {:.4} px, u^2 coefficient {s20:.5} (expected {expected:.5})",
        out.fit.residual()
    );
    rp.compare_values(expected, s20, 0.1 * expected);
    rp.check(out.fit.residual() < 1.0, "sub-pixel residual");
    rp.check(
        needs_dewarping(&warped, &config).expect("needs_dewarping"),
        "warped page needs dewarping",
    );
    rp.write_pix(&out.pix, ImageFormat::Png).expect("write dewarped");

    // --- Test 2: lines come out straight ---
    let before = max_line_spread(&warped);
    let after = max_line_spread(&out.pix);
    eprintln!("  line spread: before {before:.2} px, after {after:.2} px");
    rp.check(before > 6.0, "warp bends the lines");
    rp.check(after < 2.0, "dewarping straightens the lines");
    rp.compare_values(400.0, out.pix.width() as f64, 0.0);
    rp.check(out.pix.height() > 300, "curl exposes extra page height");

    // --- Test 3: best of N never gets worse with N ---
    let lines = find_textlines(&warped).expect("find_textlines");
    let frame = NormFrame::new(400, 300).expect("frame");
    let mut previous = f64::INFINITY;
    for n in [1, 3, 6] {
        let fit = optimize(&lines, &frame, &config, n, 17, None).expect("optimize");
        eprintln!("  n_tries {n}: residual {:.5}", fit.residual());
        rp.check(fit.residual() <= previous, "residual non-increasing in n_tries");
        previous = fit.residual();
    }

    assert!(rp.cleanup(), "dewarp_warped regression test failed");
}

#[test]
fn dewarp_known_model_reg() {
    let mut rp = RegParams::new("dewarp_known_model");
    let layout = PageLayout::default();
    let page = make_text_page(&layout).expect("make_text_page");
    let warped = warp_page_vertically(&page, warp_disp).expect("warp");

    // The exact model of the warp: S(u, v) = (A / s) u².
    let frame = NormFrame::new(400, 300).expect("frame");
    let surface = SurfacePolynomial::from_coeffs(2, vec![0.0, AMPLITUDE / 200.0, 0.0])
        .expect("surface");
    let fit = FitResult::new(
        frame,
        surface,
        vec![LinePolynomial::constant(2, 0.0)],
        0.0,
        0,
    );

    let out = rectify(&warped, &fit, 400, 255).expect("rectify");
    let domain = output_domain(&fit, 400).expect("output_domain");
    rp.compare_values(domain.width as f64, out.width() as f64, 0.0);
    rp.compare_values(domain.height as f64, out.height() as f64, 0.0);

    // The flat page seen through the same output grid.
    let (_, cy) = frame.center();
    let mut xmap = FPix::new(domain.width, domain.height).expect("xmap");
    let mut ymap = FPix::new(domain.width, domain.height).expect("ymap");
    for i in 0..domain.height {
        let y = cy + frame.scale() * domain.row_v(i);
        for j in 0..domain.width {
            xmap.set_pixel_unchecked(j, i, domain.column_x(j) as f32);
            ymap.set_pixel_unchecked(j, i, y as f32);
        }
    }
    let expected = remap(&page, &xmap, &ymap, RemapFill::Gray(255)).expect("remap");
    rp.write_pix(&out, ImageFormat::Png).expect("write out");
    rp.write_pix(&expected, ImageFormat::Png).expect("write expected");
    rp.compare_pix_within(&out, &expected, 6.0);

    assert!(rp.cleanup(), "dewarp_known_model regression test failed");
}

#[test]
fn dewarp_failure_reg() {
    let mut rp = RegParams::new("dewarp_failure");
    let config = configure(2, 2).expect("configure");

    // --- Blank page: nothing to fit ---
    let blank = blank_page(300, 200, 235).expect("blank_page");
    let result = dewarp(&blank, &config, &DewarpOptions::default(), None);
    rp.check(
        matches!(result, Err(DewarpError::InsufficientEvidence(_))),
        "blank page is insufficient evidence",
    );

    // --- Invalid arguments ---
    rp.check(
        matches!(configure(0, 3), Err(DewarpError::InvalidArgument(_))),
        "gcs degree 0 rejected",
    );
    rp.check(
        matches!(configure(2, -1), Err(DewarpError::InvalidArgument(_))),
        "line degree -1 rejected",
    );
    let page = make_text_page(&PageLayout::default()).expect("make_text_page");
    let result = dewarp(&page, &config, &DewarpOptions::new().with_n_tries(0), None);
    rp.check(
        matches!(result, Err(DewarpError::InvalidArgument(_))),
        "n_tries 0 rejected",
    );

    // --- Every attempt singular ---
    let frame = NormFrame::new(400, 300).expect("frame");
    let (cx, _) = frame.center();
    let lines: Vec<TextLine> = [60.0, 120.0, 180.0]
        .iter()
        .map(|&y| TextLine::new(vec![Point::new(cx, y); 4]).expect("line"))
        .collect();
    let result = optimize(&lines, &frame, &config, 4, 1, None);
    rp.check(
        matches!(result, Err(DewarpError::NoConvergentFit { attempts: 4 })),
        "all-singular attempts give no convergent fit",
    );

    // --- Folding model ---
    let surface = SurfacePolynomial::from_coeffs(2, vec![0.0, 0.0, -2.0]).expect("surface");
    let fit = FitResult::new(frame, surface, vec![], 0.0, 0);
    let result = rectify(&page, &fit, 400, 255);
    rp.check(
        matches!(result, Err(DewarpError::DegenerateMapping(_))),
        "folding surface is degenerate",
    );

    assert!(rp.cleanup(), "dewarp_failure regression test failed");
}
