//! Text line detection regression test
//!
//! Lines found on synthetic pages must sit where the page generator put
//! them, both on a flat page and after a known vertical warp.

use flatpage_core::{ImageFormat, PixelDepth};
use flatpage_dewarp::{binarize, find_textlines, remove_short_lines};
use flatpage_test::{PageLayout, RegParams, gray_to_rgb, make_text_page, warp_page_vertically};

#[test]
fn textline_reg() {
    let mut rp = RegParams::new("textline");
    let layout = PageLayout::default();
    let page = make_text_page(&layout).expect("make_text_page");

    // --- Test 1: flat page, one line per printed row ---
    eprintln!("=== Flat page ===");
    let lines = find_textlines(&page).expect("find_textlines");
    eprintln!("  Found {} lines", lines.len());
    rp.compare_values(layout.n_lines as f64, lines.len() as f64, 0.0);
    for (i, line) in lines.iter().enumerate() {
        let expected = layout.line_center(i as u32) as f64;
        rp.compare_values(expected, line.mid_y(), 0.01);
        rp.check(line.horizontal_extent() > 300.0, "line spans the text block");
        rp.check(
            line.points()
                .iter()
                .all(|p| p.x >= 0.0 && p.x < 400.0 && p.y >= 0.0 && p.y < 300.0),
            "points inside the image",
        );
    }
    rp.compare_values(
        lines.len() as f64,
        remove_short_lines(lines.clone(), 0.8).len() as f64,
        0.0,
    );

    let binary = binarize(&page).expect("binarize");
    rp.check(binary.depth() == PixelDepth::Bit1, "binarized to 1 bpp");
    rp.write_pix(&binary, ImageFormat::Png).expect("write binary");

    // --- Test 2: RGB input gives the same lines ---
    eprintln!("=== RGB page ===");
    let rgb = gray_to_rgb(&page).expect("gray_to_rgb");
    let rgb_lines = find_textlines(&rgb).expect("find_textlines rgb");
    rp.check(rgb_lines == lines, "RGB and gray pages give identical lines");

    // --- Test 3: warped page, points follow the displacement ---
    eprintln!("=== Warped page ===");
    let disp = |x: f32| 12.0 * ((x - 199.5) / 200.0).powi(2);
    let warped = warp_page_vertically(&page, disp).expect("warp");
    rp.write_pix(&warped, ImageFormat::Png).expect("write warped");
    let wlines = find_textlines(&warped).expect("find_textlines warped");
    rp.compare_values(layout.n_lines as f64, wlines.len() as f64, 0.0);
    let mut worst = 0.0f64;
    for (i, line) in wlines.iter().enumerate() {
        let center = layout.line_center(i as u32) as f64;
        for p in line.points() {
            let expected = center + disp(p.x as f32) as f64;
            worst = worst.max((p.y - expected).abs());
        }
    }
    eprintln!("  Worst point deviation: {worst:.3} px");
    rp.check(worst < 1.0, "warped line points follow the warp");

    assert!(rp.cleanup(), "textline regression test failed");
}
