//! flatpage - dewarp a photographed page from the command line
//!
//! ```text
//! flatpage IMG_PATH OUT_PATH GCS_POLY_DEG LINE_POLY_DEG [--n_tries N]
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `info`, or `warn`
//! with `--quiet`).

mod cli;
mod debug;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, ExitCode};
use debug::LoggingObserver;
use flatpage::dewarp::{DewarpOptions, configure, dewarp};
use flatpage::io::{read_image, write_image_auto};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            let code = ExitCode::from_error(&err);
            error!("{err:#}");
            error!("{} (exit code {})", code.description(), code.code());
            code.into()
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = configure(cli.gcs_poly_deg, cli.line_poly_deg)?;
    let pix = read_image(&cli.img_path)
        .with_context(|| format!("cannot read {}", cli.img_path.display()))?;
    info!(
        width = pix.width(),
        height = pix.height(),
        gcs_poly_deg = cli.gcs_poly_deg,
        line_poly_deg = cli.line_poly_deg,
        n_tries = cli.n_tries,
        "dewarping {}",
        cli.img_path.display()
    );

    let mut options = DewarpOptions::new()
        .with_n_tries(cli.n_tries)
        .with_seed(cli.seed)
        .with_gray_in(cli.background);
    if let Some(width) = cli.output_width {
        options = options.with_output_width(width);
    }

    let start = Instant::now();
    let mut observer = LoggingObserver::default();
    let result = dewarp(&pix, &config, &options, Some(&mut observer));

    // Written on failure too.
    if let Some(dir) = &cli.debug_dir
        && let Err(e) = observer.write_debug(dir, &pix)
    {
        warn!("debug output skipped: {e:#}");
    }

    let out = result?;
    write_image_auto(&out.pix, &cli.out_path)
        .with_context(|| format!("cannot write {}", cli.out_path.display()))?;
    info!(
        residual = out.fit.residual(),
        lines = out.n_lines,
        width = out.pix.width(),
        height = out.pix.height(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "wrote {}",
        cli.out_path.display()
    );
    Ok(())
}
