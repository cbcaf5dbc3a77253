//! CLI entry point for mupdf-wrap.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mupdf_wrap::config::Language;
use mupdf_wrap::{Actions, Options};

/// mupdf-wrap: generate C++ wrapper classes and SWIG bindings for MuPDF.
#[derive(Parser, Debug)]
#[command(name = "mupdf-wrap", version, about)]
struct Cli {
    /// Path to the mupdf-wrap.toml configuration file.
    #[arg(default_value = "mupdf-wrap.toml")]
    config: PathBuf,

    /// Actions to run: 0 = generate C++ sources, 2 = run swig.
    #[arg(short, long, default_value = "0")]
    actions: Actions,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Run swig even if its outputs are up to date.
    #[arg(short, long)]
    force: bool,

    /// Target language for swig (overrides config; repeatable).
    #[arg(short, long = "lang", value_enum)]
    lang: Vec<Language>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mupdf_wrap=info")),
        )
        .init();

    let cli = Cli::parse();
    let options = Options {
        output_dir: cli.output_dir,
        actions: cli.actions,
        force: cli.force,
        languages: cli.lang,
    };
    mupdf_wrap::run(&cli.config, &options)?;
    Ok(())
}
