//! mupdf-wrap: MuPDF C headers → C++ wrapper classes and SWIG bindings.
//!
//! Parses the MuPDF headers via libclang, classifies every `fz_`/`pdf_`
//! function, and writes a C++ API (low-level `ll_` wrappers turning MuPDF
//! errors into exceptions, wrapper classes with constructors and methods,
//! class-aware free functions) plus a SWIG interface file with Python and
//! C# glue.
//!
//! # Quick start
//!
//! Generate the C++ tree from a config (suitable for `build.rs`):
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reads config TOML, parses headers, writes changed files.
//! let summary = mupdf_wrap::run(Path::new("mupdf-wrap.toml"), &Default::default()).unwrap();
//! println!("{} files updated", summary.written.len());
//! ```
//!
//! Or get the generated text without touching the disk:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let generated = mupdf_wrap::generate(Path::new("mupdf-wrap.toml")).unwrap();
//! for path in generated.files.paths() {
//!     println!("{}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub mod classes;
pub mod classify;
pub mod config;
pub mod context;
pub mod csharp;
pub mod emit;
pub mod extract;
pub mod extras;
pub mod index;
pub mod model;
pub mod output;
pub mod python;
pub mod rename;
pub mod report;
pub mod swig;

use classify::FunctionInfo;
use config::{Config, Language};
use context::GenContext;
use emit::Layout;
use model::HeaderSet;
use output::{FlushStats, OutputFiles};
use report::Report;

/// File name of the exclusion report, relative to the output directory.
pub const REPORT_FILE: &str = "wrap-report.txt";

/// Which stages to run, parsed from a letter string such as `"02"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actions {
    /// `0`: generate and flush the C++ sources and the SWIG interface.
    pub generate: bool,
    /// `2`: run swig on the interface file.
    pub swig: bool,
}

impl Default for Actions {
    fn default() -> Self {
        Actions {
            generate: true,
            swig: false,
        }
    }
}

impl FromStr for Actions {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut actions = Actions {
            generate: false,
            swig: false,
        };
        for c in s.chars() {
            match c {
                '0' => actions.generate = true,
                '2' => actions.swig = true,
                other => anyhow::bail!(
                    "unsupported action '{other}' in \"{s}\" (supported: 0 = generate, 2 = run swig)"
                ),
            }
        }
        if !actions.generate && !actions.swig {
            anyhow::bail!("no actions given");
        }
        Ok(actions)
    }
}

/// Options of a [`run`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Overrides `output.dir` from the config.
    pub output_dir: Option<PathBuf>,
    pub actions: Actions,
    /// Run swig even when its outputs look current.
    pub force: bool,
    /// Overrides `swig.languages` from the config.
    pub languages: Vec<Language>,
}

/// What a [`run`] did.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub output_dir: PathBuf,
    /// Files created or rewritten, relative to `output_dir`.
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    /// Languages swig ran for.
    pub swig: Vec<Language>,
}

/// The generated tree of one run, not yet written.
#[derive(Debug, Clone, Default)]
pub struct Generated {
    pub files: OutputFiles,
    pub report: Report,
}

impl Generated {
    /// Write every changed file below `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<FlushStats> {
        self.files.write_to(dir)
    }
}

/// Run the full pipeline: load config, parse headers, generate, flush the
/// changed files and optionally run swig.
///
/// `config_path` is the path to a `mupdf-wrap.toml` configuration file.
pub fn run(config_path: &Path, options: &Options) -> Result<Summary> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let output_dir = match &options.output_dir {
        Some(p) => p.clone(),
        None => base_dir.join(&cfg.output.dir),
    };
    let interface = swig::interface_path(&cfg.output.module);

    let mut summary = Summary {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    if options.actions.generate {
        let generated = generate_from_config(&cfg, base_dir)?;
        let stats = generated
            .write_to(&output_dir)
            .with_context(|| format!("writing output to {}", output_dir.display()))?;
        info!(
            dir = %output_dir.display(),
            written = stats.written.len(),
            unchanged = stats.unchanged,
            "flushed generated files"
        );
        summary.written = stats.written;
        summary.unchanged = stats.unchanged;
    }

    if options.actions.swig || cfg.swig.enabled {
        if !output_dir.join(&interface).exists() {
            anyhow::bail!(
                "{} does not exist; run the generate action (0) first",
                output_dir.join(&interface).display()
            );
        }
        let interface_changed = summary.written.contains(&interface);
        summary.swig = swig::run_swig(
            &cfg,
            &output_dir,
            cfg.languages(&options.languages),
            interface_changed,
            options.force,
        )?;
    }

    Ok(summary)
}

/// Parse a `mupdf-wrap.toml` config file, extract declarations from the
/// referenced headers, and return the generated tree without writing to
/// disk.
pub fn generate(config_path: &Path) -> Result<Generated> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    generate_from_config(&cfg, base_dir)
}

/// Generate from an already-loaded [`Config`].
///
/// `base_dir` is the directory relative to which header paths in the config
/// are resolved (typically the parent directory of the TOML file).
pub fn generate_from_config(cfg: &Config, base_dir: &Path) -> Result<Generated> {
    info!(
        namespace = %cfg.output.namespace,
        headers = cfg.headers.len(),
        "loaded configuration"
    );
    let headers = extract::parse_headers(cfg, base_dir)?;
    generate_from_headers(cfg, &headers)
}

/// Generate from already-extracted declarations. Needs no libclang.
pub fn generate_from_headers(cfg: &Config, headers: &HeaderSet) -> Result<Generated> {
    let ctx = GenContext::new(cfg, headers)?;
    info!(
        configured_classes = ctx.registry.configured().count(),
        "built class registry"
    );
    let layout = Layout::new(ctx.ns());

    let infos: Vec<_> = ctx
        .index
        .functions_starting_with(&cfg.naming.prefixes)
        .map(|f| ctx.classify(f))
        .collect();
    let functions: Vec<&FunctionInfo<'_>> = infos.iter().map(|i| i.as_ref()).collect();
    debug!(functions = functions.len(), "classified functions");

    let mut files = OutputFiles::default();
    let mut report = Report::default();

    emit::internal::emit(&ctx, &layout, &mut files);
    emit::exceptions::emit(&ctx, &layout, &mut files);
    emit::functions::emit(&ctx, &layout, &functions, &mut files);

    let classes = emit::classes::build_classes(&ctx, &infos, &mut report)?;
    emit::classes::emit(&ctx, &layout, &classes, &mut files);
    emit::classes2::emit(&ctx, &layout, &functions, &mut files);

    files.append(
        swig::interface_path(&cfg.output.module),
        &swig::interface_text(&ctx, &layout, &functions, &classes),
    );
    if cfg.output.report {
        files.append(REPORT_FILE, &report.render());
    }

    info!(
        files = files.len(),
        classes = report.classes,
        excluded = report.excluded_count(),
        "generated wrappers"
    );
    Ok(Generated { files, report })
}
