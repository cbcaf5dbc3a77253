//! Configuration types for `mupdf-wrap.toml`.

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::classes::ClassSpec;

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Headers to parse (all are included into one translation unit).
    pub headers: Vec<PathBuf>,
    /// Files or directories whose declarations are wrapped.
    /// If empty, uses `headers`.
    pub traverse: Vec<PathBuf>,
    /// Additional directories to search when resolving header and traverse
    /// paths.  Each entry is tried in order after `base_dir` (the TOML
    /// file's parent directory).  Also injected as `-I` flags for clang.
    pub include_paths: Vec<PathBuf>,
    /// Extra clang arguments (e.g. `-DFZ_ENABLE_PDF=1`).
    pub clang_args: Vec<String>,
    pub output: OutputConfig,
    pub naming: NamingConfig,
    pub functions: FunctionsConfig,
    pub swig: SwigConfig,
    /// Per-struct class extras. Entries replace the built-in table entry of
    /// the same struct name.
    pub class: BTreeMap<String, ClassSpec>,
}

/// Output tree settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the generated tree, relative to the config file.
    pub dir: PathBuf,
    /// C++ namespace of the generated API. Also names the include
    /// directory and the environment variables read by generated code.
    pub namespace: String,
    /// SWIG module name.
    pub module: String,
    /// Write `wrap-report.txt` listing functions that were not wrapped as
    /// methods or constructors.
    pub report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("generated"),
            namespace: "mupdf".to_string(),
            module: "mupdf".to_string(),
            report: true,
        }
    }
}

impl OutputConfig {
    /// Prefix for the environment variables consulted by generated code,
    /// e.g. `MUPDF` for `MUPDF_trace`.
    pub fn env_prefix(&self) -> String {
        self.namespace.to_uppercase()
    }
}

/// Naming conventions of the wrapped C library.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Prefixes of the functions to wrap.
    pub prefixes: Vec<String>,
    /// Struct of the implicit context parameter.
    pub context_type: String,
    /// Prefix of the low-level wrappers.
    pub ll_prefix: String,
    /// Prefix of the error-code constants turned into exception classes.
    pub error_prefix: String,
    /// Error code used when a C++ exception escapes into C.
    pub generic_error: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        NamingConfig {
            prefixes: vec!["fz_".to_string(), "pdf_".to_string()],
            context_type: "fz_context".to_string(),
            ll_prefix: "ll_".to_string(),
            error_prefix: "FZ_ERROR_".to_string(),
            generic_error: "FZ_ERROR_GENERIC".to_string(),
        }
    }
}

/// Per-function adjustments.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Functions that get no wrappers at all.
    pub omit: Vec<String>,
    /// Functions known to return a kept reference even though their name
    /// does not say so.
    pub returns_kept: Vec<String>,
    /// Functions known to return a borrowed reference even though their
    /// name looks like a constructor.
    pub returns_borrowed: Vec<String>,
    /// Functions whose `char**` parameters are argv-style inputs rather
    /// than out-params. Added to the built-in table.
    pub argv_params: Vec<String>,
    /// Functions whose `ll_` wrapper takes the context as its first
    /// parameter instead of using the per-thread one.
    pub keep_context: Vec<String>,
}

/// Target language of the SWIG pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Csharp,
}

impl Language {
    pub fn swig_flag(self) -> &'static str {
        match self {
            Language::Python => "-python",
            Language::Csharp => "-csharp",
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Csharp => "csharp",
        }
    }
}

/// SWIG settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SwigConfig {
    /// Run swig after generating the C++ sources.
    pub enabled: bool,
    /// Name or path of the swig executable.
    pub binary: PathBuf,
    pub languages: Vec<Language>,
    /// Extra arguments passed to every swig invocation.
    pub args: Vec<String>,
}

impl Default for SwigConfig {
    fn default() -> Self {
        SwigConfig {
            enabled: false,
            binary: PathBuf::from("swig"),
            languages: vec![Language::Python],
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Returns the traverse list, falling back to `headers` if empty.
    pub fn traverse_files(&self) -> &[PathBuf] {
        if self.traverse.is_empty() {
            &self.headers
        } else {
            &self.traverse
        }
    }

    /// Returns the translation unit file to parse.
    ///
    /// If there's a single header, returns it directly. If there are
    /// multiple, generates a wrapper `.c` file that `#include`s all of them.
    pub fn wrapper_header(&self, base_dir: &Path) -> anyhow::Result<PathBuf> {
        match self.headers.as_slice() {
            [] => anyhow::bail!("no headers configured"),
            [single] => Ok(resolve_header(single, base_dir, &self.include_paths)),
            headers => {
                let wrapper_dir = std::env::temp_dir().join("mupdf_wrap_wrappers");
                std::fs::create_dir_all(&wrapper_dir)
                    .with_context(|| format!("creating {}", wrapper_dir.display()))?;

                let wrapper_path = wrapper_dir.join(format!(
                    "{}_{}_wrapper.c",
                    self.output.namespace,
                    std::process::id()
                ));

                let mut content = String::new();
                for h in headers {
                    let abs = resolve_header(h, base_dir, &self.include_paths);
                    content.push_str(&format!("#include \"{}\"\n", abs.display()));
                }
                std::fs::write(&wrapper_path, &content)
                    .with_context(|| format!("writing {}", wrapper_path.display()))?;
                Ok(wrapper_path)
            }
        }
    }

    /// The wrapped headers as spelled in the `#include` lines of generated
    /// code. Relative paths are kept, absolute ones reduced to file names.
    pub fn c_includes(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| {
                if h.is_absolute() {
                    h.file_name().map_or_else(
                        || h.display().to_string(),
                        |n| n.to_string_lossy().into_owned(),
                    )
                } else {
                    h.to_string_lossy().replace('\\', "/")
                }
            })
            .collect()
    }

    /// Languages of the SWIG pass, optionally overridden on the command line.
    pub fn languages<'a>(&'a self, overrides: &'a [Language]) -> &'a [Language] {
        if overrides.is_empty() {
            &self.swig.languages
        } else {
            overrides
        }
    }
}

/// Resolve a header path by searching `base_dir` first, then each
/// `include_paths` entry.  Absolute paths are returned as-is.  If the
/// file is not found anywhere, falls back to `base_dir.join(path)` so
/// that the caller gets a meaningful error from clang.
pub fn resolve_header(path: &Path, base_dir: &Path, include_paths: &[PathBuf]) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = base_dir.join(path);
    if candidate.exists() {
        return candidate;
    }
    for inc in include_paths {
        let candidate = inc.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    // Fall back; clang reports the missing file.
    base_dir.join(path)
}

/// Load and parse a `mupdf-wrap.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{Copyable, Pod};

    #[test]
    fn empty_config_uses_mupdf_conventions() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.naming.prefixes, ["fz_", "pdf_"]);
        assert_eq!(cfg.naming.context_type, "fz_context");
        assert_eq!(cfg.output.namespace, "mupdf");
        assert_eq!(cfg.output.env_prefix(), "MUPDF");
        assert_eq!(cfg.swig.languages, [Language::Python]);
        assert!(!cfg.swig.enabled);
    }

    #[test]
    fn class_tables_parse_into_specs() {
        let cfg: Config = toml::from_str(
            r#"
            headers = ["widget.h"]

            [class.fz_widget]
            copyable = "default"
            pod = "inline"
            constructor_prefixes = ["fz_make_widget"]

            [class.fz_gadget]
            copyable = false
            opaque = true
            "#,
        )
        .unwrap();
        let widget = &cfg.class["fz_widget"];
        assert_eq!(widget.copyable, Copyable::Default);
        assert_eq!(widget.pod, Pod::Inline);
        assert_eq!(widget.constructor_prefixes, ["fz_make_widget"]);
        assert!(widget.constructor_raw);

        let gadget = &cfg.class["fz_gadget"];
        assert_eq!(gadget.copyable, Copyable::No);
        assert!(gadget.opaque);
    }

    #[test]
    fn function_tables_parse() {
        let cfg: Config = toml::from_str(
            r#"
            [functions]
            omit = ["fz_abort"]
            keep_context = ["fz_flush_warnings"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.functions.omit, ["fz_abort"]);
        assert_eq!(cfg.functions.keep_context, ["fz_flush_warnings"]);
        assert!(cfg.functions.argv_params.is_empty());
    }

    #[test]
    fn languages_override() {
        let cfg = Config::default();
        assert_eq!(cfg.languages(&[]), [Language::Python]);
        assert_eq!(cfg.languages(&[Language::Csharp]), [Language::Csharp]);
    }

    #[test]
    fn traverse_falls_back_to_headers() {
        let cfg: Config = toml::from_str(r#"headers = ["a.h", "b.h"]"#).unwrap();
        assert_eq!(cfg.traverse_files(), [PathBuf::from("a.h"), PathBuf::from("b.h")]);
    }

    #[test]
    fn include_lines_keep_relative_paths() {
        let cfg: Config =
            toml::from_str(r#"headers = ["mupdf/fitz.h", "/usr/include/extra.h"]"#).unwrap();
        assert_eq!(cfg.c_includes(), ["mupdf/fitz.h", "extra.h"]);
    }
}
