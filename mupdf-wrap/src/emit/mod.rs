//! C++ emission.
//!
//! Each submodule renders one header/implementation pair into an
//! [`OutputFiles`](crate::output::OutputFiles) buffer. The text is built in
//! memory and only flushed to disk by the orchestrator.

use std::path::PathBuf;

pub mod classes;
pub mod classes2;
pub mod exceptions;
pub mod functions;
pub mod internal;
pub mod types;

/// Locations of the generated files, relative to the output directory.
#[derive(Debug, Clone)]
pub struct Layout {
    ns: String,
}

/// The generated header/implementation pairs, in include order.
pub const UNITS: &[&str] = &["internal", "exceptions", "functions", "classes", "classes2"];

impl Layout {
    pub fn new(ns: &str) -> Self {
        Layout { ns: ns.to_string() }
    }

    /// `include/mupdf/classes.h`
    pub fn header(&self, unit: &str) -> PathBuf {
        PathBuf::from("include").join(&self.ns).join(format!("{unit}.h"))
    }

    /// `implementation/classes.cpp`
    pub fn implementation(&self, unit: &str) -> PathBuf {
        PathBuf::from("implementation").join(format!("{unit}.cpp"))
    }

    /// `mupdf/classes.h`, as written in `#include` lines.
    pub fn include(&self, unit: &str) -> String {
        format!("{}/{unit}.h", self.ns)
    }

    pub fn include_dir(&self) -> PathBuf {
        PathBuf::from("include")
    }
}

/// Start of a generated header: banner and include guard.
pub fn header_prologue(ns: &str, unit: &str) -> String {
    let guard = format!("{}_{}_H", ns.to_ascii_uppercase(), unit.to_ascii_uppercase());
    format!("// Generated by mupdf-wrap. Do not edit.\n\n#ifndef {guard}\n#define {guard}\n\n")
}

pub fn header_epilogue(ns: &str, unit: &str) -> String {
    let guard = format!("{}_{}_H", ns.to_ascii_uppercase(), unit.to_ascii_uppercase());
    format!("\n#endif // {guard}\n")
}

pub fn impl_prologue() -> &'static str {
    "// Generated by mupdf-wrap. Do not edit.\n\n"
}

/// Render a `/** ... */` comment, one `*` line per input line.
pub fn doc_comment(text: &str, indent: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().map(str::trim_end).collect();
    match lines.as_slice() {
        [] => String::new(),
        [one] => format!("{indent}/** {one} */\n"),
        many => {
            let mut out = format!("{indent}/**\n");
            for line in many {
                if line.is_empty() {
                    out.push_str(&format!("{indent}*\n"));
                } else {
                    out.push_str(&format!("{indent}* {line}\n"));
                }
            }
            out.push_str(&format!("{indent}*/\n"));
            out
        }
    }
}

/// Strip the C comment markers from a raw doc comment taken from a header.
pub fn clean_c_comment(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("/**").or_else(|| line.strip_prefix("/*")).unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = line.trim_start_matches('*').trim_start_matches('/');
            line.trim().replace("*/", "* /")
        })
        .skip_while(|l| l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = Layout::new("mupdf");
        assert_eq!(layout.header("classes"), PathBuf::from("include/mupdf/classes.h"));
        assert_eq!(
            layout.implementation("functions"),
            PathBuf::from("implementation/functions.cpp")
        );
        assert_eq!(layout.include("internal"), "mupdf/internal.h");
    }

    #[test]
    fn comments() {
        assert_eq!(doc_comment("One line.", "    "), "    /** One line. */\n");
        assert_eq!(doc_comment("a\n\nb", ""), "/**\n* a\n*\n* b\n*/\n");
        assert_eq!(
            clean_c_comment("/**\n\tOpen a document.\n\n\tReturns NULL on failure.\n*/"),
            "Open a document.\n\nReturns NULL on failure."
        );
        assert_eq!(clean_c_comment("/// Count pages."), "Count pages.");
    }
}
