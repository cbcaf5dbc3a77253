//! The SWIG interface file and the `swig` invocation.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::classify::FunctionInfo;
use crate::config::{Config, Language};
use crate::context::GenContext;
use crate::emit::Layout;
use crate::emit::classes::GeneratedClass;
use crate::model::{CType, ConstantValue};
use crate::{csharp, python};

/// `swig/<module>.i`, relative to the output directory.
pub fn interface_path(module: &str) -> PathBuf {
    PathBuf::from("swig").join(format!("{module}.i"))
}

/// Units exposed to SWIG, in include order. `internal` stays private.
const PUBLIC_UNITS: &[&str] = &["exceptions", "functions", "classes", "classes2"];

fn takes_va_list(info: &FunctionInfo<'_>) -> bool {
    info.params
        .iter()
        .any(|p| matches!(p.ty(), CType::Named { name, .. } if name == "va_list"))
}

/// Text of the SWIG interface file.
pub fn interface_text(
    ctx: &GenContext<'_>,
    layout: &Layout,
    functions: &[&FunctionInfo<'_>],
    classes: &[GeneratedClass],
) -> String {
    let ns = ctx.ns();
    let module = &ctx.config.output.module;
    let mut out = format!("// Generated by mupdf-wrap. Do not edit.\n\n%module(directors=\"1\") {module}\n\n");

    for class in classes {
        if let Some(d) = &class.director {
            out.push_str(&format!(
                "%feature(\"director\") {ns}::{0};\n%feature(\"nodirector\") {ns}::{0}::~{0};\n",
                d.name
            ));
        }
    }

    out.push_str("\n%{\n");
    out.push_str(&format!("#include \"{}\"\n", layout.include("internal")));
    for unit in PUBLIC_UNITS {
        out.push_str(&format!("#include \"{}\"\n", layout.include(unit)));
    }
    out.push_str("%}\n\n");

    out.push_str(
        "%include <exception.i>\n%include <std_string.i>\n\n#define FZ_FUNCTION\n\n\
         %exception {\n    try {\n        $action\n    }\n    catch (std::exception& e) {\n        SWIG_exception(SWIG_RuntimeError, e.what());\n    }\n}\n\n",
    );

    out.push_str("%ignore *::operator=;\n%ignore *::operator++;\n%ignore *::operator*;\n");
    for info in functions.iter().filter(|i| i.is_wrapped() && takes_va_list(i)) {
        out.push_str(&format!(
            "%ignore {ns}::{};\n%ignore {ns}::{};\n",
            ctx.ll_name(info.name()),
            info.name()
        ));
    }
    out.push('\n');

    for e in &ctx.index.headers().enums {
        for v in &e.variants {
            out.push_str(&format!("%constant int {0} = {0};\n", v.name));
        }
    }
    for c in &ctx.index.headers().constants {
        let ty = match c.value {
            ConstantValue::Signed(v) if i32::try_from(v).is_ok() => "int",
            ConstantValue::Signed(_) => "long long",
            ConstantValue::Unsigned(v) if i32::try_from(v).is_ok() => "int",
            ConstantValue::Unsigned(_) => "unsigned long long",
            ConstantValue::Float(_) => "double",
        };
        out.push_str(&format!("%constant {ty} {0} = {0};\n", c.name));
    }
    out.push('\n');

    for unit in PUBLIC_UNITS {
        out.push_str(&format!("%include \"{}\"\n", layout.include(unit)));
    }

    out.push_str(&format!(
        "\n#if defined(SWIGPYTHON)\n%pythoncode %{{\n{}%}}\n#endif\n",
        python::outparam_wrappers(ctx, functions)
    ));
    out.push_str(&format!(
        "\n#if defined(SWIGCSHARP)\n%pragma(csharp) modulecode = %{{\n{}%}}\n#endif\n",
        csharp::outparam_wrappers(ctx, module, functions)
    ));
    out
}

/// Files one swig run produces for `lang`, used to detect a missing or
/// partial earlier run.
pub fn expected_outputs(out_dir: &Path, module: &str, lang: Language) -> Vec<PathBuf> {
    let dir = out_dir.join(lang.dir_name());
    let binding = match lang {
        Language::Python => format!("{module}.py"),
        Language::Csharp => format!("{module}.cs"),
    };
    vec![dir.join(format!("{module}.cpp")), dir.join(binding)]
}

/// Whether swig must run for a language.
pub fn needs_run(interface_changed: bool, outputs: &[PathBuf], force: bool) -> bool {
    force || interface_changed || outputs.iter().any(|p| !p.exists())
}

pub fn swig_command(cfg: &Config, out_dir: &Path, lang: Language) -> Command {
    let module = &cfg.output.module;
    let lang_dir = out_dir.join(lang.dir_name());
    let mut cmd = Command::new(&cfg.swig.binary);
    cmd.arg("-c++")
        .arg(lang.swig_flag())
        .arg("-module")
        .arg(module)
        .arg(format!("-I{}", out_dir.join("include").display()))
        .args(&cfg.swig.args)
        .arg("-outdir")
        .arg(&lang_dir)
        .arg("-o")
        .arg(lang_dir.join(format!("{module}.cpp")))
        .arg(out_dir.join(interface_path(module)));
    cmd
}

/// Run swig once per language that needs it. Returns the languages that
/// were processed.
pub fn run_swig(
    cfg: &Config,
    out_dir: &Path,
    languages: &[Language],
    interface_changed: bool,
    force: bool,
) -> Result<Vec<Language>> {
    let mut ran = Vec::new();
    for &lang in languages {
        let outputs = expected_outputs(out_dir, &cfg.output.module, lang);
        if !needs_run(interface_changed, &outputs, force) {
            debug!(language = ?lang, "swig outputs up to date");
            continue;
        }
        let lang_dir = out_dir.join(lang.dir_name());
        std::fs::create_dir_all(&lang_dir)
            .with_context(|| format!("creating {}", lang_dir.display()))?;

        let mut cmd = swig_command(cfg, out_dir, lang);
        info!(language = ?lang, command = ?cmd, "running swig");
        let output = cmd
            .output()
            .with_context(|| format!("failed to run {}", cfg.swig.binary.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} failed for {} ({}):\n{}",
                cfg.swig.binary.display(),
                lang.dir_name(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        ran.push(lang);
    }
    Ok(ran)
}
