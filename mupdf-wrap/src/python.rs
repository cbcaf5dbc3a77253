//! Python glue: `%pythoncode` functions returning out-params as tuples.
//!
//! For every wrapped function with out-params, `ll_<fn>()` is redefined in
//! Python to take only the input parameters and return
//! `(ret, out_1, out_2, ...)`, using the C++ `_outparams` helper. A
//! class-aware `<fn>()` does the same with wrapper-class arguments and
//! results.

use itertools::Itertools;
use tracing::debug;

use crate::classify::{AltPassing, FunctionInfo, ParamInfo, ReturnKind};
use crate::context::GenContext;
use crate::rename;

pub(crate) const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Python spelling of a parameter name.
pub fn py_ident(name: &str) -> String {
    if PYTHON_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Body of the `%pythoncode` block.
pub fn outparam_wrappers(ctx: &GenContext<'_>, functions: &[&FunctionInfo<'_>]) -> String {
    let mut out = String::new();
    for info in functions
        .iter()
        .filter(|i| i.is_wrapped() && i.has_out_params())
    {
        out.push_str(&ll_wrapper(ctx, info));
        match class_aware_wrapper(ctx, info) {
            Some(text) => out.push_str(&text),
            None => debug!(function = info.name(), "no class-aware Python out-param wrapper"),
        }
    }
    out
}

fn inputs<'a, 'h>(info: &'a FunctionInfo<'h>) -> impl Iterator<Item = &'a ParamInfo<'h>> {
    info.params.iter().filter(|p| !p.is_out)
}

fn ll_wrapper(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> String {
    let ll = ctx.ll_name(info.name());
    let names = inputs(info).map(|p| py_ident(&p.name)).join(", ");
    let call_args = inputs(info)
        .map(|p| py_ident(&p.name))
        .chain(std::iter::once("outparams".to_string()))
        .join(", ");
    let mut results = Vec::new();
    let returns_value = !info.def.return_type.is_void();
    if returns_value {
        results.push("ret".to_string());
    }
    results.extend(
        info.out_params()
            .map(|p| format!("outparams.{}", rename::outparam_field(&p.name))),
    );

    let call = format!("{}({call_args})", rename::outparams_fn_name(&ll));
    let call = if returns_value {
        format!("    ret = {call}\n")
    } else {
        format!("    {call}\n")
    };
    format!(
        "def {ll}({names}):\n    \"\"\"\n    Wrapper for out-params of {ll}(); returns {}.\n    \"\"\"\n    outparams = {}()\n{call}    return {}\n\n",
        results.iter().map(|r| r.trim_start_matches("outparams.")).join(", "),
        rename::outparams_struct_name(&ll),
        results.join(", ")
    )
}

/// Argument expression passing a wrapper-class instance on to the `ll_`
/// function, or `None` when Python cannot express it.
fn class_arg(p: &ParamInfo<'_>) -> Option<String> {
    let name = py_ident(&p.name);
    let Some(alt) = &p.alt else {
        return Some(name);
    };
    match (alt.passing, alt.pod.is_value()) {
        (AltPassing::Pointer { .. }, true) => Some(format!("{name}.internal()")),
        (AltPassing::Pointer { .. }, false) => Some(format!("{name}.m_internal")),
        _ => None,
    }
}

fn class_aware_wrapper(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> Option<String> {
    let name = info.name();
    let ll = ctx.ll_name(name);
    let args: Vec<String> = inputs(info).map(class_arg).collect::<Option<_>>()?;
    let names = inputs(info).map(|p| py_ident(&p.name)).join(", ");

    let mut targets = Vec::new();
    let mut results = Vec::new();
    let mut body = String::new();
    if !info.def.return_type.is_void() {
        targets.push("ret".to_string());
        results.push(match &info.ret {
            ReturnKind::Wrapped {
                class_name,
                keep: Some(keep),
                ..
            } => {
                body.push_str(&format!("    {}(ret)\n", ctx.ll_name(keep)));
                format!("{class_name}(ret)")
            }
            ReturnKind::Wrapped { class_name, .. } | ReturnKind::WrappedPod { class_name, .. } => {
                format!("{class_name}(ret)")
            }
            _ => "ret".to_string(),
        });
    }
    for p in info.out_params() {
        let n = py_ident(&p.name);
        targets.push(n.clone());
        match &p.alt {
            Some(alt) if alt.passing == AltPassing::DoublePointer => {
                results.push(format!("{}({n})", alt.class_name));
            }
            _ => results.push(n),
        }
    }
    // A single result comes back from `ll_` as a bare value.
    let unpack = targets.join(", ");
    Some(format!(
        "def {name}({names}):\n    \"\"\"\n    Class-aware wrapper for out-params of {name}(); returns {unpack}.\n    \"\"\"\n    {unpack} = {ll}({})\n{body}    return {}\n\n",
        args.join(", "),
        results.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::*;
    use indoc::indoc;

    #[test]
    fn keyword_out_params_are_valid_attributes() {
        let cfg = Config::default();
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_range",
                CType::Int,
                vec![
                    ParamDef::new("n", CType::Int),
                    ParamDef::new("from", CType::ptr(CType::Int)),
                    ParamDef::new("in", CType::ptr(CType::Int)),
                ],
            )],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[0]);
        let text = outparam_wrappers(&ctx, &[info.as_ref()]);
        assert!(text.contains("returns ret, from_, in_.\n"));
        assert!(text.contains("    return ret, outparams.from_, outparams.in_\n"));
        assert!(!text.contains("outparams.from\n") && !text.contains("outparams.from,"));
        assert!(text.contains("    ret, from_, in_ = ll_fz_range(n)\n"));
    }

    #[test]
    fn tuple_returning_wrappers() {
        let cfg = Config::default();
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_f",
                CType::Int,
                vec![
                    ParamDef::new("from", CType::Int),
                    ParamDef::new("out_b", CType::ptr(CType::Int)),
                ],
            )],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[0]);
        let text = outparam_wrappers(&ctx, &[info.as_ref()]);
        assert!(text.contains(indoc! {r#"
            def ll_fz_f(from_):
                """
                Wrapper for out-params of ll_fz_f(); returns ret, out_b.
                """
                outparams = ll_fz_f_outparams()
                ret = ll_fz_f_outparams_fn(from_, outparams)
                return ret, outparams.out_b
        "#}));
        assert!(text.contains("    ret, out_b = ll_fz_f(from_)\n    return ret, out_b\n"));
    }

    #[test]
    fn single_out_value_is_returned_bare() {
        let cfg = Config::default();
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_g",
                CType::Void,
                vec![ParamDef::new("n", CType::ptr(CType::Float))],
            )],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[0]);
        let text = outparam_wrappers(&ctx, &[info.as_ref()]);
        assert!(text.contains("    ll_fz_g_outparams_fn(outparams)\n    return outparams.n\n"));
        assert!(text.contains("    n = ll_fz_g()\n    return n\n"));
    }
}
