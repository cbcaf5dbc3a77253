//! Low-level (`ll_`) wrappers and their out-param helpers.
//!
//! Each `ll_` function has the C signature minus the context parameter and
//! turns C errors into C++ exceptions.

use itertools::Itertools;

use super::types::{declare, ll_params};
use super::{Layout, clean_c_comment, doc_comment, header_epilogue, header_prologue, impl_prologue};
use crate::classify::FunctionInfo;
use crate::context::GenContext;
use crate::output::OutputFiles;
use crate::rename;

const UNIT: &str = "functions";

pub fn emit(ctx: &GenContext<'_>, layout: &Layout, functions: &[&FunctionInfo<'_>], out: &mut OutputFiles) {
    let ns = ctx.ns();
    let mut h = header_prologue(ns, UNIT);
    h.push_str(&format!("#include \"{}\"\n\n", layout.include("internal")));
    h.push_str(&format!("namespace {ns}\n{{\n\n"));

    let mut c = impl_prologue().to_string();
    for unit in [UNIT, "exceptions", "internal"] {
        c.push_str(&format!("#include \"{}\"\n", layout.include(unit)));
    }
    c.push_str(&format!(
        "\n#include <iostream>\n\nnamespace {ns}\n{{\n\nstatic const bool s_trace = internal_env_flag(\"{}_trace\");\n\n",
        ctx.config.output.env_prefix()
    ));

    for info in functions.iter().filter(|i| i.is_wrapped()) {
        h.push_str(&ll_declaration(ctx, info));
        c.push_str(&ll_definition(ctx, info));
        if info.has_out_params() {
            let (decl, def) = outparams_helper(ctx, info);
            h.push_str(&decl);
            c.push_str(&def);
        }
    }

    h.push_str(&format!("}} // namespace {ns}\n"));
    h.push_str(&header_epilogue(ns, UNIT));
    c.push_str(&format!("}} // namespace {ns}\n"));
    out.append(layout.header(UNIT), &h);
    out.append(layout.implementation(UNIT), &c);
}

fn ll_signature(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> String {
    let name = format!("{}({})", ctx.ll_name(info.name()), ll_params(info));
    declare(&info.def.return_type, &name)
}

fn ll_declaration(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> String {
    let mut text = format!("Low-level wrapper for `::{}()`.", info.name());
    if let Some(comment) = &info.def.comment {
        text.push_str("\n\n");
        text.push_str(&clean_c_comment(comment));
    }
    format!("{}FZ_FUNCTION {};\n\n", doc_comment(&text, ""), ll_signature(ctx, info))
}

fn ll_definition(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> String {
    let name = info.name();
    let args = info.params.iter().map(|p| p.name.as_str());
    let mut out = format!("FZ_FUNCTION {}\n{{\n", ll_signature(ctx, info));
    let context = match info.params.first() {
        _ if info.has_context => "auto_ctx",
        Some(first) if info.keeps_context => first.name.as_str(),
        _ => {
            out.push_str(&format!("    return ::{name}({});\n}}\n\n", args.format(", ")));
            return out;
        }
    };
    let is_void = info.def.return_type.is_void();
    if info.has_context {
        out.push_str(&format!(
            "    ::{}* auto_ctx = internal_context_get();\n",
            ctx.config.naming.context_type
        ));
    }
    out.push_str(&format!(
        "    if (s_trace) std::cerr << __FILE__ << \":\" << __LINE__ << \": calling {name}()\\n\";\n"
    ));
    if !is_void {
        out.push_str(&format!("    {};\n    fz_var(ret);\n", declare(&info.def.return_type, "ret")));
    }
    let call = if info.has_context {
        format!("::{name}({})", std::iter::once("auto_ctx").chain(args).format(", "))
    } else {
        format!("::{name}({})", args.format(", "))
    };
    let assign = if is_void { String::new() } else { "ret = ".to_string() };
    out.push_str(&format!(
        "    fz_try({context})\n    {{\n        {assign}{call};\n    }}\n    fz_catch({context})\n    {{\n        internal_throw_exception({context});\n    }}\n"
    ));
    if !is_void {
        out.push_str("    return ret;\n");
    }
    out.push_str("}\n\n");
    out
}

/// Struct collecting the out-params of an `ll_` function, and a function
/// that takes a pointer to it in place of the out-params.
fn outparams_helper(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> (String, String) {
    let ll = ctx.ll_name(info.name());
    let st = rename::outparams_struct_name(&ll);
    let func = rename::outparams_fn_name(&ll);

    let mut decl = format!("/** Out-params of `{ll}()`. */\nstruct {st}\n{{\n");
    for p in info.out_params() {
        if let Some(ty) = p.out_type() {
            let field = rename::outparam_field(&p.name);
            decl.push_str(&format!("    {} = {{}};\n", declare(ty, &field)));
        }
    }
    decl.push_str("};\n\n");

    let params = info
        .params
        .iter()
        .filter(|p| !p.is_out)
        .map(|p| declare(p.ty(), &p.name))
        .chain(std::iter::once(format!("{st}* outparams")))
        .join(", ");
    let sig = declare(&info.def.return_type, &format!("{func}({params})"));
    decl.push_str(&format!(
        "/** Calls `{ll}()`, writing its out-params into <outparams>. */\nFZ_FUNCTION {sig};\n\n"
    ));

    let args = info.params.iter().map(|p| {
        if p.is_out {
            format!("&outparams->{}", rename::outparam_field(&p.name))
        } else {
            p.name.clone()
        }
    });
    let def = format!(
        "FZ_FUNCTION {sig}\n{{\n    return {ll}({});\n}}\n\n",
        args.format(", ")
    );
    (decl, def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::*;

    fn ctx_param() -> ParamDef {
        ParamDef::new("ctx", CType::ptr(CType::struct_typedef("fz_context")))
    }

    fn render(h: &HeaderSet) -> OutputFiles {
        let cfg = Config::default();
        let ctx = GenContext::new(&cfg, h).unwrap();
        let infos: Vec<_> = h.functions.iter().map(|f| ctx.classify(f)).collect();
        let refs: Vec<&FunctionInfo<'_>> = infos.iter().map(|i| i.as_ref()).collect();
        let mut out = OutputFiles::default();
        emit(&ctx, &Layout::new("mupdf"), &refs, &mut out);
        out
    }

    #[test]
    fn ll_wrapper_hides_context() {
        let h = HeaderSet {
            structs: vec![StructDef::opaque("fz_context")],
            functions: vec![FunctionDef::new(
                "fz_count",
                CType::Int,
                vec![ctx_param(), ParamDef::new("n", CType::Int)],
            )],
            ..Default::default()
        };
        let out = render(&h);
        let header = out.get("include/mupdf/functions.h").unwrap();
        assert!(header.contains("FZ_FUNCTION int ll_fz_count(int n);"));
        let imp = out.get("implementation/functions.cpp").unwrap();
        assert!(imp.contains("        ret = ::fz_count(auto_ctx, n);\n"));
        assert!(imp.contains("internal_throw_exception(auto_ctx);"));
        assert!(imp.contains("internal_env_flag(\"MUPDF_trace\")"));
    }

    #[test]
    fn kept_context_is_passed_through() {
        let h = HeaderSet {
            structs: vec![StructDef::opaque("fz_context")],
            functions: vec![FunctionDef::new(
                "fz_count",
                CType::Int,
                vec![ctx_param(), ParamDef::new("n", CType::Int)],
            )],
            ..Default::default()
        };
        let mut cfg = Config::default();
        cfg.functions.keep_context.push("fz_count".to_string());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[0]);
        let mut out = OutputFiles::default();
        emit(&ctx, &Layout::new("mupdf"), &[info.as_ref()], &mut out);

        let header = out.get("include/mupdf/functions.h").unwrap();
        assert!(header.contains("FZ_FUNCTION int ll_fz_count(::fz_context *ctx, int n);"));
        let imp = out.get("implementation/functions.cpp").unwrap();
        assert!(!imp.contains("internal_context_get()"));
        assert!(imp.contains("    fz_try(ctx)\n    {\n        ret = ::fz_count(ctx, n);\n"));
        assert!(imp.contains("internal_throw_exception(ctx);"));
    }

    #[test]
    fn out_param_helper_shape() {
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_f",
                CType::Int,
                vec![
                    ParamDef::new("a", CType::Int),
                    ParamDef::new("out_b", CType::ptr(CType::Int)),
                ],
            )],
            ..Default::default()
        };
        let out = render(&h);
        let header = out.get("include/mupdf/functions.h").unwrap();
        assert!(header.contains("struct ll_fz_f_outparams\n{\n    int out_b = {};\n};"));
        assert!(header.contains(
            "FZ_FUNCTION int ll_fz_f_outparams_fn(int a, ll_fz_f_outparams* outparams);"
        ));
        let imp = out.get("implementation/functions.cpp").unwrap();
        assert!(imp.contains("    return ll_fz_f(a, &outparams->out_b);\n"));
        // No context parameter: the ll_ wrapper forwards directly.
        assert!(imp.contains("    return ::fz_f(a, out_b);\n"));
    }

    #[test]
    fn keyword_out_params_get_plain_fields() {
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_range",
                CType::Void,
                vec![
                    ParamDef::new("from", CType::ptr(CType::Int)),
                    ParamDef::new("in", CType::ptr(CType::Int)),
                ],
            )],
            ..Default::default()
        };
        let out = render(&h);
        let header = out.get("include/mupdf/functions.h").unwrap();
        assert!(header.contains("    int from_ = {};\n    int in_ = {};\n"));
        let imp = out.get("implementation/functions.cpp").unwrap();
        assert!(imp.contains("    return ll_fz_range(&outparams->from_, &outparams->in_);\n"));
    }

    #[test]
    fn variadic_functions_get_no_wrapper() {
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_printf",
                CType::Void,
                vec![ParamDef::new("fmt", CType::const_ptr(CType::Char))],
            )
            .variadic()],
            ..Default::default()
        };
        let out = render(&h);
        assert!(!out.get("include/mupdf/functions.h").unwrap().contains("fz_printf"));
    }
}
