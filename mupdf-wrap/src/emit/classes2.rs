//! Class-aware free functions and getters for `extern` globals.

use itertools::Itertools;
use tracing::debug;

use super::types::{class_aware_body, class_aware_param, class_aware_signature};
use super::{Layout, clean_c_comment, doc_comment, header_epilogue, header_prologue, impl_prologue};
use crate::classify::FunctionInfo;
use crate::context::GenContext;
use crate::model::GlobalDef;
use crate::output::OutputFiles;
use crate::rename;

const UNIT: &str = "classes2";

pub fn emit(ctx: &GenContext<'_>, layout: &Layout, functions: &[&FunctionInfo<'_>], out: &mut OutputFiles) {
    let ns = ctx.ns();
    let mut h = header_prologue(ns, UNIT);
    h.push_str(&format!("#include \"{}\"\n\n", layout.include("classes")));
    h.push_str(&format!("namespace {ns}\n{{\n\n"));

    let mut c = impl_prologue().to_string();
    for unit in [UNIT, "classes", "functions", "internal"] {
        c.push_str(&format!("#include \"{}\"\n", layout.include(unit)));
    }
    c.push_str(&format!("\nnamespace {ns}\n{{\n\n"));

    for info in functions.iter().filter(|i| i.is_wrapped()) {
        let (decl, def) = class_aware_function(ctx, info);
        h.push_str(&decl);
        c.push_str(&def);
    }
    for global in ctx.index.globals() {
        if let Some((decl, def)) = global_getter(ctx, global) {
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

fn class_aware_function(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> (String, String) {
    let name = info.name();
    let convs: Vec<_> = info.params.iter().map(class_aware_param).collect();
    let params = convs.iter().map(|c| c.decl.as_str()).join(", ");
    let args: Vec<String> = convs.iter().map(|c| c.arg.clone()).collect();
    let sig = class_aware_signature(info, name, &params);

    let mut text = format!("Class-aware wrapper for `::{name}()`.");
    if let Some(comment) = &info.def.comment {
        text.push_str("\n\n");
        text.push_str(&clean_c_comment(comment));
    }
    let decl = format!("{}FZ_FUNCTION {sig};\n\n", doc_comment(&text, ""));
    let def = format!(
        "FZ_FUNCTION {sig}\n{{\n{}}}\n\n",
        class_aware_body(ctx, info, &args)
    );
    (decl, def)
}

/// `C {global}_value()` for an `extern` global whose type has a POD
/// wrapper class.
fn global_getter(ctx: &GenContext<'_>, global: &GlobalDef) -> Option<(String, String)> {
    let s = global.ty.record_name()?;
    let spec = ctx.registry.wrapper_class(s, &ctx.index)?;
    if !spec.pod.is_value() {
        debug!(global = %global.name, "global of non-POD type has no getter");
        return None;
    }
    let class = rename::class_name(s);
    let getter = rename::global_getter_name(&global.name);
    let decl = format!(
        "/** Copy of the global `::{}`. */\nFZ_FUNCTION {class} {getter}();\n\n",
        global.name
    );
    let def = format!(
        "FZ_FUNCTION {class} {getter}()\n{{\n    return {class}(&::{});\n}}\n\n",
        global.name
    );
    Some((decl, def))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{ClassSpec, Copyable, Pod};
    use crate::config::Config;
    use crate::model::*;

    fn ctx_param() -> ParamDef {
        ParamDef::new("ctx", CType::ptr(CType::struct_typedef("fz_context")))
    }

    fn ptr(name: &str) -> CType {
        CType::ptr(CType::struct_typedef(name))
    }

    #[test]
    fn wrapper_classes_in_signature() {
        let mut cfg = Config::default();
        cfg.class.insert(
            "fz_point".to_string(),
            ClassSpec {
                pod: Pod::Inline,
                copyable: Copyable::Default,
                ..Default::default()
            },
        );
        let h = HeaderSet {
            structs: vec![
                StructDef::opaque("fz_context"),
                StructDef::opaque("fz_widget"),
                StructDef::new(
                    "fz_point",
                    vec![FieldDef::new("x", CType::Float), FieldDef::new("y", CType::Float)],
                ),
            ],
            functions: vec![
                FunctionDef::new(
                    "fz_keep_widget",
                    ptr("fz_widget"),
                    vec![ctx_param(), ParamDef::new("w", ptr("fz_widget"))],
                ),
                FunctionDef::new(
                    "fz_current_widget",
                    ptr("fz_widget"),
                    vec![ctx_param(), ParamDef::new("at", CType::struct_typedef("fz_point"))],
                ),
            ],
            globals: vec![GlobalDef {
                name: "fz_origin".to_string(),
                ty: CType::struct_typedef("fz_point"),
                location: Location::default(),
            }],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let infos: Vec<_> = h.functions.iter().map(|f| ctx.classify(f)).collect();
        let refs: Vec<&FunctionInfo<'_>> = infos.iter().map(|i| i.as_ref()).collect();
        let mut out = OutputFiles::default();
        emit(&ctx, &Layout::new("mupdf"), &refs, &mut out);

        let header = out.get("include/mupdf/classes2.h").unwrap();
        assert!(header.contains("FZ_FUNCTION FzWidget fz_current_widget(const FzPoint& at);"));
        assert!(header.contains("FZ_FUNCTION FzPoint fz_origin_value();"));
        let imp = out.get("implementation/classes2.cpp").unwrap();
        // Borrowed result: the wrapper takes its own reference.
        assert!(imp.contains(
            "    ::fz_widget *temp = mupdf::ll_fz_current_widget(*at.internal());\n    mupdf::ll_fz_keep_widget(temp);\n    return FzWidget(temp);\n"
        ));
        assert!(imp.contains("    return FzPoint(&::fz_origin);\n"));
    }

    #[test]
    fn object_out_param_drops_previous_reference() {
        let cfg = Config::default();
        let h = HeaderSet {
            structs: vec![StructDef::opaque("fz_context"), StructDef::opaque("fz_widget")],
            functions: vec![
                FunctionDef::new(
                    "fz_keep_widget",
                    ptr("fz_widget"),
                    vec![ctx_param(), ParamDef::new("w", ptr("fz_widget"))],
                ),
                FunctionDef::new(
                    "fz_drop_widget",
                    CType::Void,
                    vec![ctx_param(), ParamDef::new("w", ptr("fz_widget"))],
                ),
                FunctionDef::new(
                    "fz_lookup_widget",
                    CType::Void,
                    vec![
                        ctx_param(),
                        ParamDef::new("id", CType::Int),
                        ParamDef::new("found", CType::ptr(ptr("fz_widget"))),
                    ],
                ),
            ],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[2]);
        let mut out = OutputFiles::default();
        emit(&ctx, &Layout::new("mupdf"), &[info.as_ref()], &mut out);

        let header = out.get("include/mupdf/classes2.h").unwrap();
        assert!(header.contains("FZ_FUNCTION void fz_lookup_widget(int id, FzWidget& found);"));
        let imp = out.get("implementation/classes2.cpp").unwrap();
        assert!(imp.contains(
            "{\n    mupdf::ll_fz_drop_widget(found.m_internal);\n    found.m_internal = nullptr;\n    mupdf::ll_fz_lookup_widget(id, &found.m_internal);\n}"
        ));
    }
}
