//! C# glue: `%pragma(csharp) modulecode` methods returning out-params as
//! value tuples.
//!
//! Only functions whose parameters and result are all primitive types get
//! a wrapper; SWIG's own proxy types cover everything else.

use itertools::Itertools;
use tracing::trace;

use crate::classify::FunctionInfo;
use crate::context::GenContext;
use crate::model::CType;
use crate::rename;

pub(crate) const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// C# spelling of a parameter name.
pub fn cs_ident(name: &str) -> String {
    if CSHARP_KEYWORDS.contains(&name) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

/// The C# type SWIG maps a primitive C type to.
pub fn primitive(ty: &CType) -> Option<&'static str> {
    let t = match ty.strip_typedefs() {
        CType::Bool => "bool",
        CType::Char => "char",
        CType::SChar => "sbyte",
        CType::UChar => "byte",
        CType::Short => "short",
        CType::UShort => "ushort",
        CType::Int | CType::Long => "int",
        CType::UInt | CType::ULong => "uint",
        CType::LongLong => "long",
        CType::ULongLong => "ulong",
        CType::Float => "float",
        CType::Double => "double",
        _ => return None,
    };
    Some(t)
}

/// Body of the `modulecode` block. `module` is the SWIG module class that
/// holds the generated functions.
pub fn outparam_wrappers(ctx: &GenContext<'_>, module: &str, functions: &[&FunctionInfo<'_>]) -> String {
    functions
        .iter()
        .filter(|i| i.is_wrapped() && i.has_out_params())
        .filter_map(|info| {
            let text = wrapper(ctx, module, info);
            if text.is_none() {
                trace!(function = info.name(), "non-primitive types, no C# tuple wrapper");
            }
            text
        })
        .collect()
}

fn wrapper(ctx: &GenContext<'_>, module: &str, info: &FunctionInfo<'_>) -> Option<String> {
    let ll = ctx.ll_name(info.name());
    let returns_value = !info.def.return_type.is_void();

    let mut params = Vec::new();
    let mut args = Vec::new();
    for p in info.params.iter().filter(|p| !p.is_out) {
        let name = cs_ident(&p.name);
        params.push(format!("{} {name}", primitive(p.ty())?));
        args.push(name);
    }
    args.push("outparams".to_string());

    let mut types = Vec::new();
    let mut results = Vec::new();
    if returns_value {
        types.push(primitive(&info.def.return_type)?);
        results.push("ret".to_string());
    }
    for p in info.out_params() {
        types.push(primitive(p.out_type()?)?);
        results.push(format!("outparams.{}", rename::outparam_field(&p.name)));
    }

    let (ret_type, ret_expr) = match types.as_slice() {
        [one] => (one.to_string(), results.join("")),
        _ => (
            format!("({})", types.join(", ")),
            format!("({})", results.join(", ")),
        ),
    };
    let call = format!(
        "{module}.{}({})",
        rename::outparams_fn_name(&ll),
        args.join(", ")
    );
    let call = if returns_value {
        format!("var ret = {call};")
    } else {
        format!("{call};")
    };
    Some(format!(
        "/// Wrapper for out-params of {ll}().\npublic static {ret_type} {}({})\n{{\n    var outparams = new {}();\n    {call}\n    return {ret_expr};\n}}\n\n",
        rename::outparams_fn_name(&ll),
        params.iter().join(", "),
        rename::outparams_struct_name(&ll),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::*;

    #[test]
    fn primitive_out_params_become_a_tuple() {
        let cfg = Config::default();
        let h = HeaderSet {
            functions: vec![
                FunctionDef::new(
                    "fz_f",
                    CType::Int,
                    vec![
                        ParamDef::new("params", CType::Int),
                        ParamDef::new("out_b", CType::ptr(CType::Double)),
                    ],
                ),
                FunctionDef::new(
                    "fz_name",
                    CType::Void,
                    vec![ParamDef::new(
                        "out",
                        CType::ptr(CType::ptr(CType::Char)),
                    )],
                ),
            ],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let infos: Vec<_> = h.functions.iter().map(|f| ctx.classify(f)).collect();
        let refs: Vec<&FunctionInfo<'_>> = infos.iter().map(|i| i.as_ref()).collect();
        let text = outparam_wrappers(&ctx, "mupdf", &refs);

        assert!(text.contains("public static (int, double) ll_fz_f_outparams_fn(int @params)\n"));
        assert!(text.contains("    var ret = mupdf.ll_fz_f_outparams_fn(@params, outparams);\n"));
        assert!(text.contains("    return (ret, outparams.out_b);\n"));
        // char** out-param has no primitive C# type.
        assert!(!text.contains("ll_fz_name"));
    }

    #[test]
    fn keyword_out_params_read_plain_members() {
        let cfg = Config::default();
        let h = HeaderSet {
            functions: vec![FunctionDef::new(
                "fz_range",
                CType::Void,
                vec![
                    ParamDef::new("in", CType::ptr(CType::Int)),
                    ParamDef::new("base", CType::ptr(CType::Int)),
                ],
            )],
            ..Default::default()
        };
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = ctx.classify(&h.functions[0]);
        let text = outparam_wrappers(&ctx, "mupdf", &[info.as_ref()]);
        assert!(text.contains("    return (outparams.in_, outparams.base_);\n"));
    }
}
