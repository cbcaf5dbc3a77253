//! C++ spelling of model types and parameter conversions.

use itertools::Itertools;

use crate::classes::Pod;
use crate::classify::{AltPassing, FunctionInfo, ParamInfo, ReturnKind};
use crate::context::GenContext;
use crate::model::CType;

fn base_spelling(ty: &CType) -> String {
    match ty {
        CType::Void => "void".into(),
        CType::Bool => "bool".into(),
        CType::Char => "char".into(),
        CType::SChar => "signed char".into(),
        CType::UChar => "unsigned char".into(),
        CType::Short => "short".into(),
        CType::UShort => "unsigned short".into(),
        CType::Int => "int".into(),
        CType::UInt => "unsigned int".into(),
        CType::Long => "long".into(),
        CType::ULong => "unsigned long".into(),
        CType::LongLong => "long long".into(),
        CType::ULongLong => "unsigned long long".into(),
        CType::Float => "float".into(),
        CType::Double => "double".into(),
        CType::LongDouble => "long double".into(),
        CType::Named { name, .. } if name == "va_list" => "va_list".into(),
        CType::Named { name, .. } | CType::Record { name, .. } | CType::Enum { name } => {
            format!("::{name}")
        }
        // Derived types are handled by `declare`.
        CType::Ptr { .. } | CType::Array { .. } | CType::FnPtr { .. } => String::new(),
    }
}

/// Declare `declarator` with type `ty`, e.g. `declare(int*, "x")` gives
/// `int *x`. An empty declarator gives the abstract type name.
pub fn declare(ty: &CType, declarator: &str) -> String {
    declare_inner(ty, declarator, false)
}

fn declare_inner(ty: &CType, declarator: &str, is_const: bool) -> String {
    match ty {
        CType::Ptr { pointee, is_const: pc } => {
            let d = match pointee.as_ref() {
                CType::FnPtr { .. } | CType::Array { .. } => format!("(*{declarator})"),
                _ => format!("*{declarator}"),
            };
            declare_inner(pointee, &d, *pc)
        }
        CType::Array { element, len } => {
            declare_inner(element, &format!("{declarator}[{len}]"), is_const)
        }
        CType::FnPtr {
            return_type,
            params,
            variadic,
        } => {
            let mut list = params.iter().map(|p| declare(p, "")).join(", ");
            if *variadic {
                list.push_str(if params.is_empty() { "..." } else { ", ..." });
            }
            declare(return_type, &format!("{declarator}({list})"))
        }
        _ => {
            let cst = if is_const { "const " } else { "" };
            let base = base_spelling(ty);
            if declarator.is_empty() {
                format!("{cst}{base}")
            } else {
                format!("{cst}{base} {declarator}")
            }
        }
    }
}

/// A parameter of a class-aware function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamConv {
    /// Declaration in the parameter list.
    pub decl: String,
    /// Expression passed on to the `ll_` function.
    pub arg: String,
    /// Declaration without the name, for signature comparison.
    pub key: String,
}

fn alt_decl(p: &ParamInfo<'_>, name: &str) -> Option<(String, String)> {
    let alt = p.alt.as_ref()?;
    let class = &alt.class_name;
    let by_value = alt.pod.is_value();
    let r = match (alt.passing, by_value) {
        (AltPassing::Value, true) => (format!("const {class}& {name}"), format!("*{name}.internal()")),
        (AltPassing::Value, false) => (format!("const {class}& {name}"), format!("*{name}.m_internal")),
        (AltPassing::Pointer { is_const: true }, true) => {
            (format!("const {class}& {name}"), format!("{name}.internal()"))
        }
        (AltPassing::Pointer { is_const: false }, true) => {
            (format!("{class}& {name}"), format!("{name}.internal()"))
        }
        (AltPassing::Pointer { .. }, false) => {
            (format!("const {class}& {name}"), format!("{name}.m_internal"))
        }
        (AltPassing::DoublePointer, false) => {
            (format!("{class}& {name}"), format!("&{name}.m_internal"))
        }
        (AltPassing::DoublePointer, true) => return None,
    };
    Some(r)
}

/// Class-aware form of a parameter.
pub fn class_aware_param(p: &ParamInfo<'_>) -> ParamConv {
    match (alt_decl(p, &p.name), alt_decl(p, "")) {
        (Some((decl, arg)), Some((key, _))) => ParamConv {
            decl,
            arg,
            key: key.trim_end().to_string(),
        },
        _ => ParamConv {
            decl: declare(p.ty(), &p.name),
            arg: p.name.clone(),
            key: declare(p.ty(), ""),
        },
    }
}

/// Expression passing the object itself as the first argument of a method.
pub fn self_arg(p: &ParamInfo<'_>) -> String {
    let by_value = p.alt.as_ref().is_some_and(|a| a.pod.is_value());
    match (p.alt.as_ref().map(|a| a.passing), by_value) {
        (Some(AltPassing::Value), true) => "*internal()".into(),
        (Some(AltPassing::Value), false) => "*m_internal".into(),
        (_, true) => "internal()".into(),
        _ => "m_internal".into(),
    }
}

/// Plain (`ll_`) parameter declarations, without the context parameter.
pub fn ll_params(info: &FunctionInfo<'_>) -> String {
    info.params.iter().map(|p| declare(p.ty(), &p.name)).join(", ")
}

/// Render `name(params)` with the return type of the class-aware form.
pub fn class_aware_signature(info: &FunctionInfo<'_>, name: &str, params: &str) -> String {
    match info.ret.class_name() {
        Some(class) => format!("{class} {name}({params})"),
        None => declare(&info.def.return_type, &format!("{name}({params})")),
    }
}

/// Statements releasing the references held by wrapper objects that
/// `fz_foo**` out-params are about to overwrite.
pub fn release_out_objects(ctx: &GenContext<'_>, info: &FunctionInfo<'_>) -> String {
    let mut out = String::new();
    for p in info.out_params() {
        let Some(alt) = p
            .alt
            .as_ref()
            .filter(|a| a.passing == AltPassing::DoublePointer && a.pod == Pod::No)
        else {
            continue;
        };
        if let Some(drop) = ctx.index.drop_function(&alt.struct_name) {
            out.push_str(&format!(
                "    {}({name}.m_internal);\n    {name}.m_internal = nullptr;\n",
                ctx.ll_path(&drop.name),
                name = p.name
            ));
        }
    }
    out
}

/// Statements calling `ll_<fn>(args)` and returning the converted result.
pub fn class_aware_body(ctx: &GenContext<'_>, info: &FunctionInfo<'_>, args: &[String]) -> String {
    let call = format!("{}({})", ctx.ll_path(info.name()), args.join(", "));
    let temp = declare(&info.def.return_type, "temp");
    let release = release_out_objects(ctx, info);
    let call_body = match &info.ret {
        ReturnKind::Void => format!("    {call};\n"),
        ReturnKind::Plain => format!("    return {call};\n"),
        ReturnKind::Wrapped {
            class_name,
            keep: Some(keep),
            ..
        } => format!(
            "    {temp} = {call};\n    {}(temp);\n    return {class_name}(temp);\n",
            ctx.ll_path(keep)
        ),
        ReturnKind::Wrapped { class_name, .. } | ReturnKind::WrappedPod { class_name, .. } => {
            format!("    {temp} = {call};\n    return {class_name}(temp);\n")
        }
    };
    release + &call_body
}
