//! Naming policy: C identifiers → generated C++ identifiers.
//!
//! Everything here is a pure string transform.

/// Wrapper class name for a struct: `fz_document` → `FzDocument`.
///
/// Words are split on `_` and capitalised. A word starting with a digit, or
/// an empty word (leading or doubled `_`), keeps its underscore so that
/// distinct lowercase names never map to the same class name.
pub fn class_name(struct_name: &str) -> String {
    let name = struct_name.strip_prefix("struct ").unwrap_or(struct_name);
    let mut out = String::with_capacity(name.len());
    for (i, word) in name.split('_').enumerate() {
        let mut chars = word.chars();
        match chars.next() {
            None => out.push('_'),
            Some(c) if c.is_ascii_digit() => {
                if i > 0 {
                    out.push('_');
                }
                out.push(c);
                out.extend(chars);
            }
            Some(c) => {
                out.extend(c.to_uppercase());
                out.extend(chars);
            }
        }
    }
    out
}

/// Low-level wrapper name: `fz_open_document` → `ll_fz_open_document`.
pub fn ll_name(ll_prefix: &str, fn_name: &str) -> String {
    format!("{ll_prefix}{fn_name}")
}

/// Method name for a function wrapped as a method of `struct_name`.
///
/// The full C function name is kept; see DESIGN.md.
pub fn method_name(_struct_name: &str, fn_name: &str) -> String {
    fn_name.to_string()
}

/// Exception class for an error code: `FZ_ERROR_GENERIC` → `FzErrorGeneric`.
pub fn error_class_name(code: &str) -> String {
    class_name(&code.to_ascii_lowercase())
}

/// Split `fz_document` into (`fz_`, `document`) using the first matching
/// library prefix.
fn split_prefix<'a>(name: &'a str, prefixes: &'a [String]) -> Option<(&'a str, &'a str)> {
    prefixes
        .iter()
        .find_map(|p| name.strip_prefix(p.as_str()).map(|rest| (p.as_str(), rest)))
}

/// `fz_document` → `fz_keep_document`.
pub fn keep_fn(struct_name: &str, prefixes: &[String]) -> Option<String> {
    let (prefix, rest) = split_prefix(struct_name, prefixes)?;
    Some(format!("{prefix}keep_{rest}"))
}

/// `fz_document` → `fz_drop_document`.
pub fn drop_fn(struct_name: &str, prefixes: &[String]) -> Option<String> {
    let (prefix, rest) = split_prefix(struct_name, prefixes)?;
    Some(format!("{prefix}drop_{rest}"))
}

/// Strip the library prefix from a function name: `fz_new_pixmap` →
/// `new_pixmap`. Names without a known prefix are returned unchanged.
pub fn unprefixed<'a>(fn_name: &'a str, prefixes: &'a [String]) -> &'a str {
    split_prefix(fn_name, prefixes).map_or(fn_name, |(_, rest)| rest)
}

pub fn outparams_struct_name(ll_name: &str) -> String {
    format!("{ll_name}_outparams")
}

pub fn outparams_fn_name(ll_name: &str) -> String {
    format!("{ll_name}_outparams_fn")
}

/// `FzDevice` → `FzDevice2`, the subclass exposing function pointers as
/// virtual methods.
pub fn director_class_name(class_name: &str) -> String {
    format!("{class_name}2")
}

pub fn iterator_class_name(class_name: &str) -> String {
    format!("{class_name}Iterator")
}

/// Getter for an `extern` global: `fz_identity` → `fz_identity_value`.
pub fn global_getter_name(global: &str) -> String {
    format!("{global}_value")
}

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if",
    "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr",
    "operator", "or", "private", "protected", "public", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "template", "this", "throw", "true",
    "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "while", "xor",
];

/// Locals used by generated function bodies.
const RESERVED_LOCALS: &[&str] = &["ret", "temp", "auto_ctx", "outparams", "self"];

/// Make a C parameter name usable in generated C++.
pub fn cpp_ident(name: &str) -> String {
    if CPP_KEYWORDS.contains(&name) || RESERVED_LOCALS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Member name of an out-param in the `_outparams` struct. SWIG exposes it
/// as an attribute, so it must not be a Python or C# keyword either.
pub fn outparam_field(param: &str) -> String {
    let name = cpp_ident(param);
    if crate::python::PYTHON_KEYWORDS.contains(&name.as_str())
        || crate::csharp::CSHARP_KEYWORDS.contains(&name.as_str())
    {
        format!("{name}_")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn class_names() {
        assert_eq!(class_name("fz_document"), "FzDocument");
        assert_eq!(class_name("pdf_obj"), "PdfObj");
        assert_eq!(class_name("fz_stext_page"), "FzStextPage");
        assert_eq!(class_name("struct fz_font"), "FzFont");
        assert_eq!(class_name("fz_3d_thing"), "Fz_3dThing");
        assert_eq!(class_name("_priv"), "_Priv");
    }

    #[test]
    fn method_name_keeps_full_function_name() {
        assert_eq!(
            method_name("fz_document", "fz_count_pages"),
            "fz_count_pages"
        );
    }

    #[test]
    fn keep_and_drop_names() {
        let prefixes = vec!["fz_".to_string(), "pdf_".to_string()];
        assert_eq!(keep_fn("fz_pixmap", &prefixes).unwrap(), "fz_keep_pixmap");
        assert_eq!(drop_fn("pdf_obj", &prefixes).unwrap(), "pdf_drop_obj");
        assert_eq!(keep_fn("widget", &prefixes), None);
        assert_eq!(unprefixed("pdf_load_page", &prefixes), "load_page");
        assert_eq!(unprefixed("strlen", &prefixes), "strlen");
    }

    #[test]
    fn error_classes() {
        assert_eq!(error_class_name("FZ_ERROR_GENERIC"), "FzErrorGeneric");
        assert_eq!(error_class_name("FZ_ERROR_TRYLATER"), "FzErrorTrylater");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(cpp_ident("new"), "new_");
        assert_eq!(cpp_ident("ret"), "ret_");
        assert_eq!(cpp_ident("doc"), "doc");
    }

    #[test]
    fn outparam_fields_avoid_binding_keywords() {
        assert_eq!(outparam_field("from"), "from_");
        assert_eq!(outparam_field("in"), "in_");
        assert_eq!(outparam_field("params"), "params_");
        assert_eq!(outparam_field("new"), "new_");
        assert_eq!(outparam_field("out_w"), "out_w");
    }

    proptest! {
        #[test]
        fn class_name_is_injective(
            names in proptest::collection::hash_set("(fz|pdf)_[a-z0-9_]{1,12}", 2..40)
        ) {
            let mut seen = HashSet::new();
            for name in &names {
                prop_assert!(seen.insert(class_name(name)), "collision for {}", name);
            }
        }
    }
}
