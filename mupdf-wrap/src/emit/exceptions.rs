//! Exception classes, one per error code.

use std::collections::HashSet;

use tracing::debug;

use super::{Layout, header_epilogue, header_prologue, impl_prologue};
use crate::context::GenContext;
use crate::output::OutputFiles;
use crate::rename;

const UNIT: &str = "exceptions";

pub fn emit(ctx: &GenContext<'_>, layout: &Layout, out: &mut OutputFiles) {
    let ns = ctx.ns();
    let codes = ctx.index.error_codes(&ctx.config.naming.error_prefix);
    debug!(count = codes.len(), "error codes");

    let mut h = header_prologue(ns, UNIT);
    h.push_str("#include <exception>\n#include <string>\n\n");
    h.push_str(&format!("#include \"{}\"\n\n", layout.include("internal")));
    h.push_str(&format!("namespace {ns}\n{{\n\n"));
    h.push_str(
        "/** Base class for exceptions thrown for errors raised by the C library. */\n\
         struct FzErrorBase : std::exception\n\
         {\n\
         \x20   int m_code;\n\
         \x20   std::string m_text;\n\
         \x20   std::string m_what;\n\
         \x20   FZ_FUNCTION const char* what() const throw();\n\
         \x20   FZ_FUNCTION FzErrorBase(int code, const char* text);\n\
         };\n\n",
    );
    for (code, _) in &codes {
        let class = rename::error_class_name(code);
        h.push_str(&format!(
            "/** For `{code}`. */\nstruct {class} : FzErrorBase\n{{\n    FZ_FUNCTION {class}(const char* text);\n}};\n\n"
        ));
    }
    h.push_str(&format!(
        "/** Throw the exception matching the error caught in <ctx>. */\n\
         FZ_FUNCTION void internal_throw_exception(::{}* ctx);\n\n}} // namespace {ns}\n",
        ctx.config.naming.context_type
    ));
    h.push_str(&header_epilogue(ns, UNIT));
    out.append(layout.header(UNIT), &h);

    let mut c = impl_prologue().to_string();
    c.push_str(&format!(
        "#include \"{}\"\n#include \"{}\"\n\n",
        layout.include(UNIT),
        layout.include("internal")
    ));
    c.push_str(&format!("namespace {ns}\n{{\n\n"));
    c.push_str(
        "FZ_FUNCTION FzErrorBase::FzErrorBase(int code, const char* text)\n\
         : m_code(code), m_text(text ? text : \"\")\n\
         {\n\
         \x20   m_what = \"code=\" + std::to_string(m_code) + \": \" + m_text;\n\
         }\n\n\
         FZ_FUNCTION const char* FzErrorBase::what() const throw()\n\
         {\n\
         \x20   return m_what.c_str();\n\
         }\n\n",
    );
    for (code, _) in &codes {
        let class = rename::error_class_name(code);
        c.push_str(&format!(
            "FZ_FUNCTION {class}::{class}(const char* text)\n: FzErrorBase({code}, text)\n{{\n}}\n\n"
        ));
    }

    let message = if ctx.index.function("fz_caught_message").is_some() {
        "fz_caught_message(ctx)"
    } else {
        "\"\""
    };
    c.push_str(&format!(
        "FZ_FUNCTION void internal_throw_exception(::{}* ctx)\n{{\n    int code = fz_caught(ctx);\n    const char* text = {message};\n    switch (code)\n    {{\n",
        ctx.config.naming.context_type
    ));
    // Codes sharing a value would be duplicate case labels; the first wins.
    let mut values = HashSet::new();
    for (code, value) in &codes {
        if values.insert(*value) {
            c.push_str(&format!(
                "        case {code}: throw {}(text);\n",
                rename::error_class_name(code)
            ));
        }
    }
    c.push_str(&format!(
        "    }}\n    throw FzErrorBase(code, text);\n}}\n\n}} // namespace {ns}\n"
    ));
    out.append(layout.implementation(UNIT), &c);
}
