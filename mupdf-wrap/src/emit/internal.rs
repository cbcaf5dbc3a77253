//! Support code shared by the other generated units: the per-thread
//! context, environment flags and the reference-count checker.

use super::{Layout, header_epilogue, header_prologue, impl_prologue};
use crate::context::GenContext;
use crate::output::OutputFiles;

const UNIT: &str = "internal";

pub fn emit(ctx: &GenContext<'_>, layout: &Layout, out: &mut OutputFiles) {
    let ns = ctx.ns();
    let cx = &ctx.config.naming.context_type;
    let env = ctx.config.output.env_prefix();

    let mut h = header_prologue(ns, UNIT);
    h.push_str("#include <cstdlib>\n#include <iostream>\n#include <map>\n#include <mutex>\n\n");
    for inc in ctx.config.c_includes() {
        h.push_str(&format!("#include \"{inc}\"\n"));
    }
    h.push_str("\n#ifndef FZ_FUNCTION\n    #define FZ_FUNCTION\n#endif\n\n");
    h.push_str(&format!("namespace {ns}\n{{\n\n"));
    h.push_str(&format!(
        "/** The calling thread's context, cloned on first use from a shared base context. */\n\
         FZ_FUNCTION ::{cx}* internal_context_get();\n\n\
         /** True if environment variable <name> is set to something other than \"\" or \"0\". */\n\
         FZ_FUNCTION bool internal_env_flag(const char* name);\n\n"
    ));
    h.push_str(&format!(
        r#"/**
* Cross-checks the number of live wrapper instances of each struct against
* the struct's reference count. Enabled by {env}_check_refs.
*/
template<typename Struct, typename Class>
struct RefsCheck
{{
    std::mutex m_mutex;
    std::map<const Struct*, int> m_counts;
    const char* m_name;
    int (*m_refs)(const Struct*);
    bool m_enabled;

    RefsCheck(const char* name, int (*refs)(const Struct*))
    : m_name(name), m_refs(refs), m_enabled(internal_env_flag("{env}_check_refs"))
    {{
    }}

    void change(const Class* self, const char* file, int line, const char* fn, int delta)
    {{
        if (!m_enabled) return;
        const Struct* item = self->m_internal;
        if (!item) return;
        std::lock_guard<std::mutex> lock(m_mutex);
        int& n = m_counts[item];
        n += delta;
        int refs = m_refs(item);
        if (n < 0 || n > refs)
        {{
            std::cerr << file << ":" << line << ":" << fn << "(): " << m_name
                    << ": " << n << " wrapper(s) of " << (const void*) item
                    << " but refs=" << refs << "\n";
            std::abort();
        }}
        if (n == 0) m_counts.erase(item);
    }}
}};

}} // namespace {ns}
"#
    ));
    h.push_str(&header_epilogue(ns, UNIT));
    out.append(layout.header(UNIT), &h);

    let register = if ctx.index.function("fz_register_document_handlers").is_some() {
        "        fz_register_document_handlers(m_ctx);\n"
    } else {
        ""
    };
    let mut c = impl_prologue().to_string();
    c.push_str(&format!(
        r#"#include "{include}"

#include <cstring>
#include <stdexcept>

namespace {ns}
{{

static std::mutex s_locks[FZ_LOCK_MAX];

static void s_lock(void* user, int lock)
{{
    s_locks[lock].lock();
}}

static void s_unlock(void* user, int lock)
{{
    s_locks[lock].unlock();
}}

static ::fz_locks_context s_locks_context = {{ nullptr, s_lock, s_unlock }};

struct BaseContext
{{
    ::{cx}* m_ctx;
    BaseContext()
    {{
        m_ctx = fz_new_context(nullptr, &s_locks_context, FZ_STORE_DEFAULT);
        if (!m_ctx) throw std::runtime_error("fz_new_context() failed");
{register}    }}
    ~BaseContext()
    {{
        fz_drop_context(m_ctx);
    }}
}};

struct ThreadContext
{{
    ::{cx}* m_ctx = nullptr;
    ~ThreadContext()
    {{
        if (m_ctx) fz_drop_context(m_ctx);
    }}
}};

FZ_FUNCTION ::{cx}* internal_context_get()
{{
    static BaseContext base;
    thread_local ThreadContext thread;
    if (!thread.m_ctx)
    {{
        thread.m_ctx = fz_clone_context(base.m_ctx);
        if (!thread.m_ctx) throw std::runtime_error("fz_clone_context() failed");
    }}
    return thread.m_ctx;
}}

FZ_FUNCTION bool internal_env_flag(const char* name)
{{
    const char* value = std::getenv(name);
    return value && std::strcmp(value, "") && std::strcmp(value, "0");
}}

}} // namespace {ns}
"#,
        include = layout.include(UNIT),
    ));
    out.append(layout.implementation(UNIT), &c);
}
