//! Wrapper classes.
//!
//! One class per wrapped struct, built from the class extras and the
//! functions classified as its constructors and methods, plus optional
//! iterator and director companions.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{debug, info, warn};

use super::types::{class_aware_body, class_aware_param, declare, release_out_objects, self_arg};
use super::{Layout, clean_c_comment, doc_comment, header_epilogue, header_prologue, impl_prologue};
use crate::classes::{ClassSpec, Copyable, DirectorSelf, ExtraConstructor, Pod};
use crate::classify::{self, Eligibility, Exclusion, FunctionInfo};
use crate::context::GenContext;
use crate::model::{CType, StructDef};
use crate::output::OutputFiles;
use crate::rename;
use crate::report::Report;

const UNIT: &str = "classes";

/// Return type of a member.
#[derive(Debug, Clone)]
pub enum Ret {
    /// Constructors and destructors.
    None,
    Text(String),
    Type(CType),
}

/// A member function of a generated class.
#[derive(Debug, Clone)]
pub struct Member {
    pub comment: String,
    /// `explicit `, `static ` or `virtual `; declaration only.
    pub prefix: &'static str,
    pub ret: Ret,
    pub name: String,
    pub params: String,
    pub suffix: &'static str,
    pub init: Option<String>,
    /// Statements, each line indented. `None` declares the member deleted.
    pub body: Option<String>,
}

impl Member {
    fn new(name: impl Into<String>, params: impl Into<String>, body: String) -> Self {
        Member {
            comment: String::new(),
            prefix: "",
            ret: Ret::None,
            name: name.into(),
            params: params.into(),
            suffix: "",
            init: None,
            body: Some(body),
        }
    }

    fn deleted(name: impl Into<String>, ret: Ret, params: impl Into<String>) -> Self {
        Member {
            ret,
            body: None,
            ..Member::new(name, params, String::new())
        }
    }

    fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    fn ret(mut self, ret: Ret) -> Self {
        self.ret = ret;
        self
    }

    fn prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    fn signature(&self, qualified: &str) -> String {
        let call = format!("{qualified}({}){}", self.params, self.suffix);
        match &self.ret {
            Ret::None => call,
            Ret::Text(t) => format!("{t} {call}"),
            Ret::Type(ty) => declare(ty, &call),
        }
    }

    fn declaration(&self) -> String {
        let mut out = doc_comment(&self.comment, "    ");
        match self.body {
            Some(_) => out.push_str(&format!(
                "    FZ_FUNCTION {}{};\n",
                self.prefix,
                self.signature(&self.name)
            )),
            None => out.push_str(&format!("    {} = delete;\n", self.signature(&self.name))),
        }
        out
    }

    fn definition(&self, class: &str) -> String {
        let Some(body) = &self.body else {
            return String::new();
        };
        let mut out = format!(
            "FZ_FUNCTION {}\n",
            self.signature(&format!("{class}::{}", self.name))
        );
        if let Some(init) = &self.init {
            out.push_str(&format!(": {init}\n"));
        }
        out.push_str("{\n");
        out.push_str(body);
        out.push_str("}\n\n");
        out
    }
}

/// Forward iterator over a linked list of wrapped structs.
#[derive(Debug, Clone)]
pub struct GeneratedIterator {
    pub name: String,
    pub item_class: String,
    pub item_struct: String,
    pub next: String,
    pub keep: Option<String>,
}

/// One function-pointer field exposed as a virtual method.
#[derive(Debug, Clone)]
pub struct Callback {
    pub field: String,
    pub return_type: CType,
    pub params: Vec<CType>,
    pub self_index: usize,
    pub ctx_index: Option<usize>,
}

/// `<Class>2`, whose virtual methods are called from the struct's
/// function-pointer fields.
#[derive(Debug, Clone)]
pub struct GeneratedDirector {
    pub name: String,
    pub comment: Option<String>,
    pub self_: DirectorSelf,
    pub callbacks: Vec<Callback>,
}

#[derive(Debug, Clone)]
pub struct GeneratedClass {
    pub name: String,
    pub struct_name: String,
    pub comment: String,
    pub pod: Pod,
    pub members: Vec<Member>,
    pub data: Vec<String>,
    pub iterator: Option<GeneratedIterator>,
    pub director: Option<GeneratedDirector>,
    /// Expression giving the reference count of `p`, a `const ::S*`.
    pub refs: Option<String>,
}

impl GeneratedClass {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    fn refs_check(&self) -> String {
        format!("s_{}_refs_check", self.name)
    }

    /// Statement recording a change in the number of wrappers of
    /// `m_internal`, or nothing if the class has no refs check.
    fn refs_change(&self, delta: &str) -> String {
        match self.refs {
            Some(_) => format!(
                "    {}.change(this, __FILE__, __LINE__, __FUNCTION__, {delta});\n",
                self.refs_check()
            ),
            None => String::new(),
        }
    }

    pub fn render_header(&self) -> String {
        let mut out = doc_comment(&self.comment, "");
        out.push_str(&format!("struct {}\n{{\n", self.name));
        for m in &self.members {
            out.push_str(&m.declaration());
        }
        out.push('\n');
        for d in &self.data {
            out.push_str(d);
        }
        out.push_str("};\n\n");
        if let Some(it) = &self.iterator {
            out.push_str(&it.render_header(&self.name));
        }
        if let Some(d) = &self.director {
            out.push_str(&d.render_header(self));
        }
        out
    }

    pub fn render_impl(&self, ctx: &GenContext<'_>) -> String {
        let s = &self.struct_name;
        let mut out = String::new();
        if self.pod == Pod::Inline {
            out.push_str(&format!(
                "static_assert(sizeof({}) == sizeof(::{s}), \"{} must have the layout of ::{s}\");\n\n",
                self.name, self.name
            ));
        }
        if let Some(refs) = &self.refs {
            out.push_str(&format!(
                "static int {0}_refs(const ::{s}* p)\n{{\n    return {refs};\n}}\n\nstatic RefsCheck<::{s}, {0}> {1}(\"{0}\", {0}_refs);\n\n",
                self.name,
                self.refs_check()
            ));
        }
        for m in &self.members {
            out.push_str(&m.definition(&self.name));
        }
        if let Some(it) = &self.iterator {
            out.push_str(&it.render_impl(ctx));
        }
        if let Some(d) = &self.director {
            out.push_str(&d.render_impl(ctx, self));
        }
        out
    }
}

impl GeneratedIterator {
    fn render_header(&self, container: &str) -> String {
        let name = &self.name;
        format!(
            "/** Iterator over the `{item}` items of a `{container}`. */\n\
             struct {name}\n\
             {{\n\
             \x20   FZ_FUNCTION explicit {name}(::{st}* item);\n\
             \x20   FZ_FUNCTION {name}& operator++();\n\
             \x20   FZ_FUNCTION bool operator==(const {name}& rhs) const;\n\
             \x20   FZ_FUNCTION bool operator!=(const {name}& rhs) const;\n\
             \x20   FZ_FUNCTION {item} operator*() const;\n\
             \n\
             \x20   ::{st}* m_item;\n\
             }};\n\n",
            item = self.item_class,
            st = self.item_struct,
        )
    }

    fn render_impl(&self, ctx: &GenContext<'_>) -> String {
        let name = &self.name;
        let deref = match &self.keep {
            Some(keep) => format!(
                "    {}(m_item);\n    return {}(m_item);\n",
                ctx.ll_path(keep),
                self.item_class
            ),
            None => format!("    return {}(m_item);\n", self.item_class),
        };
        format!(
            "FZ_FUNCTION {name}::{name}(::{st}* item)\n: m_item(item)\n{{\n}}\n\n\
             FZ_FUNCTION {name}& {name}::operator++()\n{{\n    m_item = m_item->{next};\n    return *this;\n}}\n\n\
             FZ_FUNCTION bool {name}::operator==(const {name}& rhs) const\n{{\n    return m_item == rhs.m_item;\n}}\n\n\
             FZ_FUNCTION bool {name}::operator!=(const {name}& rhs) const\n{{\n    return m_item != rhs.m_item;\n}}\n\n\
             FZ_FUNCTION {item} {name}::operator*() const\n{{\n{deref}}}\n\n",
            st = self.item_struct,
            next = self.next,
            item = self.item_class,
        )
    }
}

impl Callback {
    fn arg_name(i: usize) -> String {
        format!("arg_{i}")
    }

    /// Parameters of the virtual method: all but the struct itself.
    fn method_params(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.self_index)
            .map(|(i, ty)| declare(ty, &Self::arg_name(i)))
            .join(", ")
    }

    fn method_args(&self) -> String {
        (0..self.params.len())
            .filter(|i| *i != self.self_index)
            .map(Self::arg_name)
            .join(", ")
    }

    fn all_params(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .map(|(i, ty)| declare(ty, &Self::arg_name(i)))
            .join(", ")
    }
}

impl GeneratedDirector {
    fn trampoline(&self, cb: &Callback) -> String {
        format!("{}_s_{}", self.name, cb.field)
    }

    fn render_header(&self, base: &GeneratedClass) -> String {
        let name = &self.name;
        let mut text = format!(
            "Subclass of {} whose virtual methods are called by the C callbacks in `::{}`.",
            base.name, base.struct_name
        );
        if let Some(c) = &self.comment {
            text = format!("{c}\n\n{text}");
        }
        let mut out = doc_comment(&text, "");
        out.push_str(&format!("struct {name} : {}\n{{\n", base.name));
        out.push_str(&format!("    FZ_FUNCTION {name}();\n"));
        out.push_str(&format!("    {name}(const {name}& rhs) = delete;\n"));
        out.push_str(&format!("    {name}& operator=(const {name}& rhs) = delete;\n\n"));
        for cb in &self.callbacks {
            out.push_str(&format!(
                "    /** Route `{0}` to the virtual method {0}(), or clear it. */\n    FZ_FUNCTION void use_virtual_{0}(bool use = true);\n",
                cb.field
            ));
        }
        out.push('\n');
        for cb in &self.callbacks {
            let sig = declare(&cb.return_type, &format!("{}({})", cb.field, cb.method_params()));
            out.push_str(&format!("    FZ_FUNCTION virtual {sig};\n"));
        }
        out.push_str(&format!("    FZ_FUNCTION virtual ~{name}();\n}};\n\n"));
        out
    }

    fn render_impl(&self, ctx: &GenContext<'_>, base: &GeneratedClass) -> String {
        let name = &self.name;
        let s = &base.struct_name;
        let mut out = String::new();

        for cb in &self.callbacks {
            let self_arg = Callback::arg_name(cb.self_index);
            let this = match &self.self_ {
                DirectorSelf::Trailing { .. } => format!("*({name}**) ({self_arg} + 1)"),
                DirectorSelf::Field { field, .. } => format!("({name}*) {self_arg}->{field}"),
            };
            let call = format!("self->{}({})", cb.field, cb.method_args());
            let sig = declare(
                &cb.return_type,
                &format!("{}({})", self.trampoline(cb), cb.all_params()),
            );
            out.push_str(&format!("static {sig}\n{{\n    {name}* self = {this};\n"));
            match cb.ctx_index {
                Some(c) => out.push_str(&format!(
                    "    try\n    {{\n        return {call};\n    }}\n    catch (std::exception& e)\n    {{\n        fz_throw({}, {}, \"%s\", e.what());\n    }}\n",
                    Callback::arg_name(c),
                    ctx.config.naming.generic_error
                )),
                None => out.push_str(&format!("    return {call};\n")),
            }
            out.push_str("}\n\n");
        }

        let alloc = match &self.self_ {
            DirectorSelf::Trailing { alloc } => format!(
                "    m_internal = (::{s}*) {}(sizeof(*m_internal) + sizeof({name}*));\n    *({name}**) (m_internal + 1) = this;\n",
                ctx.ll_path(alloc)
            ),
            DirectorSelf::Field { field, alloc } => format!(
                "    m_internal = {}();\n    m_internal->{field} = this;\n",
                ctx.ll_path(alloc)
            ),
        };
        out.push_str(&format!(
            "FZ_FUNCTION {name}::{name}()\n: {}(nullptr)\n{{\n{alloc}{}}}\n\n",
            base.name,
            base.refs_change("+1")
        ));
        for cb in &self.callbacks {
            out.push_str(&format!(
                "FZ_FUNCTION void {name}::use_virtual_{0}(bool use)\n{{\n    m_internal->{0} = use ? {1} : nullptr;\n}}\n\n",
                cb.field,
                self.trampoline(cb)
            ));
        }
        for cb in &self.callbacks {
            let sig = declare(
                &cb.return_type,
                &format!("{name}::{}({})", cb.field, cb.method_params()),
            );
            out.push_str(&format!(
                "FZ_FUNCTION {sig}\n{{\n    std::cerr << \"Unexpected call of unimplemented virtual method {name}::{0}().\\n\";\n    throw std::runtime_error(\"{name}::{0}() is not implemented\");\n}}\n\n",
                cb.field
            ));
        }
        out.push_str(&format!("FZ_FUNCTION {name}::~{name}()\n{{\n}}\n\n"));
        out
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Build every wrapper class, sorted by struct name.
pub fn build_classes<'h>(
    ctx: &GenContext<'h>,
    functions: &[Rc<FunctionInfo<'h>>],
    report: &mut Report,
) -> Result<Vec<GeneratedClass>> {
    let mut constructors: BTreeMap<&str, Vec<Rc<FunctionInfo<'h>>>> = BTreeMap::new();
    let mut methods: BTreeMap<&str, Vec<Rc<FunctionInfo<'h>>>> = BTreeMap::new();
    for info in functions {
        match &info.eligibility {
            Eligibility::Constructor { struct_name } => constructors
                .entry(struct_name.as_str())
                .or_default()
                .push(Rc::clone(info)),
            Eligibility::Method { struct_name } => methods
                .entry(struct_name.as_str())
                .or_default()
                .push(Rc::clone(info)),
            Eligibility::Excluded(reasons) => {
                for r in reasons {
                    report.exclude(info.name(), *r);
                }
            }
        }
    }

    let mut names: BTreeMap<String, &str> = BTreeMap::new();
    let mut classes = Vec::new();
    for s in ctx.index.struct_names() {
        let Some(spec) = ctx.registry.wrapper_class(s, &ctx.index) else {
            continue;
        };
        let class = rename::class_name(s);
        if let Some(other) = names.insert(class.clone(), s) {
            anyhow::bail!("structs `{other}` and `{s}` both map to class name `{class}`");
        }
        let built = ClassBuilder::new(ctx, s, &spec)
            .build(
                constructors.remove(s).unwrap_or_default(),
                methods.remove(s).unwrap_or_default(),
                report,
            )
            .with_context(|| format!("building class for `{s}`"))?;
        classes.push(built);
    }
    report.classes = classes.len();
    info!(classes = classes.len(), "built wrapper classes");
    Ok(classes)
}

struct ClassBuilder<'a, 'h> {
    ctx: &'a GenContext<'h>,
    s: &'a str,
    spec: &'a ClassSpec,
    def: Option<&'h StructDef>,
    class: GeneratedClass,
}

impl<'a, 'h> ClassBuilder<'a, 'h> {
    fn new(ctx: &'a GenContext<'h>, s: &'a str, spec: &'a ClassSpec) -> Self {
        let def = ctx.index.struct_def(s).filter(|d| d.complete);
        let name = rename::class_name(s);
        let kind = match spec.pod {
            Pod::No => "",
            Pod::Yes => " Holds a copy of the struct.",
            Pod::Inline => " Has the same layout as the struct.",
            Pod::None => " Does not own the struct.",
        };
        ClassBuilder {
            ctx,
            s,
            spec,
            def,
            class: GeneratedClass {
                name,
                struct_name: s.to_string(),
                comment: format!("Wrapper class for struct `{s}`.{kind}"),
                pod: spec.pod,
                members: Vec::new(),
                data: Vec::new(),
                iterator: None,
                director: None,
                refs: None,
            },
        }
    }

    fn name(&self) -> &str {
        &self.class.name
    }

    fn complete_def(&self, what: &str) -> Result<&'h StructDef> {
        self.def
            .with_context(|| format!("{what} needs the definition of `{}`", self.s))
    }

    fn build(
        mut self,
        constructors: Vec<Rc<FunctionInfo<'h>>>,
        methods: Vec<Rc<FunctionInfo<'h>>>,
        report: &mut Report,
    ) -> Result<GeneratedClass> {
        if self.spec.pod.is_value() {
            self.complete_def("a POD class")?;
        }
        if self.spec.pod == Pod::No {
            self.class.refs = self.refs_expression();
        }

        let mut seeded: Vec<String> = self
            .basic_members()?
            .iter()
            .map(|k| signature_key(k))
            .collect();
        self.extra_constructors(&mut seeded)?;
        if self.spec.pod.is_value() && !seeded.iter().any(String::is_empty) {
            seeded.push(String::new());
            self.push_default_constructor();
        }

        let copyable = self.spec.is_copyable();
        let plan = classify::resolve_constructors(constructors, seeded, copyable, |info| {
            signature_key(&info.params.iter().map(|p| class_aware_param(p).key).join(", "))
        });
        for info in &plan.constructors {
            self.push_function_constructor(info);
        }
        for info in &plan.factories {
            self.push_factory(info);
        }
        for info in &plan.dropped {
            report.exclude(info.name(), Exclusion::DuplicatePrototype);
        }
        report.constructors += plan.constructors.len();
        report.factories += plan.factories.len();

        self.push_destructor();

        let prefixes = &self.ctx.config.naming.prefixes;
        let keep = rename::keep_fn(self.s, prefixes);
        let drop = rename::drop_fn(self.s, prefixes);
        let mut count = 0;
        for info in &methods {
            let name = Some(info.name().to_string());
            if name == keep || name == drop {
                continue;
            }
            self.push_method(info);
            count += 1;
        }
        report.methods += count;

        self.push_extra_methods();
        self.push_accessors();
        self.push_internal();
        self.push_data();
        self.build_iterator()?;
        self.build_director()?;
        debug!(class = %self.class.name, members = self.class.members.len(), "class");
        Ok(self.class)
    }

    fn push(&mut self, member: Member) {
        self.class.members.push(member);
    }

    /// Raw, copy and move constructors and assignment. Returns their
    /// signature keys.
    fn basic_members(&mut self) -> Result<Vec<String>> {
        let s = self.s;
        let name = self.name().to_string();
        let mut keys = Vec::new();
        if self.spec.pod.is_value() {
            let ptr = Member::new(&name, format!("const ::{s}* rhs"), "    *internal() = *rhs;\n".into())
                .prefix("explicit ")
                .comment(format!("Constructor using a copy of the `::{s}` at <rhs>."));
            let val = Member::new(&name, format!("const ::{s} rhs"), "    *internal() = rhs;\n".into())
                .prefix("explicit ")
                .comment(format!("Constructor using a copy of <rhs>."));
            self.push(ptr);
            self.push(val);
            keys.push(format!("const ::{s} *"));
            keys.push(format!("const ::{s}"));
            keys.push(format!("const {name}&"));
            return Ok(keys);
        }

        if self.spec.constructor_raw {
            let body = format!("    m_internal = internal;\n{}", self.class.refs_change("+1"));
            let comment = if self.spec.pod == Pod::No {
                "Constructor taking ownership of a reference to <internal>.".to_string()
            } else {
                "Constructor referring to <internal>, which must outlive this object.".to_string()
            };
            self.push(
                Member::new(&name, format!("::{s}* internal"), body)
                    .prefix("explicit ")
                    .comment(comment),
            );
            keys.push(format!("::{s} *"));
        }
        keys.push(format!("const {name}&"));
        if self.spec.pod == Pod::None {
            return Ok(keys);
        }

        match self.spec.copyable {
            Copyable::Yes => {
                let keep = self
                    .ctx
                    .index
                    .keep_function(s)
                    .with_context(|| format!("copyable class needs a keep function for `{s}`"))?;
                let keep = self.ctx.ll_path(&keep.name);
                let drop = self
                    .ctx
                    .index
                    .drop_function(s)
                    .map(|d| format!("    {}(m_internal);\n", self.ctx.ll_path(&d.name)))
                    .unwrap_or_default();
                let copy = format!(
                    "    m_internal = rhs.m_internal;\n    {keep}(m_internal);\n{}",
                    self.class.refs_change("+1")
                );
                self.push(
                    Member::new(&name, format!("const {name}& rhs"), copy)
                        .comment("Copy constructor, sharing the struct through its keep function."),
                );
                let assign = format!(
                    "    {keep}(rhs.m_internal);\n{}{drop}    m_internal = rhs.m_internal;\n{}    return *this;\n",
                    self.class.refs_change("-1"),
                    self.class.refs_change("+1")
                );
                self.push(
                    Member::new("operator=", format!("const {name}& rhs"), assign)
                        .ret(Ret::Text(format!("{name}&")))
                        .comment("Assignment, sharing the struct through its keep function."),
                );
            }
            Copyable::No => {
                self.push(Member::deleted(&name, Ret::None, format!("const {name}& rhs")));
                self.push(Member::deleted(
                    "operator=",
                    Ret::Text(format!("{name}&")),
                    format!("const {name}& rhs"),
                ));
                self.push(
                    Member::new(
                        &name,
                        format!("{name}&& rhs"),
                        "    m_internal = rhs.m_internal;\n    rhs.m_internal = nullptr;\n".into(),
                    )
                    .comment("Move constructor."),
                );
                keys.push(format!("{name}&&"));
            }
            Copyable::Default => {}
        }
        Ok(keys)
    }

    fn push_default_constructor(&mut self) {
        let name = self.name().to_string();
        let target = if self.spec.pod == Pod::Inline {
            "this, 0, sizeof(*this)"
        } else {
            "&m_internal, 0, sizeof(m_internal)"
        };
        self.push(
            Member::new(&name, "", format!("    std::memset({target});\n"))
                .comment("Default constructor, zeroing all fields."),
        );
    }

    /// Adds the extra constructors whose signature is not in `keys` yet,
    /// and their signatures to `keys`.
    fn extra_constructors(&mut self, keys: &mut Vec<String>) -> Result<()> {
        let name = self.name().to_string();
        let spec = self.spec;
        for extra in &spec.constructors_extra {
            match extra {
                ExtraConstructor::Fields { fields, comment } => {
                    let def = self.complete_def("a fields constructor")?;
                    if !self.spec.pod.is_value() {
                        anyhow::bail!("fields constructor on non-POD class {name}");
                    }
                    let mut params = Vec::new();
                    let mut key = Vec::new();
                    let mut body = String::new();
                    for f in fields {
                        let field = def
                            .field(f)
                            .with_context(|| format!("fields constructor: no field `{f}` in `{}`", self.s))?;
                        if matches!(field.ty.strip_typedefs(), CType::Array { .. }) {
                            anyhow::bail!("fields constructor: `{f}` is an array");
                        }
                        let p = rename::cpp_ident(f);
                        params.push(declare(&field.ty, &p));
                        key.push(declare(&field.ty, ""));
                        body.push_str(&format!("    {}{f} = {p};\n", self.member_access()));
                    }
                    if !claim_signature(keys, &name, &key.join(", ")) {
                        continue;
                    }
                    let text = comment
                        .clone()
                        .unwrap_or_else(|| format!("Constructor setting {}.", fields.join(", ")));
                    self.push(Member::new(&name, params.join(", "), body).comment(text));
                }
                ExtraConstructor::DefaultFrom { global, comment } => {
                    if !self.spec.pod.is_value() {
                        anyhow::bail!("default_from constructor on non-POD class {name}");
                    }
                    if !self.ctx.index.globals().any(|g| g.name == *global) {
                        warn!(class = %name, global = %global, "global not found, constructor skipped");
                        continue;
                    }
                    if !claim_signature(keys, &name, "") {
                        continue;
                    }
                    let text = comment
                        .clone()
                        .unwrap_or_else(|| format!("Default constructor, copying `::{global}`."));
                    self.push(
                        Member::new(&name, "", format!("    *internal() = ::{global};\n"))
                            .comment(text),
                    );
                }
                ExtraConstructor::Snippet { args, body, comment } => {
                    if !claim_signature(keys, &name, &snippet_key(args)) {
                        continue;
                    }
                    let body = body
                        .lines()
                        .map(|l| format!("    {l}\n"))
                        .collect::<String>();
                    let mut m = Member::new(&name, args.trim(), body);
                    if let Some(c) = comment {
                        m = m.comment(c.clone());
                    }
                    self.push(m);
                }
            }
        }
        Ok(())
    }

    /// `this->` for inline PODs, `m_internal.` for by-value PODs.
    fn member_access(&self) -> &'static str {
        match self.spec.pod {
            Pod::Inline => "this->",
            Pod::Yes => "m_internal.",
            Pod::No | Pod::None => "m_internal->",
        }
    }

    fn function_comment(lead: String, info: &FunctionInfo<'_>) -> String {
        match &info.def.comment {
            Some(c) => format!("{lead}\n\n{}", clean_c_comment(c)),
            None => lead,
        }
    }

    fn push_function_constructor(&mut self, info: &FunctionInfo<'_>) {
        let name = self.name().to_string();
        let convs: Vec<_> = info.params.iter().map(class_aware_param).collect();
        let call = format!(
            "{}({})",
            self.ctx.ll_path(info.name()),
            convs.iter().map(|c| c.arg.as_str()).join(", ")
        );
        let mut body = release_out_objects(self.ctx, info);
        if self.spec.pod.is_value() {
            body.push_str(&format!("    *internal() = {call};\n"));
        } else {
            body.push_str(&format!("    m_internal = {call};\n"));
        }
        if let classify::ReturnKind::Wrapped { keep: Some(keep), .. } = &info.ret {
            body.push_str(&format!("    {}(m_internal);\n", self.ctx.ll_path(keep)));
        }
        body.push_str(&self.class.refs_change("+1"));
        let comment = Self::function_comment(format!("Constructor using `{}()`.", info.name()), info);
        let prefix = if convs.len() == 1 { "explicit " } else { "" };
        self.push(
            Member::new(&name, convs.iter().map(|c| c.decl.as_str()).join(", "), body)
                .prefix(prefix)
                .comment(comment),
        );
    }

    fn push_factory(&mut self, info: &FunctionInfo<'_>) {
        let convs: Vec<_> = info.params.iter().map(class_aware_param).collect();
        let args: Vec<String> = convs.iter().map(|c| c.arg.clone()).collect();
        let comment = Self::function_comment(
            format!(
                "Static factory using `{}()`, whose signature clashes with another constructor.",
                info.name()
            ),
            info,
        );
        let ret = Ret::Text(self.name().to_string());
        self.push(
            Member::new(
                info.name(),
                convs.iter().map(|c| c.decl.as_str()).join(", "),
                class_aware_body(self.ctx, info, &args),
            )
            .prefix("static ")
            .ret(ret)
            .comment(comment),
        );
    }

    fn push_destructor(&mut self) {
        if self.spec.pod != Pod::No {
            return;
        }
        let name = self.name().to_string();
        let mut body = self.class.refs_change("-1");
        let comment = match self.ctx.index.drop_function(self.s) {
            Some(drop) => {
                body.push_str(&format!("    {}(m_internal);\n", self.ctx.ll_path(&drop.name)));
                format!("Destructor using `{}()`.", drop.name)
            }
            None => format!("Destructor; `{}` has no drop function.", self.s),
        };
        let prefix = if self.spec.virtual_fnptrs.is_some() { "virtual " } else { "" };
        self.push(Member::new(format!("~{name}"), "", body).prefix(prefix).comment(comment));
    }

    fn push_method(&mut self, info: &FunctionInfo<'_>) {
        let Some((first, rest)) = info.params.split_first() else {
            return;
        };
        let convs: Vec<_> = rest.iter().map(class_aware_param).collect();
        let args: Vec<String> = std::iter::once(self_arg(first))
            .chain(convs.iter().map(|c| c.arg.clone()))
            .collect();
        let ret = match info.ret.class_name() {
            Some(c) => Ret::Text(c.to_string()),
            None => Ret::Type(info.def.return_type.clone()),
        };
        let comment = Self::function_comment(format!("Wrapper for `{}()`.", info.name()), info);
        self.push(
            Member::new(
                rename::method_name(self.s, info.name()),
                convs.iter().map(|c| c.decl.as_str()).join(", "),
                class_aware_body(self.ctx, info, &args),
            )
            .ret(ret)
            .comment(comment),
        );
    }

    fn push_extra_methods(&mut self) {
        let spec = self.spec;
        for m in &spec.methods_extra {
            let (name, args) = m
                .name_args
                .split_once('(')
                .unwrap_or((m.name_args.as_str(), ")"));
            let args = args.strip_suffix(')').unwrap_or(args);
            let body = m.body.trim();
            let inner = body
                .strip_prefix('{')
                .and_then(|b| b.strip_suffix('}'))
                .unwrap_or(body)
                .trim_matches('\n');
            let mut text: String = inner.lines().map(|l| format!("{l}\n")).collect();
            if !text.starts_with("    ") {
                text = text.lines().map(|l| format!("    {l}\n")).collect();
            }
            let mut member =
                Member::new(name.trim(), args, text).ret(Ret::Text(m.return_type.clone()));
            if let Some(c) = &m.comment {
                member = member.comment(c.clone());
            }
            self.push(member);
        }
    }

    fn push_accessors(&mut self) {
        if !self.spec.accessors || self.spec.pod == Pod::Inline {
            return;
        }
        let Some(def) = self.def else {
            warn!(struct_name = self.s, "accessors requested for an incomplete struct");
            return;
        };
        let access = self.member_access();
        for field in &def.fields {
            if field.bitfield_width.is_some()
                || matches!(field.ty.strip_typedefs(), CType::Array { .. })
                || matches!(field.name.as_str(), "internal" | "begin" | "end" | "m_internal")
            {
                continue;
            }
            let name = rename::cpp_ident(&field.name);
            let mut m = Member::new(&name, "", format!("    return {access}{};\n", field.name))
                .ret(Ret::Type(field.ty.clone()))
                .comment(format!("Returns `{}`.", field.name));
            m.suffix = " const";
            self.push(m);
        }
    }

    fn push_internal(&mut self) {
        if !self.spec.pod.is_value() {
            return;
        }
        let s = self.s;
        let expr = match self.spec.pod {
            Pod::Inline => format!("(::{s}*) this"),
            _ => "&m_internal".to_string(),
        };
        let cexpr = match self.spec.pod {
            Pod::Inline => format!("(const ::{s}*) this"),
            _ => "&m_internal".to_string(),
        };
        self.push(
            Member::new("internal", "", format!("    return {expr};\n"))
                .ret(Ret::Text(format!("::{s}*")))
                .comment(format!("Access as a `::{s}*`.")),
        );
        let mut m = Member::new("internal", "", format!("    return {cexpr};\n"))
            .ret(Ret::Text(format!("const ::{s}*")));
        m.suffix = " const";
        self.push(m);
    }

    fn push_data(&mut self) {
        let s = self.s;
        match self.spec.pod {
            Pod::Inline => {
                if let Some(def) = self.def {
                    for f in &def.fields {
                        let decl = declare(&f.ty, &f.name);
                        match f.bitfield_width {
                            Some(w) => self.class.data.push(format!("    {decl} : {w};\n")),
                            None => self.class.data.push(format!("    {decl};\n")),
                        }
                    }
                }
            }
            Pod::Yes => self.class.data.push(format!("    ::{s} m_internal;\n")),
            Pod::No | Pod::None => self
                .class
                .data
                .push(format!("    ::{s}* m_internal; /** Pointer to wrapped data. */\n")),
        }
    }

    /// Reference count of `p`: a `refs` field found directly or through
    /// nested by-value structs, or the configured byte offset.
    fn refs_expression(&self) -> Option<String> {
        if let Some(def) = self.def
            && let Some(path) = refs_path(self.ctx, def, 0)
        {
            return Some(format!("p->{path}"));
        }
        self.spec
            .refs_offset
            .map(|off| format!("*(const int*) ((const char*) p + {off})"))
    }

    fn build_iterator(&mut self) -> Result<()> {
        let class_spec = self.spec;
        let Some(spec) = &class_spec.iterator else {
            return Ok(());
        };
        let item_struct = match &spec.first {
            None => self.s.to_string(),
            Some(first) => {
                let def = self.complete_def("an iterator")?;
                let field = def
                    .field(first)
                    .with_context(|| format!("iterator: no field `{first}`"))?;
                field
                    .ty
                    .pointee()
                    .and_then(|(t, _)| t.record_name())
                    .with_context(|| format!("iterator: `{first}` is not a struct pointer"))?
                    .to_string()
            }
        };
        let item_spec = self
            .ctx
            .registry
            .wrapper_class(&item_struct, &self.ctx.index)
            .with_context(|| format!("iterator items `{item_struct}` have no wrapper class"))?;
        if item_spec.pod.is_value() {
            anyhow::bail!("iterator items `{item_struct}` must be held by pointer");
        }
        let item_def = self
            .ctx
            .index
            .struct_def(&item_struct)
            .filter(|d| d.complete)
            .with_context(|| format!("iterator needs the definition of `{item_struct}`"))?;
        if item_def.field(&spec.next).is_none() {
            anyhow::bail!("iterator: no field `{}` in `{item_struct}`", spec.next);
        }
        let keep = if item_spec.pod == Pod::No {
            let keep = self
                .ctx
                .index
                .keep_function(&item_struct)
                .with_context(|| format!("iterator items `{item_struct}` need a keep function"))?;
            Some(keep.name.clone())
        } else {
            None
        };

        let it = rename::iterator_class_name(self.name());
        let head = match (&spec.first, class_spec.pod.is_value()) {
            (None, _) => "m_internal".to_string(),
            (Some(f), false) => format!("m_internal ? m_internal->{f} : nullptr"),
            (Some(f), true) => format!("internal()->{f}"),
        };
        self.push(
            Member::new("begin", "", format!("    return {it}({head});\n"))
                .ret(Ret::Text(it.clone()))
                .comment("Iterator to the first item."),
        );
        self.push(
            Member::new("end", "", format!("    return {it}(nullptr);\n"))
                .ret(Ret::Text(it.clone()))
                .comment("Iterator past the last item."),
        );
        self.class.iterator = Some(GeneratedIterator {
            name: it,
            item_class: rename::class_name(&item_struct),
            item_struct,
            next: spec.next.clone(),
            keep,
        });
        Ok(())
    }

    fn build_director(&mut self) -> Result<()> {
        let class_spec = self.spec;
        let Some(spec) = &class_spec.virtual_fnptrs else {
            return Ok(());
        };
        if class_spec.pod != Pod::No || !class_spec.constructor_raw {
            anyhow::bail!("virtual_fnptrs needs an owning class with a raw constructor");
        }
        let def = self.complete_def("virtual_fnptrs")?;
        let alloc = match &spec.self_ {
            DirectorSelf::Trailing { alloc } | DirectorSelf::Field { alloc, .. } => alloc,
        };
        if self.ctx.index.function(alloc).is_none() {
            anyhow::bail!("virtual_fnptrs: allocation function `{alloc}` not found");
        }
        if let DirectorSelf::Field { field, .. } = &spec.self_
            && def.field(field).is_none()
        {
            anyhow::bail!("virtual_fnptrs: no field `{field}` in `{}`", self.s);
        }

        let context_type = &self.ctx.config.naming.context_type;
        let mut callbacks = Vec::new();
        for field in &def.fields {
            let Some((ret, params)) = field.ty.fn_pointer() else {
                continue;
            };
            let points_at = |ty: &CType, name: &str| {
                ty.pointee()
                    .and_then(|(t, _)| t.record_name())
                    .is_some_and(|n| n == name)
            };
            let Some(self_index) = params.iter().position(|p| points_at(p, self.s)) else {
                debug!(field = %field.name, "callback without struct parameter skipped");
                continue;
            };
            callbacks.push(Callback {
                field: field.name.clone(),
                return_type: ret.clone(),
                params: params.to_vec(),
                self_index,
                ctx_index: params.iter().position(|p| points_at(p, context_type)),
            });
        }
        if callbacks.is_empty() {
            anyhow::bail!("virtual_fnptrs: `{}` has no callback fields", self.s);
        }
        self.class.director = Some(GeneratedDirector {
            name: rename::director_class_name(self.name()),
            comment: spec.comment.clone(),
            self_: spec.self_.clone(),
            callbacks,
        });
        Ok(())
    }
}

/// Record a constructor signature. Returns false, leaving `keys` alone,
/// when a constructor with the same parameter types already exists.
fn claim_signature(keys: &mut Vec<String>, class: &str, key: &str) -> bool {
    let key = signature_key(key);
    if keys.contains(&key) {
        warn!(class, signature = %key, "extra constructor duplicates an existing one, skipped");
        return false;
    }
    keys.push(key);
    true
}

/// Spacing-independent form of a parameter type list: no whitespace next
/// to `*`, `&` or `,` and single spaces elsewhere.
fn signature_key(types: &str) -> String {
    let mut out = String::with_capacity(types.len());
    let mut pending_space = false;
    for c in types.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        let tight = matches!(c, '*' | '&' | ',')
            || out.ends_with(|p: char| matches!(p, '*' | '&' | ','));
        if pending_space && !tight && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Parameter list of a snippet constructor with the names removed, in the
/// form used to compare constructor signatures.
fn snippet_key(args: &str) -> String {
    let types = args
        .split(',')
        .map(|a| {
            let a = a.trim();
            let ty = a.trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
            if ty.trim().is_empty() { a } else { ty.trim_end() }
        })
        .filter(|a| !a.is_empty())
        .join(", ");
    signature_key(&types)
}

fn is_integer(ty: &CType) -> bool {
    matches!(
        ty.strip_typedefs(),
        CType::Char
            | CType::SChar
            | CType::UChar
            | CType::Short
            | CType::UShort
            | CType::Int
            | CType::UInt
            | CType::Long
            | CType::ULong
            | CType::LongLong
            | CType::ULongLong
    )
}

fn refs_path(ctx: &GenContext<'_>, def: &StructDef, depth: usize) -> Option<String> {
    if def
        .fields
        .iter()
        .any(|f| f.name == "refs" && is_integer(&f.ty))
    {
        return Some("refs".to_string());
    }
    if depth >= 3 {
        return None;
    }
    def.fields.iter().find_map(|f| {
        let inner = ctx.index.struct_def(f.ty.record_name()?)?;
        let path = refs_path(ctx, inner, depth + 1)?;
        Some(format!("{}.{path}", f.name))
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub fn emit(ctx: &GenContext<'_>, layout: &Layout, classes: &[GeneratedClass], out: &mut OutputFiles) {
    let ns = ctx.ns();
    let mut h = header_prologue(ns, UNIT);
    h.push_str(&format!("#include \"{}\"\n\n", layout.include("functions")));
    h.push_str(&format!("namespace {ns}\n{{\n\n"));
    for class in classes {
        h.push_str(&format!("struct {};\n", class.name));
        if let Some(it) = &class.iterator {
            h.push_str(&format!("struct {};\n", it.name));
        }
        if let Some(d) = &class.director {
            h.push_str(&format!("struct {};\n", d.name));
        }
    }
    h.push('\n');
    for class in classes {
        h.push_str(&class.render_header());
    }
    h.push_str(&format!("}} // namespace {ns}\n"));
    h.push_str(&header_epilogue(ns, UNIT));
    out.append(layout.header(UNIT), &h);

    let mut c = impl_prologue().to_string();
    for unit in [UNIT, "exceptions", "functions", "internal"] {
        c.push_str(&format!("#include \"{}\"\n", layout.include(unit)));
    }
    c.push_str("\n#include <cstring>\n#include <iostream>\n#include <stdexcept>\n\n");
    c.push_str(&format!("namespace {ns}\n{{\n\n"));
    for class in classes {
        c.push_str(&class.render_impl(ctx));
    }
    c.push_str(&format!("}} // namespace {ns}\n"));
    out.append(layout.implementation(UNIT), &c);
}
