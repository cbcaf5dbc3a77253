//! Signature classification.
//!
//! Decides, for each C function, how every parameter is passed in the
//! generated C++ (plain, out-param, or as a wrapper class) and whether the
//! function becomes a constructor, a method, or is excluded from the class
//! API. Classification is total and never fails; the result for a function
//! is computed once per run and cached.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::classes::Pod;
use crate::context::GenContext;
use crate::model::{CType, FunctionDef, ParamDef};
use crate::rename;

/// Why a function has no class-aware form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Exclusion {
    Variadic,
    FirstArgNotStruct,
    NoExtrasForReturnType,
    ReturnTypeNotCopyable,
    ReturnTypeNoRawConstructor,
    NoWrapperClassForArgument,
    IsEnum,
    /// Listed in `functions.omit`.
    Omitted,
    /// A constructor with the same C++ signature already exists and the
    /// class cannot host a static factory instead.
    DuplicatePrototype,
}

impl Exclusion {
    pub fn code(self) -> &'static str {
        match self {
            Exclusion::Variadic => "variadic",
            Exclusion::FirstArgNotStruct => "first-arg-not-struct",
            Exclusion::NoExtrasForReturnType => "no-extras-for-return-type",
            Exclusion::ReturnTypeNotCopyable => "return-type-not-copyable",
            Exclusion::ReturnTypeNoRawConstructor => "return-type-no-raw-constructor",
            Exclusion::NoWrapperClassForArgument => "no-wrapper-class-for-argument",
            Exclusion::IsEnum => "is-enum",
            Exclusion::Omitted => "omitted",
            Exclusion::DuplicatePrototype => "duplicate-prototype",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How a parameter reaches the C function when the caller holds a wrapper
/// class instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltPassing {
    /// `S*` or `const S*`.
    Pointer { is_const: bool },
    /// `S**`, an out-param receiving a new pointer.
    DoublePointer,
    /// `S` by value.
    Value,
}

/// A parameter that the class-aware API passes as a wrapper class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alt {
    pub struct_name: String,
    pub class_name: String,
    pub passing: AltPassing,
    pub pod: Pod,
}

#[derive(Debug, Clone)]
pub struct ParamInfo<'h> {
    pub def: &'h ParamDef,
    /// Name usable in generated C++.
    pub name: String,
    pub is_out: bool,
    pub alt: Option<Alt>,
}

impl ParamInfo<'_> {
    pub fn ty(&self) -> &CType {
        &self.def.ty
    }

    /// For out-params, the type written through the pointer.
    pub fn out_type(&self) -> Option<&CType> {
        if !self.is_out {
            return None;
        }
        self.def.ty.pointee().map(|(t, _)| t)
    }
}

/// How a function's return value reaches the class-aware caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    Void,
    /// Returned unchanged.
    Plain,
    /// A pointer wrapped in its class. `keep` names the C function to call
    /// first when the function returns a borrowed reference.
    Wrapped {
        struct_name: String,
        class_name: String,
        keep: Option<String>,
    },
    /// A struct returned by value into a POD class.
    WrappedPod {
        struct_name: String,
        class_name: String,
    },
}

impl ReturnKind {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ReturnKind::Wrapped { class_name, .. } | ReturnKind::WrappedPod { class_name, .. } => {
                Some(class_name)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Constructor { struct_name: String },
    Method { struct_name: String },
    Excluded(Vec<Exclusion>),
}

/// Classification of one C function.
#[derive(Debug)]
pub struct FunctionInfo<'h> {
    pub def: &'h FunctionDef,
    /// The first C parameter is the context and is supplied by the wrapper.
    pub has_context: bool,
    /// The first C parameter is the context but the caller passes it in
    /// (`functions.keep_context`). It stays in `params`.
    pub keeps_context: bool,
    /// Parameters without a wrapper-supplied context parameter.
    pub params: Vec<ParamInfo<'h>>,
    pub ret: ReturnKind,
    pub eligibility: Eligibility,
}

impl<'h> FunctionInfo<'h> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn out_params(&self) -> impl Iterator<Item = &ParamInfo<'h>> {
        self.params.iter().filter(|p| p.is_out)
    }

    pub fn has_out_params(&self) -> bool {
        self.params.iter().any(|p| p.is_out)
    }

    /// The function gets `ll_` and class-aware wrappers.
    pub fn is_wrapped(&self) -> bool {
        !self.def.variadic && !self.excluded_for(Exclusion::Omitted)
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        match &self.eligibility {
            Eligibility::Excluded(reasons) => reasons,
            _ => &[],
        }
    }

    fn excluded_for(&self, reason: Exclusion) -> bool {
        self.exclusions().contains(&reason)
    }
}

/// Function-name stems (after the library prefix) whose results carry a
/// new reference.
pub const KEPT_PREFIXES: &[&str] = &[
    "new_",
    "create_",
    "find_",
    "load_",
    "open_",
    "keep_",
    "read_",
    "add_",
    "parse_",
    "graft_",
    "copy_",
    "deep_copy_",
];

/// Whether a pointer returned by `fn_name` is a new reference owned by the
/// caller. Manual lists take precedence over the prefix table.
pub fn returns_new_reference(
    fn_name: &str,
    prefixes: &[String],
    kept: &[String],
    borrowed: &[String],
) -> bool {
    let decision = if kept.iter().any(|f| f == fn_name) {
        (true, "config")
    } else if borrowed.iter().any(|f| f == fn_name) {
        (false, "config")
    } else {
        let stem = rename::unprefixed(fn_name, prefixes);
        (KEPT_PREFIXES.iter().any(|p| stem.starts_with(p)), "prefix")
    };
    debug!(
        function = fn_name,
        kept = decision.0,
        source = decision.1,
        "return ownership"
    );
    decision.0
}

impl<'h> GenContext<'h> {
    /// Classify a function. The first call for a name computes the result;
    /// later calls return the cached value.
    pub fn classify(&self, f: &'h FunctionDef) -> Rc<FunctionInfo<'h>> {
        if let Some(info) = self.classified.borrow().get(f.name.as_str()) {
            return Rc::clone(info);
        }
        let info = Rc::new(self.classify_uncached(f));
        self.classified
            .borrow_mut()
            .insert(f.name.as_str(), Rc::clone(&info));
        info
    }

    fn classify_uncached(&self, f: &'h FunctionDef) -> FunctionInfo<'h> {
        let first_is_context = f.params.first().is_some_and(|p| self.is_context_ptr(&p.ty));
        let keeps_context =
            first_is_context && self.config.functions.keep_context.contains(&f.name);
        let has_context = first_is_context && !keeps_context;
        let skip = usize::from(has_context);
        let params: Vec<ParamInfo<'h>> = f
            .params
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(i, p)| self.classify_param(f, i, p))
            .collect();
        let ret = self.return_kind(f);
        let mut info = FunctionInfo {
            def: f,
            has_context,
            keeps_context,
            params,
            ret,
            eligibility: Eligibility::Excluded(Vec::new()),
        };
        info.eligibility = self.eligibility(&info);
        debug!(function = %f.name, eligibility = ?info.eligibility, "classified");
        info
    }

    fn is_context_ptr(&self, ty: &CType) -> bool {
        ty.pointee()
            .and_then(|(t, _)| t.record_name())
            .is_some_and(|n| n == self.config.naming.context_type)
    }

    fn alt(&self, struct_name: &str, passing: AltPassing) -> Option<Alt> {
        let spec = self.registry.wrapper_class(struct_name, &self.index)?;
        Some(Alt {
            struct_name: struct_name.to_string(),
            class_name: rename::class_name(struct_name),
            passing,
            pod: spec.pod,
        })
    }

    fn classify_param(&self, f: &FunctionDef, i: usize, p: &'h ParamDef) -> ParamInfo<'h> {
        let name = if p.name.is_empty() {
            format!("arg_{i}")
        } else {
            rename::cpp_ident(&p.name)
        };
        let (is_out, alt) = self.param_passing(&f.name, &p.ty);
        ParamInfo {
            def: p,
            name,
            is_out,
            alt,
        }
    }

    fn param_passing(&self, fn_name: &str, ty: &CType) -> (bool, Option<Alt>) {
        if let Some(s) = ty.record_name() {
            return (false, self.alt(s, AltPassing::Value));
        }
        let Some((pointee, pointee_const)) = ty.pointee() else {
            return (false, None);
        };
        if let Some(s) = pointee.record_name() {
            if let Some(alt) = self.alt(s, AltPassing::Pointer { is_const: pointee_const }) {
                return (false, Some(alt));
            }
            // Incomplete structs cannot be held by value in an out-param.
            let complete = self.index.struct_def(s).is_some_and(|d| d.complete);
            return (!pointee_const && complete, None);
        }
        if let Some((inner, _)) = pointee.pointee() {
            if let Some(s) = inner.record_name()
                && let Some(alt) = self.alt(s, AltPassing::DoublePointer)
            {
                return (true, Some(alt));
            }
            if inner.is_char() || inner.is_void() || inner.is_file() {
                return (!self.argv_functions.contains(fn_name), None);
            }
        }
        if pointee.is_char() || pointee.is_void() || pointee.is_file() {
            return (false, None);
        }
        (!pointee_const && !pointee.is_fn(), None)
    }

    /// The struct named by a return type: `S*` gives `(S, false)`, `S`
    /// gives `(S, true)`.
    fn returned_struct<'t>(&self, ty: &'t CType) -> Option<(&'t str, bool)> {
        if let Some(s) = ty.record_name() {
            return Some((s, true));
        }
        let (pointee, _) = ty.pointee()?;
        pointee.record_name().map(|s| (s, false))
    }

    pub fn return_kind(&self, f: &FunctionDef) -> ReturnKind {
        if f.return_type.is_void() {
            return ReturnKind::Void;
        }
        let Some((s, by_value)) = self.returned_struct(&f.return_type) else {
            return ReturnKind::Plain;
        };
        let Some(spec) = self.registry.wrapper_class(s, &self.index) else {
            return ReturnKind::Plain;
        };
        let class_name = rename::class_name(s);
        match (by_value, spec.pod) {
            (true, pod) if pod.is_value() => ReturnKind::WrappedPod {
                struct_name: s.to_string(),
                class_name,
            },
            (false, Pod::None) if spec.constructor_raw => ReturnKind::Wrapped {
                struct_name: s.to_string(),
                class_name,
                keep: None,
            },
            (false, Pod::No) if spec.constructor_raw => {
                let naming = &self.config.naming;
                let functions = &self.config.functions;
                if returns_new_reference(
                    &f.name,
                    &naming.prefixes,
                    &functions.returns_kept,
                    &functions.returns_borrowed,
                ) {
                    return ReturnKind::Wrapped {
                        struct_name: s.to_string(),
                        class_name,
                        keep: None,
                    };
                }
                match self.index.keep_function(s) {
                    Some(keep) => ReturnKind::Wrapped {
                        struct_name: s.to_string(),
                        class_name,
                        keep: Some(keep.name.clone()),
                    },
                    None => {
                        debug!(function = %f.name, "borrowed reference without keep function, returned raw");
                        ReturnKind::Plain
                    }
                }
            }
            _ => ReturnKind::Plain,
        }
    }

    fn eligibility(&self, info: &FunctionInfo<'h>) -> Eligibility {
        let f = info.def;
        if self.is_omitted(&f.name) {
            return Eligibility::Excluded(vec![Exclusion::Omitted]);
        }
        if f.variadic {
            return Eligibility::Excluded(vec![Exclusion::Variadic]);
        }
        if let Some(struct_name) = self.constructor_target(info) {
            return Eligibility::Constructor { struct_name };
        }

        let mut reasons = Vec::new();
        let mut target = None;
        match info.params.first() {
            Some(p) if !p.is_out && p.alt.is_some() => {
                target = p.alt.as_ref().map(|a| a.struct_name.clone());
            }
            Some(p) if p.ty().is_enum() => reasons.push(Exclusion::IsEnum),
            Some(p) if self.names_unwrapped_struct(p.ty()) => {
                reasons.push(Exclusion::NoWrapperClassForArgument)
            }
            _ => reasons.push(Exclusion::FirstArgNotStruct),
        }
        if let Some((s, _)) = self.returned_struct(&f.return_type) {
            match self.registry.wrapper_class(s, &self.index) {
                None => reasons.push(Exclusion::NoExtrasForReturnType),
                Some(spec) if !spec.constructor_raw => {
                    reasons.push(Exclusion::ReturnTypeNoRawConstructor)
                }
                Some(spec) if !spec.is_copyable() => reasons.push(Exclusion::ReturnTypeNotCopyable),
                Some(_) => {}
            }
        }
        match target {
            Some(struct_name) if reasons.is_empty() => Eligibility::Method { struct_name },
            _ => Eligibility::Excluded(reasons),
        }
    }

    fn names_unwrapped_struct(&self, ty: &CType) -> bool {
        let s = ty
            .record_name()
            .or_else(|| ty.pointee().and_then(|(t, _)| t.record_name()));
        s.is_some_and(|s| self.registry.wrapper_class(s, &self.index).is_none())
    }

    fn constructor_target(&self, info: &FunctionInfo<'h>) -> Option<String> {
        if info.has_out_params() {
            return None;
        }
        let f = info.def;
        let (s, by_value) = self.returned_struct(&f.return_type)?;
        let spec = self.registry.wrapper_class(s, &self.index)?;
        if by_value != spec.pod.is_value() {
            return None;
        }
        if spec.constructor_excludes.iter().any(|e| *e == f.name) {
            return None;
        }
        if !spec.constructor_prefixes().any(|p| f.name.starts_with(p)) {
            return None;
        }
        // A borrowed result without a keep function cannot be owned.
        if !matches!(
            info.ret,
            ReturnKind::Wrapped { .. } | ReturnKind::WrappedPod { .. }
        ) {
            return None;
        }
        Some(s.to_string())
    }
}

/// Outcome of duplicate-signature resolution for one class.
#[derive(Debug, Default)]
pub struct ConstructorPlan<'h> {
    pub constructors: Vec<Rc<FunctionInfo<'h>>>,
    pub factories: Vec<Rc<FunctionInfo<'h>>>,
    pub dropped: Vec<Rc<FunctionInfo<'h>>>,
}

/// Resolve constructor candidates whose C++ parameter lists collide.
///
/// `seeded` holds the signatures of constructors that exist regardless of
/// the candidates (raw, copy, extra). `signature` renders a candidate's
/// parameter list with names removed. Candidates are taken in alphabetical
/// order; a later duplicate becomes a static factory when the class is
/// copyable and is dropped otherwise.
pub fn resolve_constructors<'h>(
    mut candidates: Vec<Rc<FunctionInfo<'h>>>,
    seeded: impl IntoIterator<Item = String>,
    copyable: bool,
    signature: impl Fn(&FunctionInfo<'h>) -> String,
) -> ConstructorPlan<'h> {
    candidates.sort_by(|a, b| a.name().cmp(b.name()));
    let mut seen: BTreeSet<String> = seeded.into_iter().collect();
    let mut plan = ConstructorPlan::default();
    for info in candidates {
        let sig = signature(&info);
        if seen.insert(sig.clone()) {
            plan.constructors.push(info);
        } else if copyable {
            debug!(function = info.name(), signature = %sig, "duplicate constructor, using static factory");
            plan.factories.push(info);
        } else {
            debug!(function = info.name(), signature = %sig, "duplicate constructor dropped");
            plan.dropped.push(info);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassSpec;
    use crate::config::Config;
    use crate::model::*;

    fn ctx_param() -> ParamDef {
        ParamDef::new("ctx", CType::ptr(CType::struct_typedef("fz_context")))
    }

    fn widget_ptr() -> CType {
        CType::ptr(CType::struct_typedef("fz_widget"))
    }

    fn headers() -> HeaderSet {
        HeaderSet {
            structs: vec![
                StructDef::opaque("fz_context"),
                StructDef::new("fz_widget", vec![FieldDef::new("refs", CType::Int)]),
                StructDef::opaque("fz_gadget"),
                StructDef::new(
                    "fz_point",
                    vec![
                        FieldDef::new("x", CType::Float),
                        FieldDef::new("y", CType::Float),
                    ],
                ),
            ],
            functions: vec![
                FunctionDef::new("fz_new_widget", widget_ptr(), vec![ctx_param()]),
                FunctionDef::new("fz_current_widget", widget_ptr(), vec![ctx_param()]),
                FunctionDef::new(
                    "fz_keep_widget",
                    widget_ptr(),
                    vec![ctx_param(), ParamDef::new("w", widget_ptr())],
                ),
                FunctionDef::new(
                    "fz_drop_widget",
                    CType::Void,
                    vec![ctx_param(), ParamDef::new("w", widget_ptr())],
                ),
                FunctionDef::new(
                    "fz_widget_size",
                    CType::Int,
                    vec![
                        ctx_param(),
                        ParamDef::new("w", widget_ptr()),
                        ParamDef::new("out_h", CType::ptr(CType::Int)),
                    ],
                ),
                FunctionDef::new(
                    "fz_printf",
                    CType::Void,
                    vec![
                        ctx_param(),
                        ParamDef::new("fmt", CType::const_ptr(CType::Char)),
                    ],
                )
                .variadic(),
                FunctionDef::new(
                    "fz_gadget_count",
                    CType::Int,
                    vec![ctx_param(), ParamDef::new("g", CType::ptr(CType::struct_typedef("fz_gadget")))],
                ),
                FunctionDef::new(
                    "fz_make_point",
                    CType::struct_typedef("fz_point"),
                    vec![ParamDef::new("x", CType::Float), ParamDef::new("y", CType::Float)],
                ),
                FunctionDef::new(
                    "fz_split",
                    CType::Int,
                    vec![
                        ctx_param(),
                        ParamDef::new("text", CType::const_ptr(CType::Char)),
                        ParamDef::new("parts", CType::ptr(CType::ptr(CType::Char))),
                    ],
                ),
                FunctionDef::new(
                    "pdf_clean_file",
                    CType::Void,
                    vec![
                        ctx_param(),
                        ParamDef::new("argv", CType::ptr(CType::ptr(CType::Char))),
                    ],
                ),
                FunctionDef::new(
                    "fz_lookup_kind",
                    CType::Int,
                    vec![
                        ctx_param(),
                        ParamDef::new("kind", CType::Enum { name: "fz_kind".to_string() }),
                    ],
                ),
                FunctionDef::new(
                    "fz_widget_gadget",
                    CType::ptr(CType::struct_typedef("fz_gadget")),
                    vec![ctx_param(), ParamDef::new("w", widget_ptr())],
                ),
            ],
            ..Default::default()
        }
    }

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.class.insert(
            "fz_point".to_string(),
            ClassSpec {
                pod: Pod::Inline,
                copyable: crate::classes::Copyable::Default,
                constructor_prefixes: vec!["fz_make_point".to_string()],
                ..Default::default()
            },
        );
        cfg.class.insert(
            "fz_gadget".to_string(),
            ClassSpec {
                opaque: true,
                ..Default::default()
            },
        );
        cfg
    }

    fn classify_named<'h>(ctx: &GenContext<'h>, name: &str) -> Rc<FunctionInfo<'h>> {
        ctx.classify(ctx.index.function(name).unwrap())
    }

    #[test]
    fn constructor_and_kept_return() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_new_widget");
        assert!(info.has_context);
        assert!(info.params.is_empty());
        assert_eq!(
            info.eligibility,
            Eligibility::Constructor {
                struct_name: "fz_widget".to_string()
            }
        );
        assert!(matches!(info.ret, ReturnKind::Wrapped { keep: None, .. }));
    }

    #[test]
    fn borrowed_return_is_kept() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_current_widget");
        assert_eq!(
            info.ret,
            ReturnKind::Wrapped {
                struct_name: "fz_widget".to_string(),
                class_name: "FzWidget".to_string(),
                keep: Some("fz_keep_widget".to_string()),
            }
        );
        // Not a constructor prefix, and no struct first argument.
        assert_eq!(
            info.eligibility,
            Eligibility::Excluded(vec![Exclusion::FirstArgNotStruct])
        );
    }

    #[test]
    fn method_with_out_param() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_widget_size");
        assert_eq!(
            info.eligibility,
            Eligibility::Method {
                struct_name: "fz_widget".to_string()
            }
        );
        let alt = info.params[0].alt.as_ref().unwrap();
        assert_eq!(alt.class_name, "FzWidget");
        assert_eq!(alt.passing, AltPassing::Pointer { is_const: false });
        assert!(info.params[1].is_out);
        assert_eq!(info.params[1].out_type(), Some(&CType::Int));
    }

    #[test]
    fn variadic_and_omitted() {
        let (mut cfg, h) = (config(), headers());
        cfg.functions.omit.push("fz_widget_size".to_string());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_printf");
        assert_eq!(info.exclusions(), [Exclusion::Variadic]);
        assert!(!info.is_wrapped());
        let info = classify_named(&ctx, "fz_widget_size");
        assert_eq!(info.exclusions(), [Exclusion::Omitted]);
        assert!(!info.is_wrapped());
    }

    #[test]
    fn unwrapped_struct_and_enum_arguments() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_gadget_count");
        assert_eq!(info.exclusions(), [Exclusion::NoWrapperClassForArgument]);
        // Pointer to an incomplete unwrapped struct stays plain.
        assert!(!info.params[0].is_out);
        let info = classify_named(&ctx, "fz_lookup_kind");
        assert_eq!(info.exclusions(), [Exclusion::IsEnum]);
        let info = classify_named(&ctx, "fz_widget_gadget");
        assert_eq!(info.exclusions(), [Exclusion::NoExtrasForReturnType]);
    }

    #[test]
    fn char_double_pointers() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let split = classify_named(&ctx, "fz_split");
        assert!(!split.params[0].is_out);
        assert!(split.params[1].is_out);
        let clean = classify_named(&ctx, "pdf_clean_file");
        assert!(!clean.params[0].is_out);
    }

    #[test]
    fn pod_constructor_by_value() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let info = classify_named(&ctx, "fz_make_point");
        assert!(!info.has_context);
        assert_eq!(
            info.eligibility,
            Eligibility::Constructor {
                struct_name: "fz_point".to_string()
            }
        );
        assert!(matches!(info.ret, ReturnKind::WrappedPod { .. }));
    }

    #[test]
    fn classification_is_cached() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let a = classify_named(&ctx, "fz_new_widget");
        let b = classify_named(&ctx, "fz_new_widget");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn classification_is_total() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        for f in &h.functions {
            let info = ctx.classify(f);
            match &info.eligibility {
                Eligibility::Constructor { .. } | Eligibility::Method { .. } => {}
                Eligibility::Excluded(reasons) => assert!(!reasons.is_empty(), "{}", f.name),
            }
        }
    }

    #[test]
    fn kept_prefix_table() {
        let p = vec!["fz_".to_string(), "pdf_".to_string()];
        assert!(returns_new_reference("fz_new_widget", &p, &[], &[]));
        assert!(returns_new_reference("pdf_load_page", &p, &[], &[]));
        assert!(returns_new_reference("fz_deep_copy_widget", &p, &[], &[]));
        assert!(!returns_new_reference("fz_current_widget", &p, &[], &[]));
        assert!(!returns_new_reference("fz_new_widget", &p, &[], &["fz_new_widget".to_string()]));
        assert!(returns_new_reference("fz_current_widget", &p, &["fz_current_widget".to_string()], &[]));
    }

    #[test]
    fn duplicate_constructors() {
        let (cfg, h) = (config(), headers());
        let ctx = GenContext::new(&cfg, &h).unwrap();
        let a = classify_named(&ctx, "fz_new_widget");
        let b = classify_named(&ctx, "fz_current_widget");
        let sig = |_: &FunctionInfo<'_>| String::new();

        let plan = resolve_constructors(vec![Rc::clone(&b), Rc::clone(&a)], [], true, sig);
        assert_eq!(plan.constructors[0].name(), "fz_current_widget");
        assert_eq!(plan.factories[0].name(), "fz_new_widget");

        let plan = resolve_constructors(vec![a, b], [String::new()], false, sig);
        assert!(plan.constructors.is_empty());
        assert_eq!(plan.dropped.len(), 2);
    }
}
