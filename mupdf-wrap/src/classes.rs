//! Class extras: per-struct descriptions of the generated wrapper class.
//!
//! The registry starts from the built-in MuPDF table in [`crate::extras`],
//! lets `[class.<struct>]` tables from the config replace entries, and
//! synthesizes a permissive default for every other struct on first lookup.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::index::HeaderIndex;

/// Whether instances of the wrapper class can be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Copyable {
    /// Copies share the underlying struct through its `keep` function.
    #[default]
    Yes,
    No,
    /// Plain member-wise C++ copy; no reference counting.
    Default,
}

impl<'de> Deserialize<'de> for Copyable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BoolOrText::deserialize(deserializer)? {
            BoolOrText::Bool(true) => Ok(Copyable::Yes),
            BoolOrText::Bool(false) => Ok(Copyable::No),
            BoolOrText::Text(s) if s == "default" => Ok(Copyable::Default),
            BoolOrText::Text(s) => Err(D::Error::custom(format!(
                "invalid copyable `{s}`, expected a bool or \"default\""
            ))),
        }
    }
}

/// How the wrapper class holds the C struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pod {
    /// Owning pointer (`::fz_foo* m_internal`) released by `drop`.
    #[default]
    No,
    /// The struct by value (`::fz_foo m_internal`).
    Yes,
    /// The struct's fields copied into the class as members.
    Inline,
    /// Non-owning pointer to storage owned by something else.
    None,
}

impl Pod {
    pub fn is_value(self) -> bool {
        matches!(self, Pod::Yes | Pod::Inline)
    }
}

impl<'de> Deserialize<'de> for Pod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BoolOrText::deserialize(deserializer)? {
            BoolOrText::Bool(true) => Ok(Pod::Yes),
            BoolOrText::Bool(false) => Ok(Pod::No),
            BoolOrText::Text(s) if s == "inline" => Ok(Pod::Inline),
            BoolOrText::Text(s) if s == "none" => Ok(Pod::None),
            BoolOrText::Text(s) => Err(D::Error::custom(format!(
                "invalid pod `{s}`, expected a bool, \"inline\" or \"none\""
            ))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

/// A constructor that is not derived from a C function.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtraConstructor {
    /// One argument per listed field, assigned in order. POD classes only.
    Fields {
        fields: Vec<String>,
        #[serde(default)]
        comment: Option<String>,
    },
    /// No-argument constructor copying an `extern` global, e.g. `fz_identity`.
    DefaultFrom {
        global: String,
        #[serde(default)]
        comment: Option<String>,
    },
    /// Literal C++: `args` is the parameter list, `body` the statements.
    Snippet {
        args: String,
        body: String,
        #[serde(default)]
        comment: Option<String>,
    },
}

/// A hand-written method. `name_args` is e.g. `contains(double x, double y)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtraMethod {
    pub return_type: String,
    pub name_args: String,
    pub body: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ExtraMethod {
    pub fn new(return_type: &str, name_args: &str, body: &str) -> Self {
        ExtraMethod {
            return_type: return_type.to_string(),
            name_args: name_args.to_string(),
            body: body.to_string(),
            comment: None,
        }
    }

    /// Reject snippets that cannot be spliced into a class: `name_args`
    /// must look like `name(...)` and braces in `body` must balance.
    fn validate(&self, struct_name: &str) -> Result<()> {
        let open = self.name_args.find('(');
        if open.is_none_or(|i| i == 0) || !self.name_args.ends_with(')') {
            anyhow::bail!(
                "extra method `{}` of `{struct_name}`: expected `name(args)`",
                self.name_args
            );
        }
        let mut depth = 0i32;
        for c in self.body.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                break;
            }
        }
        if depth != 0 {
            anyhow::bail!(
                "extra method `{}` of `{struct_name}`: unbalanced braces in body",
                self.name_args
            );
        }
        Ok(())
    }
}

/// Iteration over a linked list reachable from the struct.
///
/// With `first = None` the struct itself is the first item (sibling lists
/// such as `fz_outline`); otherwise `first` names the field holding the
/// head. `next` is the link field of the item struct.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IteratorSpec {
    #[serde(default)]
    pub first: Option<String>,
    pub next: String,
}

/// Where a director finds its C++ object from the C struct pointer passed
/// to a callback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectorSelf {
    /// The wrapper pointer is stored directly after the C struct; `alloc`
    /// takes a byte size, e.g. `fz_new_device_of_size`.
    Trailing { alloc: String },
    /// The wrapper pointer is stored in a `void*` field; `alloc` takes no
    /// arguments.
    Field { field: String, alloc: String },
}

/// Expose the struct's function-pointer fields as virtual methods of a
/// `<Class>2` subclass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VirtualFnptrs {
    #[serde(rename = "self")]
    pub self_: DirectorSelf,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Description of one wrapper class.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassSpec {
    pub copyable: Copyable,
    pub pod: Pod,
    /// No wrapper class; functions taking the struct stay free functions.
    pub opaque: bool,
    /// Generate a getter for every field.
    pub accessors: bool,
    /// Generate the constructor taking a raw `::fz_foo*`.
    pub constructor_raw: bool,
    /// Function-name prefixes of constructors, in addition to `fz_new_`
    /// and `pdf_new_`.
    pub constructor_prefixes: Vec<String>,
    /// Functions never used as constructors.
    pub constructor_excludes: Vec<String>,
    pub constructors_extra: Vec<ExtraConstructor>,
    pub methods_extra: Vec<ExtraMethod>,
    pub iterator: Option<IteratorSpec>,
    pub virtual_fnptrs: Option<VirtualFnptrs>,
    /// Byte offset of the `int` reference count for structs that are opaque
    /// in the public headers.
    pub refs_offset: Option<usize>,
}

impl Default for ClassSpec {
    fn default() -> Self {
        ClassSpec {
            copyable: Copyable::Yes,
            pod: Pod::No,
            opaque: false,
            accessors: false,
            constructor_raw: true,
            constructor_prefixes: Vec::new(),
            constructor_excludes: Vec::new(),
            constructors_extra: Vec::new(),
            methods_extra: Vec::new(),
            iterator: None,
            virtual_fnptrs: None,
            refs_offset: None,
        }
    }
}

/// Constructor prefixes shared by every class.
pub const DEFAULT_CONSTRUCTOR_PREFIXES: &[&str] = &["fz_new_", "pdf_new_"];

impl ClassSpec {
    /// The class holds an owning pointer released by `drop`.
    pub fn is_owning(&self) -> bool {
        self.pod == Pod::No
    }

    pub fn is_copyable(&self) -> bool {
        self.copyable != Copyable::No
    }

    pub fn constructor_prefixes(&self) -> impl Iterator<Item = &str> {
        DEFAULT_CONSTRUCTOR_PREFIXES
            .iter()
            .copied()
            .chain(self.constructor_prefixes.iter().map(String::as_str))
    }
}

/// Registry of class extras for one generation run.
pub struct ClassRegistry {
    table: BTreeMap<String, ClassSpec>,
    context_type: String,
    cache: RefCell<BTreeMap<String, Rc<ClassSpec>>>,
}

impl ClassRegistry {
    /// Build from the built-in table and config overrides. A struct listed
    /// twice in `builtin` is an authoring error.
    pub fn new(
        builtin: Vec<(&str, ClassSpec)>,
        overrides: &BTreeMap<String, ClassSpec>,
        context_type: &str,
    ) -> Result<Self> {
        let mut table = BTreeMap::new();
        for (name, spec) in builtin {
            if table.insert(name.to_string(), spec).is_some() {
                anyhow::bail!("duplicate class extras entry for `{name}`");
            }
        }
        for (name, spec) in overrides {
            debug!(name = %name, "class extras from config");
            table.insert(name.clone(), spec.clone());
        }
        for (name, spec) in &table {
            for m in &spec.methods_extra {
                m.validate(name)?;
            }
        }
        Ok(ClassRegistry {
            table,
            context_type: context_type.to_string(),
            cache: RefCell::new(BTreeMap::new()),
        })
    }

    /// The spec for a struct. Structs without an entry get the default
    /// spec. The result is cached for the rest of the run.
    pub fn lookup(&self, struct_name: &str, index: &HeaderIndex) -> Rc<ClassSpec> {
        let name = struct_name.strip_prefix("struct ").unwrap_or(struct_name);
        if let Some(spec) = self.cache.borrow().get(name) {
            return Rc::clone(spec);
        }
        let mut spec = self.table.get(name).cloned().unwrap_or_default();
        if spec.pod == Pod::No
            && spec.copyable == Copyable::Yes
            && index.keep_function(name).is_none()
        {
            debug!(name, "no keep function, class is not copyable");
            spec.copyable = Copyable::No;
        }
        let spec = Rc::new(spec);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&spec));
        spec
    }

    /// The spec of the wrapper class for a struct, or `None` when the struct
    /// gets no wrapper class (unknown to the headers, opaque in the
    /// registry, or the context type).
    pub fn wrapper_class(&self, struct_name: &str, index: &HeaderIndex) -> Option<Rc<ClassSpec>> {
        let name = struct_name.strip_prefix("struct ").unwrap_or(struct_name);
        if name == self.context_type {
            return None;
        }
        index.struct_def(name)?;
        let spec = self.lookup(name, index);
        (!spec.opaque).then_some(spec)
    }

    /// Names with an explicit entry, for diagnostics.
    pub fn configured(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}
