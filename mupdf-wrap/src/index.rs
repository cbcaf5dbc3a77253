//! Name-keyed lookups over a parsed [`HeaderSet`].
//!
//! The maps are built on first use with a single pass over the model and
//! then serve every later query. Function results come back sorted by name
//! so that generated files are stable from run to run.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{FunctionDef, GlobalDef, HeaderSet, StructDef};
use crate::rename;

pub struct HeaderIndex<'h> {
    headers: &'h HeaderSet,
    prefixes: Vec<String>,
    functions: OnceCell<BTreeMap<&'h str, &'h FunctionDef>>,
    structs: OnceCell<HashMap<&'h str, &'h StructDef>>,
}

impl<'h> HeaderIndex<'h> {
    /// `prefixes` are the library's naming prefixes (`fz_`, `pdf_`), used to
    /// derive `keep`/`drop` function names from struct names.
    pub fn new(headers: &'h HeaderSet, prefixes: &[String]) -> Self {
        HeaderIndex {
            headers,
            prefixes: prefixes.to_vec(),
            functions: OnceCell::new(),
            structs: OnceCell::new(),
        }
    }

    pub fn headers(&self) -> &'h HeaderSet {
        self.headers
    }

    fn function_map(&self) -> &BTreeMap<&'h str, &'h FunctionDef> {
        self.functions.get_or_init(|| {
            let mut map = BTreeMap::new();
            for f in &self.headers.functions {
                // First declaration wins; later ones are redeclarations.
                map.entry(f.name.as_str()).or_insert(f);
            }
            tracing::trace!(functions = map.len(), "built function index");
            map
        })
    }

    fn struct_map(&self) -> &HashMap<&'h str, &'h StructDef> {
        self.structs.get_or_init(|| {
            let mut map: HashMap<&'h str, &'h StructDef> = HashMap::new();
            for s in &self.headers.structs {
                // A full definition replaces an earlier forward declaration.
                match map.get(s.name.as_str()) {
                    Some(existing) if existing.complete || !s.complete => {}
                    _ => {
                        map.insert(s.name.as_str(), s);
                    }
                }
            }
            map
        })
    }

    /// All functions whose name starts with one of `prefixes`, sorted by name.
    pub fn functions_starting_with<'a, S: AsRef<str>>(
        &'a self,
        prefixes: &'a [S],
    ) -> impl Iterator<Item = &'h FunctionDef> + 'a {
        self.function_map()
            .iter()
            .filter(move |(name, _)| prefixes.iter().any(|p| name.starts_with(p.as_ref())))
            .map(|(_, f)| *f)
    }

    /// Point lookup. `None` is an ordinary answer.
    pub fn function(&self, name: &str) -> Option<&'h FunctionDef> {
        self.function_map().get(name).copied()
    }

    pub fn struct_def(&self, name: &str) -> Option<&'h StructDef> {
        self.struct_map().get(name).copied()
    }

    /// Struct names sorted alphabetically, each listed once.
    pub fn struct_names(&self) -> Vec<&'h str> {
        let mut names: Vec<&'h str> = self.struct_map().keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// The reference-increment function for a struct, e.g.
    /// `fz_keep_document` for `fz_document`.
    pub fn keep_function(&self, struct_name: &str) -> Option<&'h FunctionDef> {
        let name = rename::keep_fn(struct_name, &self.prefixes)?;
        self.function(&name)
    }

    /// The reference-decrement function for a struct, e.g.
    /// `fz_drop_document` for `fz_document`.
    pub fn drop_function(&self, struct_name: &str) -> Option<&'h FunctionDef> {
        let name = rename::drop_fn(struct_name, &self.prefixes)?;
        self.function(&name)
    }

    pub fn globals(&self) -> impl Iterator<Item = &'h GlobalDef> {
        self.headers.globals.iter()
    }

    /// Error-code constants (`FZ_ERROR_*`) from named enums and from
    /// constants, in declaration order. The zero "no error" code and
    /// `*_COUNT` sentinels are skipped.
    pub fn error_codes(&self, prefix: &str) -> Vec<(&'h str, i64)> {
        let mut seen = HashSet::new();
        let from_enums = self
            .headers
            .enums
            .iter()
            .flat_map(|e| e.variants.iter())
            .map(|v| (v.name.as_str(), Some(v.value)));
        let from_constants = self
            .headers
            .constants
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_i64()));
        from_enums
            .chain(from_constants)
            .filter(|(name, _)| name.starts_with(prefix) && !name.ends_with("_COUNT"))
            .filter_map(|(name, value)| Some((name, value?)))
            .filter(|(name, value)| *value != 0 && !name.ends_with("_NONE"))
            .filter(|(name, _)| seen.insert(*name))
            .collect()
    }
}
