//! Per-run generation state.
//!
//! One [`GenContext`] is created for each generation run and passed by
//! reference to the classifier and every emitter. Nothing is process-global,
//! so several runs can coexist in one process.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use anyhow::Result;

use crate::classes::ClassRegistry;
use crate::classify::FunctionInfo;
use crate::config::Config;
use crate::extras;
use crate::index::HeaderIndex;
use crate::model::HeaderSet;

/// Functions whose `char**` parameter is an argv-style list of input
/// strings rather than an out-param.
pub const ARGV_PARAM_FUNCTIONS: &[&str] = &["pdf_clean_file"];

pub struct GenContext<'h> {
    pub config: &'h Config,
    pub index: HeaderIndex<'h>,
    pub registry: ClassRegistry,
    pub(crate) argv_functions: HashSet<String>,
    pub(crate) classified: RefCell<BTreeMap<&'h str, Rc<FunctionInfo<'h>>>>,
}

impl<'h> GenContext<'h> {
    pub fn new(config: &'h Config, headers: &'h HeaderSet) -> Result<Self> {
        let index = HeaderIndex::new(headers, &config.naming.prefixes);
        let registry = ClassRegistry::new(
            extras::builtin(),
            &config.class,
            &config.naming.context_type,
        )?;
        let argv_functions = ARGV_PARAM_FUNCTIONS
            .iter()
            .map(|s| s.to_string())
            .chain(config.functions.argv_params.iter().cloned())
            .collect();
        Ok(GenContext {
            config,
            index,
            registry,
            argv_functions,
            classified: RefCell::new(BTreeMap::new()),
        })
    }

    /// The C++ namespace of the generated API.
    pub fn ns(&self) -> &str {
        &self.config.output.namespace
    }

    /// `ll_` name of a C function.
    pub fn ll_name(&self, fn_name: &str) -> String {
        crate::rename::ll_name(&self.config.naming.ll_prefix, fn_name)
    }

    /// Fully qualified `ll_` name, e.g. `mupdf::ll_fz_keep_document`.
    pub fn ll_path(&self, fn_name: &str) -> String {
        format!("{}::{}", self.ns(), self.ll_name(fn_name))
    }

    pub fn is_omitted(&self, fn_name: &str) -> bool {
        self.config.functions.omit.iter().any(|f| f == fn_name)
    }
}
