//! Assignment of scopes to modules of the output assembly.
//!
//! Every scope that holds top level types gets one module, named after the
//! target assembly and the scope's qualified path. The assignment survives
//! across the files of one invocation.

use std::collections::HashMap;

use tracing::debug;

use crate::symtab::{ScopeId, SymbolTable};
use crate::typesys::TypeUniverse;

/// Suffix of the target name that does not take part in module names.
const NETMODULE_SUFFIX: &str = ".netmodule";

#[derive(Debug)]
pub struct ModuleManager {
    target: String,
    by_path: HashMap<String, u32>,
}

impl ModuleManager {
    pub fn new(target: &str) -> Self {
        Self {
            target: target
                .strip_suffix(NETMODULE_SUFFIX)
                .unwrap_or(target)
                .to_string(),
            by_path: HashMap::new(),
        }
    }

    /// The module name for a scope path.
    ///
    /// `_` is doubled before `.` and `:` become `_`, so distinct paths never
    /// share a name.
    pub fn module_name(&self, scope_path: &str) -> String {
        if scope_path.is_empty() {
            return format!("_{}default", self.target);
        }
        let escaped: String = scope_path
            .replace('_', "__")
            .chars()
            .map(|c| if c == '.' || c == ':' { '_' } else { c })
            .collect();
        format!("_{}_{}", self.target, escaped)
    }

    /// The module for `scope`, created on first use.
    pub fn get_or_create(
        &mut self,
        universe: &mut TypeUniverse,
        table: &SymbolTable,
        scope: ScopeId,
    ) -> u32 {
        let path = table.fully_qualified_name(scope);
        if let Some(&index) = self.by_path.get(&path) {
            return index;
        }
        let name = self.module_name(&path);
        let index = universe.output_mut().define_module(&name);
        debug!(module = %name, "module assigned");
        self.by_path.insert(path, index);
        index
    }

    /// The module for `scope`, if one exists in the output assembly.
    pub fn get(&self, universe: &TypeUniverse, table: &SymbolTable, scope: ScopeId) -> Option<u32> {
        let path = table.fully_qualified_name(scope);
        self.by_path
            .get(&path)
            .copied()
            .or_else(|| universe.output().module_index(&self.module_name(&path)))
    }
}
