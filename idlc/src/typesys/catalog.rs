//! Lookup of already existing types by name.
//!
//! Two backends share the [`TypeCatalog`] interface: [`BuildCatalog`] sees
//! the complete types of the assembly under construction (those committed by
//! earlier files of the same invocation), [`LibraryCatalog`] sees the runtime
//! library and every loaded reference.

use tracing::{trace, warn};

use super::{TypeId, TypeUniverse};

pub trait TypeCatalog {
    /// Find the type named `full_name`. When `repository_id` is given, only
    /// a candidate carrying exactly that repository id matches.
    fn lookup(&self, full_name: &str, repository_id: Option<&str>) -> Option<TypeId>;
}

/// Complete types of the output assembly.
pub struct BuildCatalog<'u> {
    universe: &'u TypeUniverse,
}

impl<'u> BuildCatalog<'u> {
    pub fn new(universe: &'u TypeUniverse) -> Self {
        Self { universe }
    }
}

impl TypeCatalog for BuildCatalog<'_> {
    fn lookup(&self, full_name: &str, _repository_id: Option<&str>) -> Option<TypeId> {
        let output = self.universe.output();
        let index = output.find(full_name)?;
        // Types still being built by the current file are not visible here.
        if !output.types[index as usize].is_created() {
            return None;
        }
        trace!(name = full_name, "found in build output");
        Some(TypeId::new(0, index))
    }
}

/// Types of referenced assemblies, searched in load order.
pub struct LibraryCatalog<'u> {
    universe: &'u TypeUniverse,
}

impl<'u> LibraryCatalog<'u> {
    pub fn new(universe: &'u TypeUniverse) -> Self {
        Self { universe }
    }
}

impl TypeCatalog for LibraryCatalog<'_> {
    fn lookup(&self, full_name: &str, repository_id: Option<&str>) -> Option<TypeId> {
        for (assembly_index, assembly) in self.universe.assemblies().iter().enumerate().skip(1) {
            let Some(index) = assembly.find(full_name) else {
                continue;
            };
            let candidate = &assembly.types[index as usize];
            match (repository_id, candidate.repository_id()) {
                (Some(expected), found) if found != Some(expected) => {
                    warn!(
                        name = full_name,
                        assembly = %assembly.name,
                        expected,
                        found = found.unwrap_or("<none>"),
                        "repository id mismatch, ignoring candidate type"
                    );
                }
                _ => {
                    trace!(name = full_name, assembly = %assembly.name, "found in reference");
                    return Some(TypeId::new(assembly_index as u32, index));
                }
            }
        }
        None
    }
}
