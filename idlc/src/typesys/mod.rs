//! In-memory model of the emitted type system.
//!
//! Generated declarations are collected in an [`Assembly`] made of named
//! [`Module`]s. The assembly under construction lives in a [`TypeUniverse`]
//! together with the assemblies it may refer to: the built-in runtime
//! library and any previously compiled artifacts loaded as references.
//!
//! A type is addressed by a [`TypeId`]: the index of its assembly in the
//! universe plus its index inside that assembly. When an assembly is written
//! to disk, assembly index `0` denotes the assembly itself and index `i > 0`
//! denotes `references[i - 1]`. The output assembly is always universe index
//! `0` and its reference list mirrors the rest of the universe, so its ids
//! are stored unchanged; loaded artifacts are re-bound by assembly name.

pub mod catalog;
pub mod runtime;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use catalog::{BuildCatalog, LibraryCatalog, TypeCatalog};
pub use runtime::RuntimeType;

/// File extension of persisted assemblies.
pub const ARTIFACT_EXTENSION: &str = "idlasm.json";

/// Errors raised by the type system model.
#[derive(Debug, Error)]
pub enum TypeSysError {
    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` is not a valid assembly: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("assembly `{name}` is loaded twice")]
    DuplicateAssembly { name: String },

    #[error("assembly `{assembly}` depends on `{reference}`, which is not loaded")]
    MissingReference { assembly: String, reference: String },

    #[error("a type named `{name}` already exists")]
    DuplicateType { name: String },

    #[error("type `{name}` is already created")]
    AlreadyCreated { name: String },

    #[error("type `{name}` belongs to a referenced assembly and can not be changed")]
    NotInOutput { name: String },
}

/// Identifies a type in a [`TypeUniverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId {
    pub assembly: u32,
    pub index: u32,
}

impl TypeId {
    pub fn new(assembly: u32, index: u32) -> Self {
        Self { assembly, index }
    }
}

/// Built-in scalar types of the target type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Char,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    String,
    Object,
    MarshalByRefObject,
}

/// A reference to a type as used by fields, parameters and properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Void,
    Primitive(Primitive),
    Named(TypeId),
    Array(Box<TypeRef>),
    ByRef(Box<TypeRef>),
}

impl TypeRef {
    fn remap(&mut self, map: &impl Fn(TypeId) -> TypeId) {
        match self {
            TypeRef::Named(id) => *id = map(*id),
            TypeRef::Array(inner) | TypeRef::ByRef(inner) => inner.remap(map),
            TypeRef::Void | TypeRef::Primitive(_) => {}
        }
    }
}

/// The IDL flavour of a generated interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceType {
    Concrete,
    Abstract,
    Local,
    AbstractValue,
}

/// What an `Object`-typed slot stands for in IDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectIdlType {
    Any,
    ValueBase,
}

/// Custom attributes attached to types and members, carrying the IDL
/// information the target type alone can not express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    RepositoryId(String),
    InterfaceType(InterfaceType),
    WideChar(bool),
    StringValue,
    /// Marks an array as an IDL sequence. Nested sequences carry one marker
    /// per level; the outermost level has the highest order.
    IdlSequence(u32),
    ObjectIdlType(ObjectIdlType),
    IdlStruct,
    IdlEnum,
    ImplClass(String),
    Serializable,
    /// Marks an unboxed slot; holds the repository id of the box.
    BoxedValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Interface,
    Class,
    Struct,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Lifecycle of a type in the output assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeState {
    /// Still being built; members may be added.
    Building,
    /// Finalized.
    Created,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_literal: bool,
    pub constant: Option<i64>,
    pub attributes: Vec<Attribute>,
}

impl FieldDef {
    /// A public instance field.
    pub fn public(name: impl Into<String>, ty: TypeRef, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
            is_literal: false,
            constant: None,
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub ty: TypeRef,
    pub is_out: bool,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// Unnamed; carries the return type and its attributes.
    pub return_param: ParamDef,
    pub params: Vec<ParamDef>,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_special_name: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeRef,
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub attributes: Vec<Attribute>,
}

/// The representation a boxed value type unboxes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxedType {
    pub ty: TypeRef,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub full_name: String,
    pub kind: TypeKind,
    /// Index of the module holding the type.
    pub module: u32,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub parent: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub declaring_type: Option<TypeId>,
    pub attributes: Vec<Attribute>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub boxed: Option<BoxedType>,
    pub state: TypeState,
}

impl TypeDef {
    pub fn new(full_name: impl Into<String>, kind: TypeKind, module: u32) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
            module,
            is_abstract: false,
            is_sealed: false,
            parent: None,
            interfaces: Vec::new(),
            declaring_type: None,
            attributes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            boxed: None,
            state: TypeState::Building,
        }
    }

    pub fn is_created(&self) -> bool {
        self.state == TypeState::Created
    }

    pub fn repository_id(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::RepositoryId(id) => Some(id.as_str()),
            _ => None,
        })
    }

    pub fn interface_type(&self) -> Option<InterfaceType> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::InterfaceType(kind) => Some(*kind),
            _ => None,
        })
    }

    pub fn is_abstract_value(&self) -> bool {
        self.interface_type() == Some(InterfaceType::AbstractValue)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn remap(&mut self, map: &impl Fn(TypeId) -> TypeId) {
        for id in self
            .parent
            .iter_mut()
            .chain(self.declaring_type.iter_mut())
            .chain(self.interfaces.iter_mut())
        {
            *id = map(*id);
        }
        for field in &mut self.fields {
            field.ty.remap(map);
        }
        for method in &mut self.methods {
            method.return_param.ty.remap(map);
            for param in &mut method.params {
                param.ty.remap(map);
            }
        }
        for property in &mut self.properties {
            property.ty.remap(map);
        }
        if let Some(boxed) = &mut self.boxed {
            boxed.ty.remap(map);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Indices of the module's types in the assembly.
    pub types: Vec<u32>,
}

/// A unit of emitted types, persisted as one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub name: String,
    pub references: Vec<String>,
    pub modules: Vec<Module>,
    pub types: Vec<TypeDef>,
    #[serde(skip)]
    by_name: HashMap<String, u32>,
}

impl Assembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: Vec::new(),
            modules: Vec::new(),
            types: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn rebuild_index(&mut self) {
        self.by_name = self
            .types
            .iter()
            .enumerate()
            .map(|(index, ty)| (ty.full_name.clone(), index as u32))
            .collect();
    }

    /// Index of the type named `full_name`.
    pub fn find(&self, full_name: &str) -> Option<u32> {
        self.by_name.get(full_name).copied()
    }

    pub fn module_index(&self, name: &str) -> Option<u32> {
        self.modules
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u32)
    }

    /// Get or create the module `name`.
    pub fn define_module(&mut self, name: &str) -> u32 {
        if let Some(index) = self.module_index(name) {
            return index;
        }
        self.modules.push(Module {
            name: name.to_string(),
            types: Vec::new(),
        });
        (self.modules.len() - 1) as u32
    }

    fn push_type(&mut self, def: TypeDef) -> Result<u32, TypeSysError> {
        if self.by_name.contains_key(&def.full_name) {
            return Err(TypeSysError::DuplicateType {
                name: def.full_name,
            });
        }
        let index = self.types.len() as u32;
        self.by_name.insert(def.full_name.clone(), index);
        if let Some(module) = self.modules.get_mut(def.module as usize) {
            module.types.push(index);
        }
        self.types.push(def);
        Ok(index)
    }

    /// Read an assembly written by [`TypeUniverse::save`].
    pub fn load(path: &Path) -> Result<Self, TypeSysError> {
        let text = fs::read_to_string(path).map_err(|source| TypeSysError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut assembly: Assembly =
            serde_json::from_str(&text).map_err(|source| TypeSysError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        assembly.rebuild_index();
        Ok(assembly)
    }
}

/// The output assembly plus everything it can refer to.
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    assemblies: Vec<Assembly>,
}

impl TypeUniverse {
    /// Create a universe with an empty output assembly named `target` and
    /// the runtime library.
    pub fn new(target: &str) -> Self {
        let mut output = Assembly::new(target);
        let library = runtime::library();
        output.references.push(library.name.clone());
        Self {
            assemblies: vec![output, library],
        }
    }

    pub fn output(&self) -> &Assembly {
        &self.assemblies[0]
    }

    pub fn output_mut(&mut self) -> &mut Assembly {
        &mut self.assemblies[0]
    }

    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    pub fn assembly_index(&self, name: &str) -> Option<u32> {
        self.assemblies
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u32)
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.assemblies
            .get(id.assembly as usize)?
            .types
            .get(id.index as usize)
    }

    /// Name of a type for messages.
    pub fn type_name(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(ty) => ty.full_name.clone(),
            None => format!("<unknown type {}:{}>", id.assembly, id.index),
        }
    }

    /// Mutable access to a type of the output assembly that is still being
    /// built.
    pub fn type_mut(&mut self, id: TypeId) -> Result<&mut TypeDef, TypeSysError> {
        let name = self.type_name(id);
        if id.assembly != 0 {
            return Err(TypeSysError::NotInOutput { name });
        }
        match self.assemblies[0].types.get_mut(id.index as usize) {
            Some(ty) if ty.state == TypeState::Building => Ok(ty),
            Some(_) => Err(TypeSysError::AlreadyCreated { name }),
            None => Err(TypeSysError::NotInOutput { name }),
        }
    }

    /// Define a new top level type in `module` of the output assembly.
    pub fn define_type(
        &mut self,
        module: u32,
        full_name: &str,
        kind: TypeKind,
    ) -> Result<TypeId, TypeSysError> {
        let index = self
            .output_mut()
            .push_type(TypeDef::new(full_name, kind, module))?;
        debug!(name = full_name, ?kind, "defined type");
        Ok(TypeId::new(0, index))
    }

    /// Define a type nested in `container`; it shares the container's module.
    pub fn define_nested_type(
        &mut self,
        container: TypeId,
        full_name: &str,
        kind: TypeKind,
    ) -> Result<TypeId, TypeSysError> {
        let module = self.type_mut(container)?.module;
        let mut def = TypeDef::new(full_name, kind, module);
        def.declaring_type = Some(container);
        let index = self.output_mut().push_type(def)?;
        debug!(name = full_name, ?kind, "defined nested type");
        Ok(TypeId::new(0, index))
    }

    /// Finalize a type; it can not be changed afterwards.
    pub fn create_type(&mut self, id: TypeId) -> Result<(), TypeSysError> {
        self.type_mut(id)?.state = TypeState::Created;
        Ok(())
    }

    /// Interfaces implemented by `id`, including the ones inherited through
    /// other interfaces, in first-seen order.
    pub fn all_interfaces(&self, id: TypeId) -> Vec<TypeId> {
        let mut seen = Vec::new();
        let mut pending: Vec<TypeId> = match self.get(id) {
            Some(ty) => ty.interfaces.iter().rev().copied().collect(),
            None => Vec::new(),
        };
        while let Some(next) = pending.pop() {
            if seen.contains(&next) {
                continue;
            }
            seen.push(next);
            if let Some(ty) = self.get(next) {
                pending.extend(ty.interfaces.iter().rev().copied());
            }
        }
        seen
    }

    /// Add a referenced assembly, re-binding its type ids to this universe.
    pub fn add_reference(&mut self, mut assembly: Assembly) -> Result<u32, TypeSysError> {
        if self.assembly_index(&assembly.name).is_some() {
            return Err(TypeSysError::DuplicateAssembly {
                name: assembly.name,
            });
        }
        let own_index = self.assemblies.len() as u32;
        let mut mapping = vec![own_index];
        for reference in &assembly.references {
            match self.assembly_index(reference) {
                Some(index) => mapping.push(index),
                None => {
                    return Err(TypeSysError::MissingReference {
                        assembly: assembly.name.clone(),
                        reference: reference.clone(),
                    })
                }
            }
        }
        // Ids outside the reference list stay unresolvable.
        let map = |id: TypeId| {
            let assembly = mapping.get(id.assembly as usize).copied();
            TypeId::new(assembly.unwrap_or(u32::MAX), id.index)
        };
        for ty in &mut assembly.types {
            ty.remap(&map);
        }
        assembly.rebuild_index();
        debug!(name = %assembly.name, types = assembly.types.len(), "loaded reference");
        let name = assembly.name.clone();
        self.assemblies.push(assembly);
        self.output_mut().references.push(name);
        Ok(own_index)
    }

    /// Load a persisted assembly from `path` as a reference.
    pub fn load_reference(&mut self, path: &Path) -> Result<u32, TypeSysError> {
        let assembly = Assembly::load(path)?;
        self.add_reference(assembly)
    }

    /// Path the output assembly is written to inside `dir`.
    pub fn artifact_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{}", self.output().name, ARTIFACT_EXTENSION))
    }

    /// Write the output assembly as pretty JSON into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, TypeSysError> {
        let path = self.artifact_path(dir);
        let json = serde_json::to_string_pretty(self.output()).map_err(|source| {
            TypeSysError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::create_dir_all(dir).map_err(|source| TypeSysError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| TypeSysError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "assembly written");
        Ok(path)
    }
}
