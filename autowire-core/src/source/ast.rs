//! Syntax tree for the scanned source language.
//!
//! Only the declarations the extractors care about are materialized:
//! decorated classes (header, constructor, decorated methods) and
//! interface headers. Function bodies and everything else are skipped
//! during parsing.

use std::path::PathBuf;

use crate::keys;

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub rel_path: String,
    pub classes: Vec<ClassDecl>,
    pub interfaces: Vec<InterfaceDecl>,
}

/// A decorator application, e.g. `@Service()` or `@Qualifier("fast")`.
#[derive(Debug, Clone)]
pub struct Decorator {
    pub name: String,
    /// String-literal arguments, unquoted.
    pub args: Vec<String>,
    pub line: usize,
}

/// A class declaration header plus the members the analyzer needs.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub line: usize,
    pub is_abstract: bool,
    pub type_params: Vec<String>,
    pub extends: Option<TypeExpr>,
    pub implements: Vec<TypeExpr>,
    pub decorators: Vec<Decorator>,
    pub ctor_params: Vec<ParamDecl>,
    /// Decorated methods only (for `@Bean` discovery).
    pub methods: Vec<MethodDecl>,
}

/// An interface declaration header. The body is never needed; the name
/// and line are enough for location-qualified keys.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub line: usize,
    pub type_params: Vec<String>,
}

/// A constructor or method parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub line: usize,
    pub optional: bool,
    pub decorators: Vec<Decorator>,
    pub ty: Option<TypeExpr>,
}

/// A decorated method inside a class body.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub line: usize,
    pub decorators: Vec<Decorator>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeExpr>,
}

/// A type annotation: the literal text as written plus a structural view.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub raw: String,
    pub shape: TypeShape,
}

#[derive(Debug, Clone)]
pub enum TypeShape {
    /// `Name` or `Name<Args>` (dotted names allowed).
    Named { name: String, args: Vec<TypeExpr> },
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
    /// Inline object literal `{ ... }` (raw text kept, members not parsed).
    Object,
}

impl TypeExpr {
    /// Simple name of the outer type, when there is one.
    pub fn head_name(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Generic arguments of the outer type.
    pub fn args(&self) -> &[TypeExpr] {
        match &self.shape {
            TypeShape::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// Whether the outer type carries generic arguments.
    pub fn is_generic(&self) -> bool {
        !self.args().is_empty()
    }

    /// Canonical key for this annotation, routed by shape.
    pub fn canonical_key(&self) -> String {
        match &self.shape {
            TypeShape::Named { .. } => keys::sanitize(&self.raw),
            TypeShape::Array(elem) => keys::sanitize_array(&elem.raw),
            TypeShape::Union(members) => {
                let raws: Vec<&str> = members.iter().map(|m| m.raw.as_str()).collect();
                keys::sanitize_union(&raws)
            }
            TypeShape::Object => keys::sanitize_object(&self.raw),
        }
    }
}

impl ClassDecl {
    /// Find a decorator by exact (case-sensitive) name.
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorator(name).is_some()
    }
}

impl MethodDecl {
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorator(name).is_some()
    }
}
