//! Source-file parsing: lexer, syntax tree, and the subset parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    ClassDecl, Decorator, InterfaceDecl, MethodDecl, ParamDecl, SourceFile, TypeExpr, TypeShape,
};
pub use parser::{parse_source, ParseError};
