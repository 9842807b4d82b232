pub mod ast;
pub mod error;
pub mod hash;
pub mod parser;
pub mod tokenizer;

#[cfg(test)]
mod tests_comprehensive;

pub use ast::{
    is_component_name, is_custom_element_name, is_void_element, Attribute, AttributeKind,
    Document, Node, NodeId, NodeKind, Span,
};
pub use error::{ParseAnomaly, ParseError, ParseResult};
pub use hash::hash_from_source;
pub use parser::{parse, Parser};
pub use tokenizer::{tokenize, Token, Tokenizer};
