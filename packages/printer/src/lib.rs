pub mod ast_json;
pub mod printer;
pub mod runtime;
pub mod sourcemap;

#[cfg(test)]
mod tests;

pub use ast_json::{print_to_json, print_to_json_pretty, AstNode};
pub use printer::{print_to_js, PrintError, PrintResult};
pub use sourcemap::{LineIndex, SourcemapBuilder};
