//! Compile a component-file source to a self-contained JavaScript module.
//!
//! This crate is the thin facade over the pipeline: parse → transform →
//! print. Callers hand in one UTF-8 source string plus [`TransformOptions`]
//! and get back the emitted module, the raw sourcemap chunk, and the compile
//! metadata. Compiles share nothing; run as many in parallel as you like.

use astro_parser::{parse, ParseAnomaly, ParseError};
use astro_printer::{print_to_js, PrintError};
use astro_transform::{transform, Metadata, TransformWarning};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

pub use astro_parser::hash_from_source;
pub use astro_transform::TransformOptions;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Print(#[from] PrintError),
}

/// Result of one compile.
#[derive(Debug, Serialize)]
pub struct TransformResult {
    /// The emitted module
    pub output: String,
    /// Raw VLQ `mappings` chunk for the sourcemap
    pub source_map_chunk: String,
    /// Modules, hydrated components, client-only components, hydration
    /// directives, hoisted scripts
    pub metadata: Metadata,
    /// Non-fatal transform findings
    pub warnings: Vec<TransformWarning>,
    /// Recoverable parse anomalies
    pub anomalies: Vec<ParseAnomaly>,
}

/// Compile one document. Fatal parse errors return `Err` and produce no
/// output; warnings and anomalies ride along on the result.
#[instrument(skip_all, fields(source_len = source.len()))]
pub fn compile(source: &str, options: &TransformOptions) -> Result<TransformResult, CompileError> {
    let mut doc = parse(source)?;
    let ctx = transform(&mut doc, source, options);
    let printed = print_to_js(source, &doc, &ctx, options)?;
    Ok(TransformResult {
        output: printed.output,
        source_map_chunk: printed.source_map_chunk,
        metadata: ctx.metadata,
        warnings: ctx.warnings,
        anomalies: doc.anomalies,
    })
}

/// Parse a document and serialize its tree as JSON.
pub fn parse_to_json(source: &str, pretty: bool) -> Result<String, CompileError> {
    let doc = parse(source)?;
    let json = if pretty {
        astro_printer::print_to_json_pretty(&doc)
    } else {
        astro_printer::print_to_json(&doc)
    };
    Ok(json.expect("tree serialization cannot fail"))
}
