use crate::ast::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Fatal parse errors. No partial output is produced when one of these is
/// returned; the span points at the construct that failed to terminate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unterminated frontmatter fence opened at byte {}", span.start)]
    UnterminatedFrontmatter { span: Span },

    #[error("unbalanced braces in expression opened at byte {}", span.start)]
    UnbalancedBraces { span: Span },

    #[error("unterminated string opened at byte {}", span.start)]
    UnterminatedString { span: Span },

    #[error("unterminated tag opened at byte {}", span.start)]
    UnterminatedTag { span: Span },

    #[error("unterminated comment opened at byte {}", span.start)]
    UnterminatedComment { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnterminatedFrontmatter { span } => *span,
            Self::UnbalancedBraces { span } => *span,
            Self::UnterminatedString { span } => *span,
            Self::UnterminatedTag { span } => *span,
            Self::UnterminatedComment { span } => *span,
        }
    }

    pub fn position(&self) -> usize {
        self.span().start
    }
}

/// Recoverable parse anomalies. These are recorded on a side channel and
/// skipped; parsing continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseAnomaly {
    UnexpectedEndTag { name: String, span: Span },
    DuplicateAttribute { name: String, span: Span },
    UnknownDoctype { value: String, span: Span },
}

impl ParseAnomaly {
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedEndTag { span, .. } => *span,
            Self::DuplicateAttribute { span, .. } => *span,
            Self::UnknownDoctype { span, .. } => *span,
        }
    }
}

/// Pretty error formatting using ariadne
#[cfg(feature = "pretty-errors")]
pub mod pretty {
    use super::ParseError;
    use ariadne::{Color, Label, Report, ReportKind, Source};

    /// Format an error with source context for terminal display
    pub fn format_error(error: &ParseError, file_path: &str, source: &str) -> String {
        let span = error.span();
        let range = span.start..span.end.max(span.start + 1).min(source.len().max(1));

        let report = Report::build(ReportKind::Error, file_path, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((file_path, range))
                    .with_message(label_for(error))
                    .with_color(Color::Red),
            )
            .finish();

        let mut output = Vec::new();
        report
            .write((file_path, Source::from(source)), &mut output)
            .unwrap_or_else(|e| {
                eprintln!("Warning: failed to format error with ariadne: {}", e);
            });

        String::from_utf8(output).unwrap_or_else(|_| error.to_string())
    }

    fn label_for(error: &ParseError) -> &'static str {
        match error {
            ParseError::UnterminatedFrontmatter { .. } => "this fence is never closed",
            ParseError::UnbalancedBraces { .. } => "this brace is never matched",
            ParseError::UnterminatedString { .. } => "this string is never closed",
            ParseError::UnterminatedTag { .. } => "this tag is never closed",
            ParseError::UnterminatedComment { .. } => "this comment is never closed",
        }
    }
}
