use std::{error::Error, fmt::Display};

use pest::{error::LineColLocation, iterators::Pairs, Parser};
use pest_derive::Parser;

use super::Position;

#[derive(Parser)]
#[grammar = "ml.pest"]
pub struct MlParser;

/// Error produced when the parser cannot consume its input. Carries the
/// location of the failing token and pest's expected-token summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (file, line, col) = &self.position;
        f.write_str(&format!("{} ({}:{}:{})", self.message, file, line, col))
    }
}

impl Error for SyntaxError {}

impl MlParser {
    /// Parse a whole program and return the statement pairs (with the
    /// trailing EOI still present).
    pub fn parse_program<'i>(file: &str, source: &'i str) -> Result<Pairs<'i, Rule>, SyntaxError> {
        match Self::parse(Rule::program, source) {
            Ok(mut pairs) => {
                let Some(program) = pairs.next() else {
                    return Err(SyntaxError {
                        message: "empty parse result".to_owned(),
                        position: (file.to_owned(), 1, 1),
                    });
                };
                Ok(program.into_inner())
            }
            Err(err) => {
                let (line, col) = match err.line_col {
                    LineColLocation::Pos((line, col)) => (line, col),
                    LineColLocation::Span((line, col), _) => (line, col),
                };
                Err(SyntaxError {
                    message: err.variant.message().to_string(),
                    position: (file.to_owned(), line, col),
                })
            }
        }
    }
}
