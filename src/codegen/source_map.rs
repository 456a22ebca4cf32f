//! Positional mapping from emitted lines back to source locations.
use serde::Serialize;

use crate::ast::Position;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceMap {
    pub file: String,
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub out_line: usize,
    pub src_file: String,
    pub src_line: usize,
    pub src_col: usize,
}

impl SourceMap {
    pub fn new(file: impl Into<String>) -> SourceMap {
        SourceMap {
            file: file.into(),
            mappings: vec![],
        }
    }

    pub fn add(&mut self, out_line: usize, position: &Position) {
        let (src_file, src_line, src_col) = position;
        self.mappings.push(Mapping {
            out_line,
            src_file: src_file.clone(),
            src_line: *src_line,
            src_col: *src_col,
        });
    }

    /// Shift every mapping down, used when scaffolding is prepended to
    /// an already-generated body.
    pub fn shift(&mut self, lines: usize) {
        for mapping in &mut self.mappings {
            mapping.out_line += lines;
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_owned())
    }
}
