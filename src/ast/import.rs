use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformError, TransformResult};

/// `import a.b.c;`. The bound name is the final segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub segments: Vec<String>,
    pub position: Position,
}

impl Import {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Import> {
        let position = pos(&pair, file);

        let Some(path) = pair.into_inner().next() else {
            return Err(TransformError::new("import without path", position));
        };

        let segments = path
            .into_inner()
            .map(|segment| segment.as_str().to_owned())
            .collect::<Vec<_>>();

        if segments.is_empty() {
            return Err(TransformError::new("import with empty path", position));
        }

        Ok(Import { segments, position })
    }

    /// The name under which the module becomes visible to the importing
    /// unit.
    pub fn module_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}
