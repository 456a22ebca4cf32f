use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, Str, TransformError, TransformResult};

/// Object literal. Keys are always strings after transformation; bare
/// identifier keys are folded into their spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLiteral {
    pub entries: Vec<ObjectEntry>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expression,
    pub position: Position,
}

impl ObjectLiteral {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<ObjectLiteral> {
        let position = pos(&pair, file);

        let mut entries = vec![];
        for entry in pair.into_inner() {
            entries.push(ObjectEntry::from_pair(entry, file)?);
        }

        Ok(ObjectLiteral { entries, position })
    }
}

impl ObjectEntry {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<ObjectEntry> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(key_pair) = inner.next() else {
            return Err(TransformError::new("object entry without key", position));
        };

        let key = match key_pair.as_rule() {
            Rule::ident => key_pair.as_str().to_owned(),
            Rule::string => Str::from_pair(key_pair, file)?.value,
            other => {
                return Err(TransformError::new(
                    format!("unexpected object key '{other:?}'"),
                    position,
                ))
            }
        };

        let Some(value_pair) = inner.next() else {
            return Err(TransformError::new("object entry without value", position));
        };

        Ok(ObjectEntry {
            key,
            value: Expression::from_pair(value_pair, file)?,
            position,
        })
    }
}
