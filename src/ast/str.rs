use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Str {
    pub value: String,
    pub position: Position,
}

impl Str {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Str> {
        let position = pos(&pair, file);

        let Some(inner) = pair.into_inner().next() else {
            return Err(TransformError::new("string without body", position));
        };

        let Some(value) = unescape::unescape(inner.as_str()) else {
            return Err(TransformError::new(
                format!("invalid escape sequence in string '{}'", inner.as_str()),
                position,
            ));
        };

        Ok(Str { value, position })
    }
}
