use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Boolean {
    pub value: bool,
    pub position: Position,
}

impl Boolean {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Boolean> {
        Ok(Boolean {
            value: pair.as_str() == "true",
            position: pos(&pair, file),
        })
    }
}
