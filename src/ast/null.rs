use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Null {
    pub position: Position,
}

impl Null {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Null> {
        Ok(Null {
            position: pos(&pair, file),
        })
    }
}
