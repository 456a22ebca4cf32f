use pest::iterators::Pair;

use super::{pos, Block, Expression, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
    pub position: Position,
}

impl WhileLoop {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<WhileLoop> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(condition) = inner.next() else {
            return Err(TransformError::new("while without condition", position));
        };
        let Some(body) = inner.next() else {
            return Err(TransformError::new("while without body", position));
        };

        Ok(WhileLoop {
            condition: Expression::from_pair(condition, file)?,
            body: Block::from_pair(body, file)?,
            position,
        })
    }
}
