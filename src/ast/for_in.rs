use pest::iterators::Pair;

use super::{pos, Block, Expression, Ident, Position, Rule, TransformError, TransformResult};

/// `for (name in iterable) { ... }`. The binding is visible inside the
/// loop body only.
#[derive(Debug, Clone, PartialEq)]
pub struct ForIn {
    pub binding: Ident,
    pub iterable: Expression,
    pub body: Block,
    pub position: Position,
}

impl ForIn {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<ForIn> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(binding) = inner.next() else {
            return Err(TransformError::new("for without binding", position));
        };
        let Some(iterable) = inner.next() else {
            return Err(TransformError::new("for without iterable", position));
        };
        let Some(body) = inner.next() else {
            return Err(TransformError::new("for without body", position));
        };

        Ok(ForIn {
            binding: Ident::from_pair(binding, file)?,
            iterable: Expression::from_pair(iterable, file)?,
            body: Block::from_pair(body, file)?,
            position,
        })
    }
}
