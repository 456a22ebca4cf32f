use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Ternary {
    pub condition: Box<Expression>,
    pub truthy: Box<Expression>,
    pub falsy: Box<Expression>,
    pub position: Position,
}

impl Ternary {
    /// Transform a `ternary` pair. When the `?`/`:` arms are absent the
    /// pair only wraps its condition, which is returned unchanged.
    pub fn fold_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Expression> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(condition) = inner.next() else {
            return Err(TransformError::new("empty ternary expression", position));
        };
        let condition = Expression::from_pair(condition, file)?;

        let Some(truthy) = inner.next() else {
            return Ok(condition);
        };

        let Some(falsy) = inner.next() else {
            return Err(TransformError::new(
                "ternary expression without else arm",
                position,
            ));
        };

        Ok(Expression::Ternary(Ternary {
            condition: Box::new(condition),
            truthy: Box::new(Expression::from_pair(truthy, file)?),
            falsy: Box::new(Expression::from_pair(falsy, file)?),
            position,
        }))
    }
}
