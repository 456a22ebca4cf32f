use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
    pub position: Position,
}

impl ArrayLiteral {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<ArrayLiteral> {
        let position = pos(&pair, file);

        let mut elements = vec![];
        for element in pair.into_inner() {
            elements.push(Expression::from_pair(element, file)?);
        }

        Ok(ArrayLiteral { elements, position })
    }
}
