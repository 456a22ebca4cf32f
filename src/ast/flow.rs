use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Break {
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Continue {
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Expression>,
    pub position: Position,
}

/// `throw <expr>`. The payload expression is preserved verbatim; the
/// generator wraps it into a structured exception at emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Throw {
    pub payload: Expression,
    pub position: Position,
}

impl Break {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Break> {
        Ok(Break {
            position: pos(&pair, file),
        })
    }
}

impl Continue {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Continue> {
        Ok(Continue {
            position: pos(&pair, file),
        })
    }
}

impl Return {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Return> {
        let position = pos(&pair, file);

        let value = match pair.into_inner().next() {
            Some(value) => Some(Expression::from_pair(value, file)?),
            None => None,
        };

        Ok(Return { value, position })
    }
}

impl Throw {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Throw> {
        let position = pos(&pair, file);

        let Some(payload) = pair.into_inner().next() else {
            return Err(TransformError::new("throw without payload", position));
        };

        Ok(Throw {
            payload: Expression::from_pair(payload, file)?,
            position,
        })
    }
}
