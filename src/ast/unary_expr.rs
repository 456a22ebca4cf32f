use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformError, TransformResult};

/// Unary expression. The operator tag comes from the rule name
/// (`neg_expr` / `not_expr`); the operator literal itself was consumed by
/// the parser and is never string-matched again.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryExpr {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<UnaryExpr> {
        let position = pos(&pair, file);

        let op = match pair.as_rule() {
            Rule::neg_expr => UnaryOp::Neg,
            Rule::not_expr => UnaryOp::Not,
            other => {
                return Err(TransformError::new(
                    format!("expected unary expression, found '{other:?}'"),
                    position,
                ))
            }
        };

        let Some(operand) = pair.into_inner().next() else {
            return Err(TransformError::new("unary operator without operand", position));
        };

        Ok(UnaryExpr {
            op,
            operand: Box::new(Expression::from_pair(operand, file)?),
            position,
        })
    }
}
