use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_pair(pair: &Pair<Rule>, file: &str) -> TransformResult<BinaryOp> {
        let op = match pair.as_str() {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            other => {
                return Err(TransformError::new(
                    format!("unknown binary operator '{other}'"),
                    pos(pair, file),
                ))
            }
        };

        Ok(op)
    }

    /// Spelling of this operator in the emitted output.
    pub fn target_spelling(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl BinaryExpr {
    /// Fold a precedence-cascade pair (`additive`, `logic_or`, ...) into a
    /// left-associative chain of binary expressions.
    pub fn fold_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Expression> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(first) = inner.next() else {
            return Err(TransformError::new("empty binary expression", position));
        };

        let mut lhs = Expression::from_pair(first, file)?;

        while let Some(op_pair) = inner.next() {
            let op = BinaryOp::from_pair(&op_pair, file)?;
            let op_position = pos(&op_pair, file);

            let Some(rhs_pair) = inner.next() else {
                return Err(TransformError::new(
                    "binary operator without right operand",
                    op_position,
                ));
            };
            let rhs = Expression::from_pair(rhs_pair, file)?;

            lhs = Expression::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position: op_position,
            });
        }

        Ok(lhs)
    }
}
