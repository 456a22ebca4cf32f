use pest::iterators::Pair;

use super::{pos, Block, Expression, Ident, Position, Rule, TransformError, TransformResult};

/// Anonymous function `fn (params) => body` where the body is either a
/// single expression or a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Ident>,
    pub body: LambdaBody,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expression(Box<Expression>),
    Block(Block),
}

impl Lambda {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Lambda> {
        let position = pos(&pair, file);

        let mut params = vec![];
        let mut body = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::param_list => {
                    for param in inner.into_inner() {
                        params.push(Ident::from_pair(param, file)?);
                    }
                }
                Rule::block => {
                    body = Some(LambdaBody::Block(Block::from_pair(inner, file)?));
                }
                _ => {
                    body = Some(LambdaBody::Expression(Box::new(Expression::from_pair(
                        inner, file,
                    )?)));
                }
            }
        }

        let Some(body) = body else {
            return Err(TransformError::new("lambda without body", position));
        };

        Ok(Lambda {
            params,
            body,
            position,
        })
    }
}
