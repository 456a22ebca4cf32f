use pest::iterators::Pair;

use super::{pos, Block, Ident, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    pub position: Position,
}

impl FunctionDef {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<FunctionDef> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return Err(TransformError::new("function without name", position));
        };
        let name = Ident::from_pair(name, file)?;

        let mut params = vec![];
        let mut body = None;

        for part in inner {
            match part.as_rule() {
                Rule::param_list => {
                    for param in part.into_inner() {
                        params.push(Ident::from_pair(param, file)?);
                    }
                }
                Rule::block => body = Some(Block::from_pair(part, file)?),
                other => {
                    return Err(TransformError::new(
                        format!("unexpected function part '{other:?}'"),
                        position,
                    ))
                }
            }
        }

        let Some(body) = body else {
            return Err(TransformError::new("function without body", position));
        };

        Ok(FunctionDef {
            name,
            params,
            body,
            position,
        })
    }
}
