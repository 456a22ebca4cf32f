use pest::iterators::Pair;

use super::{pos, Block, Ident, Position, Rule, TransformError, TransformResult};

/// `try` / `except (name?)` / `finally`. The finally block attaches to
/// its try-statement even when no except clause is present; an empty
/// finally body survives transformation so the generator can emit its
/// no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: Block,
    pub handler: Option<ExceptClause>,
    pub finally_block: Option<Block>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptClause {
    pub binding: Option<Ident>,
    pub body: Block,
    pub position: Position,
}

impl TryStatement {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<TryStatement> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(body) = inner.next() else {
            return Err(TransformError::new("try without body", position));
        };
        let body = Block::from_pair(body, file)?;

        let mut handler = None;
        let mut finally_block = None;

        for clause in inner {
            let clause_pos = pos(&clause, file);
            match clause.as_rule() {
                Rule::except_clause => {
                    let mut binding = None;
                    let mut except_body = None;
                    for part in clause.into_inner() {
                        match part.as_rule() {
                            Rule::ident => binding = Some(Ident::from_pair(part, file)?),
                            Rule::block => except_body = Some(Block::from_pair(part, file)?),
                            other => {
                                return Err(TransformError::new(
                                    format!("unexpected except part '{other:?}'"),
                                    clause_pos,
                                ))
                            }
                        }
                    }
                    let Some(except_body) = except_body else {
                        return Err(TransformError::new("except without body", clause_pos));
                    };
                    handler = Some(ExceptClause {
                        binding,
                        body: except_body,
                        position: clause_pos,
                    });
                }
                Rule::finally_clause => {
                    let Some(block) = clause.into_inner().next() else {
                        return Err(TransformError::new("finally without body", clause_pos));
                    };
                    finally_block = Some(Block::from_pair(block, file)?);
                }
                other => {
                    return Err(TransformError::new(
                        format!("unexpected try clause '{other:?}'"),
                        clause_pos,
                    ))
                }
            }
        }

        Ok(TryStatement {
            body,
            handler,
            finally_block,
            position,
        })
    }
}
