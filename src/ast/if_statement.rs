use pest::iterators::Pair;

use super::{pos, Block, Expression, Position, Rule, TransformError, TransformResult};

/// `if` statement with its chained `elif` branches flattened into a
/// list, as produced by the transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub condition: Expression,
    pub then_block: Block,
    pub elif_branches: Vec<ElifBranch>,
    pub else_block: Option<Block>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifBranch {
    pub condition: Expression,
    pub block: Block,
    pub position: Position,
}

impl If {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<If> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(condition) = inner.next() else {
            return Err(TransformError::new("if without condition", position));
        };
        let condition = Expression::from_pair(condition, file)?;

        let Some(then_block) = inner.next() else {
            return Err(TransformError::new("if without body", position));
        };
        let then_block = Block::from_pair(then_block, file)?;

        let mut elif_branches = vec![];
        let mut else_block = None;

        for branch in inner {
            let branch_pos = pos(&branch, file);
            match branch.as_rule() {
                Rule::elif_branch => {
                    let mut parts = branch.into_inner();
                    let Some(elif_condition) = parts.next() else {
                        return Err(TransformError::new("elif without condition", branch_pos));
                    };
                    let Some(elif_block) = parts.next() else {
                        return Err(TransformError::new("elif without body", branch_pos));
                    };
                    elif_branches.push(ElifBranch {
                        condition: Expression::from_pair(elif_condition, file)?,
                        block: Block::from_pair(elif_block, file)?,
                        position: branch_pos,
                    });
                }
                Rule::else_branch => {
                    let Some(block) = branch.into_inner().next() else {
                        return Err(TransformError::new("else without body", branch_pos));
                    };
                    else_block = Some(Block::from_pair(block, file)?);
                }
                other => {
                    return Err(TransformError::new(
                        format!("unexpected if branch '{other:?}'"),
                        branch_pos,
                    ))
                }
            }
        }

        Ok(If {
            condition,
            then_block,
            elif_branches,
            else_block,
            position,
        })
    }
}
