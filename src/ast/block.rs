use pest::iterators::Pair;

use super::{pos, Position, Rule, Statement, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub position: Position,
}

impl Block {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Block> {
        let position = pos(&pair, file);

        let mut statements = vec![];
        for statement in pair.into_inner() {
            statements.push(Statement::from_pair(statement, file)?);
        }

        Ok(Block {
            statements,
            position,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
