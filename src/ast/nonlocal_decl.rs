use pest::iterators::Pair;

use super::{pos, Ident, Position, Rule, TransformResult};

/// `nonlocal a, b;` declaration inside a nested function, marking the
/// named closure variables as assignable.
#[derive(Debug, Clone, PartialEq)]
pub struct NonLocalDecl {
    pub names: Vec<Ident>,
    pub position: Position,
}

impl NonLocalDecl {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<NonLocalDecl> {
        let position = pos(&pair, file);

        let mut names = vec![];
        for name in pair.into_inner() {
            names.push(Ident::from_pair(name, file)?);
        }

        Ok(NonLocalDecl { names, position })
    }
}
