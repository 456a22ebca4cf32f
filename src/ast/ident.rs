use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformError, TransformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub value: String,
    pub position: Position,
}

impl Ident {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Ident> {
        if pair.as_rule() != Rule::ident {
            return Err(TransformError::new(
                format!("expected identifier, found '{:?}'", pair.as_rule()),
                pos(&pair, file),
            ));
        }

        Ok(Ident {
            value: pair.as_str().to_owned(),
            position: pos(&pair, file),
        })
    }
}
