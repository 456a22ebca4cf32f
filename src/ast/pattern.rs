use pest::iterators::Pair;

use super::{pos, Ident, Position, Rule, TransformError, TransformResult};

/// Destructuring target. Order and nesting of the source pattern are
/// preserved so the generator can emit a matching unpacking form.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Ident),
    Array(ArrayPattern),
    Object(ObjectPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    pub elements: Vec<Pattern>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    pub keys: Vec<Ident>,
    pub position: Position,
}

impl Pattern {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Pattern> {
        let position = pos(&pair, file);

        match pair.as_rule() {
            Rule::ident => Ok(Pattern::Ident(Ident::from_pair(pair, file)?)),
            Rule::array_pattern => {
                let mut elements = vec![];
                for element in pair.into_inner() {
                    elements.push(Pattern::from_pair(element, file)?);
                }
                Ok(Pattern::Array(ArrayPattern { elements, position }))
            }
            Rule::object_pattern => {
                let mut keys = vec![];
                for key in pair.into_inner() {
                    keys.push(Ident::from_pair(key, file)?);
                }
                Ok(Pattern::Object(ObjectPattern { keys, position }))
            }
            other => Err(TransformError::new(
                format!("unexpected pattern '{other:?}'"),
                position,
            )),
        }
    }

    /// Every name the pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            Pattern::Ident(ident) => vec![ident.value.clone()],
            Pattern::Array(array) => array
                .elements
                .iter()
                .flat_map(|element| element.bound_names())
                .collect(),
            Pattern::Object(object) => {
                object.keys.iter().map(|key| key.value.clone()).collect()
            }
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Pattern::Ident(ident) => ident.position.clone(),
            Pattern::Array(array) => array.position.clone(),
            Pattern::Object(object) => object.position.clone(),
        }
    }
}
