use pest::iterators::Pair;

use super::{
    pos, Expression, Ident, Indexing, MemberAccess, Pattern, Position, Rule, TransformError,
    TransformResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: AssignTarget,
    pub value: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Ident(Ident),
    Member(MemberTarget),
    Index(IndexTarget),
    Pattern(Pattern),
}

/// Attribute write `object.property = value`. Routed through
/// `safe_attr_assign` so the underscore and whitelist rules also cover
/// the write side.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTarget {
    pub object: Expression,
    pub property: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexTarget {
    pub object: Expression,
    pub index: Expression,
    pub position: Position,
}

impl Assignment {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Assignment> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(target_pair) = inner.next() else {
            return Err(TransformError::new("assignment without target", position));
        };
        let Some(value_pair) = inner.next() else {
            return Err(TransformError::new("assignment without value", position));
        };

        Ok(Assignment {
            target: AssignTarget::from_pair(target_pair, file)?,
            value: Expression::from_pair(value_pair, file)?,
            position,
        })
    }
}

impl AssignTarget {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<AssignTarget> {
        let position = pos(&pair, file);

        let Some(inner) = pair.into_inner().next() else {
            return Err(TransformError::new("empty assignment target", position));
        };

        match inner.as_rule() {
            Rule::array_pattern | Rule::object_pattern => {
                Ok(AssignTarget::Pattern(Pattern::from_pair(inner, file)?))
            }
            Rule::target_chain => Self::from_chain(inner, file),
            other => Err(TransformError::new(
                format!("unexpected assignment target '{other:?}'"),
                position,
            )),
        }
    }

    /// Fold `ident (.member | [index])*` into a target. All but the last
    /// suffix are reads on the way to the written location.
    fn from_chain(pair: Pair<Rule>, file: &str) -> TransformResult<AssignTarget> {
        let position = pos(&pair, file);

        let mut suffixes: Vec<Pair<Rule>> = pair.into_inner().collect();
        if suffixes.is_empty() {
            return Err(TransformError::new("empty assignment chain", position));
        }

        let head = suffixes.remove(0);
        let head = Ident::from_pair(head, file)?;

        let Some(last) = suffixes.pop() else {
            return Ok(AssignTarget::Ident(head));
        };

        let mut object = Expression::Ident(head);
        for suffix in suffixes {
            let suffix_pos = pos(&suffix, file);
            match suffix.as_rule() {
                Rule::member_target => {
                    let Some(property) = suffix.into_inner().next() else {
                        return Err(TransformError::new("member target without name", suffix_pos));
                    };
                    object = Expression::Member(MemberAccess {
                        object: Box::new(object),
                        property: property.as_str().to_owned(),
                        position: suffix_pos,
                    });
                }
                Rule::index_target => {
                    let Some(index) = suffix.into_inner().next() else {
                        return Err(TransformError::new("index target without index", suffix_pos));
                    };
                    object = Expression::Index(Indexing {
                        object: Box::new(object),
                        index: Box::new(Expression::from_pair(index, file)?),
                        position: suffix_pos,
                    });
                }
                other => {
                    return Err(TransformError::new(
                        format!("unexpected target suffix '{other:?}'"),
                        suffix_pos,
                    ))
                }
            }
        }

        let last_pos = pos(&last, file);
        match last.as_rule() {
            Rule::member_target => {
                let Some(property) = last.into_inner().next() else {
                    return Err(TransformError::new("member target without name", last_pos));
                };
                Ok(AssignTarget::Member(MemberTarget {
                    object,
                    property: property.as_str().to_owned(),
                    position: last_pos,
                }))
            }
            Rule::index_target => {
                let Some(index) = last.into_inner().next() else {
                    return Err(TransformError::new("index target without index", last_pos));
                };
                Ok(AssignTarget::Index(IndexTarget {
                    object,
                    index: Expression::from_pair(index, file)?,
                    position: last_pos,
                }))
            }
            other => Err(TransformError::new(
                format!("unexpected target suffix '{other:?}'"),
                last_pos,
            )),
        }
    }
}
