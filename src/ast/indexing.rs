use super::{Expression, Position};

/// Index expression `object[index]`. Lowers to native subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Indexing {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub position: Position,
}
