use super::{Expression, Position};

/// Attribute read `object.property`. Lowered by the code generator to a
/// `safe_attr_access` call, never to a native attribute lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub object: Box<Expression>,
    pub property: String,
    pub position: Position,
}
