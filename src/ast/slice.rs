use pest::iterators::Pair;

use super::{pos, Expression, Position, Rule, TransformError, TransformResult};

/// Slice expression `object[start:end:step]` with every component
/// optional. Negative indices and steps ride on the signed number
/// literal.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceExpr {
    pub object: Box<Expression>,
    pub start: Option<Box<Expression>>,
    pub end: Option<Box<Expression>>,
    pub step: Option<Box<Expression>>,
    pub has_step_colon: bool,
    pub position: Position,
}

impl SliceExpr {
    /// Build a slice from a `slice` pair and the already-transformed
    /// object it applies to. Components are matched by rule name, so an
    /// `a[::2]` step is never mistaken for a start.
    pub fn from_suffix(
        object: Expression,
        pair: Pair<Rule>,
        file: &str,
    ) -> TransformResult<SliceExpr> {
        let position = pos(&pair, file);

        let mut start = None;
        let mut end = None;
        let mut step = None;
        let mut has_step_colon = false;

        let colons = pair.as_str().matches(':').count();
        if colons > 1 {
            has_step_colon = true;
        }

        for component in pair.into_inner() {
            let rule = component.as_rule();
            let Some(inner) = component.into_inner().next() else {
                return Err(TransformError::new("slice component without expression", position));
            };
            let expression = Box::new(Expression::from_pair(inner, file)?);

            match rule {
                Rule::slice_start => start = Some(expression),
                Rule::slice_end => end = Some(expression),
                Rule::slice_step => step = Some(expression),
                other => {
                    return Err(TransformError::new(
                        format!("unexpected slice component '{other:?}'"),
                        position,
                    ))
                }
            }
        }

        Ok(SliceExpr {
            object: Box::new(object),
            start,
            end,
            step,
            has_step_colon,
            position,
        })
    }
}
