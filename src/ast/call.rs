use pest::iterators::Pair;

use super::{Expression, Position, Rule, TransformResult};

/// Plain function call `callee(args)`. The callee is usually an
/// identifier resolved against the whitelist; calling any other
/// expression routes through `safe_call` at emission.
#[derive(Debug, Clone, PartialEq)]
pub struct FnCall {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub position: Position,
}

/// Method call `object.name(args)`. Always emitted as a
/// `safe_method_call`, which performs the underscore and whitelist
/// checks at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub object: Box<Expression>,
    pub method: String,
    pub args: Vec<Expression>,
    pub position: Position,
}

/// Transform a `call_suffix` pair into the argument list it carries.
pub fn args_from_suffix(pair: Pair<Rule>, file: &str) -> TransformResult<Vec<Expression>> {
    let mut args = vec![];

    if let Some(arg_list) = pair.into_inner().next() {
        debug_assert_eq!(arg_list.as_rule(), Rule::arg_list);
        for arg in arg_list.into_inner() {
            args.push(Expression::from_pair(arg, file)?);
        }
    }

    Ok(args)
}
