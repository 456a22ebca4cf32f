use pest::iterators::Pair;

use super::{
    args_from_suffix, pos, ArrayLiteral, BinaryExpr, Boolean, FnCall, Ident, Indexing, Lambda,
    MemberAccess, MethodCall, Null, Number, ObjectLiteral, Position, Rule, SliceExpr, Str, Ternary,
    TransformError, TransformResult, UnaryExpr,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(Number),
    Str(Str),
    Boolean(Boolean),
    Null(Null),
    Array(ArrayLiteral),
    Object(ObjectLiteral),
    Ident(Ident),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Ternary(Ternary),
    Member(MemberAccess),
    Index(Indexing),
    Slice(SliceExpr),
    Call(FnCall),
    MethodCall(MethodCall),
    Lambda(Lambda),
}

impl Expression {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Expression> {
        match pair.as_rule() {
            Rule::ternary => Ternary::fold_pair(pair, file),
            Rule::logic_or
            | Rule::logic_and
            | Rule::equality
            | Rule::comparison
            | Rule::additive
            | Rule::multiplicative => BinaryExpr::fold_pair(pair, file),
            Rule::neg_expr | Rule::not_expr => {
                Ok(Expression::Unary(UnaryExpr::from_pair(pair, file)?))
            }
            Rule::postfix_expr => Self::fold_postfix(pair, file),
            Rule::paren_expr => {
                let position = pos(&pair, file);
                let Some(inner) = pair.into_inner().next() else {
                    return Err(TransformError::new("empty parenthesized expression", position));
                };
                Self::from_pair(inner, file)
            }
            Rule::number => Ok(Expression::Number(Number::from_pair(pair, file)?)),
            Rule::string => Ok(Expression::Str(Str::from_pair(pair, file)?)),
            Rule::boolean => Ok(Expression::Boolean(Boolean::from_pair(pair, file)?)),
            Rule::null => Ok(Expression::Null(Null::from_pair(pair, file)?)),
            Rule::array_literal => Ok(Expression::Array(ArrayLiteral::from_pair(pair, file)?)),
            Rule::object_literal => Ok(Expression::Object(ObjectLiteral::from_pair(pair, file)?)),
            Rule::ident => Ok(Expression::Ident(Ident::from_pair(pair, file)?)),
            Rule::lambda => Ok(Expression::Lambda(Lambda::from_pair(pair, file)?)),
            other => Err(TransformError::new(
                format!("unexpected expression '{other:?}'"),
                pos(&pair, file),
            )),
        }
    }

    /// Fold a `postfix_expr` pair: a primary followed by any mix of call,
    /// member, and index suffixes. A member suffix directly followed by a
    /// call suffix fuses into a method call so the generator can route it
    /// through `safe_method_call`.
    fn fold_postfix(pair: Pair<Rule>, file: &str) -> TransformResult<Expression> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner().peekable();
        let Some(first) = inner.next() else {
            return Err(TransformError::new("empty postfix expression", position));
        };
        let mut expr = Expression::from_pair(first, file)?;

        while let Some(suffix) = inner.next() {
            let suffix_pos = pos(&suffix, file);

            match suffix.as_rule() {
                Rule::member_suffix => {
                    let Some(property) = suffix.into_inner().next() else {
                        return Err(TransformError::new(
                            "member access without property name",
                            suffix_pos,
                        ));
                    };
                    let property = property.as_str().to_owned();

                    if let Some(call) =
                        inner.next_if(|next| next.as_rule() == Rule::call_suffix)
                    {
                        expr = Expression::MethodCall(MethodCall {
                            object: Box::new(expr),
                            method: property,
                            args: args_from_suffix(call, file)?,
                            position: suffix_pos,
                        });
                    } else {
                        expr = Expression::Member(MemberAccess {
                            object: Box::new(expr),
                            property,
                            position: suffix_pos,
                        });
                    }
                }
                Rule::call_suffix => {
                    expr = Expression::Call(FnCall {
                        callee: Box::new(expr),
                        args: args_from_suffix(suffix, file)?,
                        position: suffix_pos,
                    });
                }
                Rule::index_suffix => {
                    let Some(index) = suffix.into_inner().next() else {
                        return Err(TransformError::new("index access without index", suffix_pos));
                    };

                    if index.as_rule() == Rule::slice {
                        expr = Expression::Slice(SliceExpr::from_suffix(expr, index, file)?);
                    } else {
                        expr = Expression::Index(Indexing {
                            object: Box::new(expr),
                            index: Box::new(Expression::from_pair(index, file)?),
                            position: suffix_pos,
                        });
                    }
                }
                other => {
                    return Err(TransformError::new(
                        format!("unexpected postfix '{other:?}'"),
                        suffix_pos,
                    ))
                }
            }
        }

        Ok(expr)
    }

    pub fn position(&self) -> Position {
        match self {
            Expression::Number(Number { position, .. })
            | Expression::Str(Str { position, .. })
            | Expression::Boolean(Boolean { position, .. })
            | Expression::Null(Null { position, .. })
            | Expression::Array(ArrayLiteral { position, .. })
            | Expression::Object(ObjectLiteral { position, .. })
            | Expression::Ident(Ident { position, .. })
            | Expression::Binary(BinaryExpr { position, .. })
            | Expression::Unary(UnaryExpr { position, .. })
            | Expression::Ternary(Ternary { position, .. })
            | Expression::Member(MemberAccess { position, .. })
            | Expression::Index(Indexing { position, .. })
            | Expression::Slice(SliceExpr { position, .. })
            | Expression::Call(FnCall { position, .. })
            | Expression::MethodCall(MethodCall { position, .. })
            | Expression::Lambda(Lambda { position, .. }) => position.clone(),
        }
    }
}
