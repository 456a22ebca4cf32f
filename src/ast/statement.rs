use pest::iterators::Pair;

use super::{
    pos, Assignment, Break, CapabilityDecl, Continue, Expression, ForIn, FunctionDef, If, Import,
    NonLocalDecl, Position, Return, Rule, Throw, TransformError, TransformResult, TryStatement,
    WhileLoop,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment(Assignment),
    Expression(Expression),
    If(If),
    While(WhileLoop),
    ForIn(ForIn),
    Try(TryStatement),
    Break(Break),
    Continue(Continue),
    Return(Return),
    Throw(Throw),
    NonLocal(NonLocalDecl),
    Import(Import),
    FunctionDef(FunctionDef),
    Capability(CapabilityDecl),
}

impl Statement {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Statement> {
        match pair.as_rule() {
            Rule::assignment => Ok(Statement::Assignment(Assignment::from_pair(pair, file)?)),
            Rule::expr_stmt => {
                let position = pos(&pair, file);
                let Some(inner) = pair.into_inner().next() else {
                    return Err(TransformError::new("empty expression statement", position));
                };
                Ok(Statement::Expression(Expression::from_pair(inner, file)?))
            }
            Rule::if_stmt => Ok(Statement::If(If::from_pair(pair, file)?)),
            Rule::while_stmt => Ok(Statement::While(WhileLoop::from_pair(pair, file)?)),
            Rule::for_stmt => Ok(Statement::ForIn(ForIn::from_pair(pair, file)?)),
            Rule::try_stmt => Ok(Statement::Try(TryStatement::from_pair(pair, file)?)),
            Rule::break_stmt => Ok(Statement::Break(Break::from_pair(pair, file)?)),
            Rule::continue_stmt => Ok(Statement::Continue(Continue::from_pair(pair, file)?)),
            Rule::return_stmt => Ok(Statement::Return(Return::from_pair(pair, file)?)),
            Rule::throw_stmt => Ok(Statement::Throw(Throw::from_pair(pair, file)?)),
            Rule::nonlocal_stmt => Ok(Statement::NonLocal(NonLocalDecl::from_pair(pair, file)?)),
            Rule::import_stmt => Ok(Statement::Import(Import::from_pair(pair, file)?)),
            Rule::function_def => Ok(Statement::FunctionDef(FunctionDef::from_pair(pair, file)?)),
            Rule::capability_decl => {
                Ok(Statement::Capability(CapabilityDecl::from_pair(pair, file)?))
            }
            other => Err(TransformError::new(
                format!("unexpected statement '{other:?}'"),
                pos(&pair, file),
            )),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Statement::Assignment(Assignment { position, .. })
            | Statement::If(If { position, .. })
            | Statement::While(WhileLoop { position, .. })
            | Statement::ForIn(ForIn { position, .. })
            | Statement::Try(TryStatement { position, .. })
            | Statement::Break(Break { position, .. })
            | Statement::Continue(Continue { position, .. })
            | Statement::Return(Return { position, .. })
            | Statement::Throw(Throw { position, .. })
            | Statement::NonLocal(NonLocalDecl { position, .. })
            | Statement::Import(Import { position, .. })
            | Statement::FunctionDef(FunctionDef { position, .. })
            | Statement::Capability(CapabilityDecl { position, .. }) => position.clone(),
            Statement::Expression(expression) => expression.position(),
        }
    }
}
