//! Read-only AST traversal shared by the analyzer passes.
//!
//! Traversal is in definition order; passes hook the nodes they care
//! about and ignore the rest.
use crate::ast::{AssignTarget, Ast, Block, Expression, LambdaBody, Statement};

pub trait Visitor {
    fn visit_statement(&mut self, _statement: &Statement) {}
    fn visit_expression(&mut self, _expression: &Expression) {}
}

pub fn walk_ast<V: Visitor>(visitor: &mut V, ast: &Ast) {
    for statement in ast.nodes() {
        walk_statement(visitor, statement);
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &Block) {
    for statement in &block.statements {
        walk_statement(visitor, statement);
    }
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &Statement) {
    visitor.visit_statement(statement);

    match statement {
        Statement::Assignment(assignment) => {
            match &assignment.target {
                AssignTarget::Member(member) => walk_expression(visitor, &member.object),
                AssignTarget::Index(index) => {
                    walk_expression(visitor, &index.object);
                    walk_expression(visitor, &index.index);
                }
                AssignTarget::Ident(_) | AssignTarget::Pattern(_) => {}
            }
            walk_expression(visitor, &assignment.value);
        }
        Statement::Expression(expression) => walk_expression(visitor, expression),
        Statement::If(if_statement) => {
            walk_expression(visitor, &if_statement.condition);
            walk_block(visitor, &if_statement.then_block);
            for branch in &if_statement.elif_branches {
                walk_expression(visitor, &branch.condition);
                walk_block(visitor, &branch.block);
            }
            if let Some(else_block) = &if_statement.else_block {
                walk_block(visitor, else_block);
            }
        }
        Statement::While(while_loop) => {
            walk_expression(visitor, &while_loop.condition);
            walk_block(visitor, &while_loop.body);
        }
        Statement::ForIn(for_in) => {
            walk_expression(visitor, &for_in.iterable);
            walk_block(visitor, &for_in.body);
        }
        Statement::Try(try_statement) => {
            walk_block(visitor, &try_statement.body);
            if let Some(handler) = &try_statement.handler {
                walk_block(visitor, &handler.body);
            }
            if let Some(finally_block) = &try_statement.finally_block {
                walk_block(visitor, finally_block);
            }
        }
        Statement::Return(return_statement) => {
            if let Some(value) = &return_statement.value {
                walk_expression(visitor, value);
            }
        }
        Statement::Throw(throw) => walk_expression(visitor, &throw.payload),
        Statement::FunctionDef(function) => walk_block(visitor, &function.body),
        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::NonLocal(_)
        | Statement::Import(_)
        | Statement::Capability(_) => {}
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &Expression) {
    visitor.visit_expression(expression);

    match expression {
        Expression::Array(array) => {
            for element in &array.elements {
                walk_expression(visitor, element);
            }
        }
        Expression::Object(object) => {
            for entry in &object.entries {
                walk_expression(visitor, &entry.value);
            }
        }
        Expression::Binary(binary) => {
            walk_expression(visitor, &binary.lhs);
            walk_expression(visitor, &binary.rhs);
        }
        Expression::Unary(unary) => walk_expression(visitor, &unary.operand),
        Expression::Ternary(ternary) => {
            walk_expression(visitor, &ternary.condition);
            walk_expression(visitor, &ternary.truthy);
            walk_expression(visitor, &ternary.falsy);
        }
        Expression::Member(member) => walk_expression(visitor, &member.object),
        Expression::Index(index) => {
            walk_expression(visitor, &index.object);
            walk_expression(visitor, &index.index);
        }
        Expression::Slice(slice) => {
            walk_expression(visitor, &slice.object);
            for component in [&slice.start, &slice.end, &slice.step].into_iter().flatten() {
                walk_expression(visitor, component);
            }
        }
        Expression::Call(call) => {
            walk_expression(visitor, &call.callee);
            for arg in &call.args {
                walk_expression(visitor, arg);
            }
        }
        Expression::MethodCall(method_call) => {
            walk_expression(visitor, &method_call.object);
            for arg in &method_call.args {
                walk_expression(visitor, arg);
            }
        }
        Expression::Lambda(lambda) => match &lambda.body {
            LambdaBody::Expression(body) => walk_expression(visitor, body),
            LambdaBody::Block(block) => walk_block(visitor, block),
        },
        Expression::Number(_)
        | Expression::Str(_)
        | Expression::Boolean(_)
        | Expression::Null(_)
        | Expression::Ident(_) => {}
    }
}
