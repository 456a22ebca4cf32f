//! Parsing and AST for ML programs.
//!
//! Contains the pest grammar wrapper, the typed node structs, and the
//! tree-to-AST transformer (the `from_pair` constructors on each node).
mod array;
mod assignment;
mod binary_expr;
mod block;
mod boolean;
mod call;
mod capability;
mod expression;
mod flow;
mod fn_def;
mod for_in;
mod ident;
mod if_statement;
mod import;
mod indexing;
mod lambda;
mod member;
mod nonlocal_decl;
mod null;
mod number;
mod object;
mod parser;
mod pattern;
mod pretty;
mod slice;
mod statement;
mod str;
mod ternary;
mod transform_error;
mod try_statement;
mod unary_expr;
mod while_loop;

pub use self::array::*;
pub use self::assignment::*;
pub use self::binary_expr::*;
pub use self::block::*;
pub use self::boolean::*;
pub use self::call::*;
pub use self::capability::*;
pub use self::expression::*;
pub use self::flow::*;
pub use self::fn_def::*;
pub use self::for_in::*;
pub use self::ident::*;
pub use self::if_statement::*;
pub use self::import::*;
pub use self::indexing::*;
pub use self::lambda::*;
pub use self::member::*;
pub use self::nonlocal_decl::*;
pub use self::null::*;
pub use self::number::*;
pub use self::object::*;
pub use self::parser::*;
pub use self::pattern::*;
pub use self::slice::*;
pub use self::statement::*;
pub use self::str::*;
pub use self::ternary::*;
pub use self::transform_error::*;
pub use self::try_statement::*;
pub use self::unary_expr::*;
pub use self::while_loop::*;

use pest::iterators::{Pair, Pairs};

/// A position within a file (i.e., file, line, and column).
pub type Position = (String, usize, usize);

/// Result of transforming a parse-tree node into its AST form.
pub type TransformResult<T> = Result<T, TransformError>;

/// Extract the position of a pair within the given file.
pub fn pos(pair: &Pair<Rule>, file: &str) -> Position {
    let (line, col) = pair.line_col();
    (file.to_owned(), line, col)
}

/// AST representing a single ML compilation unit.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Statement>,
}

impl Ast {
    /// Build an AST from the statement pairs of a parsed program.
    pub fn from_program(program: Pairs<Rule>, file: &str) -> TransformResult<Ast> {
        let mut nodes = vec![];

        for statement in program {
            if statement.as_rule() != Rule::EOI {
                nodes.push(Statement::from_pair(statement, file)?);
            }
        }

        Ok(Self { nodes })
    }

    pub fn from_nodes(nodes: Vec<Statement>) -> Ast {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Statement] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Ast {
        let pairs = MlParser::parse_program("test.ml", source).expect("parse failed");
        Ast::from_program(pairs, "test.ml").expect("transform failed")
    }

    #[test]
    fn test_signed_literal_is_single_node() {
        let ast = parse("x = -1;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            assignment.value,
            Expression::Number(Number {
                value: NumberValue::Integer(-1),
                position: ("test.ml".to_owned(), 1, 5),
            })
        );
    }

    #[test]
    fn test_negation_of_identifier_is_unary() {
        let ast = parse("y = -x;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Unary(unary) = &assignment.value else {
            panic!("expected unary expression, got {:?}", assignment.value);
        };
        assert_eq!(unary.op, UnaryOp::Neg);
        assert!(matches!(*unary.operand, Expression::Ident(_)));
    }

    #[test]
    fn test_double_not_preserved() {
        let ast = parse("y = !!x;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Unary(outer) = &assignment.value else {
            panic!("expected unary expression");
        };
        assert_eq!(outer.op, UnaryOp::Not);
        let Expression::Unary(inner) = outer.operand.as_ref() else {
            panic!("expected nested unary expression");
        };
        assert_eq!(inner.op, UnaryOp::Not);
    }

    #[test]
    fn test_subtraction_still_binary() {
        let ast = parse("y = a - 1;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Binary(binary) = &assignment.value else {
            panic!("expected binary expression, got {:?}", assignment.value);
        };
        assert_eq!(binary.op, BinaryOp::Sub);
    }

    #[test]
    fn test_elif_chain_flattens() {
        let ast = parse("if (a) { } elif (b) { } elif (c) { } else { }");

        let Statement::If(if_statement) = &ast.nodes()[0] else {
            panic!("expected if statement");
        };
        assert_eq!(if_statement.elif_branches.len(), 2);
        assert!(if_statement.else_block.is_some());
    }

    #[test]
    fn test_finally_without_except() {
        let ast = parse("try { x = 1; } finally { }");

        let Statement::Try(try_statement) = &ast.nodes()[0] else {
            panic!("expected try statement");
        };
        assert!(try_statement.handler.is_none());
        let finally_block = try_statement
            .finally_block
            .as_ref()
            .expect("finally should attach without except");
        assert!(finally_block.is_empty());
    }

    #[test]
    fn test_except_binding() {
        let ast = parse("try { } except (e) { y = e; }");

        let Statement::Try(try_statement) = &ast.nodes()[0] else {
            panic!("expected try statement");
        };
        let handler = try_statement.handler.as_ref().expect("handler expected");
        assert_eq!(handler.binding.as_ref().map(|b| b.value.as_str()), Some("e"));
    }

    #[test]
    fn test_slice_components_by_name() {
        let ast = parse("y = arr[::2];");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Slice(slice) = &assignment.value else {
            panic!("expected slice, got {:?}", assignment.value);
        };
        assert!(slice.start.is_none());
        assert!(slice.end.is_none());
        let step = slice.step.as_ref().expect("step expected");
        assert!(matches!(
            step.as_ref(),
            Expression::Number(Number {
                value: NumberValue::Integer(2),
                ..
            })
        ));
    }

    #[test]
    fn test_reversal_slice() {
        let ast = parse("y = arr[::-1];");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Slice(slice) = &assignment.value else {
            panic!("expected slice");
        };
        let step = slice.step.as_ref().expect("step expected");
        assert!(matches!(
            step.as_ref(),
            Expression::Number(Number {
                value: NumberValue::Integer(-1),
                ..
            })
        ));
    }

    #[test]
    fn test_method_call_fuses() {
        let ast = parse("y = obj.update(1);");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::MethodCall(method_call) = &assignment.value else {
            panic!("expected method call, got {:?}", assignment.value);
        };
        assert_eq!(method_call.method, "update");
        assert_eq!(method_call.args.len(), 1);
    }

    #[test]
    fn test_member_without_call_is_attribute() {
        let ast = parse("y = obj.size;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(assignment.value, Expression::Member(_)));
    }

    #[test]
    fn test_destructuring_targets() {
        let ast = parse("[a, [b, c]] = rows; {x, y} = point;");

        let Statement::Assignment(array_assign) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let AssignTarget::Pattern(pattern) = &array_assign.target else {
            panic!("expected pattern target");
        };
        assert_eq!(pattern.bound_names(), vec!["a", "b", "c"]);

        let Statement::Assignment(object_assign) = &ast.nodes()[1] else {
            panic!("expected assignment");
        };
        let AssignTarget::Pattern(pattern) = &object_assign.target else {
            panic!("expected pattern target");
        };
        assert_eq!(pattern.bound_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_capability_declaration() {
        let ast = parse(
            "capability FileReader {\n    resource \"*.txt\";\n    allow read;\n}",
        );

        let Statement::Capability(capability) = &ast.nodes()[0] else {
            panic!("expected capability declaration");
        };
        assert_eq!(capability.name.value, "FileReader");
        assert_eq!(capability.resources[0].value, "*.txt");
        assert_eq!(capability.operations[0].value, "read");
    }

    #[test]
    fn test_lambda_with_expression_body() {
        let ast = parse("double = fn (x) => x * 2;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Lambda(lambda) = &assignment.value else {
            panic!("expected lambda");
        };
        assert_eq!(lambda.params.len(), 1);
        assert!(matches!(lambda.body, LambdaBody::Expression(_)));
    }

    #[test]
    fn test_lambda_with_block_body() {
        let ast = parse("run = fn (x) => { return x; };");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let Expression::Lambda(lambda) = &assignment.value else {
            panic!("expected lambda");
        };
        assert!(matches!(lambda.body, LambdaBody::Block(_)));
    }

    #[test]
    fn test_scientific_notation() {
        let ast = parse("x = -2.5e3;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            assignment.value,
            Expression::Number(Number {
                value: NumberValue::Float(-2500.0),
                position: ("test.ml".to_owned(), 1, 5),
            })
        );
    }

    #[test]
    fn test_import_path_segments() {
        let ast = parse("import utils.text;");

        let Statement::Import(import) = &ast.nodes()[0] else {
            panic!("expected import");
        };
        assert_eq!(import.segments, vec!["utils", "text"]);
        assert_eq!(import.module_name(), "text");
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let error = MlParser::parse_program("bad.ml", "x = ;").expect_err("should fail");
        assert_eq!(error.position.0, "bad.ml");
    }

    #[test]
    fn test_member_assignment_target() {
        let ast = parse("obj.field = 1;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let AssignTarget::Member(member) = &assignment.target else {
            panic!("expected member target, got {:?}", assignment.target);
        };
        assert_eq!(member.property, "field");
    }

    #[test]
    fn test_nested_index_member_target() {
        let ast = parse("grid[0].cells[1] = 9;");

        let Statement::Assignment(assignment) = &ast.nodes()[0] else {
            panic!("expected assignment");
        };
        let AssignTarget::Index(index) = &assignment.target else {
            panic!("expected index target, got {:?}", assignment.target);
        };
        assert!(matches!(index.object, Expression::Member(_)));
    }
}
