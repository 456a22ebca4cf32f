//! Pretty-printer: renders an AST back to canonical ML source.
//!
//! Used by tooling for round-tripping; printing then re-parsing yields
//! a semantically equivalent AST, and the printed form is a fixpoint.
use super::{
    AssignTarget, Ast, BinaryOp, Block, Expression, LambdaBody, NumberValue, Pattern, Statement,
    UnaryOp,
};

impl Ast {
    /// Render the AST as ML source.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for statement in self.nodes() {
            write_statement(&mut out, statement, 0);
        }
        out
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("    ");
    }
}

fn write_block(out: &mut String, block: &Block, indent: usize) {
    out.push_str("{\n");
    for statement in &block.statements {
        write_statement(out, statement, indent + 1);
    }
    push_indent(out, indent);
    out.push('}');
}

fn write_statement(out: &mut String, statement: &Statement, indent: usize) {
    push_indent(out, indent);

    match statement {
        Statement::Assignment(assignment) => {
            out.push_str(&target_to_source(&assignment.target));
            out.push_str(" = ");
            out.push_str(&expr_to_source(&assignment.value));
            out.push_str(";\n");
        }
        Statement::Expression(expression) => {
            out.push_str(&expr_to_source(expression));
            out.push_str(";\n");
        }
        Statement::If(if_statement) => {
            out.push_str("if (");
            out.push_str(&expr_to_source(&if_statement.condition));
            out.push_str(") ");
            write_block(out, &if_statement.then_block, indent);
            for branch in &if_statement.elif_branches {
                out.push_str(" elif (");
                out.push_str(&expr_to_source(&branch.condition));
                out.push_str(") ");
                write_block(out, &branch.block, indent);
            }
            if let Some(else_block) = &if_statement.else_block {
                out.push_str(" else ");
                write_block(out, else_block, indent);
            }
            out.push('\n');
        }
        Statement::While(while_loop) => {
            out.push_str("while (");
            out.push_str(&expr_to_source(&while_loop.condition));
            out.push_str(") ");
            write_block(out, &while_loop.body, indent);
            out.push('\n');
        }
        Statement::ForIn(for_in) => {
            out.push_str("for (");
            out.push_str(&for_in.binding.value);
            out.push_str(" in ");
            out.push_str(&expr_to_source(&for_in.iterable));
            out.push_str(") ");
            write_block(out, &for_in.body, indent);
            out.push('\n');
        }
        Statement::Try(try_statement) => {
            out.push_str("try ");
            write_block(out, &try_statement.body, indent);
            if let Some(handler) = &try_statement.handler {
                match &handler.binding {
                    Some(binding) => {
                        out.push_str(" except (");
                        out.push_str(&binding.value);
                        out.push_str(") ");
                    }
                    None => out.push_str(" except "),
                }
                write_block(out, &handler.body, indent);
            }
            if let Some(finally_block) = &try_statement.finally_block {
                out.push_str(" finally ");
                write_block(out, finally_block, indent);
            }
            out.push('\n');
        }
        Statement::Break(_) => out.push_str("break;\n"),
        Statement::Continue(_) => out.push_str("continue;\n"),
        Statement::Return(return_statement) => {
            match &return_statement.value {
                Some(value) => {
                    out.push_str("return ");
                    out.push_str(&expr_to_source(value));
                    out.push_str(";\n");
                }
                None => out.push_str("return;\n"),
            }
        }
        Statement::Throw(throw) => {
            out.push_str("throw ");
            out.push_str(&expr_to_source(&throw.payload));
            out.push_str(";\n");
        }
        Statement::NonLocal(nonlocal) => {
            out.push_str("nonlocal ");
            out.push_str(
                &nonlocal
                    .names
                    .iter()
                    .map(|name| name.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            out.push_str(";\n");
        }
        Statement::Import(import) => {
            out.push_str("import ");
            out.push_str(&import.dotted());
            out.push_str(";\n");
        }
        Statement::FunctionDef(function) => {
            out.push_str("function ");
            out.push_str(&function.name.value);
            out.push('(');
            out.push_str(
                &function
                    .params
                    .iter()
                    .map(|param| param.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            out.push_str(") ");
            write_block(out, &function.body, indent);
            out.push('\n');
        }
        Statement::Capability(capability) => {
            out.push_str("capability ");
            out.push_str(&capability.name.value);
            out.push_str(" {\n");
            for resource in &capability.resources {
                push_indent(out, indent + 1);
                out.push_str("resource ");
                out.push_str(&ml_str(&resource.value));
                out.push_str(";\n");
            }
            for operation in &capability.operations {
                push_indent(out, indent + 1);
                out.push_str("allow ");
                out.push_str(&operation.value);
                out.push_str(";\n");
            }
            push_indent(out, indent);
            out.push_str("}\n");
        }
    }
}

fn target_to_source(target: &AssignTarget) -> String {
    match target {
        AssignTarget::Ident(ident) => ident.value.clone(),
        AssignTarget::Member(member) => {
            format!("{}.{}", expr_to_source(&member.object), member.property)
        }
        AssignTarget::Index(index) => format!(
            "{}[{}]",
            expr_to_source(&index.object),
            expr_to_source(&index.index)
        ),
        AssignTarget::Pattern(pattern) => pattern_to_source(pattern),
    }
}

fn pattern_to_source(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Ident(ident) => ident.value.clone(),
        Pattern::Array(array) => format!(
            "[{}]",
            array
                .elements
                .iter()
                .map(pattern_to_source)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Pattern::Object(object) => format!(
            "{{{}}}",
            object
                .keys
                .iter()
                .map(|key| key.value.clone())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn expr_to_source(expression: &Expression) -> String {
    match expression {
        Expression::Number(number) => match number.value {
            NumberValue::Integer(value) => value.to_string(),
            NumberValue::Float(value) => format!("{value:?}"),
        },
        Expression::Str(string) => ml_str(&string.value),
        Expression::Boolean(boolean) => if boolean.value { "true" } else { "false" }.to_owned(),
        Expression::Null(_) => "null".to_owned(),
        Expression::Array(array) => format!(
            "[{}]",
            array
                .elements
                .iter()
                .map(expr_to_source)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Expression::Object(object) => {
            let entries = object
                .entries
                .iter()
                .map(|entry| {
                    let key = if is_bare_key(&entry.key) {
                        entry.key.clone()
                    } else {
                        ml_str(&entry.key)
                    };
                    format!("{key}: {}", expr_to_source(&entry.value))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{entries}}}")
        }
        Expression::Ident(ident) => ident.value.clone(),
        Expression::Binary(binary) => format!(
            "({} {} {})",
            expr_to_source(&binary.lhs),
            binary.op.source_spelling(),
            expr_to_source(&binary.rhs)
        ),
        Expression::Unary(unary) => {
            let operand = expr_to_source(&unary.operand);
            match unary.op {
                UnaryOp::Neg => format!("(-{operand})"),
                UnaryOp::Not => format!("(!{operand})"),
            }
        }
        Expression::Ternary(ternary) => format!(
            "({} ? {} : {})",
            expr_to_source(&ternary.condition),
            expr_to_source(&ternary.truthy),
            expr_to_source(&ternary.falsy)
        ),
        Expression::Member(member) => {
            format!("{}.{}", expr_to_source(&member.object), member.property)
        }
        Expression::Index(index) => format!(
            "{}[{}]",
            expr_to_source(&index.object),
            expr_to_source(&index.index)
        ),
        Expression::Slice(slice) => {
            let component =
                |part: &Option<Box<Expression>>| part.as_ref().map(|p| expr_to_source(p));
            let start = component(&slice.start).unwrap_or_default();
            let end = component(&slice.end).unwrap_or_default();
            match (slice.has_step_colon, component(&slice.step)) {
                (true, Some(step)) => {
                    format!("{}[{start}:{end}:{step}]", expr_to_source(&slice.object))
                }
                (true, None) => format!("{}[{start}:{end}:]", expr_to_source(&slice.object)),
                (false, _) => format!("{}[{start}:{end}]", expr_to_source(&slice.object)),
            }
        }
        Expression::Call(call) => format!(
            "{}({})",
            expr_to_source(&call.callee),
            call.args
                .iter()
                .map(expr_to_source)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Expression::MethodCall(method_call) => format!(
            "{}.{}({})",
            expr_to_source(&method_call.object),
            method_call.method,
            method_call
                .args
                .iter()
                .map(expr_to_source)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Expression::Lambda(lambda) => {
            let params = lambda
                .params
                .iter()
                .map(|param| param.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            match &lambda.body {
                LambdaBody::Expression(body) => {
                    format!("fn ({params}) => {}", expr_to_source(body))
                }
                LambdaBody::Block(block) => {
                    let mut rendered = format!("fn ({params}) => ");
                    write_block(&mut rendered, block, 0);
                    rendered
                }
            }
        }
    }
}

impl BinaryOp {
    /// Spelling of this operator in ML source.
    pub fn source_spelling(&self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            other => other.target_spelling(),
        }
    }
}

const KEYWORDS: &[&str] = &[
    "function",
    "capability",
    "import",
    "if",
    "elif",
    "else",
    "while",
    "for",
    "in",
    "try",
    "except",
    "finally",
    "break",
    "continue",
    "return",
    "throw",
    "nonlocal",
    "true",
    "false",
    "null",
    "fn",
    "resource",
    "allow",
];

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
        && !KEYWORDS.contains(&key)
}

fn ml_str(value: &str) -> String {
    let mut rendered = String::with_capacity(value.len() + 2);
    rendered.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => rendered.push_str("\\\\"),
            '"' => rendered.push_str("\\\""),
            '\n' => rendered.push_str("\\n"),
            '\r' => rendered.push_str("\\r"),
            '\t' => rendered.push_str("\\t"),
            ch => rendered.push(ch),
        }
    }
    rendered.push('"');
    rendered
}

#[cfg(test)]
mod tests {
    use crate::ast::{Ast, MlParser};

    fn parse(source: &str) -> Ast {
        let pairs = MlParser::parse_program("test.ml", source).expect("parse failed");
        Ast::from_program(pairs, "test.ml").expect("transform failed")
    }

    const PROGRAM: &str = r#"import math;

capability FileReader {
    resource "*.txt";
    allow read;
}

function classify(n) {
    if (n < 0) {
        return "negative";
    } elif (n == 0) {
        return "zero";
    } else {
        return "positive";
    }
}

function walk(rows) {
    total = 0;
    for (row in rows) {
        [head, tail] = row;
        total = total + head;
        while (total > 100) {
            total = total - 100;
        }
    }
    return total;
}

double = fn (x) => x * 2;
shout = fn (s) => { return s; };
arr = [1, -2, 3];
rev = arr[::-1];
mid = arr[1:2];
obj = {name: "demo", size: 3};
obj.size = 4;
label = obj.name;
flag = !true;
pick = flag ? 1 : -1;
try {
    throw "boom";
} except (e) {
    msg = e;
} finally {
}
print(classify(-5));
"#;

    #[test]
    fn test_print_parse_fixpoint() {
        let first = parse(PROGRAM).to_source();
        let second = parse(&first).to_source();
        assert_eq!(first, second, "pretty output must be a parse fixpoint");
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let original = parse(PROGRAM);
        let reparsed = parse(&original.to_source());
        assert_eq!(original.nodes().len(), reparsed.nodes().len());
    }

    #[test]
    fn test_signed_literal_survives_round_trip() {
        let printed = parse("x = -1;").to_source();
        assert_eq!(printed, "x = -1;\n");
    }

    #[test]
    fn test_unary_survives_round_trip() {
        let printed = parse("y = -x; z = !!x;").to_source();
        assert_eq!(printed, "y = (-x);\nz = (!(!x));\n");
    }
}
