//! Code generator: lowers a checked AST to Python source in which every
//! dynamic operation is routed through the safe runtime helpers.
//!
//! The generator is the only pass that fails mid-stream: on the first
//! unknown identifier or whitelist violation the output cannot be
//! meaningfully continued, so it returns a fatal error carrying a
//! structured diagnostic.
mod emit;
mod source_map;
mod symbols;

pub use self::emit::*;
pub use self::source_map::*;
pub use self::symbols::*;

use std::{error::Error, fmt::Display, path::PathBuf};

use log::debug;

use crate::{
    ast::{
        AssignTarget, Assignment, Ast, CapabilityDecl, Expression, FunctionDef, Ident, Import,
        Lambda, LambdaBody, NumberValue, Pattern, Position, Statement,
    },
    diagnostics::{Category, Diagnostic},
    options::{EmitMode, TranspileOptions},
    registry::stdlib_registry,
    resolver::{resolve_import, ResolvedImport, UserModule},
    runtime::RUNTIME_MODULE_NAME,
};

/// Prefix for every generated top-level name (lifted module functions,
/// hoisted lambdas, capability factories).
pub const SENTINEL: &str = "_ml";

/// Fatal code-generation failure wrapping the structured diagnostic
/// that describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenError {
    pub diagnostic: Diagnostic,
}

impl CodegenError {
    fn new(diagnostic: Diagnostic) -> CodegenError {
        CodegenError { diagnostic }
    }
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.diagnostic, f)
    }
}

impl Error for CodegenError {}

/// Result of generating one compilation unit.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub source: String,
    pub source_map: Option<SourceMap>,
    pub diagnostics: Vec<Diagnostic>,
    pub uses_runtime: bool,
}

/// Functions of a module lifted to file scope for single-file output.
#[derive(Debug, Clone)]
pub struct LiftedModule {
    pub name: String,
    pub dotted: String,
    pub defs_source: String,
    pub import_bindings: Vec<String>,
    /// `(public name, lifted name)` pairs for the namespace object.
    pub namespace_members: Vec<(String, String)>,
    pub diagnostics: Vec<Diagnostic>,
    pub uses_runtime: bool,
}

pub struct CodeGenerator<'a> {
    options: &'a TranspileOptions,
    source_dir: Option<PathBuf>,
    symbols: SymbolTable,
    module_prefix: Option<String>,
    mark_user_module: bool,
    suppress_prelude: bool,
    out: String,
    lines_written: usize,
    indent: usize,
    source_map: SourceMap,
    diagnostics: Vec<Diagnostic>,
    lambda_counter: usize,
    pending_defs: Vec<(String, Lambda)>,
    uses_runtime: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a TranspileOptions, source_dir: Option<PathBuf>) -> Self {
        CodeGenerator {
            options,
            source_dir,
            symbols: SymbolTable::new(stdlib_registry().builtin_names()),
            module_prefix: None,
            mark_user_module: false,
            suppress_prelude: false,
            out: String::new(),
            lines_written: 0,
            indent: 0,
            source_map: SourceMap::new(&options.source_name),
            diagnostics: vec![],
            lambda_counter: 0,
            pending_defs: vec![],
            uses_runtime: false,
        }
    }

    /// Mark the unit as a user module: its emitted file carries the
    /// trust sentinel so the attribute helpers accept its members.
    pub fn as_user_module(mut self) -> Self {
        self.mark_user_module = true;
        self
    }

    /// Leave the runtime-import prelude to the caller, which is
    /// assembling several units into one output file.
    pub fn without_prelude(mut self) -> Self {
        self.suppress_prelude = true;
        self
    }

    /// Generate a whole compilation unit.
    pub fn generate(mut self, ast: &Ast) -> Result<GeneratedUnit, CodegenError> {
        debug!(
            "generating unit '{}' ({} top-level statements)",
            self.options.source_name,
            ast.nodes().len()
        );
        self.emit_statements(ast.nodes())?;
        Ok(self.finish())
    }

    /// Generate only the lifted functions of a user module for
    /// single-file output. Inter-module calls are rewritten to the
    /// lifted names, so sibling functions keep calling each other at
    /// file scope.
    pub fn generate_lifted(mut self, module: &UserModule) -> Result<LiftedModule, CodegenError> {
        let prefix = format!("{SENTINEL}_{}", module.dotted.replace('.', "_"));
        self.module_prefix = Some(prefix.clone());

        // register every function up front so ordering and mutual
        // recursion inside the module do not matter
        for statement in module.ast.nodes() {
            if let Statement::FunctionDef(function) = statement {
                self.symbols.add_function(&function.name.value);
            }
        }

        let mut import_bindings = vec![];
        let mut namespace_members = vec![];

        for statement in module.ast.nodes() {
            match statement {
                Statement::FunctionDef(function) => {
                    namespace_members.push((
                        function.name.value.clone(),
                        format!("{prefix}_{}", function.name.value),
                    ));
                    self.emit_function_def(function)?;
                }
                Statement::Import(import) => {
                    if let Some(binding) = self.lifted_import_binding(import)? {
                        import_bindings.push(binding);
                    }
                }
                other => {
                    self.diagnostics.push(Diagnostic::warning(
                        Category::Whitelist,
                        "GEN002",
                        format!(
                            "top-level statement in module '{}' is not carried into \
                             single-file output",
                            module.name
                        ),
                        &other.position(),
                    ));
                }
            }
        }

        namespace_members.sort();

        Ok(LiftedModule {
            name: module.name.clone(),
            dotted: module.dotted.clone(),
            defs_source: self.out,
            import_bindings,
            namespace_members,
            diagnostics: self.diagnostics,
            uses_runtime: self.uses_runtime,
        })
    }

    fn lifted_import_binding(&mut self, import: &Import) -> Result<Option<String>, CodegenError> {
        match self.resolve(import)? {
            ResolvedImport::Stdlib(metadata) => {
                self.uses_runtime = true;
                self.symbols.add_import(import.module_name());
                Ok(Some(format!(
                    "{name} = {RUNTIME_MODULE_NAME}.load_module(\"{name}\")",
                    name = metadata.name
                )))
            }
            ResolvedImport::Host(dotted) => {
                self.symbols.add_import(import.module_name());
                Ok(Some(host_import_line(&dotted, import.module_name())))
            }
            ResolvedImport::User { name, .. } => {
                // the namespace object is bound by the single-file
                // assembly before any lifted function runs
                self.symbols.add_import(&name);
                Ok(None)
            }
        }
    }

    fn finish(self) -> GeneratedUnit {
        let mut source = String::new();
        let mut source_map = self.source_map;
        let mut prelude_lines = 0;

        if self.uses_runtime && !self.suppress_prelude {
            source.push_str(&format!("import {RUNTIME_MODULE_NAME}\n"));
            source.push_str(&format!(
                "from {RUNTIME_MODULE_NAME} import builtin, safe_call, safe_attr_access, \
                 safe_attr_assign, safe_method_call, MLUserException\n\n"
            ));
            prelude_lines += 3;
        }
        if self.mark_user_module {
            source.push_str("_is_user_module = True\n\n");
            prelude_lines += 2;
        }

        source_map.shift(prelude_lines);
        source.push_str(&self.out);

        GeneratedUnit {
            source,
            source_map: self.options.source_maps.then_some(source_map),
            diagnostics: self.diagnostics,
            uses_runtime: self.uses_runtime,
        }
    }

    // -----------------------------------------------------------------
    // low-level output

    fn push_line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
        } else {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
            self.out.push('\n');
        }
        self.lines_written += 1;
    }

    fn map_position(&mut self, position: &Position) {
        self.source_map.add(self.lines_written + 1, position);
    }

    fn cancelled(&self) -> CodegenError {
        CodegenError::new(Diagnostic::error(
            Category::Cancelled,
            "CAN001",
            "compilation cancelled",
            &(self.options.source_name.clone(), 0, 0),
        ))
    }

    fn unknown_identifier(&self, ident: &Ident) -> CodegenError {
        let mut diagnostic = Diagnostic::error(
            Category::UnknownIdentifier,
            "NAME001",
            format!("unknown identifier '{}'", ident.value),
            &ident.position,
        );

        for (label, names) in self.symbols.nearby_names(&ident.value) {
            diagnostic = diagnostic.with_hint(format!("known {label}: {}", names.join(", ")));
        }
        if let Some(suggestion) = self.symbols.suggestion(&ident.value) {
            diagnostic = diagnostic.with_remediation(format!("did you mean '{suggestion}'?"));
        }

        CodegenError::new(diagnostic)
    }

    // -----------------------------------------------------------------
    // statements

    fn emit_statements(&mut self, statements: &[Statement]) -> Result<(), CodegenError> {
        if statements.is_empty() {
            self.push_line("pass");
            return Ok(());
        }

        for (index, statement) in statements.iter().enumerate() {
            if self.options.cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            if let Statement::Capability(capability) = statement {
                return self.emit_capability(capability, &statements[index + 1..]);
            }
            self.emit_statement(statement)?;
        }

        Ok(())
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Assignment(assignment) => self.emit_assignment(assignment),
            Statement::Expression(expression) => {
                let rendered = self.emit_expr(expression)?;
                self.flush_pending()?;
                self.map_position(&expression.position());
                self.push_line(&rendered);
                Ok(())
            }
            Statement::If(if_statement) => {
                let condition = self.emit_expr(&if_statement.condition)?;
                self.flush_pending()?;
                self.map_position(&if_statement.position);
                self.push_line(&format!("if {condition}:"));
                self.indent += 1;
                self.emit_statements(&if_statement.then_block.statements)?;
                self.indent -= 1;

                for branch in &if_statement.elif_branches {
                    let condition = self.emit_expr(&branch.condition)?;
                    self.flush_pending()?;
                    self.map_position(&branch.position);
                    self.push_line(&format!("elif {condition}:"));
                    self.indent += 1;
                    self.emit_statements(&branch.block.statements)?;
                    self.indent -= 1;
                }

                if let Some(else_block) = &if_statement.else_block {
                    self.push_line("else:");
                    self.indent += 1;
                    self.emit_statements(&else_block.statements)?;
                    self.indent -= 1;
                }
                Ok(())
            }
            Statement::While(while_loop) => {
                let condition = self.emit_expr(&while_loop.condition)?;
                self.flush_pending()?;
                self.map_position(&while_loop.position);
                self.push_line(&format!("while {condition}:"));
                self.indent += 1;
                self.emit_statements(&while_loop.body.statements)?;
                self.indent -= 1;
                Ok(())
            }
            Statement::ForIn(for_in) => {
                let iterable = self.emit_expr(&for_in.iterable)?;
                self.flush_pending()?;
                self.symbols.add_variable(&for_in.binding.value);
                self.map_position(&for_in.position);
                self.push_line(&format!("for {} in {iterable}:", for_in.binding.value));
                self.indent += 1;
                self.emit_statements(&for_in.body.statements)?;
                self.indent -= 1;
                Ok(())
            }
            Statement::Try(try_statement) => {
                self.map_position(&try_statement.position);
                self.push_line("try:");
                self.indent += 1;
                self.emit_statements(&try_statement.body.statements)?;
                self.indent -= 1;

                if let Some(handler) = &try_statement.handler {
                    match &handler.binding {
                        Some(binding) => {
                            self.symbols.add_variable(&binding.value);
                            self.push_line(&format!("except Exception as {}:", binding.value));
                        }
                        None => self.push_line("except Exception:"),
                    }
                    self.indent += 1;
                    self.emit_statements(&handler.body.statements)?;
                    self.indent -= 1;
                }

                match &try_statement.finally_block {
                    Some(finally_block) => {
                        self.push_line("finally:");
                        self.indent += 1;
                        self.emit_statements(&finally_block.statements)?;
                        self.indent -= 1;
                    }
                    // a bare `try { }` still needs a clause to be valid
                    // in the host language
                    None if try_statement.handler.is_none() => {
                        self.push_line("finally:");
                        self.indent += 1;
                        self.push_line("pass");
                        self.indent -= 1;
                    }
                    None => {}
                }
                Ok(())
            }
            Statement::Break(break_statement) => {
                self.map_position(&break_statement.position);
                self.push_line("break");
                Ok(())
            }
            Statement::Continue(continue_statement) => {
                self.map_position(&continue_statement.position);
                self.push_line("continue");
                Ok(())
            }
            Statement::Return(return_statement) => {
                let rendered = match &return_statement.value {
                    Some(value) => {
                        let value = self.emit_expr(value)?;
                        format!("return {value}")
                    }
                    None => "return".to_owned(),
                };
                self.flush_pending()?;
                self.map_position(&return_statement.position);
                self.push_line(&rendered);
                Ok(())
            }
            Statement::Throw(throw) => {
                self.uses_runtime = true;
                let payload = self.emit_expr(&throw.payload)?;
                self.flush_pending()?;
                self.map_position(&throw.position);
                self.push_line(&format!("raise MLUserException({payload})"));
                Ok(())
            }
            Statement::NonLocal(nonlocal) => {
                let names = nonlocal
                    .names
                    .iter()
                    .map(|name| name.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                for name in &nonlocal.names {
                    self.symbols.add_variable(&name.value);
                }
                self.map_position(&nonlocal.position);
                self.push_line(&format!("nonlocal {names}"));
                Ok(())
            }
            Statement::Import(import) => self.emit_import(import),
            Statement::FunctionDef(function) => self.emit_function_def(function),
            Statement::Capability(capability) => self.emit_capability(capability, &[]),
        }
    }

    fn emit_function_def(&mut self, function: &FunctionDef) -> Result<(), CodegenError> {
        let emitted_name = match &self.module_prefix {
            Some(prefix) => format!("{prefix}_{}", function.name.value),
            None => function.name.value.clone(),
        };
        self.symbols.add_function(&function.name.value);

        let params = function
            .params
            .iter()
            .map(|param| param.value.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        self.map_position(&function.position);
        self.push_line(&format!("def {emitted_name}({params}):"));
        self.symbols
            .push_frame(function.params.iter().map(|param| param.value.clone()));
        self.indent += 1;
        self.emit_statements(&function.body.statements)?;
        self.indent -= 1;
        self.symbols.pop_frame();
        self.push_line("");
        Ok(())
    }

    fn emit_capability(
        &mut self,
        capability: &CapabilityDecl,
        rest: &[Statement],
    ) -> Result<(), CodegenError> {
        self.uses_runtime = true;

        let factory = format!("{SENTINEL}_cap_{}", capability.name.value);
        let resources = capability
            .resources
            .iter()
            .map(|resource| py_str(&resource.value))
            .collect::<Vec<_>>()
            .join(", ");
        let operations = capability
            .operations
            .iter()
            .map(|operation| py_str(&operation.value))
            .collect::<Vec<_>>()
            .join(", ");

        self.map_position(&capability.position);
        self.push_line(&format!("def {factory}():"));
        self.indent += 1;
        self.push_line(&format!(
            "return {RUNTIME_MODULE_NAME}.create_capability({name}, [{resources}], [{operations}])",
            name = py_str(&capability.name.value)
        ));
        self.indent -= 1;
        self.push_line("");

        self.push_line(&format!(
            "with {RUNTIME_MODULE_NAME}.use_capability({factory}()):"
        ));
        self.indent += 1;
        self.emit_statements(rest)?;
        self.indent -= 1;
        Ok(())
    }

    fn resolve(&self, import: &Import) -> Result<ResolvedImport, CodegenError> {
        resolve_import(import, self.options, self.source_dir.as_deref()).map_err(|err| {
            CodegenError::new(Diagnostic::error(
                Category::Import,
                "IMP001",
                err.message.clone(),
                &err.position,
            ))
        })
    }

    fn emit_import(&mut self, import: &Import) -> Result<(), CodegenError> {
        match self.resolve(import)? {
            ResolvedImport::Stdlib(metadata) => {
                self.uses_runtime = true;
                self.symbols.add_import(import.module_name());
                self.map_position(&import.position);
                self.push_line(&format!(
                    "{name} = {RUNTIME_MODULE_NAME}.load_module(\"{name}\")",
                    name = metadata.name
                ));
            }
            ResolvedImport::Host(dotted) => {
                self.symbols.add_import(import.module_name());
                self.map_position(&import.position);
                self.push_line(&host_import_line(&dotted, import.module_name()));
            }
            ResolvedImport::User { name, .. } => {
                self.symbols.add_import(&name);
                match self.options.emit_mode {
                    EmitMode::MultiFile => {
                        self.map_position(&import.position);
                        if import.segments.len() > 1 {
                            let parent = import.segments[..import.segments.len() - 1].join(".");
                            self.push_line(&format!("from {parent} import {name}"));
                        } else {
                            self.push_line(&format!("import {name}"));
                        }
                    }
                    // inlined modes bind the namespace object before the
                    // main body runs
                    EmitMode::SingleFile | EmitMode::Silent => {}
                }
            }
        }
        Ok(())
    }

    fn emit_assignment(&mut self, assignment: &Assignment) -> Result<(), CodegenError> {
        let value = self.emit_expr(&assignment.value)?;

        match &assignment.target {
            AssignTarget::Ident(ident) => {
                self.flush_pending()?;
                self.symbols.add_variable(&ident.value);
                self.map_position(&assignment.position);
                self.push_line(&format!("{} = {value}", ident.value));
            }
            AssignTarget::Member(member) => {
                self.uses_runtime = true;
                let object = self.emit_expr(&member.object)?;
                self.flush_pending()?;
                self.map_position(&assignment.position);
                self.push_line(&format!(
                    "safe_attr_assign({object}, {prop}, {value})",
                    prop = py_str(&member.property)
                ));
            }
            AssignTarget::Index(index) => {
                let object = self.emit_expr(&index.object)?;
                let subscript = self.emit_expr(&index.index)?;
                self.flush_pending()?;
                self.map_position(&assignment.position);
                self.push_line(&format!("{object}[{subscript}] = {value}"));
            }
            AssignTarget::Pattern(pattern) => {
                for name in pattern.bound_names() {
                    self.symbols.add_variable(&name);
                }
                self.flush_pending()?;
                self.map_position(&assignment.position);
                self.emit_pattern_assignment(pattern, &value)?;
            }
        }
        Ok(())
    }

    /// Emit a destructuring assignment. Array patterns use the host's
    /// native unpacking; object patterns extract their keys through the
    /// runtime helper so the underscore rule covers them.
    fn emit_pattern_assignment(
        &mut self,
        pattern: &Pattern,
        value: &str,
    ) -> Result<(), CodegenError> {
        match pattern {
            Pattern::Ident(ident) => {
                self.push_line(&format!("{} = {value}", ident.value));
                Ok(())
            }
            Pattern::Object(object) => {
                self.uses_runtime = true;
                let names = object
                    .keys
                    .iter()
                    .map(|key| key.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let keys = object
                    .keys
                    .iter()
                    .map(|key| py_str(&key.value))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push_line(&format!(
                    "{names} = {RUNTIME_MODULE_NAME}.destructure_object({value}, [{keys}])"
                ));
                Ok(())
            }
            Pattern::Array(array) => {
                let mut post = vec![];
                let target = self.array_pattern_target(&array.elements, &mut post)?;
                self.push_line(&format!("{target} = {value}"));
                for line in post {
                    self.push_line(&line);
                }
                Ok(())
            }
        }
    }

    fn array_pattern_target(
        &mut self,
        elements: &[Pattern],
        post: &mut Vec<String>,
    ) -> Result<String, CodegenError> {
        let mut parts = vec![];
        for element in elements {
            match element {
                Pattern::Ident(ident) => parts.push(ident.value.clone()),
                Pattern::Array(nested) => {
                    let inner = self.array_pattern_target(&nested.elements, post)?;
                    parts.push(format!("({inner})"));
                }
                Pattern::Object(object) => {
                    self.uses_runtime = true;
                    let tmp = format!("{SENTINEL}_tmp{}", self.lambda_counter);
                    self.lambda_counter += 1;
                    let names = object
                        .keys
                        .iter()
                        .map(|key| key.value.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    let keys = object
                        .keys
                        .iter()
                        .map(|key| py_str(&key.value))
                        .collect::<Vec<_>>()
                        .join(", ");
                    post.push(format!(
                        "{names} = {RUNTIME_MODULE_NAME}.destructure_object({tmp}, [{keys}])"
                    ));
                    parts.push(tmp);
                }
            }
        }
        Ok(parts.join(", "))
    }

    fn flush_pending(&mut self) -> Result<(), CodegenError> {
        while !self.pending_defs.is_empty() {
            let (name, lambda) = self.pending_defs.remove(0);
            let params = lambda
                .params
                .iter()
                .map(|param| param.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            self.map_position(&lambda.position);
            self.push_line(&format!("def {name}({params}):"));
            self.symbols
                .push_frame(lambda.params.iter().map(|param| param.value.clone()));
            self.indent += 1;
            match &lambda.body {
                LambdaBody::Block(block) => self.emit_statements(&block.statements)?,
                LambdaBody::Expression(expression) => {
                    let value = self.emit_expr(expression)?;
                    self.push_line(&format!("return {value}"));
                }
            }
            self.indent -= 1;
            self.symbols.pop_frame();
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // expressions

    fn emit_expr(&mut self, expression: &Expression) -> Result<String, CodegenError> {
        match expression {
            Expression::Number(number) => Ok(match number.value {
                NumberValue::Integer(value) => value.to_string(),
                NumberValue::Float(value) => format!("{value:?}"),
            }),
            Expression::Str(string) => Ok(py_str(&string.value)),
            Expression::Boolean(boolean) => {
                Ok(if boolean.value { "True" } else { "False" }.to_owned())
            }
            Expression::Null(_) => Ok("None".to_owned()),
            Expression::Array(array) => {
                let elements = array
                    .elements
                    .iter()
                    .map(|element| self.emit_expr(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", elements.join(", ")))
            }
            Expression::Object(object) => {
                let entries = object
                    .entries
                    .iter()
                    .map(|entry| {
                        Ok(format!(
                            "{}: {}",
                            py_str(&entry.key),
                            self.emit_expr(&entry.value)?
                        ))
                    })
                    .collect::<Result<Vec<_>, CodegenError>>()?;
                Ok(format!("{{{}}}", entries.join(", ")))
            }
            Expression::Ident(ident) => self.emit_ident(ident),
            Expression::Binary(binary) => {
                let lhs = self.emit_expr(&binary.lhs)?;
                let rhs = self.emit_expr(&binary.rhs)?;
                Ok(format!("({lhs} {} {rhs})", binary.op.target_spelling()))
            }
            Expression::Unary(unary) => {
                let operand = self.emit_expr(&unary.operand)?;
                Ok(match unary.op {
                    crate::ast::UnaryOp::Neg => format!("(-{operand})"),
                    crate::ast::UnaryOp::Not => format!("(not {operand})"),
                })
            }
            Expression::Ternary(ternary) => {
                let condition = self.emit_expr(&ternary.condition)?;
                let truthy = self.emit_expr(&ternary.truthy)?;
                let falsy = self.emit_expr(&ternary.falsy)?;
                Ok(format!("({truthy} if {condition} else {falsy})"))
            }
            Expression::Member(member) => {
                self.uses_runtime = true;
                let object = self.emit_expr(&member.object)?;
                Ok(format!(
                    "safe_attr_access({object}, {})",
                    py_str(&member.property)
                ))
            }
            Expression::Index(index) => {
                let object = self.emit_expr(&index.object)?;
                let subscript = self.emit_expr(&index.index)?;
                Ok(format!("{object}[{subscript}]"))
            }
            Expression::Slice(slice) => {
                let object = self.emit_expr(&slice.object)?;
                let start = slice
                    .start
                    .as_ref()
                    .map(|component| self.emit_expr(component))
                    .transpose()?
                    .unwrap_or_default();
                let end = slice
                    .end
                    .as_ref()
                    .map(|component| self.emit_expr(component))
                    .transpose()?
                    .unwrap_or_default();
                let step = slice
                    .step
                    .as_ref()
                    .map(|component| self.emit_expr(component))
                    .transpose()?;

                Ok(match (slice.has_step_colon, step) {
                    (true, Some(step)) => format!("{object}[{start}:{end}:{step}]"),
                    (true, None) => format!("{object}[{start}:{end}:]"),
                    (false, _) => format!("{object}[{start}:{end}]"),
                })
            }
            Expression::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.emit_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");

                if let Expression::Ident(ident) = call.callee.as_ref() {
                    match self.symbols.resolve(&ident.value) {
                        Some(ResolvedName::Function) => {
                            let name = match &self.module_prefix {
                                Some(prefix) => format!("{prefix}_{}", ident.value),
                                None => ident.value.clone(),
                            };
                            Ok(format!("{name}({args})"))
                        }
                        Some(ResolvedName::Variable) | Some(ResolvedName::Parameter) => {
                            Ok(format!("{}({args})", ident.value))
                        }
                        Some(ResolvedName::Builtin) => {
                            self.uses_runtime = true;
                            Ok(format!("builtin.{}({args})", ident.value))
                        }
                        Some(ResolvedName::Import) => {
                            self.uses_runtime = true;
                            Ok(call_through_helper(&ident.value, &args))
                        }
                        Some(ResolvedName::Literal(literal)) => {
                            self.uses_runtime = true;
                            Ok(call_through_helper(literal, &args))
                        }
                        None => Err(self.unknown_identifier(ident)),
                    }
                } else {
                    self.uses_runtime = true;
                    let callee = self.emit_expr(&call.callee)?;
                    Ok(call_through_helper(&callee, &args))
                }
            }
            Expression::MethodCall(method_call) => {
                self.uses_runtime = true;
                let object = self.emit_expr(&method_call.object)?;
                let args = method_call
                    .args
                    .iter()
                    .map(|arg| self.emit_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut rendered = format!(
                    "safe_method_call({object}, {}",
                    py_str(&method_call.method)
                );
                for arg in args {
                    rendered.push_str(", ");
                    rendered.push_str(&arg);
                }
                rendered.push(')');
                Ok(rendered)
            }
            Expression::Lambda(lambda) => self.emit_lambda(lambda),
        }
    }

    fn emit_ident(&mut self, ident: &Ident) -> Result<String, CodegenError> {
        match self.symbols.resolve(&ident.value) {
            Some(ResolvedName::Function) => Ok(match &self.module_prefix {
                Some(prefix) => format!("{prefix}_{}", ident.value),
                None => ident.value.clone(),
            }),
            Some(ResolvedName::Variable)
            | Some(ResolvedName::Parameter)
            | Some(ResolvedName::Import) => Ok(ident.value.clone()),
            Some(ResolvedName::Builtin) => {
                self.uses_runtime = true;
                Ok(format!("builtin.{}", ident.value))
            }
            Some(ResolvedName::Literal(literal)) => Ok(literal.to_owned()),
            None => Err(self.unknown_identifier(ident)),
        }
    }

    fn emit_lambda(&mut self, lambda: &Lambda) -> Result<String, CodegenError> {
        match &lambda.body {
            LambdaBody::Expression(body) => {
                let params = lambda
                    .params
                    .iter()
                    .map(|param| param.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.symbols
                    .push_frame(lambda.params.iter().map(|param| param.value.clone()));
                let body = self.emit_expr(body);
                self.symbols.pop_frame();
                Ok(format!("(lambda {params}: {})", body?))
            }
            LambdaBody::Block(_) => {
                // block-bodied lambdas hoist to a named def right before
                // the statement that uses them
                let name = format!("{SENTINEL}_lambda_{}", self.lambda_counter);
                self.lambda_counter += 1;
                self.pending_defs.push((name.clone(), lambda.clone()));
                Ok(name)
            }
        }
    }
}

fn call_through_helper(callee: &str, args: &str) -> String {
    if args.is_empty() {
        format!("safe_call({callee})")
    } else {
        format!("safe_call({callee}, {args})")
    }
}

fn host_import_line(dotted: &str, binding: &str) -> String {
    if dotted.contains('.') {
        format!("import {dotted} as {binding}")
    } else {
        format!("import {dotted}")
    }
}

/// Render a string as a host string literal.
pub(crate) fn py_str(value: &str) -> String {
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
    use crate::ast::MlParser;

    use super::*;

    fn generate(source: &str) -> String {
        let pairs = MlParser::parse_program("test.ml", source).expect("parse failed");
        let ast = Ast::from_program(pairs, "test.ml").expect("transform failed");
        let options = TranspileOptions::silent();
        CodeGenerator::new(&options, None)
            .generate(&ast)
            .expect("generation failed")
            .source
    }

    fn generate_err(source: &str) -> CodegenError {
        let pairs = MlParser::parse_program("test.ml", source).expect("parse failed");
        let ast = Ast::from_program(pairs, "test.ml").expect("transform failed");
        let options = TranspileOptions::silent();
        CodeGenerator::new(&options, None)
            .generate(&ast)
            .expect_err("generation should fail")
    }

    #[test]
    fn test_builtin_call_routed_through_module_object() {
        let output = generate("x = len([1, 2, 3]); print(x);");
        assert!(output.contains("x = builtin.len([1, 2, 3])"), "{output}");
        assert!(output.contains("builtin.print(x)"), "{output}");
        assert!(!output.contains("\nlen("), "no bare len: {output}");
    }

    #[test]
    fn test_unknown_identifier_fails_with_suggestion() {
        let err = generate_err("y = type(42);");
        assert_eq!(err.diagnostic.category, Category::UnknownIdentifier);
        assert!(err.diagnostic.message.contains("'type'"));
        assert_eq!(
            err.diagnostic.remediation.as_deref(),
            Some("did you mean 'typeof'?")
        );
    }

    #[test]
    fn test_unary_operators_preserved() {
        let output = generate("x = 1; a = -(x + 1); b = !x; c = !!x;");
        assert!(output.contains("a = (-(x + 1))"), "{output}");
        assert!(output.contains("b = (not x)"), "{output}");
        assert!(output.contains("c = (not (not x))"), "{output}");
    }

    #[test]
    fn test_signed_literal_stays_literal() {
        let output = generate("x = -5;");
        assert!(output.contains("x = -5"), "{output}");
    }

    #[test]
    fn test_method_call_routed() {
        let output = generate("obj = {}; y = obj.update(1);");
        assert!(
            output.contains("y = safe_method_call(obj, \"update\", 1)"),
            "{output}"
        );
    }

    #[test]
    fn test_attribute_access_routed() {
        let output = generate("obj = {}; y = obj.size;");
        assert!(output.contains("y = safe_attr_access(obj, \"size\")"), "{output}");
    }

    #[test]
    fn test_member_assignment_routed() {
        let output = generate("obj = {}; obj.size = 3;");
        assert!(
            output.contains("safe_attr_assign(obj, \"size\", 3)"),
            "{output}"
        );
    }

    #[test]
    fn test_slices_lower_natively() {
        let output = generate(
            "arr = [1, 2, 3, 4, 5]; a = arr[:]; b = arr[::-1]; c = arr[-1:]; d = arr[1:100]; e = arr[3:1];",
        );
        assert!(output.contains("a = arr[:]"), "{output}");
        assert!(output.contains("b = arr[::-1]"), "{output}");
        assert!(output.contains("c = arr[-1:]"), "{output}");
        assert!(output.contains("d = arr[1:100]"), "{output}");
        assert!(output.contains("e = arr[3:1]"), "{output}");
    }

    #[test]
    fn test_empty_finally_emits_noop() {
        let output = generate("try { x = 1; } finally { }");
        assert!(output.contains("finally:"), "{output}");
        let after_finally = output.split("finally:").nth(1).expect("finally present");
        assert!(after_finally.contains("pass"), "{output}");
    }

    #[test]
    fn test_bare_try_gets_synthetic_finally() {
        let output = generate("try { x = 1; }");
        assert!(output.contains("finally:"), "{output}");
    }

    #[test]
    fn test_throw_wraps_payload() {
        let output = generate("throw \"boom\";");
        assert!(output.contains("raise MLUserException(\"boom\")"), "{output}");
    }

    #[test]
    fn test_empty_if_body_emits_pass() {
        let output = generate("x = 1; if (x) { }");
        assert!(output.contains("if x:"), "{output}");
        assert!(output.contains("pass"), "{output}");
    }

    #[test]
    fn test_function_def_and_call() {
        let output = generate("function double(n) { return n * 2; } y = double(4);");
        assert!(output.contains("def double(n):"), "{output}");
        assert!(output.contains("return (n * 2)"), "{output}");
        assert!(output.contains("y = double(4)"), "{output}");
    }

    #[test]
    fn test_expression_lambda() {
        let output = generate("double = fn (x) => x * 2;");
        assert!(output.contains("double = (lambda x: (x * 2))"), "{output}");
    }

    #[test]
    fn test_block_lambda_hoisted() {
        let output = generate("run = fn (x) => { return x; };");
        assert!(output.contains("def _ml_lambda_0(x):"), "{output}");
        assert!(output.contains("run = _ml_lambda_0"), "{output}");
    }

    #[test]
    fn test_capability_scaffolding() {
        let output = generate(
            "capability FileReader {\n    resource \"*.txt\";\n    allow read;\n}\nfunction main() { return null; }\n",
        );
        assert!(output.contains("def _ml_cap_FileReader():"), "{output}");
        assert!(
            output.contains(
                "return ml_runtime.create_capability(\"FileReader\", [\"*.txt\"], [\"read\"])"
            ),
            "{output}"
        );
        assert!(
            output.contains("with ml_runtime.use_capability(_ml_cap_FileReader()):"),
            "{output}"
        );
        // the declaration's region covers the following statements
        let with_index = output.find("with ml_runtime").expect("with present");
        let def_index = output.find("def main").expect("main def present");
        assert!(def_index > with_index, "{output}");
    }

    #[test]
    fn test_stdlib_import_binding() {
        let output = generate("import math; y = math.sqrt(4);");
        assert!(
            output.contains("math = ml_runtime.load_module(\"math\")"),
            "{output}"
        );
        assert!(
            output.contains("y = safe_method_call(math, \"sqrt\", 4)"),
            "{output}"
        );
    }

    #[test]
    fn test_object_destructuring_through_helper() {
        let output = generate("point = {x: 1, y: 2}; {x, y} = point;");
        assert!(
            output.contains("x, y = ml_runtime.destructure_object(point, [\"x\", \"y\"])"),
            "{output}"
        );
    }

    #[test]
    fn test_array_destructuring_native() {
        let output = generate("rows = [[1, 2], [3, 4]]; [a, [b, c]] = rows;");
        assert!(output.contains("a, (b, c) = rows"), "{output}");
    }

    #[test]
    fn test_nonlocal_emitted() {
        let output = generate(
            "function outer() { x = 1; function inner() { nonlocal x; x = 2; } inner(); }",
        );
        assert!(output.contains("nonlocal x"), "{output}");
    }

    #[test]
    fn test_runtime_header_only_when_needed() {
        let plain = generate("x = 1;");
        assert!(!plain.contains("import ml_runtime"), "{plain}");

        let with_builtin = generate("x = len([1]);");
        assert!(with_builtin.contains("import ml_runtime"), "{with_builtin}");
    }

    #[test]
    fn test_idempotent_generation() {
        let source = "x = len([1, 2, 3]); print(x);";
        assert_eq!(generate(source), generate(source));
    }

    #[test]
    fn test_ternary_emitted() {
        let output = generate("x = 1; y = x ? 2 : 3;");
        assert!(output.contains("y = (2 if x else 3)"), "{output}");
    }

    #[test]
    fn test_source_map_records_positions() {
        let pairs = MlParser::parse_program("test.ml", "x = 1;\ny = 2;").expect("parse");
        let ast = Ast::from_program(pairs, "test.ml").expect("transform");
        let options = TranspileOptions {
            source_maps: true,
            ..TranspileOptions::silent()
        };
        let unit = CodeGenerator::new(&options, None)
            .generate(&ast)
            .expect("generation failed");

        let source_map = unit.source_map.expect("source map requested");
        assert_eq!(source_map.mappings.len(), 2);
        assert_eq!(source_map.mappings[0].src_line, 1);
        assert_eq!(source_map.mappings[1].src_line, 2);
    }
}
