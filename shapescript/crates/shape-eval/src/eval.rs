//! The tree-walking evaluator.
//!
//! Statements execute in source order against an [`EvalContext`]. Geometry
//! is produced as [`Geometry`] nodes that build lazily through the mesh
//! kernel and cache; a single runtime error aborts evaluation.
//!
//! The parser cannot know which names are commands, so a line like
//! `fill text "hello"` arrives as one operand tuple. Disambiguation
//! happens here: an identifier that resolves to an argument-taking
//! function consumes the operands that follow it.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use shape_geom::{
    CancellationToken, Color, Geometry, GeometryCache, GeometryKind, Halfturns, MeshKernel,
    Path, PathPoint, Polygon, Primitive, Texture, Transform, Vector,
};
use shape_lex::{InfixOp, PrefixOp};
use shape_par::ast::{
    Block, Definition, Expression, ExpressionKind, Identifier, Program, Statement, StatementKind,
};
use shape_util::diagnostic::{Diagnostic, DiagnosticBuilder, W_UNUSED_VALUE};
use shape_util::span::{FileId, Span};
use shape_util::symbol::Symbol;

use crate::context::{
    Binding, EvalContext, ScopeId, ScopeKind, UserBlock, UserFunction,
};
use crate::convert::{convert, ConvertError};
use crate::delegate::Delegate;
use crate::error::{nearest_matches, RuntimeError, RuntimeErrorKind};
use crate::stdlib::{apply_math, apply_string, Builtin, BuiltinKind};
use crate::types::{ordinal_index, ValueType};
use crate::value::{RangeValue, Value};

pub type EvalResult<T> = Result<T, RuntimeError>;

/// Evaluates programs against a context, producing scene children, a log,
/// and non-fatal warnings.
pub struct Evaluator<'a> {
    pub ctx: EvalContext,
    delegate: &'a dyn Delegate,
    kernel: &'a dyn MeshKernel,
    cache: Arc<GeometryCache>,
    cancel: CancellationToken,
    /// Values logged by `print`, in order.
    pub log: Vec<Value>,
    /// Non-fatal diagnostics (unused values, unresolved textures).
    pub warnings: Vec<Diagnostic>,
    /// Files currently being imported, outermost first.
    import_stack: Vec<PathBuf>,
    /// Parsed sub-programs, keyed by resolved path.
    import_cache: FxHashMap<PathBuf, Arc<Program>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        delegate: &'a dyn Delegate,
        kernel: &'a dyn MeshKernel,
        cache: Arc<GeometryCache>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx: EvalContext::new(),
            delegate,
            kernel,
            cache,
            cancel,
            log: Vec::new(),
            warnings: Vec::new(),
            import_stack: Vec::new(),
            import_cache: FxHashMap::default(),
        }
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    /// Execute a whole program at the root scope.
    pub fn evaluate(&mut self, program: &Program) -> EvalResult<()> {
        self.exec_statements(&program.statements)
    }

    /// Execute one statement at the current scope. Hosts that feed a
    /// program line by line (a REPL) use this instead of [`evaluate`].
    ///
    /// [`evaluate`]: Evaluator::evaluate
    pub fn exec(&mut self, statement: &Statement) -> EvalResult<()> {
        self.exec_statement(statement)
    }

    /// The root scope's accumulated children (the scene).
    pub fn take_children(&mut self) -> Vec<Value> {
        let root = self.ctx.root_id();
        self.ctx.take_children(root)
    }

    // ----- statements ----------------------------------------------------

    fn exec_statements(&mut self, statements: &[Statement]) -> EvalResult<()> {
        for statement in statements {
            self.exec_statement(statement)?;
        }
        Ok(())
    }

    fn exec_statement(&mut self, statement: &Statement) -> EvalResult<()> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::new(RuntimeErrorKind::Cancelled, statement.span));
        }
        match &statement.kind {
            StatementKind::Define(name, definition) => self.exec_define(name, definition),
            StatementKind::Option(name, default) => self.exec_option(name, default),
            StatementKind::Command(name, argument) => {
                self.exec_command(name, argument.as_ref(), statement.span)
            }
            StatementKind::ForLoop {
                index,
                iterable,
                body,
            } => self.exec_for(index.as_ref(), iterable, body),
            StatementKind::IfElse {
                condition,
                then_body,
                else_body,
            } => self.exec_if(condition, then_body, else_body.as_ref()),
            StatementKind::Switch {
                subject,
                cases,
                default,
            } => self.exec_switch(subject, cases, default.as_ref()),
            StatementKind::Import(path) => self.exec_import(path, statement.span),
            StatementKind::Expression(expression) => {
                let value = self.eval_expr(expression)?;
                self.route_value(value, expression.span);
                Ok(())
            }
        }
    }

    fn exec_define(&mut self, name: &Identifier, definition: &Definition) -> EvalResult<()> {
        let binding = match definition {
            Definition::Expression(expression) => {
                Binding::Constant(self.eval_expr(expression)?)
            }
            Definition::Block(body) => Binding::Block(Arc::new(UserBlock {
                name: name.name,
                body: body.clone(),
                captured: self.ctx.current_id(),
                options: declared_options(body),
                ty: Default::default(),
            })),
            Definition::Function(params, body) => Binding::Function(Arc::new(UserFunction {
                name: name.name,
                params: params.clone(),
                body: body.clone(),
                captured: self.ctx.current_id(),
                ty: Default::default(),
            })),
        };
        self.ctx.define(name.name, binding).map_err(|()| {
            RuntimeError::new(
                RuntimeErrorKind::Redefinition {
                    name: name.name.as_str().to_string(),
                },
                name.span,
            )
        })
    }

    /// `option NAME default`: bind the override collected by the call
    /// body, coerced to the default's type, or the default itself.
    fn exec_option(&mut self, name: &Identifier, default: &Expression) -> EvalResult<()> {
        let default_value = self.eval_expr(default)?;
        let value = match self.ctx.current_mut().option_values.remove(&name.name) {
            Some(supplied) => {
                let target = ValueType::of(&default_value);
                self.coerce(supplied, &target, name.name.as_str(), name.span)?
            }
            None => default_value,
        };
        self.ctx.define(name.name, Binding::Constant(value)).map_err(|()| {
            RuntimeError::new(
                RuntimeErrorKind::Redefinition {
                    name: name.name.as_str().to_string(),
                },
                name.span,
            )
        })
    }

    fn exec_command(
        &mut self,
        name: &Identifier,
        argument: Option<&Expression>,
        span: Span,
    ) -> EvalResult<()> {
        // Inside a block call body, a declared option name wins over any
        // other meaning, so `option size` blocks can be sized.
        if self.ctx.current().settable_options.contains(&name.name) {
            let expression = argument.ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::MissingArgument {
                        name: name.name.as_str().to_string(),
                        expected: "value".to_string(),
                    },
                    span,
                )
            })?;
            let value = self.eval_expr(expression)?;
            self.ctx.current_mut().option_values.insert(name.name, value);
            return Ok(());
        }
        match self.ctx.lookup(name.name).cloned() {
            Some(Binding::Builtin(builtin)) => {
                let value = self.call_builtin_command(builtin, argument, span)?;
                self.route_value(value, span);
                Ok(())
            }
            Some(Binding::Constant(value)) => {
                if argument.is_some() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::UnexpectedArgument {
                            name: name.name.as_str().to_string(),
                            max: 0,
                        },
                        span,
                    ));
                }
                self.route_value(value, span);
                Ok(())
            }
            Some(Binding::Function(function)) => {
                let args = match argument {
                    Some(expression) => self.function_arguments(&function, expression)?,
                    None if function.params.is_empty() => Vec::new(),
                    None => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::MissingArgument {
                                name: name.name.as_str().to_string(),
                                expected: "argument".to_string(),
                            },
                            span,
                        ))
                    }
                };
                let value = self.call_function(&function, args, span)?;
                self.route_value(value, span);
                Ok(())
            }
            Some(Binding::Block(block)) => {
                if argument.is_some() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::UnexpectedArgument {
                            name: name.name.as_str().to_string(),
                            max: 0,
                        },
                        span,
                    ));
                }
                let value = self.invoke_block(&block, None, span)?;
                self.route_value(value, span);
                Ok(())
            }
            None => Err(self.unknown_symbol(name)),
        }
    }

    fn exec_for(
        &mut self,
        index: Option<&Identifier>,
        iterable: &Expression,
        body: &Block,
    ) -> EvalResult<()> {
        let subject = self.eval_expr(iterable)?;
        let items: Vec<Value> = match subject {
            Value::Range(range) => range.iter().map(Value::Number).collect(),
            Value::Tuple(elements) => elements,
            Value::Object(map) => Value::sorted_object_entries(&map),
            other => vec![other],
        };
        for item in items {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::new(RuntimeErrorKind::Cancelled, body.span));
            }
            self.ctx.push_scope(ScopeKind::Body);
            if let Some(index) = index {
                // The loop variable is fresh each iteration; shadowing an
                // outer binding is fine, redefining a reserved name is not.
                self.ctx
                    .define(index.name, Binding::Constant(item))
                    .map_err(|()| {
                        RuntimeError::new(
                            RuntimeErrorKind::Redefinition {
                                name: index.name.as_str().to_string(),
                            },
                            index.span,
                        )
                    })?;
            }
            let result = self.exec_statements(&body.statements);
            self.finish_body_scope();
            result?;
        }
        Ok(())
    }

    fn exec_if(
        &mut self,
        condition: &Expression,
        then_body: &Block,
        else_body: Option<&Block>,
    ) -> EvalResult<()> {
        let value = self.eval_expr(condition)?;
        let truth = match self.coerce(value, &ValueType::Boolean, "if", condition.span)? {
            Value::Boolean(b) => b,
            _ => false,
        };
        let chosen = if truth { Some(then_body) } else { else_body };
        if let Some(body) = chosen {
            self.ctx.push_scope(ScopeKind::Body);
            let result = self.exec_statements(&body.statements);
            self.finish_body_scope();
            result?;
        }
        Ok(())
    }

    fn exec_switch(
        &mut self,
        subject: &Expression,
        cases: &[shape_par::ast::CaseClause],
        default: Option<&Block>,
    ) -> EvalResult<()> {
        let subject_value = self.eval_expr(subject)?;
        let mut chosen: Option<&Block> = None;
        for case in cases {
            let pattern = self.eval_expr(&case.pattern)?;
            let matched = loose_equals(&subject_value, &pattern)
                // A multi-value pattern also matches any one of its values.
                || match &pattern {
                    Value::Tuple(options) => options
                        .iter()
                        .any(|option| loose_equals(&subject_value, option)),
                    _ => false,
                };
            if matched {
                chosen = Some(&case.body);
                break;
            }
        }
        if let Some(body) = chosen.or(default) {
            self.ctx.push_scope(ScopeKind::Body);
            let result = self.exec_statements(&body.statements);
            self.finish_body_scope();
            result?;
        }
        Ok(())
    }

    fn exec_import(&mut self, path: &Expression, span: Span) -> EvalResult<()> {
        let value = self.eval_expr(path)?;
        let name = match self.coerce(value, &ValueType::String, "import", path.span)? {
            Value::String(name) => name.to_string(),
            _ => String::new(),
        };
        let resolved = self.delegate.resolve_path(&name).ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::FileNotFound {
                    name: name.clone(),
                    at: None,
                },
                span,
            )
        })?;

        let extension = resolved
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "shape" => self.import_shape(&name, resolved, span),
            "txt" => {
                let text = self.read_import(&name, &resolved, span)?;
                self.route_value(Value::string(text), span);
                Ok(())
            }
            "json" => {
                let text = self.read_import(&name, &resolved, span)?;
                let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
                    RuntimeError::new(
                        RuntimeErrorKind::AssertionFailure {
                            message: format!("invalid JSON in '{}': {}", name, err),
                        },
                        span,
                    )
                })?;
                let value = json_to_value(parsed);
                self.route_value(value, span);
                Ok(())
            }
            _ => {
                let mesh = self.delegate.import_geometry(&resolved).ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::FileNotFound {
                            name: name.clone(),
                            at: Some(resolved.clone()),
                        },
                        span,
                    )
                })?;
                let node = Geometry::new(GeometryKind::Mesh(Arc::new(mesh)));
                self.route_value(Value::Mesh(Arc::new(node)), span);
                Ok(())
            }
        }
    }

    /// Run a `.shape` import in the current scope: its definitions become
    /// visible to the importer and its children are emitted here.
    fn import_shape(&mut self, name: &str, resolved: PathBuf, span: Span) -> EvalResult<()> {
        if self.import_stack.contains(&resolved) {
            return Err(RuntimeError::new(
                RuntimeErrorKind::CyclicImport {
                    name: name.to_string(),
                },
                span,
            ));
        }
        let program = match self.import_cache.get(&resolved) {
            Some(program) => program.clone(),
            None => {
                let source = self.read_import(name, &resolved, span)?;
                let file_id = FileId::new(self.import_cache.len() + 1);
                let program = shape_par::parse_source(&source, file_id).map_err(|err| {
                    RuntimeError::new(
                        RuntimeErrorKind::AssertionFailure {
                            message: format!("error in '{}': {}", name, err),
                        },
                        span,
                    )
                })?;
                let program = Arc::new(program);
                self.import_cache.insert(resolved.clone(), program.clone());
                program
            }
        };
        self.import_stack.push(resolved);
        let result = self.exec_statements(&program.statements);
        self.import_stack.pop();
        result
    }

    fn read_import(&self, name: &str, resolved: &std::path::Path, span: Span) -> EvalResult<String> {
        self.delegate.read_text(resolved).ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::FileNotFound {
                    name: name.to_string(),
                    at: Some(resolved.to_path_buf()),
                },
                span,
            )
        })
    }

    // ----- value routing -------------------------------------------------

    /// Leave a loop/branch scope, handing its children to the parent.
    fn finish_body_scope(&mut self) {
        let popped = self.ctx.pop_scope();
        let children = self.ctx.take_children(popped);
        self.ctx.current_mut().children.extend(children);
    }

    /// Decide what an emitted value means in the current scope: geometry
    /// becomes a child, a value-collecting scope keeps everything, and
    /// anything else is warned about as unused.
    fn route_value(&mut self, value: Value, span: Span) {
        if value.is_void() {
            return;
        }
        match self.ctx.collecting_kind() {
            ScopeKind::Block | ScopeKind::Function => self.ctx.emit_child(value),
            ScopeKind::Path => match value {
                Value::Point(_) | Value::Path(_) => self.ctx.emit_child(value),
                Value::Tuple(elements) => {
                    for element in elements {
                        self.route_value(element, span);
                    }
                }
                other => self.warn_unused(&other, span),
            },
            ScopeKind::Root | ScopeKind::Shape => match value {
                Value::Mesh(_) | Value::Path(_) | Value::Polygon(_) => {
                    let placed = self.place_in_scope(value);
                    self.ctx.emit_child(placed);
                }
                Value::Tuple(elements) => {
                    for element in elements {
                        self.route_value(element, span);
                    }
                }
                other => self.warn_unused(&other, span),
            },
            ScopeKind::Body => {
                // collecting_kind never reports a transparent body.
                self.ctx.emit_child(value);
            }
        }
    }

    /// Apply the scope's accumulated transform to emitted geometry.
    fn place_in_scope(&mut self, value: Value) -> Value {
        let transform = self.ctx.current().transform;
        if transform.is_identity() {
            return value;
        }
        match value {
            Value::Mesh(geometry) => {
                let mut node = geometry.as_ref().clone();
                node.transform = transform.combined(&node.transform);
                Value::Mesh(Arc::new(node))
            }
            Value::Path(path) => Value::Path(Arc::new(path.transformed(&transform))),
            Value::Polygon(polygon) => Value::Polygon(Arc::new(polygon.transformed(&transform))),
            other => other,
        }
    }

    fn warn_unused(&mut self, value: &Value, span: Span) {
        self.warnings.push(
            DiagnosticBuilder::warning(format!("unused {}", value.type_description()))
                .code(W_UNUSED_VALUE)
                .span(span)
                .hint("Assign the value with 'define' or remove it.".to_string())
                .build(),
        );
    }

    // ----- expressions ---------------------------------------------------

    pub fn eval_expr(&mut self, expression: &Expression) -> EvalResult<Value> {
        match &expression.kind {
            ExpressionKind::Number(value) => Ok(Value::Number(*value)),
            ExpressionKind::String(text) => Ok(Value::string(text.as_str())),
            ExpressionKind::HexColor(digits) => Color::from_hex_digits(digits)
                .map(Value::Color)
                .ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::AssertionFailure {
                            message: format!("invalid color literal '#{}'", digits),
                        },
                        expression.span,
                    )
                }),
            ExpressionKind::Identifier(name) => {
                self.eval_identifier(&Identifier::new(*name, expression.span))
            }
            ExpressionKind::Member(lhs, member) => {
                let value = self.eval_expr(lhs)?;
                self.member_value(value, member)
            }
            ExpressionKind::Subscript(lhs, index) => {
                let value = self.eval_expr(lhs)?;
                let index_value = self.eval_expr(index)?;
                self.subscript_value(value, index_value, index.span)
            }
            ExpressionKind::Tuple(elements) => self.eval_tuple(elements, expression.span),
            ExpressionKind::Block(name, body) => self.eval_block_invocation(name, body),
            ExpressionKind::Infix(lhs, op, rhs) => self.eval_infix(lhs, *op, rhs, expression.span),
            ExpressionKind::Prefix(op, operand) => {
                self.eval_prefix(*op, operand, expression.span)
            }
        }
    }

    fn eval_identifier(&mut self, name: &Identifier) -> EvalResult<Value> {
        match self.ctx.lookup(name.name).cloned() {
            Some(Binding::Constant(value)) => Ok(value),
            Some(Binding::Builtin(builtin)) => self.builtin_as_value(builtin, name.span),
            Some(Binding::Function(function)) => {
                if function.params.is_empty() {
                    self.call_function(&function, Vec::new(), name.span)
                } else {
                    Err(RuntimeError::new(
                        RuntimeErrorKind::MissingArgument {
                            name: name.name.as_str().to_string(),
                            expected: "argument".to_string(),
                        },
                        name.span,
                    ))
                }
            }
            Some(Binding::Block(block)) => self.invoke_block(&block, None, name.span),
            None => Err(self.unknown_symbol(name)),
        }
    }

    /// A built-in in value position: getters read state, shapes build with
    /// defaults, argument-taking functions are missing their argument.
    fn builtin_as_value(&mut self, builtin: Builtin, span: Span) -> EvalResult<Value> {
        if builtin.property_type().is_some() {
            return Ok(self.read_property(builtin));
        }
        match builtin.kind() {
            BuiltinKind::Shape | BuiltinKind::PathShape => {
                self.call_shape(builtin, None, span)
            }
            BuiltinKind::Function if builtin == Builtin::Rnd => {
                Ok(Value::Number(self.ctx.next_rnd()))
            }
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::MissingArgument {
                    name: builtin.name().to_string(),
                    expected: builtin
                        .parameter_type()
                        .map(|ty| ty.to_string())
                        .unwrap_or_else(|| "argument".to_string()),
                },
                span,
            )),
        }
    }

    fn read_property(&self, builtin: Builtin) -> Value {
        let scope = self.ctx.current();
        match builtin {
            Builtin::ColorSet => Value::Color(scope.material.color.unwrap_or(Color::WHITE)),
            Builtin::TextureSet => scope
                .material
                .texture
                .clone()
                .map(Value::Texture)
                .unwrap_or(Value::Void),
            Builtin::NormalsSet => scope
                .material
                .normals
                .clone()
                .map(Value::Texture)
                .unwrap_or(Value::Void),
            Builtin::Opacity => Value::Number(scope.material.opacity),
            Builtin::Metallicity => Value::Number(scope.material.metallicity),
            Builtin::Roughness => Value::Number(scope.material.roughness),
            Builtin::Glow => Value::Number(scope.material.glow),
            Builtin::MaterialSet => Value::Material(scope.material.clone()),
            Builtin::FontSet => scope.font.clone().map(Value::Font).unwrap_or(Value::Void),
            Builtin::Detail => Value::Number(scope.detail as f64),
            Builtin::Smoothing => scope.smoothing.map(Value::Number).unwrap_or(Value::Void),
            _ => Value::Void,
        }
    }

    /// Evaluate juxtaposed operands. An identifier naming an
    /// argument-taking function consumes everything after it.
    fn eval_tuple(&mut self, elements: &[Expression], span: Span) -> EvalResult<Value> {
        let mut values = Vec::new();
        let mut i = 0;
        while i < elements.len() {
            let rest = &elements[i + 1..];
            if let ExpressionKind::Identifier(name) = elements[i].kind {
                match self.ctx.lookup(name).cloned() {
                    Some(Binding::Builtin(builtin))
                        if builtin.consumes_operands() && !rest.is_empty() =>
                    {
                        let arg = self.eval_tuple(rest, span)?;
                        values.push(self.apply_builtin_function(
                            builtin,
                            arg,
                            elements[i].span.to(span),
                        )?);
                        i = elements.len();
                        continue;
                    }
                    Some(Binding::Function(function))
                        if !function.params.is_empty() && !rest.is_empty() =>
                    {
                        let args = self.operand_arguments(&function, rest, span)?;
                        values.push(self.call_function(&function, args, elements[i].span)?);
                        i = elements.len();
                        continue;
                    }
                    _ => {}
                }
            }
            values.push(self.eval_expr(&elements[i])?);
            i += 1;
        }
        Ok(match values.len() {
            1 => values.remove(0),
            _ => Value::Tuple(values),
        })
    }

    /// Positional arguments for a function consuming trailing operands.
    fn operand_arguments(
        &mut self,
        function: &Arc<UserFunction>,
        rest: &[Expression],
        span: Span,
    ) -> EvalResult<Vec<Value>> {
        let value = self.eval_tuple(rest, span)?;
        self.spread_arguments(function, value, span)
    }

    fn function_arguments(
        &mut self,
        function: &Arc<UserFunction>,
        expression: &Expression,
    ) -> EvalResult<Vec<Value>> {
        let value = self.eval_expr(expression)?;
        self.spread_arguments(function, value, expression.span)
    }

    /// Match an evaluated operand bundle to the function's parameter list.
    fn spread_arguments(
        &mut self,
        function: &Arc<UserFunction>,
        value: Value,
        span: Span,
    ) -> EvalResult<Vec<Value>> {
        let name = function.name.as_str();
        let count = function.params.len();
        let args: Vec<Value> = match value {
            Value::Tuple(elements) if count != 1 => elements,
            single => vec![single],
        };
        if args.len() < count {
            return Err(RuntimeError::new(
                RuntimeErrorKind::MissingArgument {
                    name: name.to_string(),
                    expected: format!("{} arguments", count),
                },
                span,
            ));
        }
        if args.len() > count {
            return Err(RuntimeError::new(
                RuntimeErrorKind::UnexpectedArgument {
                    name: name.to_string(),
                    max: count,
                },
                span,
            ));
        }
        Ok(args)
    }

    // ----- calls ---------------------------------------------------------

    /// A built-in at the head of a command statement.
    fn call_builtin_command(
        &mut self,
        builtin: Builtin,
        argument: Option<&Expression>,
        span: Span,
    ) -> EvalResult<Value> {
        match builtin.kind() {
            BuiltinKind::Shape | BuiltinKind::PathShape => {
                if argument.is_some() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::UnexpectedArgument {
                            name: builtin.name().to_string(),
                            max: 0,
                        },
                        span,
                    ));
                }
                self.call_shape(builtin, None, span)
            }
            BuiltinKind::Builder => {
                let expression = argument.ok_or_else(|| self.missing_argument(builtin, span))?;
                let value = self.eval_expr(expression)?;
                let children = self.geometry_children(value, builtin, expression.span)?;
                let detail = self.ctx.current().detail;
                self.build_builder(builtin, children, Halfturns(0.0), None, detail, span)
            }
            BuiltinKind::PointEmitter => {
                let expression = argument.ok_or_else(|| self.missing_argument(builtin, span))?;
                let value = self.eval_expr(expression)?;
                let position =
                    match self.coerce(value, &ValueType::Vector, builtin.name(), span)? {
                        Value::Vector(v) => v,
                        _ => Vector::ZERO,
                    };
                Ok(Value::Point(self.make_point(builtin, position)))
            }
            BuiltinKind::Setter => {
                let expression = argument.ok_or_else(|| self.missing_argument(builtin, span))?;
                let value = self.eval_expr(expression)?;
                self.apply_setter(builtin, value, span)?;
                Ok(Value::Void)
            }
            BuiltinKind::Function => match argument {
                Some(expression) => {
                    let value = self.eval_expr(expression)?;
                    self.apply_builtin_function(builtin, value, span)
                }
                None if builtin == Builtin::Rnd => Ok(Value::Number(self.ctx.next_rnd())),
                None => Err(self.missing_argument(builtin, span)),
            },
        }
    }

    fn missing_argument(&self, builtin: Builtin, span: Span) -> RuntimeError {
        RuntimeError::new(
            RuntimeErrorKind::MissingArgument {
                name: builtin.name().to_string(),
                expected: builtin
                    .parameter_type()
                    .map(|ty| ty.to_string())
                    .unwrap_or_else(|| "argument".to_string()),
            },
            span,
        )
    }

    /// A pure built-in function applied to an evaluated argument.
    fn apply_builtin_function(
        &mut self,
        builtin: Builtin,
        value: Value,
        span: Span,
    ) -> EvalResult<Value> {
        match builtin {
            Builtin::Print => {
                let values: Vec<Value> = match value {
                    Value::Tuple(elements) => elements,
                    single => vec![single],
                };
                self.delegate.debug_log(&values);
                self.log.extend(values);
                Ok(Value::Void)
            }
            Builtin::Assert => {
                let got = value.type_description().to_string();
                match self.coerce(value, &ValueType::Boolean, "assert", span) {
                    Ok(Value::Boolean(true)) => Ok(Value::Void),
                    Ok(_) => Err(RuntimeError::new(
                        RuntimeErrorKind::AssertionFailure {
                            message: "condition is false".to_string(),
                        },
                        span,
                    )),
                    Err(_) => Err(RuntimeError::new(
                        RuntimeErrorKind::TypeMismatch {
                            name: "assert".to_string(),
                            index: None,
                            expected: "boolean".to_string(),
                            got,
                        },
                        span,
                    )),
                }
            }
            Builtin::Text => {
                let text = match self.coerce(value, &ValueType::String, "text", span)? {
                    Value::String(text) => text,
                    _ => "".into(),
                };
                self.build_text(&text, span)
            }
            Builtin::Rnd => Ok(Value::Number(self.ctx.next_rnd())),
            Builtin::Split | Builtin::Join | Builtin::Trim => {
                let coerced = self.coerce_to_parameter(builtin, value, span)?;
                apply_string(builtin, &coerced).map_err(|err| {
                    conversion_error(err, builtin.name(), &parameter_description(builtin), &coerced, span)
                })
            }
            _ => {
                let coerced = self.coerce_to_parameter(builtin, value, span)?;
                apply_math(builtin, &coerced).map_err(|err| {
                    conversion_error(err, builtin.name(), &parameter_description(builtin), &coerced, span)
                })
            }
        }
    }

    fn coerce_to_parameter(
        &mut self,
        builtin: Builtin,
        value: Value,
        span: Span,
    ) -> EvalResult<Value> {
        match builtin.parameter_type() {
            Some(target) => self.coerce(value, &target, builtin.name(), span),
            None => Ok(value),
        }
    }

    /// Mutate the current scope's state.
    fn apply_setter(&mut self, builtin: Builtin, value: Value, span: Span) -> EvalResult<()> {
        let target = builtin
            .parameter_type()
            .unwrap_or(ValueType::Any);
        let value = self.coerce(value, &target, builtin.name(), span)?;
        match (builtin, value) {
            (Builtin::ColorSet, Value::Color(color)) => {
                self.ctx.current_mut().material.color = Some(color);
                // Inside a path body the colour also applies per point.
                if let Some(path_scope) = self.ctx.enclosing_path_scope() {
                    self.ctx.scope_mut(path_scope).shape.point_color = Some(color);
                }
            }
            (Builtin::TextureSet, Value::Texture(texture)) => {
                let texture = self.resolve_texture(texture, span);
                self.ctx.current_mut().material.texture = Some(texture);
            }
            (Builtin::NormalsSet, Value::Texture(texture)) => {
                let texture = self.resolve_texture(texture, span);
                self.ctx.current_mut().material.normals = Some(texture);
            }
            (Builtin::Opacity, Value::Number(n)) => {
                self.ctx.current_mut().material.opacity = n.clamp(0.0, 1.0);
            }
            (Builtin::Metallicity, Value::Number(n)) => {
                self.ctx.current_mut().material.metallicity = n.clamp(0.0, 1.0);
            }
            (Builtin::Roughness, Value::Number(n)) => {
                self.ctx.current_mut().material.roughness = n.clamp(0.0, 1.0);
            }
            (Builtin::Glow, Value::Number(n)) => {
                self.ctx.current_mut().material.glow = n.clamp(0.0, 1.0);
            }
            (Builtin::MaterialSet, Value::Material(material)) => {
                self.ctx.current_mut().material = material;
            }
            (Builtin::FontSet, Value::Font(name)) => {
                self.ctx.current_mut().font = Some(name);
            }
            (Builtin::Detail, Value::Number(n)) => {
                self.ctx.current_mut().detail = n.max(0.0) as u32;
            }
            (Builtin::Smoothing, Value::Number(n)) => {
                self.ctx.current_mut().smoothing = Some(n);
            }
            (Builtin::Seed, Value::Number(n)) => self.ctx.set_seed(n),
            (Builtin::Translate, Value::Vector(v)) => {
                let scope = self.ctx.current_mut();
                scope.transform = scope.transform.combined(&Transform::offset(v));
            }
            (Builtin::Rotate, Value::Rotation(r)) => {
                let scope = self.ctx.current_mut();
                scope.transform = scope.transform.combined(&Transform::rotation(r));
            }
            (Builtin::Scale, Value::Size(v)) => {
                let scope = self.ctx.current_mut();
                scope.transform = scope.transform.combined(&Transform::scale(v));
            }
            (Builtin::Position, Value::Vector(v)) => {
                self.ctx.current_mut().shape.position = Some(v);
            }
            (Builtin::Orientation, Value::Rotation(r)) => {
                self.ctx.current_mut().shape.orientation = Some(r);
            }
            (Builtin::Size, Value::Size(v)) => {
                self.ctx.current_mut().shape.size = Some(v);
            }
            (Builtin::Along, Value::Tuple(paths)) => {
                if let Some(Value::Path(path)) = paths.into_iter().next() {
                    self.ctx.current_mut().shape.along = Some(path.as_ref().clone());
                }
            }
            (Builtin::Twist, Value::Number(n)) => {
                self.ctx.current_mut().shape.twist = Halfturns(n);
            }
            (Builtin::Sides, Value::Number(n)) => {
                self.ctx.current_mut().shape.sides = Some(n.max(3.0) as u32);
            }
            (Builtin::Radius, Value::Number(n)) => {
                self.ctx.current_mut().shape.radius = Some(n);
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve a texture file through the delegate; an unresolved file is
    /// a warning, not an error, because rendering can fall back.
    fn resolve_texture(&mut self, texture: Texture, span: Span) -> Texture {
        match &texture.source {
            shape_geom::TextureSource::File { name, resolved: None } => {
                match self.delegate.resolve_path(name) {
                    Some(path) => Texture {
                        source: shape_geom::TextureSource::File {
                            name: name.clone(),
                            resolved: Some(path),
                        },
                        intensity: texture.intensity,
                    },
                    None => {
                        self.warnings.push(
                            RuntimeError::new(
                                RuntimeErrorKind::FileNotFound {
                                    name: name.clone(),
                                    at: None,
                                },
                                span,
                            )
                            .to_diagnostic(),
                        );
                        texture
                    }
                }
            }
            _ => texture,
        }
    }

    fn make_point(&self, builtin: Builtin, position: Vector) -> PathPoint {
        let color = self
            .ctx
            .enclosing_path_scope()
            .and_then(|scope| self.ctx.scope(scope).shape.point_color);
        PathPoint {
            position,
            color,
            is_curved: matches!(builtin, Builtin::Curve | Builtin::ArcPoint),
        }
    }

    /// A `name { body }` invocation in expression position.
    fn eval_block_invocation(&mut self, name: &Identifier, body: &Block) -> EvalResult<Value> {
        match self.ctx.lookup(name.name).cloned() {
            Some(Binding::Builtin(Builtin::ObjectShape)) => self.build_object(body),
            Some(Binding::Builtin(builtin)) => match builtin.kind() {
                BuiltinKind::Shape | BuiltinKind::PathShape | BuiltinKind::Builder => {
                    self.call_shape(builtin, Some(body), name.span.to(body.span))
                }
                _ => Err(RuntimeError::new(
                    RuntimeErrorKind::UnexpectedArgument {
                        name: builtin.name().to_string(),
                        max: 0,
                    },
                    body.span,
                )),
            },
            Some(Binding::Block(block)) => {
                self.invoke_block(&block, Some(body), name.span.to(body.span))
            }
            Some(_) => Err(RuntimeError::new(
                RuntimeErrorKind::UnexpectedArgument {
                    name: name.name.as_str().to_string(),
                    max: 0,
                },
                body.span,
            )),
            None => Err(self.unknown_symbol(name)),
        }
    }

    /// `object { key value, ... }`: every line is a key/value pair.
    /// Insertion order is preserved; a repeated key overwrites.
    fn build_object(&mut self, body: &Block) -> EvalResult<Value> {
        let mut map = IndexMap::new();
        for statement in &body.statements {
            match &statement.kind {
                StatementKind::Command(key, Some(expression)) => {
                    let value = self.eval_expr(expression)?;
                    map.insert(key.name.as_str().to_string(), value);
                }
                _ => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::AssertionFailure {
                            message: "object entries must be 'name value' pairs".to_string(),
                        },
                        statement.span,
                    ))
                }
            }
        }
        Ok(Value::Object(map))
    }

    /// Build a primitive, group, path shape, or builder from an option
    /// body.
    fn call_shape(
        &mut self,
        builtin: Builtin,
        body: Option<&Block>,
        span: Span,
    ) -> EvalResult<Value> {
        // A bare `object` has nothing to construct from; the body form is
        // handled before dispatch reaches here.
        if builtin == Builtin::ObjectShape {
            return Err(RuntimeError::new(
                RuntimeErrorKind::MissingArgument {
                    name: "object".to_string(),
                    expected: "object body".to_string(),
                },
                span,
            ));
        }
        let kind = match builtin.kind() {
            BuiltinKind::PathShape => ScopeKind::Path,
            _ => ScopeKind::Shape,
        };
        let scope_id = self.ctx.push_scope(kind);
        let result = match body {
            Some(body) => self.exec_statements(&body.statements),
            None => Ok(()),
        };
        self.ctx.pop_scope();
        result?;
        let children = self.ctx.take_children(scope_id);
        self.finish_shape(builtin, scope_id, children, span)
    }

    fn finish_shape(
        &mut self,
        builtin: Builtin,
        scope_id: ScopeId,
        children: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let scope = self.ctx.scope(scope_id);
        let detail = scope.detail;
        let material = scope.material.clone();
        let placement = scope.shape.placement();
        let shape = scope.shape.clone();

        match builtin {
            Builtin::Cube | Builtin::Sphere | Builtin::Cylinder | Builtin::Cone => {
                let primitive = match builtin {
                    Builtin::Cube => Primitive::Cube,
                    Builtin::Sphere => Primitive::Sphere { detail },
                    Builtin::Cylinder => Primitive::Cylinder { detail },
                    _ => Primitive::Cone { detail },
                };
                let node = Geometry::new(GeometryKind::Primitive(primitive))
                    .with_transform(placement)
                    .with_material(material);
                Ok(Value::Mesh(Arc::new(node)))
            }
            Builtin::Group => {
                let nodes = self.geometry_nodes(children, builtin, span)?;
                let node = Geometry::new(GeometryKind::Group)
                    .with_children(nodes)
                    .with_transform(placement)
                    .with_material(material);
                Ok(Value::Mesh(Arc::new(node)))
            }
            Builtin::Square => Ok(finish_path(Path::square(), &shape, placement)),
            Builtin::Circle => Ok(finish_path(Path::circle(detail), &shape, placement)),
            Builtin::RoundRect => {
                let radius = shape.radius.unwrap_or(0.25);
                let corner_detail = (detail / 4).max(1);
                Ok(finish_path(
                    Path::roundrect(1.0, 1.0, radius, corner_detail),
                    &shape,
                    placement,
                ))
            }
            Builtin::PolygonShape => self.finish_polygon(&shape, children, placement, span),
            Builtin::PathShape => Ok(finish_free_path(children, placement)),
            _ => {
                let nodes = self.geometry_nodes(children, builtin, span)?;
                let value = self.build_builder(
                    builtin,
                    nodes,
                    shape.twist,
                    shape.along.clone(),
                    detail,
                    span,
                )?;
                // The builder's own placement and material stick to it.
                match value {
                    Value::Mesh(geometry) => {
                        let mut node = geometry.as_ref().clone();
                        node.transform = placement.combined(&node.transform);
                        node.material = material;
                        Ok(Value::Mesh(Arc::new(node)))
                    }
                    other => Ok(other),
                }
            }
        }
    }

    /// `polygon` has two modes: `sides N` makes a regular path, `point`
    /// children make a planar polygon. Mixing them is impossible to mean.
    fn finish_polygon(
        &mut self,
        shape: &crate::context::ShapeState,
        children: Vec<Value>,
        placement: Transform,
        span: Span,
    ) -> EvalResult<Value> {
        let points: Vec<PathPoint> = children
            .iter()
            .filter_map(|child| match child {
                Value::Point(point) => Some(*point),
                _ => None,
            })
            .collect();
        match (shape.sides, points.is_empty()) {
            (Some(_), false) => Err(RuntimeError::new(
                RuntimeErrorKind::AssertionFailure {
                    message: "polygon cannot combine sides and points".to_string(),
                },
                span,
            )),
            (sides, true) => {
                let sides = sides.unwrap_or(5).max(3);
                let positions = (0..sides).map(|i| {
                    let angle = (i as f64) / (sides as f64) * std::f64::consts::TAU;
                    Vector::new(angle.cos() * 0.5, angle.sin() * 0.5, 0.0)
                });
                let path = Path::closed_polygon(positions);
                Ok(finish_path(path, shape, placement))
            }
            (None, false) => {
                let polygon = Polygon::new(
                    points
                        .into_iter()
                        .map(|p| PathPoint {
                            position: placement.apply(p.position),
                            ..p
                        })
                        .collect(),
                );
                Ok(Value::Polygon(Arc::new(polygon)))
            }
        }
    }

    /// Glyph outlines for `text`, through the delegate's font backend.
    fn build_text(&mut self, text: &str, span: Span) -> EvalResult<Value> {
        let font = self.ctx.current().font.clone();
        let outlines = self
            .delegate
            .glyph_outlines(text, font.as_deref())
            .ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::FileNotFound {
                        name: font
                            .as_deref()
                            .unwrap_or("default font")
                            .to_string(),
                        at: None,
                    },
                    span,
                )
            })?;
        Ok(Value::Tuple(
            outlines
                .into_iter()
                .map(|path| Value::Path(Arc::new(path)))
                .collect(),
        ))
    }

    /// Turn child values into geometry nodes for a builder or group.
    fn geometry_nodes(
        &mut self,
        children: Vec<Value>,
        builtin: Builtin,
        span: Span,
    ) -> EvalResult<Vec<Geometry>> {
        self.geometry_children(Value::Tuple(children), builtin, span)
    }

    fn geometry_children(
        &mut self,
        value: Value,
        builtin: Builtin,
        span: Span,
    ) -> EvalResult<Vec<Geometry>> {
        let values: Vec<Value> = match value {
            Value::Tuple(elements) => elements,
            single => vec![single],
        };
        let mut nodes = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Value::Mesh(geometry) => nodes.push(geometry.as_ref().clone()),
                Value::Path(path) => {
                    nodes.push(Geometry::new(GeometryKind::Path(path.as_ref().clone())))
                }
                Value::Polygon(polygon) => {
                    nodes.push(Geometry::new(GeometryKind::Path(polygon.as_path())))
                }
                Value::Tuple(elements) => {
                    let nested =
                        self.geometry_children(Value::Tuple(elements), builtin, span)?;
                    nodes.extend(nested);
                }
                other => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TypeMismatch {
                            name: builtin.name().to_string(),
                            index: None,
                            expected: "mesh or path".to_string(),
                            got: other.type_description().to_string(),
                        },
                        span,
                    ))
                }
            }
        }
        Ok(nodes)
    }

    fn build_builder(
        &mut self,
        builtin: Builtin,
        children: Vec<Geometry>,
        twist: Halfturns,
        along: Option<Path>,
        detail: u32,
        span: Span,
    ) -> EvalResult<Value> {
        if children.is_empty() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::MissingArgument {
                    name: builtin.name().to_string(),
                    expected: "mesh or path".to_string(),
                },
                span,
            ));
        }
        let kind = match builtin {
            Builtin::Fill => GeometryKind::Fill,
            Builtin::Extrude => GeometryKind::Extrude { along, twist },
            Builtin::Lathe => GeometryKind::Lathe { segments: detail },
            Builtin::Hull => GeometryKind::Hull,
            Builtin::Minkowski => GeometryKind::Minkowski,
            Builtin::UnionOp => GeometryKind::Union,
            Builtin::IntersectionOp => GeometryKind::Intersection,
            Builtin::DifferenceOp => GeometryKind::Difference,
            Builtin::Stencil => GeometryKind::Stencil,
            _ => GeometryKind::Group,
        };
        let node = Geometry::new(kind).with_children(children);
        Ok(Value::Mesh(Arc::new(node)))
    }

    /// Invoke a user block: run the call body in the caller's scope to
    /// collect option overrides and passed children, then run the block
    /// body in a scope under its captured definition scope.
    fn invoke_block(
        &mut self,
        block: &Arc<UserBlock>,
        call_body: Option<&Block>,
        span: Span,
    ) -> EvalResult<Value> {
        // Call scope: dynamic state plus option collection.
        let call_scope = self.ctx.push_scope(ScopeKind::Block);
        self.ctx.current_mut().settable_options = block.options.clone();
        let call_result = match call_body {
            Some(body) => self.exec_statements(&body.statements),
            None => Ok(()),
        };
        self.ctx.pop_scope();
        call_result?;

        let overrides = std::mem::take(&mut self.ctx.scope_mut(call_scope).option_values);
        let passed_children = self.ctx.take_children(call_scope);

        // Body scope: lexical parent is the definition scope, dynamic
        // state flows from the call site (including call-body setters).
        let body_scope = self
            .ctx
            .push_scope_under(ScopeKind::Block, block.captured);
        {
            let (material, font, detail, smoothing, rnd_state, transform) = {
                let call = self.ctx.scope(call_scope);
                (
                    call.material.clone(),
                    call.font.clone(),
                    call.detail,
                    call.smoothing,
                    call.rnd_state,
                    call.transform,
                )
            };
            let body = self.ctx.scope_mut(body_scope);
            body.material = material;
            body.font = font;
            body.detail = detail;
            body.smoothing = smoothing;
            body.rnd_state = rnd_state;
            body.transform = transform;
            body.option_values = overrides;
        }
        let children_value = match passed_children.len() {
            0 => Value::Tuple(Vec::new()),
            _ => Value::Tuple(passed_children),
        };
        self.ctx
            .define(Symbol::intern("children"), Binding::Constant(children_value))
            .ok();

        let result = self.exec_statements(&block.body.statements);
        self.ctx.pop_scope();
        result.map_err(|err| err.with_enclosing_span(span))?;

        let mut produced = self.ctx.take_children(body_scope);
        Ok(match produced.len() {
            0 => Value::Void,
            1 => produced.remove(0),
            _ => Value::Tuple(produced),
        })
    }

    /// Call a user function with positional arguments.
    fn call_function(
        &mut self,
        function: &Arc<UserFunction>,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let signature = crate::infer::function_type(function, &self.ctx);
        let mut coerced = Vec::with_capacity(args.len());
        for (index, (arg, target)) in args.into_iter().zip(&signature.params).enumerate() {
            let converted = convert(&arg, target).map_err(|err| match err {
                ConvertError::Mismatch => RuntimeError::new(
                    RuntimeErrorKind::TypeMismatch {
                        name: function.name.as_str().to_string(),
                        index: Some(index),
                        expected: target.to_string(),
                        got: arg.type_description().to_string(),
                    },
                    span,
                ),
                ConvertError::TooMany { max } => RuntimeError::new(
                    RuntimeErrorKind::UnexpectedArgument {
                        name: function.name.as_str().to_string(),
                        max,
                    },
                    span,
                ),
            })?;
            coerced.push(converted);
        }

        self.ctx
            .push_scope_under(ScopeKind::Function, function.captured);
        for (param, value) in function.params.iter().zip(coerced) {
            self.ctx
                .define(param.name, Binding::Constant(value))
                .ok();
        }
        let result = self.exec_statements(&function.body.statements);
        let body_scope = self.ctx.pop_scope();
        result.map_err(|err| err.with_enclosing_span(span))?;

        let mut produced = self.ctx.take_children(body_scope);
        Ok(match produced.len() {
            0 => Value::Void,
            1 => produced.remove(0),
            _ => Value::Tuple(produced),
        })
    }

    // ----- members, subscripts, operators --------------------------------

    fn member_value(&mut self, value: Value, member: &Identifier) -> EvalResult<Value> {
        let name = member.name.as_str();
        match &value {
            Value::Vector(v) | Value::Size(v) => match name {
                "x" => return Ok(Value::Number(v.x)),
                "y" => return Ok(Value::Number(v.y)),
                "z" => return Ok(Value::Number(v.z)),
                "width" => return Ok(Value::Number(v.x)),
                "height" => return Ok(Value::Number(v.y)),
                "depth" => return Ok(Value::Number(v.z)),
                _ => {}
            },
            Value::Color(c) => match name {
                "red" => return Ok(Value::Number(c.r)),
                "green" => return Ok(Value::Number(c.g)),
                "blue" => return Ok(Value::Number(c.b)),
                "alpha" => return Ok(Value::Number(c.a)),
                _ => {}
            },
            Value::Range(range) => match name {
                "start" => return Ok(Value::Number(range.from)),
                "end" => return Ok(Value::Number(range.to)),
                "step" => return Ok(Value::Number(range.stride())),
                _ => {}
            },
            Value::Point(point) => match name {
                "position" => return Ok(Value::Vector(point.position)),
                "color" => {
                    return Ok(point.color.map(Value::Color).unwrap_or(Value::Void))
                }
                "isCurved" => return Ok(Value::Boolean(point.is_curved)),
                _ => {}
            },
            Value::Path(path) => match name {
                "points" => {
                    return Ok(Value::Tuple(
                        path.points.iter().map(|p| Value::Point(*p)).collect(),
                    ))
                }
                "bounds" => return Ok(Value::Bounds(path.bounds())),
                _ => {}
            },
            Value::Polygon(polygon) => match name {
                "points" => {
                    return Ok(Value::Tuple(
                        polygon.points.iter().map(|p| Value::Point(*p)).collect(),
                    ))
                }
                "center" => return Ok(Value::Vector(polygon.center())),
                _ => {}
            },
            Value::Mesh(geometry) => match name {
                "polygons" => {
                    let mesh = self.build_geometry(geometry, member.span)?;
                    return Ok(Value::Tuple(
                        mesh.polygons
                            .iter()
                            .map(|polygon| Value::Polygon(Arc::new(polygon.clone())))
                            .collect(),
                    ));
                }
                "bounds" => {
                    let bounds = geometry
                        .bounds(self.kernel, &self.cache, &self.cancel)
                        .map_err(|err| kernel_error(err, member.span))?;
                    return Ok(Value::Bounds(bounds));
                }
                _ => {}
            },
            Value::Bounds(bounds) => match name {
                "min" => return Ok(Value::Vector(bounds.min)),
                "max" => return Ok(Value::Vector(bounds.max)),
                "size" => return Ok(Value::Size(bounds.size())),
                "center" => return Ok(Value::Vector(bounds.center())),
                "width" => return Ok(Value::Number(bounds.size().x)),
                "height" => return Ok(Value::Number(bounds.size().y)),
                "depth" => return Ok(Value::Number(bounds.size().z)),
                _ => {}
            },
            Value::String(text) => {
                if let Some(result) = string_member(text, name) {
                    return Ok(result);
                }
            }
            Value::Object(map) => {
                if let Some(entry) = map.get(name) {
                    return Ok(entry.clone());
                }
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UnknownMember {
                        name: name.to_string(),
                        of_type: "object".to_string(),
                        options: nearest_matches(
                            name,
                            map.keys().map(|key| key.as_str()),
                        ),
                    },
                    member.span,
                ));
            }
            _ => {}
        }

        // Sequence members: tuples directly, every other value as a
        // one-element sequence (`10.first` is `10`).
        if let Some(result) = self.sequence_member(&value, name) {
            return Ok(result);
        }

        Err(RuntimeError::new(
            RuntimeErrorKind::UnknownMember {
                name: name.to_string(),
                of_type: value.type_description().to_string(),
                options: nearest_matches(name, member_names(&value)),
            },
            member.span,
        ))
    }

    fn sequence_member(&mut self, value: &Value, name: &str) -> Option<Value> {
        let elements: &[Value] = match value {
            Value::Tuple(elements) => elements,
            Value::Void => return None,
            single => std::slice::from_ref(single),
        };
        if let Some(index) = ordinal_index(name) {
            return Some(elements.get(index).cloned().unwrap_or(Value::Void));
        }
        match name {
            "last" => Some(elements.last().cloned().unwrap_or(Value::Void)),
            "count" => Some(Value::Number(elements.len() as f64)),
            "allButFirst" => Some(Value::Tuple(
                elements.iter().skip(1).cloned().collect(),
            )),
            "allButLast" => Some(Value::Tuple(
                elements[..elements.len().saturating_sub(1)].to_vec(),
            )),
            // Numeric tuples answer to vector/colour accessors.
            "x" | "y" | "z" | "width" | "height" | "depth" => {
                let vector = convert(value, &ValueType::Vector).ok()?;
                match (vector, name) {
                    (Value::Vector(v), "x" | "width") => Some(Value::Number(v.x)),
                    (Value::Vector(v), "y" | "height") => Some(Value::Number(v.y)),
                    (Value::Vector(v), _) => Some(Value::Number(v.z)),
                    _ => None,
                }
            }
            "red" | "green" | "blue" | "alpha" => {
                let color = convert(value, &ValueType::Color).ok()?;
                match (color, name) {
                    (Value::Color(c), "red") => Some(Value::Number(c.r)),
                    (Value::Color(c), "green") => Some(Value::Number(c.g)),
                    (Value::Color(c), "blue") => Some(Value::Number(c.b)),
                    (Value::Color(c), _) => Some(Value::Number(c.a)),
                    _ => None,
                }
            }
            // Tuples that can be stringified expose the string members.
            "lines" | "words" | "characters" => {
                let text = value.log_description();
                string_member(&text, name)
            }
            _ => None,
        }
    }

    fn subscript_value(&mut self, value: Value, index: Value, span: Span) -> EvalResult<Value> {
        let index_number = index.as_number().ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeMismatch {
                    name: "index".to_string(),
                    index: None,
                    expected: "number".to_string(),
                    got: index.type_description().to_string(),
                },
                span,
            )
        })?;
        let raw = index_number as i64;
        let elements: Vec<Value> = match value {
            Value::Tuple(elements) => elements,
            single => vec![single],
        };
        if raw < 0 || raw as usize >= elements.len() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::InvalidIndex {
                    index: raw,
                    count: elements.len(),
                },
                span,
            ));
        }
        Ok(elements.into_iter().nth(raw as usize).unwrap_or(Value::Void))
    }

    fn eval_infix(
        &mut self,
        lhs: &Expression,
        op: InfixOp,
        rhs: &Expression,
        span: Span,
    ) -> EvalResult<Value> {
        // `and`/`or` short-circuit on the left value.
        if matches!(op, InfixOp::And | InfixOp::Or) {
            let left = self.eval_expr(lhs)?;
            let left = self.boolean_operand(left, op.as_str(), lhs.span)?;
            return match (op, left) {
                (InfixOp::And, false) => Ok(Value::Boolean(false)),
                (InfixOp::Or, true) => Ok(Value::Boolean(true)),
                _ => {
                    let right = self.eval_expr(rhs)?;
                    let right = self.boolean_operand(right, op.as_str(), rhs.span)?;
                    Ok(Value::Boolean(right))
                }
            };
        }

        let left = self.eval_expr(lhs)?;
        let right = self.eval_expr(rhs)?;
        match op {
            InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div => {
                arithmetic(op, &left, &right).ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::TypeMismatch {
                            name: op.as_str().to_string(),
                            index: None,
                            expected: "number or vector".to_string(),
                            got: if numeric_operand(&left).is_some() {
                                right.type_description().to_string()
                            } else {
                                left.type_description().to_string()
                            },
                        },
                        span,
                    )
                })
            }
            InfixOp::To => {
                let from = self.number_operand(&left, "range", lhs.span)?;
                let to = self.number_operand(&right, "range", rhs.span)?;
                Ok(Value::Range(RangeValue::new(from, to)))
            }
            InfixOp::Step => match left {
                Value::Range(range) => {
                    let step = self.number_operand(&right, "step", rhs.span)?;
                    Ok(Value::Range(range.with_step(step)))
                }
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::TypeMismatch {
                        name: "step".to_string(),
                        index: None,
                        expected: "range".to_string(),
                        got: other.type_description().to_string(),
                    },
                    lhs.span,
                )),
            },
            InfixOp::Equal => Ok(Value::Boolean(loose_equals(&left, &right))),
            InfixOp::NotEqual => Ok(Value::Boolean(!loose_equals(&left, &right))),
            InfixOp::Less | InfixOp::LessEqual | InfixOp::Greater | InfixOp::GreaterEqual => {
                let a = self.number_operand(&left, op.as_str(), lhs.span)?;
                let b = self.number_operand(&right, op.as_str(), rhs.span)?;
                Ok(Value::Boolean(match op {
                    InfixOp::Less => a < b,
                    InfixOp::LessEqual => a <= b,
                    InfixOp::Greater => a > b,
                    _ => a >= b,
                }))
            }
            InfixOp::In => membership(&left, &right).ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::TypeMismatch {
                        name: "in".to_string(),
                        index: None,
                        expected: "range, list, or string".to_string(),
                        got: right.type_description().to_string(),
                    },
                    rhs.span,
                )
            }),
            InfixOp::And | InfixOp::Or => unreachable!("short-circuited above"),
        }
    }

    fn eval_prefix(
        &mut self,
        op: PrefixOp,
        operand: &Expression,
        span: Span,
    ) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            PrefixOp::Not => {
                let truth = self.boolean_operand(value, "not", operand.span)?;
                Ok(Value::Boolean(!truth))
            }
            PrefixOp::Minus => negated(&value).ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::TypeMismatch {
                        name: "-".to_string(),
                        index: None,
                        expected: "number or vector".to_string(),
                        got: value.type_description().to_string(),
                    },
                    span,
                )
            }),
            PrefixOp::Plus => arithmetic(InfixOp::Add, &Value::Number(0.0), &value)
                .ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::TypeMismatch {
                            name: "+".to_string(),
                            index: None,
                            expected: "number or vector".to_string(),
                            got: value.type_description().to_string(),
                        },
                        span,
                    )
                }),
        }
    }

    fn boolean_operand(&mut self, value: Value, name: &str, span: Span) -> EvalResult<bool> {
        match self.coerce(value, &ValueType::Boolean, name, span)? {
            Value::Boolean(b) => Ok(b),
            _ => Ok(false),
        }
    }

    fn number_operand(&self, value: &Value, name: &str, span: Span) -> EvalResult<f64> {
        value.as_number().ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeMismatch {
                    name: name.to_string(),
                    index: None,
                    expected: "number".to_string(),
                    got: value.type_description().to_string(),
                },
                span,
            )
        })
    }

    // ----- helpers -------------------------------------------------------

    fn build_geometry(
        &self,
        geometry: &Arc<Geometry>,
        span: Span,
    ) -> EvalResult<Arc<shape_geom::Mesh>> {
        geometry
            .build_mesh(self.kernel, &self.cache, &self.cancel)
            .map_err(|err| kernel_error(err, span))
    }

    fn coerce(
        &self,
        value: Value,
        target: &ValueType,
        name: &str,
        span: Span,
    ) -> EvalResult<Value> {
        convert(&value, target)
            .map_err(|err| conversion_error(err, name, &target.to_string(), &value, span))
    }

    fn unknown_symbol(&self, name: &Identifier) -> RuntimeError {
        let mut candidates = self.ctx.visible_names();
        let current = self.ctx.current();
        candidates.extend(current.settable_options.iter().map(|s| s.as_str()));
        RuntimeError::new(
            RuntimeErrorKind::UnknownSymbol {
                name: name.name.as_str().to_string(),
                options: nearest_matches(name.name.as_str(), candidates),
            },
            name.span,
        )
    }
}

/// Wrap a conversion failure with the receiving symbol's name and range.
fn conversion_error(
    err: ConvertError,
    name: &str,
    expected: &str,
    value: &Value,
    span: Span,
) -> RuntimeError {
    match err {
        ConvertError::Mismatch => RuntimeError::new(
            RuntimeErrorKind::TypeMismatch {
                name: name.to_string(),
                index: None,
                expected: expected.to_string(),
                got: value.type_description().to_string(),
            },
            span,
        ),
        ConvertError::TooMany { max } => RuntimeError::new(
            RuntimeErrorKind::UnexpectedArgument {
                name: name.to_string(),
                max,
            },
            span,
        ),
    }
}

/// The phrase describing a built-in's expected argument.
fn parameter_description(builtin: Builtin) -> String {
    builtin
        .parameter_type()
        .map(|ty| ty.to_string())
        .unwrap_or_else(|| "argument".to_string())
}

/// Option names declared at the top level of a block body.
fn declared_options(body: &Block) -> Vec<Symbol> {
    body.statements
        .iter()
        .filter_map(|statement| match &statement.kind {
            StatementKind::Option(name, _) => Some(name.name),
            _ => None,
        })
        .collect()
}

/// Map a kernel failure onto the runtime taxonomy.
fn kernel_error(err: shape_geom::KernelError, span: Span) -> RuntimeError {
    match err {
        shape_geom::KernelError::Cancelled => {
            RuntimeError::new(RuntimeErrorKind::Cancelled, span)
        }
        other => RuntimeError::new(
            RuntimeErrorKind::AssertionFailure {
                message: other.to_string(),
            },
            span,
        ),
    }
}

/// Finish a generated path: apply point colour and placement.
fn finish_path(
    mut path: Path,
    shape: &crate::context::ShapeState,
    placement: Transform,
) -> Value {
    if let Some(color) = shape.point_color {
        for point in &mut path.points {
            point.color = Some(color);
        }
    }
    if !placement.is_identity() {
        path = path.transformed(&placement);
    }
    Value::Path(Arc::new(path))
}

/// Assemble a free-form `path { ... }` body from emitted points and
/// sub-paths. Points keep the colours they were emitted with; the body's
/// colour changes apply per point, not to the finished path.
fn finish_free_path(children: Vec<Value>, placement: Transform) -> Value {
    let mut points: Vec<PathPoint> = Vec::new();
    for child in children {
        match child {
            Value::Point(point) => points.push(point),
            Value::Path(path) => points.extend(path.points.iter().copied()),
            _ => {}
        }
    }
    // A path whose ends coincide is closed, dropping the duplicate.
    let mut closed = false;
    if points.len() > 3 {
        let first = points[0].position;
        let last = points[points.len() - 1].position;
        if first == last {
            points.pop();
            closed = true;
        }
    }
    let mut path = Path::new(points, closed);
    if !placement.is_identity() {
        path = path.transformed(&placement);
    }
    Value::Path(Arc::new(path))
}

fn string_member(text: &str, name: &str) -> Option<Value> {
    match name {
        "lines" => Some(Value::Tuple(text.lines().map(Value::string).collect())),
        "words" => Some(Value::Tuple(
            text.split_whitespace().map(Value::string).collect(),
        )),
        "characters" => Some(Value::Tuple(
            text.chars().map(|c| Value::string(c.to_string())).collect(),
        )),
        "count" => Some(Value::Number(text.chars().count() as f64)),
        _ => None,
    }
}

/// Member names offered in "did you mean" hints.
fn member_names(value: &Value) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = vec![
        "first", "second", "third", "last", "count", "allButFirst", "allButLast",
    ];
    match value {
        Value::Vector(_) | Value::Size(_) => names.extend(["x", "y", "z"]),
        Value::Color(_) => names.extend(["red", "green", "blue", "alpha"]),
        Value::Path(_) => names.extend(["points", "bounds"]),
        Value::Mesh(_) => names.extend(["polygons", "bounds"]),
        Value::Polygon(_) => names.extend(["points", "center"]),
        Value::Point(_) => names.extend(["position", "color", "isCurved"]),
        Value::Range(_) => names.extend(["start", "end", "step"]),
        Value::Bounds(_) => names.extend(["min", "max", "size", "center"]),
        Value::String(_) | Value::Tuple(_) => names.extend(["lines", "words", "characters"]),
        _ => {}
    }
    names
}

/// The numeric view arithmetic works over: a scalar or a component list.
enum Numeric {
    Scalar(f64),
    Vector(Vector),
    Components(Vec<f64>),
}

fn numeric_operand(value: &Value) -> Option<Numeric> {
    match value {
        Value::Vector(v) | Value::Size(v) => Some(Numeric::Vector(*v)),
        Value::Tuple(elements) if elements.len() > 1 => {
            let components: Option<Vec<f64>> = elements.iter().map(|e| e.as_number()).collect();
            components.map(Numeric::Components)
        }
        other => other.as_number().map(Numeric::Scalar),
    }
}

fn apply_op(op: InfixOp, a: f64, b: f64) -> f64 {
    match op {
        InfixOp::Add => a + b,
        InfixOp::Sub => a - b,
        InfixOp::Mul => a * b,
        InfixOp::Div => a / b,
        _ => f64::NAN,
    }
}

/// `+ - * /` over numbers, vectors, and numeric lists, broadcasting
/// scalars component-wise.
fn arithmetic(op: InfixOp, left: &Value, right: &Value) -> Option<Value> {
    let a = numeric_operand(left)?;
    let b = numeric_operand(right)?;
    Some(match (a, b) {
        (Numeric::Scalar(a), Numeric::Scalar(b)) => Value::Number(apply_op(op, a, b)),
        (Numeric::Vector(v), Numeric::Scalar(s)) => Value::Vector(Vector::new(
            apply_op(op, v.x, s),
            apply_op(op, v.y, s),
            apply_op(op, v.z, s),
        )),
        (Numeric::Scalar(s), Numeric::Vector(v)) => Value::Vector(Vector::new(
            apply_op(op, s, v.x),
            apply_op(op, s, v.y),
            apply_op(op, s, v.z),
        )),
        (Numeric::Vector(a), Numeric::Vector(b)) => Value::Vector(Vector::new(
            apply_op(op, a.x, b.x),
            apply_op(op, a.y, b.y),
            apply_op(op, a.z, b.z),
        )),
        (Numeric::Components(components), Numeric::Scalar(s)) => Value::Tuple(
            components
                .into_iter()
                .map(|c| Value::Number(apply_op(op, c, s)))
                .collect(),
        ),
        (Numeric::Scalar(s), Numeric::Components(components)) => Value::Tuple(
            components
                .into_iter()
                .map(|c| Value::Number(apply_op(op, s, c)))
                .collect(),
        ),
        (Numeric::Components(a), Numeric::Components(b)) => {
            if a.len() != b.len() {
                return None;
            }
            Value::Tuple(
                a.into_iter()
                    .zip(b)
                    .map(|(x, y)| Value::Number(apply_op(op, x, y)))
                    .collect(),
            )
        }
        (Numeric::Vector(v), Numeric::Components(c)) => {
            let b = components_vector(&c)?;
            Value::Vector(Vector::new(
                apply_op(op, v.x, b.x),
                apply_op(op, v.y, b.y),
                apply_op(op, v.z, b.z),
            ))
        }
        (Numeric::Components(c), Numeric::Vector(v)) => {
            let a = components_vector(&c)?;
            Value::Vector(Vector::new(
                apply_op(op, a.x, v.x),
                apply_op(op, a.y, v.y),
                apply_op(op, a.z, v.z),
            ))
        }
    })
}

/// A short numeric list as a vector, zero-filled.
fn components_vector(components: &[f64]) -> Option<Vector> {
    if components.len() > 3 {
        return None;
    }
    Some(Vector::new(
        components.first().copied().unwrap_or(0.0),
        components.get(1).copied().unwrap_or(0.0),
        components.get(2).copied().unwrap_or(0.0),
    ))
}

fn negated(value: &Value) -> Option<Value> {
    match value {
        Value::Vector(v) => Some(Value::Vector(-*v)),
        Value::Size(v) => Some(Value::Size(-*v)),
        Value::Tuple(elements) if elements.len() > 1 => {
            let negated: Option<Vec<Value>> = elements
                .iter()
                .map(|e| e.as_number().map(|n| Value::Number(-n)))
                .collect();
            negated.map(Value::Tuple)
        }
        other => other.as_number().map(|n| Value::Number(-n)),
    }
}

/// Value equality with the implicit string/number bridge used by `=` and
/// `switch` matching.
fn loose_equals(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x == y;
    }
    match (a, b) {
        (Value::Tuple(xs), Value::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loose_equals(x, y))
        }
        _ => a == b,
    }
}

/// `in`: range containment, list membership, substring, or object key.
fn membership(needle: &Value, haystack: &Value) -> Option<Value> {
    match haystack {
        Value::Range(range) => needle
            .as_number()
            .map(|n| Value::Boolean(range.contains(n))),
        Value::Tuple(elements) => Some(Value::Boolean(
            elements.iter().any(|element| loose_equals(needle, element)),
        )),
        Value::String(text) => match needle {
            Value::String(sub) => Some(Value::Boolean(text.contains(sub.as_ref()))),
            _ => None,
        },
        Value::Object(map) => match needle {
            Value::String(key) => Some(Value::Boolean(map.contains_key(key.as_ref()))),
            _ => None,
        },
        _ => None,
    }
}

/// Convert parsed JSON into a runtime value.
fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Void,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            Value::Tuple(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut object = IndexMap::new();
            for (key, entry) in map {
                object.insert(key, json_to_value(entry));
            }
            Value::Object(object)
        }
    }
}
