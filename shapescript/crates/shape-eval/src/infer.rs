//! Static type inference.
//!
//! The inferencer walks an AST without evaluating side effects. It answers
//! two questions: the static type of an expression in a scope, and the
//! signature of a user-defined function or block. Parameter types come
//! from a constraint walk of the body (use in arithmetic implies
//! number-or-vector, use as a condition implies boolean, and so on), with
//! the union of constraints across branches as the result. Recursive
//! references type as `any`; signatures are memoised on the symbol.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use shape_lex::{InfixOp, PrefixOp};
use shape_par::ast::{Block, Definition, Expression, ExpressionKind, Statement, StatementKind};
use shape_util::symbol::Symbol;

use crate::context::{
    Binding, BlockType, EvalContext, FunctionType, ScopeId, UserBlock, UserFunction,
};
use crate::types::{ordinal_index, ValueType};

/// The static type of `expression` as seen from the context's current
/// scope.
pub fn static_type(expression: &Expression, ctx: &EvalContext) -> ValueType {
    Inferencer::new(ctx)
        .expression_type(expression, ctx.current_id())
        .simplified()
}

/// The memoised signature of a user function.
pub fn function_type(function: &Arc<UserFunction>, ctx: &EvalContext) -> FunctionType {
    if let Some(signature) = function.ty.get() {
        return signature.clone();
    }
    let signature = Inferencer::new(ctx).function_signature(function);
    // A concurrent computation of the same signature yields the same
    // result, so a lost race is harmless.
    let _ = function.ty.set(signature.clone());
    signature
}

/// The memoised signature of a user block.
pub fn block_type(block: &Arc<UserBlock>, ctx: &EvalContext) -> BlockType {
    if let Some(signature) = block.ty.get() {
        return signature.clone();
    }
    let signature = Inferencer::new(ctx).block_signature(block);
    let _ = block.ty.set(signature.clone());
    signature
}

/// AST walker with an environment for parameters and a recursion guard.
pub struct Inferencer<'ctx> {
    ctx: &'ctx EvalContext,
    /// Parameter/local bindings introduced by the signature walks.
    env: Vec<FxHashMap<Symbol, ValueType>>,
    /// Functions and blocks currently being typed, by allocation address;
    /// a re-entrant reference types as `any`.
    in_progress: Vec<usize>,
}

impl<'ctx> Inferencer<'ctx> {
    pub fn new(ctx: &'ctx EvalContext) -> Self {
        Self {
            ctx,
            env: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    // ----- signatures ----------------------------------------------------

    pub fn function_signature(&mut self, function: &Arc<UserFunction>) -> FunctionType {
        let address = Arc::as_ptr(function) as usize;
        if self.in_progress.contains(&address) {
            return FunctionType {
                params: function.params.iter().map(|_| ValueType::Any).collect(),
                returns: ValueType::Any,
            };
        }
        self.in_progress.push(address);

        let param_names: Vec<Symbol> = function.params.iter().map(|p| p.name).collect();
        let params = self.infer_parameters(&function.body, &param_names, function.captured);

        let frame: FxHashMap<Symbol, ValueType> = param_names
            .iter()
            .copied()
            .zip(params.iter().cloned())
            .collect();
        self.env.push(frame);
        let returns = self
            .body_type(&function.body, function.captured)
            .simplified();
        self.env.pop();

        self.in_progress.pop();
        FunctionType { params, returns }
    }

    pub fn block_signature(&mut self, block: &Arc<UserBlock>) -> BlockType {
        let address = Arc::as_ptr(block) as usize;
        if self.in_progress.contains(&address) {
            // Recursive blocks stay widened rather than narrowing to the
            // emitted element type.
            return BlockType {
                child_types: ValueType::list(ValueType::Any),
                returns: ValueType::list(ValueType::Any),
            };
        }
        self.in_progress.push(address);

        let children = Symbol::intern("children");
        let child_types = self
            .infer_parameters(&block.body, &[children], block.captured)
            .pop()
            .unwrap_or(ValueType::list(ValueType::Any));

        let mut frame = FxHashMap::default();
        frame.insert(children, child_types.clone());
        self.env.push(frame);
        let returns = self.body_type(&block.body, block.captured).simplified();
        self.env.pop();

        self.in_progress.pop();
        BlockType {
            child_types,
            returns,
        }
    }

    /// Narrow each parameter from `any` to the union of its usage-implied
    /// constraints; an unused parameter stays `list(any)`.
    fn infer_parameters(
        &mut self,
        body: &Block,
        params: &[Symbol],
        scope: ScopeId,
    ) -> Vec<ValueType> {
        let mut constraints: FxHashMap<Symbol, Vec<ValueType>> = FxHashMap::default();
        for &param in params {
            constraints.insert(param, Vec::new());
        }
        self.collect_constraints(&body.statements, scope, &mut constraints);
        params
            .iter()
            .map(|param| {
                let found = &constraints[param];
                if found.is_empty() {
                    ValueType::list(ValueType::Any)
                } else {
                    ValueType::Union(found.clone()).simplified()
                }
            })
            .collect()
    }

    fn collect_constraints(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
        constraints: &mut FxHashMap<Symbol, Vec<ValueType>>,
    ) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Command(name, argument) => {
                    // An argument fed straight to a symbol constrains to
                    // that symbol's parameter type.
                    if let Some(expression) = argument {
                        if let Some(target) = self.command_parameter(name.name, scope) {
                            self.constrain_identifier(expression, target, constraints);
                        }
                        self.collect_expr_constraints(expression, scope, constraints);
                    }
                }
                StatementKind::Define(_, Definition::Expression(expression)) => {
                    self.collect_expr_constraints(expression, scope, constraints);
                }
                StatementKind::Define(_, _) => {}
                StatementKind::Option(_, default) => {
                    self.collect_expr_constraints(default, scope, constraints);
                }
                StatementKind::Expression(expression) => {
                    self.collect_expr_constraints(expression, scope, constraints);
                }
                StatementKind::ForLoop {
                    iterable, body, ..
                } => {
                    self.constrain_identifier(
                        iterable,
                        ValueType::Union(vec![
                            ValueType::Range,
                            ValueType::list(ValueType::Any),
                        ]),
                        constraints,
                    );
                    self.collect_expr_constraints(iterable, scope, constraints);
                    self.collect_constraints(&body.statements, scope, constraints);
                }
                StatementKind::IfElse {
                    condition,
                    then_body,
                    else_body,
                } => {
                    self.constrain_identifier(condition, ValueType::Boolean, constraints);
                    self.collect_expr_constraints(condition, scope, constraints);
                    self.collect_constraints(&then_body.statements, scope, constraints);
                    if let Some(else_body) = else_body {
                        self.collect_constraints(&else_body.statements, scope, constraints);
                    }
                }
                StatementKind::Switch {
                    subject,
                    cases,
                    default,
                } => {
                    self.collect_expr_constraints(subject, scope, constraints);
                    for case in cases {
                        self.collect_constraints(&case.body.statements, scope, constraints);
                    }
                    if let Some(default) = default {
                        self.collect_constraints(&default.statements, scope, constraints);
                    }
                }
                StatementKind::Import(path) => {
                    self.collect_expr_constraints(path, scope, constraints);
                }
            }
        }
    }

    fn collect_expr_constraints(
        &mut self,
        expression: &Expression,
        scope: ScopeId,
        constraints: &mut FxHashMap<Symbol, Vec<ValueType>>,
    ) {
        match &expression.kind {
            ExpressionKind::Infix(lhs, op, rhs) => {
                match op {
                    InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div => {
                        self.constrain_identifier(lhs, ValueType::number_or_vector(), constraints);
                        self.constrain_identifier(rhs, ValueType::number_or_vector(), constraints);
                    }
                    InfixOp::And | InfixOp::Or => {
                        self.constrain_identifier(lhs, ValueType::Boolean, constraints);
                        self.constrain_identifier(rhs, ValueType::Boolean, constraints);
                    }
                    InfixOp::To | InfixOp::Step => {
                        self.constrain_identifier(lhs, ValueType::Number, constraints);
                        self.constrain_identifier(rhs, ValueType::Number, constraints);
                    }
                    InfixOp::Less
                    | InfixOp::LessEqual
                    | InfixOp::Greater
                    | InfixOp::GreaterEqual => {
                        // Comparison against a numeric literal pins the
                        // other side to number.
                        if matches!(rhs.kind, ExpressionKind::Number(_)) {
                            self.constrain_identifier(lhs, ValueType::Number, constraints);
                        }
                        if matches!(lhs.kind, ExpressionKind::Number(_)) {
                            self.constrain_identifier(rhs, ValueType::Number, constraints);
                        }
                    }
                    _ => {}
                }
                self.collect_expr_constraints(lhs, scope, constraints);
                self.collect_expr_constraints(rhs, scope, constraints);
            }
            ExpressionKind::Prefix(op, operand) => {
                let target = match op {
                    PrefixOp::Not => ValueType::Boolean,
                    _ => ValueType::number_or_vector(),
                };
                self.constrain_identifier(operand, target, constraints);
                self.collect_expr_constraints(operand, scope, constraints);
            }
            ExpressionKind::Tuple(elements) => {
                // An argument-taking head constrains its trailing operands.
                if let [head, rest @ ..] = elements.as_slice() {
                    if let ExpressionKind::Identifier(name) = head.kind {
                        if let Some(target) = self.command_parameter(name, scope) {
                            if let ValueType::Tuple(components) = &target {
                                for (operand, component) in rest.iter().zip(components) {
                                    self.constrain_identifier(
                                        operand,
                                        component.clone(),
                                        constraints,
                                    );
                                }
                            } else if let [single] = rest {
                                self.constrain_identifier(single, target, constraints);
                            }
                        }
                    }
                }
                for element in elements {
                    self.collect_expr_constraints(element, scope, constraints);
                }
            }
            ExpressionKind::Member(lhs, _) | ExpressionKind::Subscript(lhs, _) => {
                self.collect_expr_constraints(lhs, scope, constraints);
            }
            ExpressionKind::Block(_, body) => {
                // Setter usage inside an option body constrains too.
                self.collect_constraints(&body.statements, scope, constraints);
            }
            _ => {}
        }
    }

    /// If `expression` is a bare identifier under constraint collection,
    /// record the implied type.
    fn constrain_identifier(
        &mut self,
        expression: &Expression,
        target: ValueType,
        constraints: &mut FxHashMap<Symbol, Vec<ValueType>>,
    ) {
        if let ExpressionKind::Identifier(name) = expression.kind {
            if let Some(found) = constraints.get_mut(&name) {
                found.push(target);
            }
        }
    }

    /// The parameter type of a name used in command position, if any.
    fn command_parameter(&mut self, name: Symbol, scope: ScopeId) -> Option<ValueType> {
        match self.ctx.lookup_from(scope, name)? {
            Binding::Builtin(builtin) => builtin.parameter_type(),
            Binding::Function(function) => {
                let function = function.clone();
                let signature = self.function_signature(&function);
                match signature.params.len() {
                    0 => None,
                    1 => Some(signature.params[0].clone()),
                    _ => Some(ValueType::Tuple(signature.params)),
                }
            }
            _ => None,
        }
    }

    // ----- expression types ----------------------------------------------

    /// The type a body produces: the union of its emitted statement types.
    fn body_type(&mut self, body: &Block, scope: ScopeId) -> ValueType {
        let mut emitted = Vec::new();
        self.body_emissions(&body.statements, scope, &mut emitted);
        match emitted.len() {
            0 => ValueType::Void,
            1 => emitted.remove(0),
            _ => ValueType::list(ValueType::Union(emitted)).simplified(),
        }
    }

    fn body_emissions(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
        emitted: &mut Vec<ValueType>,
    ) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Expression(expression) => {
                    let ty = self.expression_type(expression, scope);
                    if ty != ValueType::Void {
                        emitted.push(ty);
                    }
                }
                StatementKind::Command(name, _) => {
                    let ty = self.identifier_result_type(name.name, scope);
                    if ty != ValueType::Void {
                        emitted.push(ty);
                    }
                }
                StatementKind::ForLoop { body, .. } => {
                    let inner = self.body_type(body, scope);
                    if inner != ValueType::Void {
                        emitted.push(ValueType::list(inner).simplified());
                    }
                }
                StatementKind::IfElse {
                    then_body,
                    else_body,
                    ..
                } => {
                    let then_ty = self.body_type(then_body, scope);
                    if then_ty != ValueType::Void {
                        emitted.push(then_ty);
                    }
                    if let Some(else_body) = else_body {
                        let else_ty = self.body_type(else_body, scope);
                        if else_ty != ValueType::Void {
                            emitted.push(else_ty);
                        }
                    }
                }
                StatementKind::Switch { cases, default, .. } => {
                    for case in cases {
                        let ty = self.body_type(&case.body, scope);
                        if ty != ValueType::Void {
                            emitted.push(ty);
                        }
                    }
                    if let Some(default) = default {
                        let ty = self.body_type(default, scope);
                        if ty != ValueType::Void {
                            emitted.push(ty);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    pub fn expression_type(&mut self, expression: &Expression, scope: ScopeId) -> ValueType {
        match &expression.kind {
            ExpressionKind::Number(_) => ValueType::Number,
            ExpressionKind::String(_) => ValueType::String,
            ExpressionKind::HexColor(_) => ValueType::Color,
            ExpressionKind::Identifier(name) => self.identifier_result_type(*name, scope),
            ExpressionKind::Member(lhs, member) => {
                let lhs_type = self.expression_type(lhs, scope);
                self.member_type(&lhs_type, member.name.as_str())
            }
            ExpressionKind::Subscript(lhs, _) => {
                match self.expression_type(lhs, scope).simplified() {
                    ValueType::List(element) => *element,
                    ValueType::Tuple(components) => {
                        ValueType::Union(components).simplified()
                    }
                    other => other,
                }
            }
            ExpressionKind::Tuple(elements) => self.tuple_type(elements, scope),
            ExpressionKind::Block(name, _) => match self.ctx.lookup_from(scope, name.name) {
                Some(Binding::Builtin(builtin)) => builtin.return_type(),
                Some(Binding::Block(block)) => {
                    let block = block.clone();
                    self.block_signature(&block).returns
                }
                _ => ValueType::Any,
            },
            ExpressionKind::Infix(lhs, op, rhs) => match op {
                InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div => {
                    let a = self.expression_type(lhs, scope).simplified();
                    let b = self.expression_type(rhs, scope).simplified();
                    arithmetic_type(&a, &b)
                }
                InfixOp::To | InfixOp::Step => ValueType::Range,
                _ => ValueType::Boolean,
            },
            ExpressionKind::Prefix(op, operand) => match op {
                PrefixOp::Not => ValueType::Boolean,
                _ => match self.expression_type(operand, scope).simplified() {
                    ValueType::Vector | ValueType::Size => ValueType::Vector,
                    _ => ValueType::Number,
                },
            },
        }
    }

    /// The type an identifier produces when referenced (or invoked bare).
    fn identifier_result_type(&mut self, name: Symbol, scope: ScopeId) -> ValueType {
        for frame in self.env.iter().rev() {
            if let Some(ty) = frame.get(&name) {
                return ty.clone();
            }
        }
        match self.ctx.lookup_from(scope, name) {
            Some(Binding::Constant(value)) => ValueType::of(value),
            Some(Binding::Builtin(builtin)) => builtin
                .property_type()
                .unwrap_or_else(|| builtin.return_type()),
            Some(Binding::Function(function)) => {
                let function = function.clone();
                self.function_signature(&function).returns
            }
            Some(Binding::Block(block)) => {
                let block = block.clone();
                self.block_signature(&block).returns
            }
            None => ValueType::Any,
        }
    }

    /// Juxtaposed operands: an application types as the head's result,
    /// anything else as a homogeneous-ish list.
    fn tuple_type(&mut self, elements: &[Expression], scope: ScopeId) -> ValueType {
        if let [head, rest @ ..] = elements {
            if !rest.is_empty() {
                if let ExpressionKind::Identifier(name) = head.kind {
                    match self.ctx.lookup_from(scope, name) {
                        Some(Binding::Builtin(builtin)) if builtin.consumes_operands() => {
                            return builtin.return_type();
                        }
                        Some(Binding::Function(function))
                            if !function.params.is_empty() =>
                        {
                            let function = function.clone();
                            return self.function_signature(&function).returns;
                        }
                        _ => {}
                    }
                }
            }
        }
        if elements.is_empty() {
            return ValueType::Tuple(Vec::new());
        }
        let element_union = elements
            .iter()
            .map(|element| self.expression_type(element, scope))
            .reduce(|a, b| a.union_with(b))
            .unwrap_or(ValueType::Void);
        ValueType::list(element_union).simplified()
    }

    /// Member typing with the scalar-as-sequence fallback the runtime has.
    fn member_type(&mut self, lhs: &ValueType, name: &str) -> ValueType {
        if let Some(ty) = lhs.member_type(name) {
            return ty;
        }
        // Scalars answer ordinal members as one-element sequences.
        if ordinal_index(name) == Some(0) || name == "last" {
            return lhs.clone();
        }
        match name {
            "count" => ValueType::Number,
            "allButFirst" | "allButLast" => ValueType::list(lhs.clone()),
            "lines" | "words" | "characters" => ValueType::list(ValueType::String),
            _ if ordinal_index(name).is_some() => ValueType::Void,
            _ => ValueType::Any,
        }
    }
}

/// The operator-typing rule for `+ - * /`.
fn arithmetic_type(a: &ValueType, b: &ValueType) -> ValueType {
    let vectorish =
        |ty: &ValueType| matches!(ty, ValueType::Vector | ValueType::Size);
    let listish = |ty: &ValueType| matches!(ty, ValueType::List(_) | ValueType::Tuple(_));
    if vectorish(a) || vectorish(b) {
        ValueType::Vector
    } else if listish(a) || listish(b) {
        ValueType::list(ValueType::Number)
    } else if matches!(a, ValueType::Any) || matches!(b, ValueType::Any) {
        ValueType::Union(vec![ValueType::Number, ValueType::list(ValueType::Number)])
    } else {
        ValueType::Number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_par::parse_source;
    use shape_util::span::FileId;

    /// Type the final expression statement of a program, executing the
    /// defines before it so user symbols resolve.
    fn type_of_last(source: &str) -> ValueType {
        use crate::delegate::NullDelegate;
        use crate::eval::Evaluator;
        use shape_geom::{CancellationToken, DefaultKernel, GeometryCache};
        use std::sync::Arc;

        let program = parse_source(source, FileId::DUMMY).unwrap();
        let delegate = NullDelegate;
        let kernel = DefaultKernel::new();
        let mut evaluator = Evaluator::new(
            &delegate,
            &kernel,
            Arc::new(GeometryCache::new()),
            CancellationToken::new(),
        );
        let (last, rest) = program.statements.split_last().unwrap();
        for statement in rest {
            evaluator
                .exec(statement)
                .unwrap_or_else(|err| panic!("setup failed: {}", err));
        }
        match &last.kind {
            StatementKind::Expression(expression) => {
                static_type(expression, &evaluator.ctx)
            }
            StatementKind::Command(name, Some(argument)) if name.name.as_str() == "probe" => {
                static_type(argument, &evaluator.ctx)
            }
            other => panic!("expected a final expression, got {:?}", other),
        }
    }

    #[test]
    fn literal_and_application_types() {
        assert_eq!(type_of_last("probe cos(pi)"), ValueType::Number);
        assert_eq!(
            type_of_last("probe (1 5)"),
            ValueType::list(ValueType::Number)
        );
        assert_eq!(type_of_last("probe \"hi\""), ValueType::String);
        assert_eq!(type_of_last("probe #f00"), ValueType::Color);
    }

    #[test]
    fn member_chains_through_geometry() {
        assert_eq!(
            type_of_last("probe cube.polygons.first.points"),
            ValueType::list(ValueType::Point)
        );
        assert_eq!(
            type_of_last("probe (square { color red }).points.first.color"),
            ValueType::optional(ValueType::Color)
        );
        assert_eq!(type_of_last("probe cube.bounds"), ValueType::Bounds);
    }

    #[test]
    fn scalars_type_as_single_element_sequences() {
        assert_eq!(type_of_last("define foo 10\nprobe foo.first"), ValueType::Number);
        assert_eq!(type_of_last("define foo 10\nprobe foo.count"), ValueType::Number);
        assert_eq!(
            type_of_last("define foo 10\nprobe foo.second"),
            ValueType::Void
        );
    }

    #[test]
    fn operator_typing_table() {
        assert_eq!(type_of_last("probe 1 + 2"), ValueType::Number);
        assert_eq!(type_of_last("probe (1 2) * 2"), ValueType::list(ValueType::Number));
        assert_eq!(type_of_last("probe 1 < 2"), ValueType::Boolean);
        assert_eq!(type_of_last("probe 1 = 2"), ValueType::Boolean);
        assert_eq!(type_of_last("probe 1 to 10 step 2"), ValueType::Range);
        assert_eq!(type_of_last("probe not true"), ValueType::Boolean);
        assert_eq!(type_of_last("probe 1 in (1 2)"), ValueType::Boolean);
    }

    #[test]
    fn property_identifiers_use_declared_types() {
        assert_eq!(type_of_last("probe color"), ValueType::Color);
        assert_eq!(type_of_last("probe opacity"), ValueType::Number);
        assert_eq!(type_of_last("probe rnd"), ValueType::Number);
    }

    #[test]
    fn function_parameters_infer_from_usage() {
        let source = "define avg(a b) {\n    (a + b) / 2\n}\nprobe avg";
        // Typing the bare identifier forces the signature.
        assert_eq!(type_of_last(source), ValueType::Number);
    }

    #[test]
    fn signature_narrows_arithmetic_parameters() {
        use crate::delegate::NullDelegate;
        use crate::eval::Evaluator;
        use shape_geom::{CancellationToken, DefaultKernel, GeometryCache};
        use std::sync::Arc;

        let program = parse_source(
            "define scaled(v k) {\n    v * k\n}",
            FileId::DUMMY,
        )
        .unwrap();
        let delegate = NullDelegate;
        let kernel = DefaultKernel::new();
        let mut evaluator = Evaluator::new(
            &delegate,
            &kernel,
            Arc::new(GeometryCache::new()),
            CancellationToken::new(),
        );
        evaluator.exec(&program.statements[0]).unwrap();

        let name = Symbol::intern("scaled");
        let function = match evaluator.ctx.lookup(name) {
            Some(Binding::Function(function)) => function.clone(),
            other => panic!("expected function binding, got {:?}", other),
        };
        let signature = function_type(&function, &evaluator.ctx);
        assert_eq!(signature.params.len(), 2);
        assert_eq!(
            signature.params[0].clone().simplified(),
            ValueType::number_or_vector().simplified()
        );
        // Memoised on the symbol.
        assert!(function.ty.get().is_some());
    }

    #[test]
    fn unused_parameters_default_to_open_lists() {
        use crate::delegate::NullDelegate;
        use crate::eval::Evaluator;
        use shape_geom::{CancellationToken, DefaultKernel, GeometryCache};
        use std::sync::Arc;

        let program =
            parse_source("define pick(a b) {\n    a + 1\n}", FileId::DUMMY).unwrap();
        let delegate = NullDelegate;
        let kernel = DefaultKernel::new();
        let mut evaluator = Evaluator::new(
            &delegate,
            &kernel,
            Arc::new(GeometryCache::new()),
            CancellationToken::new(),
        );
        evaluator.exec(&program.statements[0]).unwrap();

        let function = match evaluator.ctx.lookup(Symbol::intern("pick")) {
            Some(Binding::Function(function)) => function.clone(),
            other => panic!("expected function binding, got {:?}", other),
        };
        let signature = function_type(&function, &evaluator.ctx);
        assert_eq!(signature.params[1], ValueType::list(ValueType::Any));
    }

    #[test]
    fn recursive_functions_type_as_any() {
        use crate::delegate::NullDelegate;
        use crate::eval::Evaluator;
        use shape_geom::{CancellationToken, DefaultKernel, GeometryCache};
        use std::sync::Arc;

        let program = parse_source(
            "define nest(n) {\n    if n > 0 {\n        nest n - 1\n    }\n}",
            FileId::DUMMY,
        )
        .unwrap();
        let delegate = NullDelegate;
        let kernel = DefaultKernel::new();
        let mut evaluator = Evaluator::new(
            &delegate,
            &kernel,
            Arc::new(GeometryCache::new()),
            CancellationToken::new(),
        );
        evaluator.exec(&program.statements[0]).unwrap();

        let function = match evaluator.ctx.lookup(Symbol::intern("nest")) {
            Some(Binding::Function(function)) => function.clone(),
            other => panic!("expected function binding, got {:?}", other),
        };
        // Inference terminates and produces a usable signature.
        let signature = function_type(&function, &evaluator.ctx);
        assert_eq!(signature.params.len(), 1);
    }

    #[test]
    fn block_returns_infer_from_body() {
        use crate::delegate::NullDelegate;
        use crate::eval::Evaluator;
        use shape_geom::{CancellationToken, DefaultKernel, GeometryCache};
        use std::sync::Arc;

        let program = parse_source(
            "define wheel {\n    cylinder { size 1 0.2 }\n}",
            FileId::DUMMY,
        )
        .unwrap();
        let delegate = NullDelegate;
        let kernel = DefaultKernel::new();
        let mut evaluator = Evaluator::new(
            &delegate,
            &kernel,
            Arc::new(GeometryCache::new()),
            CancellationToken::new(),
        );
        evaluator.exec(&program.statements[0]).unwrap();

        let block = match evaluator.ctx.lookup(Symbol::intern("wheel")) {
            Some(Binding::Block(block)) => block.clone(),
            other => panic!("expected block binding, got {:?}", other),
        };
        let signature = block_type(&block, &evaluator.ctx);
        assert_eq!(signature.returns, ValueType::Mesh);
    }
}
