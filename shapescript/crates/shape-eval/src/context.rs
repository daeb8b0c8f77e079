//! The evaluation context: a tree of scopes.
//!
//! Scopes are ribs in an arena, linked by parent ids. Pushing a scope
//! copies the inherited state (material, transform, font, detail,
//! smoothing, random state) by value, so mutations in a child are
//! invisible to the parent. The arena never frees ribs during a run,
//! which is what lets user functions and blocks capture their definition
//! scope by id and be invoked long after that scope was "popped".

use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use shape_geom::{Color, Halfturns, Material, Path, Rotation, Transform, Vector};
use shape_par::ast::{Block, Identifier};
use shape_util::index_vec::{Idx, IndexVec};
use shape_util::symbol::Symbol;

use crate::stdlib::Builtin;
use crate::types::ValueType;
use crate::value::Value;

/// Index of a scope in the context arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl Idx for ScopeId {
    fn from_usize(idx: usize) -> Self {
        ScopeId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a scope is for; this decides where transforms restart and what
/// happens to emitted children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// The program root; children become the scene.
    Root,
    /// The body of a geometry node (primitive, builder, group). Children
    /// are placed relative to the node, so the local transform restarts
    /// at identity.
    Shape,
    /// A path body; children are points and sub-paths.
    Path,
    /// A user block invocation; children become the return value.
    Block,
    /// A user function call; the body's value is the result.
    Function,
    /// A loop iteration or conditional branch: transparent for children,
    /// which flow to the nearest enclosing collector.
    Body,
}

/// The inferred signature of a user-defined function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    /// One entry per declared parameter.
    pub params: Vec<ValueType>,
    pub returns: ValueType,
}

/// The inferred signature of a user-defined block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    /// What the block's body does with `children`.
    pub child_types: ValueType,
    pub returns: ValueType,
}

/// A user-defined function: named parameters plus a body, closed over its
/// definition scope.
#[derive(Debug)]
pub struct UserFunction {
    pub name: Symbol,
    pub params: Vec<Identifier>,
    pub body: Block,
    pub captured: ScopeId,
    /// Memoised signature, computed on first use by the inferencer.
    pub ty: OnceLock<FunctionType>,
}

/// A user-defined block: a body with declared options, closed over its
/// definition scope.
#[derive(Debug)]
pub struct UserBlock {
    pub name: Symbol,
    pub body: Block,
    pub captured: ScopeId,
    /// Names declared with `option` at the top level of the body, in
    /// declaration order. Only these may be set by a call body.
    pub options: Vec<Symbol>,
    /// Memoised signature, computed on first use by the inferencer.
    pub ty: OnceLock<BlockType>,
}

/// What a name is bound to.
#[derive(Clone, Debug)]
pub enum Binding {
    Constant(Value),
    Function(Arc<UserFunction>),
    Block(Arc<UserBlock>),
    Builtin(Builtin),
}

/// Per-shape option state collected while a block body runs.
#[derive(Clone, Debug, Default)]
pub struct ShapeState {
    /// `position` replaces rather than accumulates.
    pub position: Option<Vector>,
    pub orientation: Option<Rotation>,
    pub size: Option<Vector>,
    /// Extrusion rail.
    pub along: Option<Path>,
    /// Extrusion twist in half-turns.
    pub twist: Halfturns,
    /// Regular-polygon side count.
    pub sides: Option<u32>,
    /// Corner radius for `roundrect`.
    pub radius: Option<f64>,
    /// Colour applied to points emitted in a path body; starts unset so
    /// uniform colour outside the path does not bake into vertices.
    pub point_color: Option<Color>,
}

impl ShapeState {
    /// The placement transform a shape's options describe.
    pub fn placement(&self) -> Transform {
        Transform {
            offset: self.position.unwrap_or(Vector::ZERO),
            rotation: self.orientation.unwrap_or(Rotation::IDENTITY),
            scale: self.size.unwrap_or(Vector::ONE),
        }
    }
}

/// One rib of the scope tree.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    bindings: FxHashMap<Symbol, Binding>,
    pub material: Material,
    pub transform: Transform,
    pub font: Option<Arc<str>>,
    pub detail: u32,
    pub smoothing: Option<f64>,
    /// State of the deterministic random generator; copied to children so
    /// a child's draws do not disturb the parent's sequence.
    pub rnd_state: u64,
    /// Values emitted by statements in this scope, in source order.
    pub children: Vec<Value>,
    pub shape: ShapeState,
    /// During a block call body: the names the callee declared as options.
    pub settable_options: Vec<Symbol>,
    /// Option overrides, collected by the call body and consumed by
    /// `option` statements in the block body.
    pub option_values: FxHashMap<Symbol, Value>,
}

impl Scope {
    pub const DEFAULT_DETAIL: u32 = 16;

    fn root() -> Self {
        Self {
            parent: None,
            kind: ScopeKind::Root,
            bindings: FxHashMap::default(),
            material: Material::default(),
            transform: Transform::IDENTITY,
            font: None,
            detail: Self::DEFAULT_DETAIL,
            smoothing: None,
            rnd_state: seed_state(0.0),
            children: Vec::new(),
            shape: ShapeState::default(),
            settable_options: Vec::new(),
            option_values: FxHashMap::default(),
        }
    }

    pub fn binding(&self, name: Symbol) -> Option<&Binding> {
        self.bindings.get(&name)
    }

    /// Names bound directly in this scope.
    pub fn binding_names(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.bindings.keys().copied()
    }
}

/// The scope arena plus a pointer to the scope statements currently
/// execute in.
pub struct EvalContext {
    scopes: IndexVec<ScopeId, Scope>,
    current: ScopeId,
}

impl EvalContext {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope::root());
        let mut ctx = Self {
            scopes,
            current: root,
        };
        crate::stdlib::install(&mut ctx);
        ctx
    }

    pub fn root_id(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current_id(&self) -> ScopeId {
        self.current
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    pub fn current(&self) -> &Scope {
        &self.scopes[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        let id = self.current;
        &mut self.scopes[id]
    }

    /// Push a child of the current scope and make it current.
    pub fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        self.push_scope_under(kind, self.current)
    }

    /// Push a child of an arbitrary scope (used for calls, whose lexical
    /// parent is the captured definition scope) and make it current.
    ///
    /// The dynamic state (material, transform, font, detail, smoothing,
    /// random state) is inherited by value from the *current* scope, not
    /// the lexical parent: a red cube stays red inside a block defined
    /// before the colour was set.
    pub fn push_scope_under(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let inherited = &self.scopes[self.current];
        let scope = Scope {
            parent: Some(parent),
            kind,
            bindings: FxHashMap::default(),
            material: inherited.material.clone(),
            // A geometry node's children are placed relative to the node,
            // and a call's results are placed by the caller when it routes
            // them; only transparent bodies keep the accumulated transform.
            transform: match kind {
                ScopeKind::Root | ScopeKind::Body => inherited.transform,
                ScopeKind::Shape
                | ScopeKind::Path
                | ScopeKind::Block
                | ScopeKind::Function => Transform::IDENTITY,
            },
            font: inherited.font.clone(),
            detail: inherited.detail,
            smoothing: inherited.smoothing,
            rnd_state: inherited.rnd_state,
            children: Vec::new(),
            shape: ShapeState::default(),
            settable_options: Vec::new(),
            option_values: FxHashMap::default(),
        };
        let id = self.scopes.push(scope);
        self.current = id;
        id
    }

    /// Leave the current scope, returning its id for inspection. The rib
    /// itself stays in the arena (captured scopes reference it by id).
    pub fn pop_scope(&mut self) -> ScopeId {
        let popped = self.current;
        self.current = self.scopes[popped]
            .parent
            .expect("the root scope is never popped");
        popped
    }

    /// Move a finished scope's children out.
    pub fn take_children(&mut self, id: ScopeId) -> Vec<Value> {
        std::mem::take(&mut self.scopes[id].children)
    }

    /// Walk the scope chain for a binding.
    pub fn lookup(&self, name: Symbol) -> Option<&Binding> {
        self.lookup_from(self.current, name)
    }

    pub fn lookup_from(&self, start: ScopeId, name: Symbol) -> Option<&Binding> {
        let mut id = start;
        loop {
            let scope = &self.scopes[id];
            if let Some(binding) = scope.bindings.get(&name) {
                return Some(binding);
            }
            id = scope.parent?;
        }
    }

    /// Bind a name in the current scope.
    ///
    /// Shadowing an outer binding is allowed (that is how users override
    /// built-ins locally); rebinding a reserved built-in name in its own
    /// scope is a redefinition error, reported by the caller.
    pub fn define(&mut self, name: Symbol, binding: Binding) -> Result<(), ()> {
        let scope = self.current_mut();
        if matches!(scope.bindings.get(&name), Some(Binding::Builtin(_))) {
            return Err(());
        }
        scope.bindings.insert(name, binding);
        Ok(())
    }

    /// Install a built-in; used only while populating the root scope.
    pub(crate) fn install_builtin(&mut self, name: &str, builtin: Builtin) {
        let symbol = Symbol::intern(name);
        self.current_mut().bindings.insert(symbol, Binding::Builtin(builtin));
    }

    /// Install a named constant; used while populating the root scope.
    pub(crate) fn install_constant(&mut self, name: &str, value: Value) {
        let symbol = Symbol::intern(name);
        self.current_mut()
            .bindings
            .insert(symbol, Binding::Constant(value));
    }

    /// Append a value to the current scope's children.
    pub fn emit_child(&mut self, value: Value) {
        self.current_mut().children.push(value);
    }

    /// The kind that decides what children mean here, looking through
    /// transparent bodies.
    pub fn collecting_kind(&self) -> ScopeKind {
        let mut id = self.current;
        loop {
            let scope = &self.scopes[id];
            if scope.kind != ScopeKind::Body {
                return scope.kind;
            }
            match scope.parent {
                Some(parent) => id = parent,
                None => return ScopeKind::Root,
            }
        }
    }

    /// The nearest enclosing path scope, if statements currently execute
    /// inside one.
    pub fn enclosing_path_scope(&self) -> Option<ScopeId> {
        let mut id = self.current;
        loop {
            let scope = &self.scopes[id];
            match scope.kind {
                ScopeKind::Path => return Some(id),
                ScopeKind::Body => id = scope.parent?,
                _ => return None,
            }
        }
    }

    /// All names visible from the current scope, for "did you mean" hints.
    pub fn visible_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut id = Some(self.current);
        while let Some(scope_id) = id {
            let scope = &self.scopes[scope_id];
            names.extend(scope.binding_names().map(|s| s.as_str()));
            id = scope.parent;
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Draw the next deterministic random number in `[0, 1)`.
    pub fn next_rnd(&mut self) -> f64 {
        let scope = self.current_mut();
        scope.rnd_state = scope
            .rnd_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // Top 53 bits give a uniform double in [0, 1).
        (scope.rnd_state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Reset the current scope's random sequence.
    pub fn set_seed(&mut self, seed: f64) {
        self.current_mut().rnd_state = seed_state(seed);
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a seed number onto a generator state, avoiding the all-zero state.
fn seed_state(seed: f64) -> u64 {
    let bits = if seed == 0.0 { 0 } else { seed.to_bits() };
    bits.wrapping_mul(0x9e3779b97f4a7c15).wrapping_add(0x2545f4914f6cdd1d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_scope_chain() {
        let mut ctx = EvalContext::new();
        let name = Symbol::intern("radius");
        ctx.define(name, Binding::Constant(Value::Number(1.0))).unwrap();
        ctx.push_scope(ScopeKind::Block);
        assert!(matches!(
            ctx.lookup(name),
            Some(Binding::Constant(Value::Number(n))) if *n == 1.0
        ));
        // Shadowing in the child is fine and invisible to the parent.
        ctx.define(name, Binding::Constant(Value::Number(2.0))).unwrap();
        assert!(matches!(
            ctx.lookup(name),
            Some(Binding::Constant(Value::Number(n))) if *n == 2.0
        ));
        ctx.pop_scope();
        assert!(matches!(
            ctx.lookup(name),
            Some(Binding::Constant(Value::Number(n))) if *n == 1.0
        ));
    }

    #[test]
    fn builtin_names_resist_same_scope_redefinition() {
        let mut ctx = EvalContext::new();
        let cube = Symbol::intern("cube");
        assert!(ctx.define(cube, Binding::Constant(Value::Number(1.0))).is_err());
        // A child scope may shadow it.
        ctx.push_scope(ScopeKind::Block);
        assert!(ctx.define(cube, Binding::Constant(Value::Number(1.0))).is_ok());
    }

    #[test]
    fn child_state_is_a_copy() {
        let mut ctx = EvalContext::new();
        ctx.current_mut().material.color = Some(Color::RED);
        ctx.push_scope(ScopeKind::Shape);
        ctx.current_mut().material.color = Some(Color::BLUE);
        assert_eq!(ctx.current().material.color, Some(Color::BLUE));
        ctx.pop_scope();
        assert_eq!(ctx.current().material.color, Some(Color::RED));
    }

    #[test]
    fn shape_scopes_restart_the_transform() {
        let mut ctx = EvalContext::new();
        ctx.current_mut().transform =
            Transform::offset(Vector::new(5.0, 0.0, 0.0));
        ctx.push_scope(ScopeKind::Shape);
        assert!(ctx.current().transform.is_identity());
        ctx.pop_scope();
        ctx.push_scope(ScopeKind::Body);
        assert!(!ctx.current().transform.is_identity());
    }

    #[test]
    fn collecting_kind_looks_through_bodies() {
        let mut ctx = EvalContext::new();
        ctx.push_scope(ScopeKind::Block);
        ctx.push_scope(ScopeKind::Body);
        ctx.push_scope(ScopeKind::Body);
        assert_eq!(ctx.collecting_kind(), ScopeKind::Block);
        assert!(ctx.enclosing_path_scope().is_none());
    }

    #[test]
    fn path_scope_is_found_through_bodies() {
        let mut ctx = EvalContext::new();
        let path_scope = ctx.push_scope(ScopeKind::Path);
        ctx.push_scope(ScopeKind::Body);
        assert_eq!(ctx.enclosing_path_scope(), Some(path_scope));
    }

    #[test]
    fn children_collect_in_order() {
        let mut ctx = EvalContext::new();
        let id = ctx.push_scope(ScopeKind::Block);
        ctx.emit_child(Value::Number(1.0));
        ctx.emit_child(Value::Number(2.0));
        ctx.pop_scope();
        assert_eq!(
            ctx.take_children(id),
            vec![Value::Number(1.0), Value::Number(2.0)]
        );
        assert!(ctx.take_children(id).is_empty());
    }

    #[test]
    fn rnd_is_deterministic_and_seedable() {
        let mut a = EvalContext::new();
        let mut b = EvalContext::new();
        assert_eq!(a.next_rnd(), b.next_rnd());
        let first = a.next_rnd();
        assert!((0.0..1.0).contains(&first));

        a.set_seed(7.0);
        b.set_seed(7.0);
        assert_eq!(a.next_rnd(), b.next_rnd());
        a.set_seed(8.0);
        assert_ne!(a.next_rnd(), b.next_rnd());
    }

    #[test]
    fn child_rnd_does_not_disturb_parent() {
        let mut ctx = EvalContext::new();
        let mut reference = EvalContext::new();
        ctx.push_scope(ScopeKind::Block);
        ctx.next_rnd();
        ctx.next_rnd();
        ctx.pop_scope();
        assert_eq!(ctx.next_rnd(), reference.next_rnd());
    }

    #[test]
    fn placement_composes_options() {
        let state = ShapeState {
            position: Some(Vector::new(1.0, 2.0, 3.0)),
            size: Some(Vector::splat(2.0)),
            ..ShapeState::default()
        };
        let placement = state.placement();
        assert_eq!(placement.offset, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(placement.scale, Vector::splat(2.0));
        assert!(placement.rotation.is_identity());
    }
}
