//! The standard library: built-in symbols installed into the root scope.
//!
//! A built-in is an id the evaluator dispatches on, plus static metadata:
//! its kind (shape, builder, setter, function), the type its argument
//! coerces to, and the types the inferencer reports. Named constants
//! (`pi`, `true`, the colour names) are ordinary constant bindings and
//! need no dispatch.

mod math;
mod strings;

pub(crate) use math::apply_math;
pub(crate) use strings::apply_string;

use shape_geom::Color;

use crate::context::EvalContext;
use crate::types::ValueType;
use crate::value::Value;

/// A built-in symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Solid primitives and the transparent container.
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Group,

    // 2D path shapes.
    Square,
    Circle,
    RoundRect,
    PolygonShape,
    PathShape,
    Text,

    // Point emitters, valid inside a path body.
    Point,
    Curve,
    ArcPoint,

    // Mesh builders and constructive operations.
    Fill,
    Extrude,
    Lathe,
    Hull,
    Minkowski,
    UnionOp,
    IntersectionOp,
    DifferenceOp,
    Stencil,

    // Cumulative transform commands.
    Translate,
    Rotate,
    Scale,

    // Replacing placement options.
    Position,
    Orientation,
    Size,

    // Builder options.
    Along,
    Twist,
    Sides,
    Radius,

    // Material and context setters (usable bare as getters).
    ColorSet,
    TextureSet,
    NormalsSet,
    Opacity,
    Metallicity,
    Roughness,
    Glow,
    MaterialSet,
    FontSet,
    Detail,
    Smoothing,
    Seed,

    /// `object { key value, ... }` constructor.
    ObjectShape,

    // Logging and checks.
    Print,
    Assert,

    // Math.
    Rnd,
    Sum,
    Length,
    Normalize,
    Dot,
    Cross,
    Floor,
    Ceil,
    Round,
    Abs,
    Sqrt,
    Sign,
    Min,
    Max,
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    Atan2,
    Pow,
    Log,
    Exp,
    Clamp,
    Lerp,
    Mod,

    // Strings.
    Split,
    Join,
    Trim,
}

/// Broad classification driving evaluator dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Emits a mesh node; takes an option body, never a juxtaposed
    /// argument.
    Shape,
    /// Emits a 2D path (or planar polygon); takes an option body.
    PathShape,
    /// Emits a path point; takes a position argument.
    PointEmitter,
    /// Consumes child paths/meshes (from a body or juxtaposed operands)
    /// and produces a mesh.
    Builder,
    /// Mutates context state; usable bare as a getter when it has a
    /// property type.
    Setter,
    /// A value function; consumes the operands that follow it in a tuple.
    Function,
}

impl Builtin {
    /// The source-level name.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cube => "cube",
            Builtin::Sphere => "sphere",
            Builtin::Cylinder => "cylinder",
            Builtin::Cone => "cone",
            Builtin::Group => "group",
            Builtin::Square => "square",
            Builtin::Circle => "circle",
            Builtin::RoundRect => "roundrect",
            Builtin::PolygonShape => "polygon",
            Builtin::PathShape => "path",
            Builtin::Text => "text",
            Builtin::Point => "point",
            Builtin::Curve => "curve",
            Builtin::ArcPoint => "arc",
            Builtin::Fill => "fill",
            Builtin::Extrude => "extrude",
            Builtin::Lathe => "lathe",
            Builtin::Hull => "hull",
            Builtin::Minkowski => "minkowski",
            Builtin::UnionOp => "union",
            Builtin::IntersectionOp => "intersection",
            Builtin::DifferenceOp => "difference",
            Builtin::Stencil => "stencil",
            Builtin::Translate => "translate",
            Builtin::Rotate => "rotate",
            Builtin::Scale => "scale",
            Builtin::Position => "position",
            Builtin::Orientation => "orientation",
            Builtin::Size => "size",
            Builtin::Along => "along",
            Builtin::Twist => "twist",
            Builtin::Sides => "sides",
            Builtin::Radius => "radius",
            Builtin::ColorSet => "color",
            Builtin::TextureSet => "texture",
            Builtin::NormalsSet => "normals",
            Builtin::Opacity => "opacity",
            Builtin::Metallicity => "metallicity",
            Builtin::Roughness => "roughness",
            Builtin::Glow => "glow",
            Builtin::MaterialSet => "material",
            Builtin::FontSet => "font",
            Builtin::Detail => "detail",
            Builtin::Smoothing => "smoothing",
            Builtin::Seed => "seed",
            Builtin::ObjectShape => "object",
            Builtin::Print => "print",
            Builtin::Assert => "assert",
            Builtin::Rnd => "rnd",
            Builtin::Sum => "sum",
            Builtin::Length => "length",
            Builtin::Normalize => "normalize",
            Builtin::Dot => "dot",
            Builtin::Cross => "cross",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Abs => "abs",
            Builtin::Sqrt => "sqrt",
            Builtin::Sign => "sign",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Cos => "cos",
            Builtin::Sin => "sin",
            Builtin::Tan => "tan",
            Builtin::Acos => "acos",
            Builtin::Asin => "asin",
            Builtin::Atan => "atan",
            Builtin::Atan2 => "atan2",
            Builtin::Pow => "pow",
            Builtin::Log => "log",
            Builtin::Exp => "exp",
            Builtin::Clamp => "clamp",
            Builtin::Lerp => "lerp",
            Builtin::Mod => "mod",
            Builtin::Split => "split",
            Builtin::Join => "join",
            Builtin::Trim => "trim",
        }
    }

    pub fn kind(self) -> BuiltinKind {
        use Builtin::*;
        match self {
            Cube | Sphere | Cylinder | Cone | Group | ObjectShape => BuiltinKind::Shape,
            Square | Circle | RoundRect | PolygonShape | PathShape => BuiltinKind::PathShape,
            Point | Curve | ArcPoint => BuiltinKind::PointEmitter,
            Fill | Extrude | Lathe | Hull | Minkowski | UnionOp | IntersectionOp
            | DifferenceOp | Stencil => BuiltinKind::Builder,
            Translate | Rotate | Scale | Position | Orientation | Size | Along | Twist
            | Sides | Radius | ColorSet | TextureSet | NormalsSet | Opacity | Metallicity
            | Roughness | Glow | MaterialSet | FontSet | Detail | Smoothing | Seed => {
                BuiltinKind::Setter
            }
            Text | Print | Assert | Rnd | Sum | Length | Normalize | Dot | Cross | Floor
            | Ceil | Round | Abs | Sqrt | Sign | Min | Max | Cos | Sin | Tan | Acos | Asin
            | Atan | Atan2 | Pow | Log | Exp | Clamp | Lerp | Mod | Split | Join | Trim => {
                BuiltinKind::Function
            }
        }
    }

    /// The type a supplied argument is coerced to, or `None` when the
    /// symbol takes no argument (shapes, `rnd`).
    pub fn parameter_type(self) -> Option<ValueType> {
        use Builtin::*;
        let geometry_child = ValueType::Union(vec![
            ValueType::Mesh,
            ValueType::Path,
            ValueType::Polygon,
        ]);
        Some(match self {
            Cube | Sphere | Cylinder | Cone | Group | Square | Circle | RoundRect
            | PolygonShape | PathShape | ObjectShape | Rnd => return None,
            Point | Curve | ArcPoint => ValueType::Vector,
            Fill | Extrude | Lathe | Hull | Minkowski | UnionOp | IntersectionOp
            | DifferenceOp | Stencil => ValueType::list(geometry_child),
            Translate | Position => ValueType::Vector,
            Rotate | Orientation => ValueType::Rotation,
            Scale | Size => ValueType::Size,
            Along => ValueType::list(ValueType::Path),
            Twist | Sides | Radius => ValueType::Number,
            ColorSet => ValueType::Color,
            TextureSet | NormalsSet => ValueType::Texture,
            Opacity | Metallicity | Roughness | Glow => ValueType::Number,
            MaterialSet => ValueType::Material,
            FontSet => ValueType::Font,
            Detail | Smoothing | Seed => ValueType::Number,
            Print => ValueType::list(ValueType::Any),
            Assert => ValueType::Boolean,
            Text => ValueType::String,
            // Accepts tuples of any arity, which broadcast with zero fill.
            Sum => ValueType::list(ValueType::Any),
            Length | Normalize => ValueType::Vector,
            Dot | Cross => ValueType::Tuple(vec![ValueType::Vector, ValueType::Vector]),
            Floor | Ceil | Round | Abs | Sqrt | Sign => ValueType::number_or_vector(),
            Min | Max => ValueType::list(ValueType::Number),
            Cos | Sin | Tan => {
                ValueType::Union(vec![ValueType::Number, ValueType::Radians])
            }
            Acos | Asin | Atan | Log | Exp => ValueType::Number,
            Atan2 | Pow | Mod => ValueType::Tuple(vec![ValueType::Number, ValueType::Number]),
            Trim => ValueType::String,
            Clamp | Lerp => ValueType::Tuple(vec![
                ValueType::Number,
                ValueType::Number,
                ValueType::Number,
            ]),
            Split => ValueType::Tuple(vec![ValueType::String, ValueType::String]),
            Join => ValueType::list(ValueType::Any),
        })
    }

    /// The static type of the symbol's result when invoked.
    pub fn return_type(self) -> ValueType {
        use Builtin::*;
        match self {
            Cube | Sphere | Cylinder | Cone | Group | Fill | Extrude | Lathe | Hull
            | Minkowski | UnionOp | IntersectionOp | DifferenceOp | Stencil => ValueType::Mesh,
            Square | Circle | RoundRect | PathShape => ValueType::Path,
            PolygonShape => ValueType::Union(vec![ValueType::Path, ValueType::Polygon]),
            Text => ValueType::list(ValueType::Path),
            ObjectShape => ValueType::AnyObject,
            Point | Curve | ArcPoint => ValueType::Point,
            Rnd | Length | Dot | Floor | Ceil | Round | Sqrt | Sign | Min | Max | Cos | Sin
            | Tan | Acos | Asin | Atan | Atan2 | Pow | Log | Exp | Clamp | Lerp | Mod => {
                ValueType::Number
            }
            Abs => ValueType::number_or_vector(),
            Sum => ValueType::Union(vec![
                ValueType::Number,
                ValueType::list(ValueType::Number),
            ]),
            Normalize | Cross => ValueType::Vector,
            Split => ValueType::list(ValueType::String),
            Join | Trim => ValueType::String,
            Print | Assert => ValueType::Void,
            // Setters produce no value when invoked as commands.
            _ => ValueType::Void,
        }
    }

    /// The value type a setter exposes when read bare, if it is readable.
    pub fn property_type(self) -> Option<ValueType> {
        use Builtin::*;
        Some(match self {
            ColorSet => ValueType::Color,
            TextureSet | NormalsSet => ValueType::optional(ValueType::Texture),
            Opacity | Metallicity | Roughness | Glow | Detail => ValueType::Number,
            Smoothing => ValueType::optional(ValueType::Number),
            MaterialSet => ValueType::Material,
            FontSet => ValueType::optional(ValueType::Font),
            _ => return None,
        })
    }

    /// Whether a following operand sequence in a tuple belongs to this
    /// symbol. Only value functions consume; setters read as getters in
    /// expression position.
    pub fn consumes_operands(self) -> bool {
        self.kind() == BuiltinKind::Function && self.parameter_type().is_some()
    }
}

/// Install every built-in symbol and named constant into the root scope.
pub(crate) fn install(ctx: &mut EvalContext) {
    use Builtin::*;
    for builtin in [
        Cube, Sphere, Cylinder, Cone, Group, Square, Circle, RoundRect, PolygonShape,
        PathShape, Text, Point, Curve, ArcPoint, Fill, Extrude, Lathe, Hull, Minkowski,
        UnionOp, IntersectionOp, DifferenceOp, Stencil, Translate, Rotate, Scale, Position,
        Orientation, Size, Along, Twist, Sides, Radius, ColorSet, TextureSet, NormalsSet,
        Opacity, Metallicity, Roughness, Glow, MaterialSet, FontSet, Detail, Smoothing, Seed,
        ObjectShape, Print, Assert, Rnd, Sum, Length, Normalize, Dot, Cross, Floor, Ceil, Round, Abs,
        Sqrt, Sign, Min, Max, Cos, Sin, Tan, Acos, Asin, Atan, Atan2, Pow, Log, Exp, Clamp,
        Lerp, Mod, Split, Join, Trim,
    ] {
        ctx.install_builtin(builtin.name(), builtin);
    }

    ctx.install_constant("pi", Value::Radians(std::f64::consts::PI));
    ctx.install_constant("true", Value::Boolean(true));
    ctx.install_constant("false", Value::Boolean(false));

    for (name, color) in [
        ("white", Color::WHITE),
        ("black", Color::BLACK),
        ("red", Color::RED),
        ("green", Color::GREEN),
        ("blue", Color::BLUE),
        ("yellow", Color::YELLOW),
        ("cyan", Color::CYAN),
        ("magenta", Color::MAGENTA),
        ("orange", Color::ORANGE),
        ("gray", Color::GRAY),
        ("grey", Color::GRAY),
    ] {
        ctx.install_constant(name, Value::Color(color));
    }
}
