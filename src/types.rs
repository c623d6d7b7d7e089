//! Type descriptors and the compatibility rules of the language.

use std::fmt::Display;

use indexmap::IndexMap;

/// A type descriptor.
///
/// User-declared names stay as [`Type::Named`] inside the AST and resolve
/// through the symbol table's type namespace at use sites, so descriptors
/// never own each other in a cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Integer,
    Real,
    Boolean,
    Str,
    Void,
    /// A user-declared type name.
    Named(String),
    /// A fixed-size array. The declared size must be positive.
    Array { size: i32, element: Box<Type> },
    /// A nominally-typed record; field order is declaration order.
    Record(IndexMap<String, Type>),
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Real)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Str)
    }

    /// Whether a value of type `actual` can be assigned where `self` is
    /// expected: identical simple types, `real` accepting `integer`, and
    /// arrays of identical size with compatible elements.
    pub fn accepts(&self, actual: &Type) -> bool {
        match (self, actual) {
            (
                Type::Array { size, element },
                Type::Array {
                    size: actual_size,
                    element: actual_element,
                },
            ) => size == actual_size && element.accepts(actual_element),
            (Type::Real, Type::Integer) => true,
            (expected, actual) => expected == actual,
        }
    }

    /// Whether an `as` cast from `self` to `target` is allowed: identity, or
    /// any direction within {integer, real, boolean}.
    pub fn casts_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        matches!(self, Type::Integer | Type::Real | Type::Boolean)
            && matches!(target, Type::Integer | Type::Real | Type::Boolean)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Real => write!(f, "real"),
            Type::Boolean => write!(f, "boolean"),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Named(name) => write!(f, "{name}"),
            Type::Array { size, element } => write!(f, "array [{size}] {element}"),
            Type::Record(fields) => {
                write!(f, "record ")?;
                for (name, ty) in fields {
                    write!(f, "var {name}: {ty}; ")?;
                }
                write!(f, "end")
            }
        }
    }
}
