//! Type system for tempo
//!
//! Defines the type representations consumed by the MIR passes. Types are
//! produced by the type checker; the passes here only query and extend them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Core type representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Unit result (statements, `return` without value)
    Void,
    /// Integer type
    Int,
    /// Floating point sample value
    Float,
    /// Boolean type
    Bool,
    /// String type
    String,
    /// Reference to a storage slot of the inner type
    Ref(Box<Type>),
    /// Tuple type with fixed element types
    Tuple(Vec<Type>),
    /// Array type with element type
    Array(Box<Type>),
    /// Value stamped with a logical time
    Time(Box<Type>),
    /// Function type
    Function(FunctionType),
    /// Reference to a named type (alias or record)
    Named(String),
}

/// Function type information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    /// Parameter types in declaration order
    pub arg_types: Vec<Type>,
    /// Return type
    pub ret_type: Box<Type>,
}

impl Type {
    /// Build a function type from its argument and return types.
    pub fn function(arg_types: Vec<Type>, ret_type: Type) -> Self {
        Type::Function(FunctionType {
            arg_types,
            ret_type: Box::new(ret_type),
        })
    }

    /// Wrap a type in a reference.
    pub fn reference(inner: Type) -> Self {
        Type::Ref(Box::new(inner))
    }

    /// Type of the record a closure carries for its captured values:
    /// a reference to a tuple holding a reference to each capture, in order.
    pub fn capture_record(captures: &[TypedVal]) -> Self {
        let fields = captures
            .iter()
            .map(|c| Type::reference(c.ty.clone()))
            .collect();
        Type::reference(Type::Tuple(fields))
    }

    /// Check if this type is a function type
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function(_))
    }

    /// Mutable access to the function signature, if this is a function type
    pub fn as_function_mut(&mut self) -> Option<&mut FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Ref(inner) => write!(f, "&{}", inner),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            Type::Array(elem) => write!(f, "[{}]", elem),
            Type::Time(inner) => write!(f, "time<{}>", inner),
            Type::Function(func) => write!(f, "{}", func),
            Type::Named(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        write_list(f, &self.arg_types)?;
        write!(f, ") -> {}", self.ret_type)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

/// A named value together with its type, e.g. one captured free variable.
///
/// Identity is the name: two `TypedVal`s with the same name compare equal
/// regardless of their types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedVal {
    pub name: String,
    pub ty: Type,
}

impl TypedVal {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl PartialEq for TypedVal {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypedVal {}

impl fmt::Display for TypedVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ty)
    }
}

/// Name -> type environment produced by type inference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeEnv {
    types: HashMap<String, Type>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the type of a name, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.types.insert(name.into(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Type)> for TypeEnv {
    fn from_iter<I: IntoIterator<Item = (S, Type)>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }
}
