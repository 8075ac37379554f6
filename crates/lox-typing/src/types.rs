use std::fmt;

use serde::Serialize;

/// Handle to a unification variable stored in a [`TypeArena`](crate::TypeArena).
///
/// Ids start at 1 and grow with every allocation, so comparing two ids tells which variable is
/// older.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RefId(pub u32);

impl RefId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Nil,
    Bool,
    Number,
    String,
    Function(FunctionType),
    Ref(RefId),
    /// Ad hoc polymorphism: the value has one of these shapes. Built through
    /// [`TypeArena::union`](crate::TypeArena::union), which keeps alternatives flat and distinct.
    Union(Vec<Type>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl Type {
    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function(FunctionType {
            params,
            ret: Box::new(ret),
        })
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Type::Nil | Type::Bool | Type::Number | Type::String)
    }

    pub fn as_ref_id(&self) -> Option<RefId> {
        match self {
            Type::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

/// One self-consistent set of ref bindings found by the unifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraint {
    pub bindings: Vec<(RefId, Type)>,
}

impl Constraint {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn get(&self, id: RefId) -> Option<&Type> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == id)
            .map(|(_, ty)| ty)
    }
}
