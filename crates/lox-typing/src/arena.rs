use std::fmt;

use rustc_hash::FxHashSet;

use crate::types::{Constraint, RefId, Type};

#[derive(Debug, Clone, Default)]
struct RefSlot {
    value: Option<Type>,
    /// Alternative binding sets left behind by an ambiguous unification. Consulted the next time
    /// the ref is bound.
    pending: Vec<Constraint>,
}

/// Owner of every unification variable created during one checker run.
///
/// Refs are plain indices into `slots`; binding and unbinding are array writes, and forgetting
/// every ref created after some point is a truncation.
#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    slots: Vec<RefSlot>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> RefId {
        self.slots.push(RefSlot::default());
        RefId(self.ref_count())
    }

    pub fn fresh_type(&mut self) -> Type {
        Type::Ref(self.fresh())
    }

    /// Value of the allocator counter: the id of the most recently created ref.
    pub fn ref_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Forgets every ref whose id is above `count`.
    pub fn truncate(&mut self, count: u32) {
        self.slots.truncate(count as usize);
    }

    pub fn value(&self, id: RefId) -> Option<&Type> {
        self.slots[id.index()].value.as_ref()
    }

    pub fn is_bound(&self, id: RefId) -> bool {
        self.value(id).is_some()
    }

    /// Binds an unbound ref. Rebinding without an `unbind` in between would allow cycles.
    pub fn bind(&mut self, id: RefId, value: Type) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.value.is_none(), "{id} is already bound");
        slot.value = Some(value);
    }

    pub fn unbind(&mut self, id: RefId) {
        self.slots[id.index()].value = None;
    }

    pub fn pending(&self, id: RefId) -> &[Constraint] {
        &self.slots[id.index()].pending
    }

    pub fn set_pending(&mut self, id: RefId, constraints: Vec<Constraint>) {
        self.slots[id.index()].pending = constraints;
    }

    /// Follows bound refs until reaching a non-ref or an unbound ref.
    pub fn deref<'a>(&'a self, mut ty: &'a Type) -> &'a Type {
        while let Type::Ref(id) = ty {
            match self.value(*id) {
                Some(value) => ty = value,
                None => break,
            }
        }
        ty
    }

    /// Builds a union, flattening nested unions and dropping alternatives that render the same.
    /// A single surviving alternative is returned as is.
    pub fn union(&self, alternatives: Vec<Type>) -> Type {
        let mut flat = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = alternatives;
        queue.reverse();
        while let Some(alternative) = queue.pop() {
            if let Type::Union(nested) = self.deref(&alternative) {
                queue.extend(nested.iter().rev().cloned());
                continue;
            }
            if seen.insert(self.render(&alternative)) {
                flat.push(alternative);
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Type::Union(flat)
        }
    }

    pub fn display<'a>(&'a self, ty: &'a Type) -> TypeDisplay<'a> {
        TypeDisplay { arena: self, ty }
    }

    /// Canonical text of a type. Also the dedup key for union alternatives.
    pub fn render(&self, ty: &Type) -> String {
        self.display(ty).to_string()
    }
}

pub struct TypeDisplay<'a> {
    arena: &'a TypeArena,
    ty: &'a Type,
}

impl TypeDisplay<'_> {
    fn nested<'b>(&'b self, ty: &'b Type) -> TypeDisplay<'b> {
        TypeDisplay {
            arena: self.arena,
            ty,
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Nil => f.write_str("Nil"),
            Type::Bool => f.write_str("Bool"),
            Type::Number => f.write_str("Number"),
            Type::String => f.write_str("String"),
            Type::Function(function) => {
                f.write_str("(")?;
                for (index, param) in function.params.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.nested(param))?;
                }
                write!(f, ") -> {}", self.nested(&function.ret))
            }
            Type::Ref(id) => match self.arena.value(*id) {
                Some(value) => write!(f, "&{}", self.nested(value)),
                None => write!(f, "{id}"),
            },
            Type::Union(alternatives) => {
                for (index, alternative) in alternatives.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", self.nested(alternative))?;
                }
                Ok(())
            }
        }
    }
}
