use rustc_hash::FxHashMap;

use crate::arena::TypeArena;
use crate::types::{Constraint, FunctionType, RefId, Type};

/// A type whose unbound refs created after `floor` are renamed on every use.
///
/// Refs at or below the floor existed before the declaration was checked and stay shared
/// with the enclosing scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub ty: Type,
    pub floor: u32,
}

impl Scheme {
    /// A scheme that renames every unbound ref it contains.
    pub fn closed(ty: Type) -> Self {
        Self { ty, floor: 0 }
    }
}

impl TypeArena {
    /// Resolves bound refs and reports whether any unbound ref remains.
    pub fn ground(&self, ty: &Type) -> (Type, bool) {
        let resolved = self.resolve(ty);
        let is_ground = !self.has_unbound(&resolved);
        (resolved, is_ground)
    }

    /// Replaces every bound ref by its value, leaving unbound refs in place.
    pub fn resolve(&self, ty: &Type) -> Type {
        match self.deref(ty) {
            Type::Function(function) => Type::Function(FunctionType {
                params: function.params.iter().map(|param| self.resolve(param)).collect(),
                ret: Box::new(self.resolve(&function.ret)),
            }),
            Type::Union(alternatives) => Type::Union(
                alternatives
                    .iter()
                    .map(|alternative| self.resolve(alternative))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn occurs(&self, id: RefId, ty: &Type) -> bool {
        match self.deref(ty) {
            Type::Ref(other) => *other == id,
            Type::Function(function) => {
                function.params.iter().any(|param| self.occurs(id, param))
                    || self.occurs(id, &function.ret)
            }
            Type::Union(alternatives) => alternatives.iter().any(|alt| self.occurs(id, alt)),
            Type::Nil | Type::Bool | Type::Number | Type::String => false,
        }
    }

    fn has_unbound(&self, ty: &Type) -> bool {
        match self.deref(ty) {
            Type::Ref(_) => true,
            Type::Function(function) => {
                function.params.iter().any(|param| self.has_unbound(param))
                    || self.has_unbound(&function.ret)
            }
            Type::Union(alternatives) => alternatives.iter().any(|alt| self.has_unbound(alt)),
            Type::Nil | Type::Bool | Type::Number | Type::String => false,
        }
    }

    /// Copies `ty` with one fresh ref per distinct unbound ref.
    pub fn copy(&mut self, ty: &Type) -> Type {
        self.instantiate(&Scheme::closed(ty.clone()))
    }

    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        Copier::new(scheme.floor).copy(self, &scheme.ty)
    }
}

/// One copy operation. The table makes every occurrence of a source ref map to the same fresh
/// ref, so sharing inside the copied type is preserved.
struct Copier {
    floor: u32,
    table: FxHashMap<RefId, RefId>,
}

impl Copier {
    fn new(floor: u32) -> Self {
        Self {
            floor,
            table: FxHashMap::default(),
        }
    }

    fn copy(&mut self, arena: &mut TypeArena, ty: &Type) -> Type {
        match ty {
            Type::Nil | Type::Bool | Type::Number | Type::String => ty.clone(),
            Type::Function(function) => {
                let mut params = Vec::with_capacity(function.params.len());
                for param in &function.params {
                    params.push(self.copy(arena, param));
                }
                let ret = self.copy(arena, &function.ret);
                Type::function(params, ret)
            }
            Type::Union(alternatives) => {
                let mut copied = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    copied.push(self.copy(arena, alternative));
                }
                Type::Union(copied)
            }
            Type::Ref(id) => match arena.value(*id).cloned() {
                Some(value) => self.copy(arena, &value),
                None => Type::Ref(self.copy_ref(arena, *id)),
            },
        }
    }

    fn copy_ref(&mut self, arena: &mut TypeArena, id: RefId) -> RefId {
        if id.0 <= self.floor {
            return id;
        }
        if let Some(copied) = self.table.get(&id) {
            return *copied;
        }
        let fresh = arena.fresh();
        self.table.insert(id, fresh);

        // Pending alternatives travel with the ref, rewritten onto the copied refs.
        let pending = arena.pending(id).to_vec();
        if !pending.is_empty() {
            let mut copied = Vec::with_capacity(pending.len());
            for constraint in &pending {
                let mut bindings = Vec::with_capacity(constraint.len());
                for (key, value) in &constraint.bindings {
                    let key = if arena.is_bound(*key) {
                        *key
                    } else {
                        self.copy_ref(arena, *key)
                    };
                    bindings.push((key, self.copy(arena, value)));
                }
                copied.push(Constraint { bindings });
            }
            arena.set_pending(fresh, copied);
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_preserves_sharing_within_one_call() {
        let mut arena = TypeArena::new();
        let x = arena.fresh_type();
        let y = arena.fresh_type();
        let scheme = Type::function(vec![x.clone(), x, y.clone()], y);
        let copied = arena.copy(&scheme);
        assert_eq!(arena.render(&copied), "(_3, _3, _4) -> _4");
    }

    #[test]
    fn copy_dereferences_bound_refs() {
        let mut arena = TypeArena::new();
        let x = arena.fresh();
        arena.bind(x, Type::Number);
        let copied = arena.copy(&Type::function(vec![Type::Ref(x)], Type::Ref(x)));
        assert_eq!(copied, Type::function(vec![Type::Number], Type::Number));
        assert_eq!(arena.ref_count(), 1);
    }

    #[test]
    fn instantiate_keeps_refs_below_the_floor() {
        let mut arena = TypeArena::new();
        let outer = arena.fresh_type();
        let floor = arena.ref_count();
        let inner = arena.fresh_type();
        let scheme = Scheme {
            ty: Type::function(vec![outer], inner),
            floor,
        };
        let first = arena.instantiate(&scheme);
        let second = arena.instantiate(&scheme);
        assert_eq!(arena.render(&first), "(_1) -> _3");
        assert_eq!(arena.render(&second), "(_1) -> _4");
    }

    #[test]
    fn pending_alternatives_follow_the_copy() {
        let mut arena = TypeArena::new();
        let a = arena.fresh();
        let b = arena.fresh();
        let pending = vec![
            Constraint {
                bindings: vec![(a, Type::Number), (b, Type::Number)],
            },
            Constraint {
                bindings: vec![(a, Type::String), (b, Type::String)],
            },
        ];
        arena.set_pending(a, pending.clone());
        arena.set_pending(b, pending);

        let copied = arena.copy(&Type::function(vec![Type::Ref(a)], Type::Ref(b)));
        let Type::Function(function) = &copied else {
            panic!("expected a function, got {copied:?}");
        };
        let (Some(a2), Some(b2)) = (function.params[0].as_ref_id(), function.ret.as_ref_id()) else {
            panic!("expected refs, got {copied:?}");
        };
        let copied_pending = arena.pending(a2);
        assert_eq!(copied_pending.len(), 2);
        assert_eq!(copied_pending[0].get(b2), Some(&Type::Number));
        assert_eq!(copied_pending[1].get(a2), Some(&Type::String));
        assert_eq!(arena.pending(b2), copied_pending);
    }

    #[test]
    fn ground_reports_unbound_refs() {
        let mut arena = TypeArena::new();
        let x = arena.fresh();
        let ty = Type::function(vec![Type::Ref(x)], Type::Nil);
        assert_eq!(arena.ground(&ty), (ty.clone(), false));
        arena.bind(x, Type::String);
        assert_eq!(
            arena.ground(&ty),
            (Type::function(vec![Type::String], Type::Nil), true)
        );
    }

    #[test]
    fn occurs_looks_through_bindings() {
        let mut arena = TypeArena::new();
        let x = arena.fresh();
        let y = arena.fresh();
        arena.bind(y, Type::function(vec![], Type::Ref(x)));
        assert!(arena.occurs(x, &Type::Ref(y)));
        assert!(!arena.occurs(y, &Type::Ref(x)));
    }
}
