use lox_typing::{Type, TypeArena, Unification, unify};
use proptest::prelude::*;

fn ground_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Nil),
        Just(Type::Bool),
        Just(Type::Number),
        Just(Type::String),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        (prop::collection::vec(inner.clone(), 0..3), inner)
            .prop_map(|(params, ret)| Type::function(params, ret))
    })
}

proptest! {
    #[test]
    fn grounding_a_ground_type_is_the_identity(ty in ground_type()) {
        let arena = TypeArena::new();
        prop_assert_eq!(arena.ground(&ty), (ty.clone(), true));
    }

    #[test]
    fn copying_a_ground_type_allocates_nothing(ty in ground_type()) {
        let mut arena = TypeArena::new();
        let copied = arena.copy(&ty);
        prop_assert_eq!(copied, ty);
        prop_assert_eq!(arena.ref_count(), 0);
    }

    #[test]
    fn a_type_unifies_with_itself(ty in ground_type()) {
        let mut arena = TypeArena::new();
        let outcome = unify(&mut arena, &ty, &ty);
        prop_assert!(matches!(outcome, Ok(Unification::Solved(ref constraint)) if constraint.is_empty()));
    }

    #[test]
    fn a_ref_solved_against_a_type_grounds_to_it(ty in ground_type()) {
        let mut arena = TypeArena::new();
        let x = arena.fresh_type();
        unify(&mut arena, &x, &ty).expect("a fresh ref unifies with anything");
        prop_assert_eq!(arena.ground(&x), (ty, true));
    }

    #[test]
    fn ref_merging_is_order_independent(count in 2u32..6, pairs in prop::collection::vec((0u32..6, 0u32..6), 1..8)) {
        let mut forward = TypeArena::new();
        let mut backward = TypeArena::new();
        for _ in 0..count {
            forward.fresh();
            backward.fresh();
        }
        for (a, b) in pairs {
            let a = Type::Ref(lox_typing::RefId(a % count + 1));
            let b = Type::Ref(lox_typing::RefId(b % count + 1));
            unify(&mut forward, &a, &b).expect("refs always unify");
            unify(&mut backward, &b, &a).expect("refs always unify");
        }
        for id in 1..=count {
            let ty = Type::Ref(lox_typing::RefId(id));
            prop_assert_eq!(forward.deref(&ty), backward.deref(&ty));
        }
    }
}

#[test]
fn two_instantiations_are_independent_but_compatible() {
    let mut arena = TypeArena::new();
    let x = arena.fresh_type();
    let scheme = Type::function(vec![x.clone()], x);
    let first = arena.copy(&scheme);
    let second = arena.copy(&scheme);
    assert_ne!(first, second);

    let numeric = Type::function(vec![Type::Number], Type::Number);
    unify(&mut arena, &first, &numeric).expect("first copy takes numbers");
    assert_eq!(arena.render(&arena.resolve(&second)), "(_3) -> _3");
    unify(&mut arena, &first, &second).expect("copies of one scheme unify");
}
