use crate::arena::TypeArena;
use crate::types::Type;

/// Signatures of the operators (keyed by their symbol) and native functions.
///
/// Refs created here are renamed on every lookup, so each use site gets its own copy.
pub(crate) fn signatures(arena: &mut TypeArena) -> Vec<(&'static str, Type)> {
    use Type::{Bool, Nil, Number, String};

    let binary = |operand: Type, result: Type| {
        Type::function(vec![operand.clone(), operand], result)
    };
    let mut table = vec![
        (
            "+",
            arena.union(vec![binary(Number, Number), binary(String, String)]),
        ),
        (
            "-",
            arena.union(vec![
                binary(Number, Number),
                Type::function(vec![Number], Number),
            ]),
        ),
        ("*", binary(Number, Number)),
        ("/", binary(Number, Number)),
        ("<", binary(Number, Bool)),
        ("<=", binary(Number, Bool)),
        (">", binary(Number, Bool)),
        (">=", binary(Number, Bool)),
        ("clock", Type::function(vec![], Number)),
        ("random", Type::function(vec![], Number)),
        ("randomSeed", Type::function(vec![Number], Nil)),
    ];

    for symbol in ["==", "!="] {
        let (left, right) = (arena.fresh_type(), arena.fresh_type());
        table.push((symbol, Type::function(vec![left, right], Bool)));
    }

    let operand = arena.fresh_type();
    table.push(("!", Type::function(vec![operand], Bool)));

    // The result is whichever operand decided the outcome.
    for symbol in ["and", "or"] {
        let (left, right) = (arena.fresh_type(), arena.fresh_type());
        let operands = vec![left.clone(), right.clone()];
        let signature = arena.union(vec![
            Type::function(operands.clone(), left),
            Type::function(operands, right),
        ]);
        table.push((symbol, signature));
    }

    let (value, result) = (arena.fresh_type(), arena.fresh_type());
    table.push(("type", Type::function(vec![value], result)));

    table
}
