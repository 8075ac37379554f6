//! Backtracking unification over the ref arena.
//!
//! The solver is an explicit stack machine. `stack` holds the goals still to solve. Each
//! disjunction (a union, or a ref carrying pending alternatives) opens a [`ChoicePoint`] that
//! snapshots the stack and the allocator counter and records on its trail every older ref bound
//! while one of its alternatives runs. Backtracking unbinds the trail, truncates the arena and
//! resumes from the snapshot with the next alternative. Every solution is enumerated.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::arena::TypeArena;
use crate::error::{Mismatch, MismatchKind};
use crate::types::{Constraint, RefId, Type};

#[derive(Debug, Clone, PartialEq)]
pub enum Unification {
    /// Exactly one solution; its bindings are now live in the arena.
    Solved(Constraint),
    /// Several solutions. Bindings shared by all of them are live; the rest are attached to
    /// their refs as pending alternatives.
    Ambiguous(Vec<Constraint>),
}

impl Unification {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Unification::Ambiguous(_))
    }
}

/// Makes `left` and `right` equal by binding refs in `arena`.
///
/// On failure every binding made during the attempt is undone and the conflicting pair of the
/// last failed branch is returned.
pub fn unify(arena: &mut TypeArena, left: &Type, right: &Type) -> Result<Unification, Mismatch> {
    Unifier::new(arena).run(left.clone(), right.clone())
}

#[derive(Debug, Clone)]
enum Goal {
    Equate(Type, Type),
    /// Bind the ref directly if it is unbound, skipping its pending alternatives.
    Resolve(RefId, Type),
}

#[derive(Debug)]
struct ChoicePoint {
    alternatives: VecDeque<Vec<Goal>>,
    ref_count: u32,
    trail: Vec<RefId>,
    stack: Vec<Goal>,
}

#[derive(Debug)]
struct Solution {
    constraint: Constraint,
    rendered: Vec<String>,
}

impl Solution {
    fn key(&self) -> String {
        let mut entries = self.rendered.clone();
        entries.sort();
        entries.join(";")
    }
}

struct Unifier<'a> {
    arena: &'a mut TypeArena,
    stack: Vec<Goal>,
    choices: Vec<ChoicePoint>,
    /// Bindings made before the first choice point opened.
    trail: Vec<RefId>,
    ref_count: u32,
    solutions: Vec<Solution>,
    failure: Option<Mismatch>,
}

impl<'a> Unifier<'a> {
    fn new(arena: &'a mut TypeArena) -> Self {
        let ref_count = arena.ref_count();
        Self {
            arena,
            stack: Vec::new(),
            choices: Vec::new(),
            trail: Vec::new(),
            ref_count,
            solutions: Vec::new(),
            failure: None,
        }
    }

    fn run(mut self, left: Type, right: Type) -> Result<Unification, Mismatch> {
        trace!(
            left = %self.arena.display(&left),
            right = %self.arena.display(&right),
            "unify"
        );
        let initial = (left.clone(), right.clone());
        self.stack.push(Goal::Equate(left, right));
        loop {
            match self.stack.pop() {
                Some(goal) => {
                    if let Err(mismatch) = self.step(goal) {
                        trace!(%mismatch, depth = self.choices.len(), "branch failed");
                        self.failure = Some(mismatch);
                        if !self.retry() {
                            break;
                        }
                    }
                }
                None => {
                    self.record_solution();
                    if !self.retry() {
                        break;
                    }
                }
            }
        }
        self.finish(initial)
    }

    fn step(&mut self, goal: Goal) -> Result<(), Mismatch> {
        match goal {
            Goal::Equate(left, right) => self.equate(left, right),
            Goal::Resolve(id, ty) if self.arena.is_bound(id) => self.equate(Type::Ref(id), ty),
            Goal::Resolve(id, ty) => self.bind(id, ty),
        }
    }

    fn equate(&mut self, left: Type, right: Type) -> Result<(), Mismatch> {
        let left = self.arena.deref(&left).clone();
        let right = self.arena.deref(&right).clone();
        match (&left, &right) {
            (Type::Ref(a), Type::Ref(b)) if a == b => Ok(()),
            (Type::Ref(a), Type::Ref(b)) => {
                // The older ref survives as the representative.
                let (older, newer) = if a < b { (*a, *b) } else { (*b, *a) };
                self.unify_ref(newer, Type::Ref(older))
            }
            (Type::Ref(a), _) => self.unify_ref(*a, right.clone()),
            (_, Type::Ref(b)) => self.unify_ref(*b, left.clone()),
            (Type::Nil, _) | (_, Type::Nil) => Ok(()),
            (Type::Union(alternatives), _) => {
                let branches = alternatives
                    .iter()
                    .map(|alternative| vec![Goal::Equate(alternative.clone(), right.clone())])
                    .collect();
                self.choose(branches, &left, &right)
            }
            (_, Type::Union(alternatives)) => {
                let branches = alternatives
                    .iter()
                    .map(|alternative| vec![Goal::Equate(left.clone(), alternative.clone())])
                    .collect();
                self.choose(branches, &left, &right)
            }
            (Type::Function(f), Type::Function(g)) => {
                if f.params.len() != g.params.len() {
                    return Err(self.mismatch(MismatchKind::Arity, &left, &right));
                }
                self.stack
                    .push(Goal::Equate((*f.ret).clone(), (*g.ret).clone()));
                for (p, q) in f.params.iter().zip(&g.params).rev() {
                    self.stack.push(Goal::Equate(p.clone(), q.clone()));
                }
                Ok(())
            }
            (Type::Bool, Type::Bool) | (Type::Number, Type::Number) | (Type::String, Type::String) => {
                Ok(())
            }
            _ => Err(self.mismatch(MismatchKind::Mismatch, &left, &right)),
        }
    }

    /// Binds an unbound ref, first trying each of its pending alternatives if it has any.
    fn unify_ref(&mut self, id: RefId, ty: Type) -> Result<(), Mismatch> {
        let pending = self.arena.pending(id);
        if pending.is_empty() {
            return self.bind(id, ty);
        }
        let branches = pending
            .iter()
            .map(|constraint| {
                let mut goals = Vec::with_capacity(constraint.len() + 1);
                goals.push(Goal::Resolve(id, ty.clone()));
                goals.extend(
                    constraint
                        .bindings
                        .iter()
                        .map(|(key, value)| Goal::Resolve(*key, value.clone())),
                );
                goals
            })
            .collect();
        self.choose(branches, &Type::Ref(id), &ty)
    }

    fn bind(&mut self, id: RefId, ty: Type) -> Result<(), Mismatch> {
        if self.arena.deref(&ty) == &Type::Ref(id) {
            return Ok(());
        }
        if self.arena.occurs(id, &ty) {
            return Err(self.mismatch(MismatchKind::Infinite, &Type::Ref(id), &ty));
        }
        self.arena.bind(id, ty);
        match self.choices.last_mut() {
            Some(choice) if id.0 <= choice.ref_count => choice.trail.push(id),
            // Created inside the current attempt; truncation forgets it.
            Some(_) => {}
            None => self.trail.push(id),
        }
        Ok(())
    }

    /// Opens a choice point over `branches` and starts on the first one.
    fn choose(
        &mut self,
        branches: VecDeque<Vec<Goal>>,
        left: &Type,
        right: &Type,
    ) -> Result<(), Mismatch> {
        if branches.is_empty() {
            return Err(self.mismatch(MismatchKind::Mismatch, left, right));
        }
        trace!(
            alternatives = branches.len(),
            depth = self.choices.len() + 1,
            "open choice point"
        );
        self.choices.push(ChoicePoint {
            alternatives: branches,
            ref_count: self.arena.ref_count(),
            trail: Vec::new(),
            stack: self.stack.clone(),
        });
        self.retry();
        Ok(())
    }

    /// Undoes the innermost choice point's attempt and resumes with its next alternative,
    /// dropping exhausted choice points. Returns `false` once none remain.
    fn retry(&mut self) -> bool {
        while let Some(choice) = self.choices.last_mut() {
            for id in choice.trail.drain(..).rev() {
                self.arena.unbind(id);
            }
            self.arena.truncate(choice.ref_count);
            if let Some(goals) = choice.alternatives.pop_front() {
                let mut stack = choice.stack.clone();
                stack.extend(goals.into_iter().rev());
                self.stack = stack;
                return true;
            }
            self.choices.pop();
        }
        false
    }

    fn record_solution(&mut self) {
        let ids = self
            .trail
            .iter()
            .chain(self.choices.iter().flat_map(|choice| choice.trail.iter()))
            .copied();
        let mut bindings = Vec::new();
        let mut rendered = Vec::new();
        for id in ids {
            if let Some(value) = self.arena.value(id) {
                rendered.push(format!("{id} = {}", self.arena.render(value)));
                bindings.push((id, value.clone()));
            }
        }
        trace!(bindings = bindings.len(), "solution");
        self.solutions.push(Solution {
            constraint: Constraint { bindings },
            rendered,
        });
    }

    fn finish(mut self, initial: (Type, Type)) -> Result<Unification, Mismatch> {
        for id in self.trail.drain(..).rev() {
            self.arena.unbind(id);
        }
        self.arena.truncate(self.ref_count);

        let mut seen = FxHashSet::default();
        let mut solutions: Vec<Solution> = std::mem::take(&mut self.solutions)
            .into_iter()
            .filter(|solution| seen.insert(solution.key()))
            .collect();
        debug!(solutions = solutions.len(), "unification finished");

        match solutions.len() {
            0 => Err(self.failure.take().unwrap_or_else(|| {
                self.mismatch(MismatchKind::Mismatch, &initial.0, &initial.1)
            })),
            1 => {
                let solution = solutions.remove(0);
                for (id, value) in &solution.constraint.bindings {
                    self.arena.bind(*id, value.clone());
                }
                Ok(Unification::Solved(solution.constraint))
            }
            _ => Ok(self.commit_shared(solutions)),
        }
    }

    /// Applies the bindings every solution agrees on and parks the rest as pending alternatives.
    fn commit_shared(&mut self, solutions: Vec<Solution>) -> Unification {
        let shared: Vec<String> = solutions[0]
            .rendered
            .iter()
            .filter(|entry| solutions[1..].iter().all(|other| other.rendered.contains(entry)))
            .cloned()
            .collect();

        let mut remaining = Vec::with_capacity(solutions.len());
        let mut parked = Vec::new();
        for (index, solution) in solutions.iter().enumerate() {
            let mut rest = Constraint::default();
            for ((id, value), entry) in solution.constraint.bindings.iter().zip(&solution.rendered) {
                if shared.contains(entry) {
                    if index == 0 {
                        self.arena.bind(*id, value.clone());
                    }
                } else {
                    rest.bindings.push((*id, value.clone()));
                    if !parked.contains(id) {
                        parked.push(*id);
                    }
                }
            }
            remaining.push(rest);
        }
        for id in parked {
            self.arena.set_pending(id, remaining.clone());
        }
        Unification::Ambiguous(
            solutions
                .into_iter()
                .map(|solution| solution.constraint)
                .collect(),
        )
    }

    fn mismatch(&self, kind: MismatchKind, left: &Type, right: &Type) -> Mismatch {
        Mismatch {
            kind,
            left: left.clone(),
            right: right.clone(),
            left_text: self.arena.render(left),
            right_text: self.arena.render(right),
        }
    }
}
