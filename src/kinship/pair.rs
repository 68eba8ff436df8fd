//! Single-pair kinship evaluation without a full sweep

use crate::kinship::arena::KinshipArena;
use std::collections::HashMap;

type Pair = (u32, u32);

fn ordered(a: u32, b: u32) -> Pair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Memoised evaluation of the kinship recurrence for individual pairs.
///
/// The pair is always expanded through the vertex with the larger arena index, so
/// the recursion only ever descends towards founders. An explicit stack replaces
/// call recursion to cope with deep genealogies.
pub(crate) struct PairSolver<'a> {
    arena: &'a KinshipArena,
    memo: HashMap<Pair, f64>,
}

impl<'a> PairSolver<'a> {
    pub fn new(arena: &'a KinshipArena) -> Self {
        Self {
            arena,
            memo: HashMap::new(),
        }
    }

    pub fn kinship(&mut self, a: u32, b: u32) -> f64 {
        let root = ordered(a, b);
        let mut stack = vec![root];

        while let Some(&pair) = stack.last() {
            if self.memo.contains_key(&pair) {
                stack.pop();
                continue;
            }

            let dependencies = self.dependencies(pair);
            let pending = stack.len();
            for dependency in dependencies.iter().flatten() {
                if !self.memo.contains_key(dependency) {
                    stack.push(*dependency);
                }
            }

            if stack.len() == pending {
                let value = self.evaluate(pair, &dependencies);
                self.memo.insert(pair, value);
                stack.pop();
            }
        }

        self.lookup(root)
    }

    /// Number of distinct pairs evaluated so far
    pub fn evaluated_pairs(&self) -> usize {
        self.memo.len()
    }

    fn dependencies(&self, (a, b): Pair) -> [Option<Pair>; 2] {
        if a == b {
            match self.arena.record(a).parents {
                [Some(p), Some(q)] => [Some(ordered(p, q)), None],
                _ => [None, None],
            }
        } else {
            let parents = self.arena.record(b).parents;
            [
                parents[0].map(|p| ordered(a, p)),
                parents[1].map(|p| ordered(a, p)),
            ]
        }
    }

    fn evaluate(&self, (a, b): Pair, dependencies: &[Option<Pair>; 2]) -> f64 {
        if a == b {
            match dependencies[0] {
                Some(parents) => 0.5 * (1.0 + self.lookup(parents)),
                None => 0.5,
            }
        } else {
            0.5 * dependencies
                .iter()
                .flatten()
                .map(|&dependency| self.lookup(dependency))
                .sum::<f64>()
        }
    }

    fn lookup(&self, pair: Pair) -> f64 {
        self.memo.get(&pair).copied().unwrap_or(0.0)
    }
}
