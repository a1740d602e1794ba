//! Optimization backends for a [`MatchModel`].
//!
//! A backend turns a model into a [`Solution`]: a value for every variable, the
//! objective reached and a status. Backends never fail; running out of time or
//! nodes is reported through [`SolveStatus`].

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::matching::model::{ConstraintKind, MatchModel, VarId};

/// How often (in nodes) the wall clock is consulted
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Search completed; the assignment is optimal
    Optimal,
    /// Search stopped early; the assignment is the best one found
    Feasible,
    /// Search completed without finding any feasible assignment
    NoSolution,
    /// Search stopped early before finding any feasible assignment
    TimedOut,
}

impl SolveStatus {
    /// Whether the solution carries a usable assignment
    #[must_use]
    pub fn has_assignment(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }

    /// One-line human summary
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Optimal => "Optimal solution found",
            Self::Feasible => "Feasible solution found (not necessarily optimal)",
            Self::NoSolution => "No solution found",
            Self::TimedOut => "Search stopped before any solution was found",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Optimal => "optimal",
            Self::Feasible => "feasible",
            Self::NoSolution => "no-solution",
            Self::TimedOut => "timed-out",
        };
        write!(f, "{s}")
    }
}

/// Search limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Wall-clock budget for one solve
    pub time_limit: Option<Duration>,
    /// Maximum number of search nodes
    pub node_limit: Option<u64>,
}

/// Result of a solve
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    pub objective: i64,
    /// One entry per model variable; all false without an assignment
    pub values: Vec<bool>,
    pub nodes_explored: u64,
    pub solve_time: Duration,
}

impl Solution {
    #[must_use]
    pub fn value(&self, var: VarId) -> bool {
        self.values.get(var).copied().unwrap_or(false)
    }
}

/// A 0/1 solver
pub trait Backend {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Solve `model` within the limits of `config`
    fn solve(&self, model: &MatchModel, config: &SolverConfig) -> Solution;
}

/// Exact depth-first branch and bound.
///
/// Variables fixed to zero never enter the search. Open variables are ordered
/// by descending objective weight and branched on one then zero. Each
/// constraint tracks the smallest left-hand side still reachable given the
/// decisions so far; a branch is cut as soon as that minimum exceeds the
/// right-hand side.
///
/// The optimistic bound groups the positive-weight variables twice: once by
/// the party being carried and once by the vehicle carrying it. A group can
/// gain no more than the slack left in the constraint that defines it, so the
/// remaining objective is at most the smaller of the two group totals. A
/// branch is cut when the objective so far plus that bound cannot beat the
/// incumbent.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

/// Constraints whose slack bounds how many more parties can still be carried
const CARRIED_GROUPS: [ConstraintKind; 4] = [
    ConstraintKind::RiderTakenOnce,
    ConstraintKind::PairingRiderExclusive,
    ConstraintKind::ShifterTakenOnce,
    ConstraintKind::PairingRiderOnce,
];

/// Constraints whose slack bounds how many more seats can still be filled
const VEHICLE_GROUPS: [ConstraintKind; 2] = [
    ConstraintKind::DriverCapacity,
    ConstraintKind::ShifterVehicleCapacity,
];

/// Variables sharing one defining constraint
struct Group {
    /// `None` for a variable no listed constraint covers
    constraint: Option<usize>,
    max_weight: i64,
    size: i64,
}

/// Partition of the open positive-weight variables into groups
struct Cover {
    groups: Vec<Group>,
    group_of: Vec<Option<usize>>,
    /// Groups whose contribution changes when a variable is decided
    touched: Vec<Vec<usize>>,
}

impl Cover {
    fn new(
        model: &MatchModel,
        kinds: &[ConstraintKind],
        occurrences: &[Vec<(usize, i64)>],
    ) -> Self {
        let variables = model.variables();
        let gains = |var: VarId| variables[var].is_open() && variables[var].objective > 0;

        let mut groups = Vec::new();
        let mut group_of = vec![None; variables.len()];
        let mut by_constraint = vec![None; model.constraints().len()];

        for kind in kinds {
            for (c, constraint) in model.constraints().iter().enumerate() {
                if constraint.kind != *kind {
                    continue;
                }
                // Every member adds at least one to the left-hand side
                let members: Vec<VarId> = constraint
                    .terms
                    .iter()
                    .filter(|&&(var, coef)| {
                        coef >= 1 && gains(var) && group_of[var].is_none()
                    })
                    .map(|&(var, _)| var)
                    .collect();
                if members.is_empty() {
                    continue;
                }
                let g = groups.len();
                let max_weight = members
                    .iter()
                    .map(|&v| variables[v].objective)
                    .max()
                    .unwrap_or(0);
                groups.push(Group {
                    constraint: Some(c),
                    max_weight,
                    size: i64::try_from(members.len()).unwrap_or(i64::MAX),
                });
                for var in members {
                    group_of[var] = Some(g);
                }
                by_constraint[c] = Some(g);
            }
        }

        for var in 0..variables.len() {
            if gains(var) && group_of[var].is_none() {
                group_of[var] = Some(groups.len());
                groups.push(Group {
                    constraint: None,
                    max_weight: variables[var].objective,
                    size: 1,
                });
            }
        }

        let touched = (0..variables.len())
            .map(|var| {
                let mut groups: Vec<usize> = group_of[var].into_iter().collect();
                for &(c, _) in &occurrences[var] {
                    if let Some(g) = by_constraint[c] {
                        if !groups.contains(&g) {
                            groups.push(g);
                        }
                    }
                }
                groups
            })
            .collect();

        Self {
            groups,
            group_of,
            touched,
        }
    }

    fn contribution(&self, g: usize, free: &[i64], min_lhs: &[i64], rhs: &[i64]) -> i64 {
        let group = &self.groups[g];
        let room = match group.constraint {
            Some(c) => (rhs[c] - min_lhs[c]).max(0).min(free[g]),
            None => free[g],
        };
        room * group.max_weight
    }

    fn touched_contribution(
        &self,
        var: VarId,
        free: &[i64],
        min_lhs: &[i64],
        rhs: &[i64],
    ) -> i64 {
        self.touched[var]
            .iter()
            .map(|&g| self.contribution(g, free, min_lhs, rhs))
            .sum()
    }
}

/// Search state below the current node
struct Frontier {
    /// Smallest reachable left-hand side of each constraint
    min_lhs: Vec<i64>,
    /// Undecided members per group, per cover
    free: Vec<Vec<i64>>,
    /// Sum of group contributions, per cover
    optimistic: Vec<i64>,
}

impl Frontier {
    /// Most the undecided variables can still add to the objective
    fn bound(&self) -> i64 {
        self.optimistic.iter().copied().min().unwrap_or(0)
    }
}

/// Per-variable view of the constraints it appears in
struct SearchSpace {
    order: Vec<VarId>,
    weights: Vec<i64>,
    occurrences: Vec<Vec<(usize, i64)>>,
    rhs: Vec<i64>,
    covers: Vec<Cover>,
}

impl SearchSpace {
    fn new(model: &MatchModel) -> Self {
        let variables = model.variables();
        let mut order: Vec<VarId> = (0..variables.len())
            .filter(|&id| variables[id].is_open())
            .collect();
        order.sort_by_key(|&id| std::cmp::Reverse(variables[id].objective));

        let mut occurrences = vec![Vec::new(); variables.len()];
        for (c, constraint) in model.constraints().iter().enumerate() {
            for &(var, coef) in &constraint.terms {
                if variables[var].is_open() {
                    occurrences[var].push((c, coef));
                }
            }
        }

        let covers = vec![
            Cover::new(model, &CARRIED_GROUPS, &occurrences),
            Cover::new(model, &VEHICLE_GROUPS, &occurrences),
        ];

        Self {
            order,
            weights: variables.iter().map(|v| v.objective).collect(),
            occurrences,
            rhs: model.constraints().iter().map(|c| c.rhs).collect(),
            covers,
        }
    }

    /// State with every open variable still free
    fn root(&self) -> Frontier {
        let mut min_lhs = vec![0; self.rhs.len()];
        for terms in &self.occurrences {
            for &(c, coef) in terms {
                min_lhs[c] += coef.min(0);
            }
        }
        let free: Vec<Vec<i64>> = self
            .covers
            .iter()
            .map(|cover| cover.groups.iter().map(|g| g.size).collect())
            .collect();
        let optimistic = self
            .covers
            .iter()
            .zip(&free)
            .map(|(cover, free)| {
                (0..cover.groups.len())
                    .map(|g| cover.contribution(g, free, &min_lhs, &self.rhs))
                    .sum()
            })
            .collect();
        Frontier {
            min_lhs,
            free,
            optimistic,
        }
    }

    /// Change in a constraint's minimum when a free variable takes `value`
    fn shift(coef: i64, value: bool) -> i64 {
        let chosen = if value { coef } else { 0 };
        chosen - coef.min(0)
    }

    fn fits(&self, min_lhs: &[i64], var: VarId, value: bool) -> bool {
        self.occurrences[var]
            .iter()
            .all(|&(c, coef)| min_lhs[c] + Self::shift(coef, value) <= self.rhs[c])
    }

    fn apply(&self, frontier: &mut Frontier, var: VarId, value: bool) {
        self.step(frontier, var, value, 1);
    }

    fn revert(&self, frontier: &mut Frontier, var: VarId, value: bool) {
        self.step(frontier, var, value, -1);
    }

    /// Decide (`sign = 1`) or undecide (`sign = -1`) `var`
    fn step(&self, frontier: &mut Frontier, var: VarId, value: bool, sign: i64) {
        for (k, cover) in self.covers.iter().enumerate() {
            frontier.optimistic[k] -=
                cover.touched_contribution(var, &frontier.free[k], &frontier.min_lhs, &self.rhs);
        }
        for &(c, coef) in &self.occurrences[var] {
            frontier.min_lhs[c] += sign * Self::shift(coef, value);
        }
        for (k, cover) in self.covers.iter().enumerate() {
            if let Some(g) = cover.group_of[var] {
                frontier.free[k][g] -= sign;
            }
            frontier.optimistic[k] +=
                cover.touched_contribution(var, &frontier.free[k], &frontier.min_lhs, &self.rhs);
        }
    }
}

impl Backend for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, model: &MatchModel, config: &SolverConfig) -> Solution {
        let start = Instant::now();
        let deadline = config.time_limit.map(|limit| start + limit);
        let space = SearchSpace::new(model);
        let n = space.order.len();

        let mut frontier = space.root();
        let mut values = vec![false; model.variables().len()];
        let mut best: Option<(i64, Vec<bool>)> = None;
        let mut nodes: u64 = 0;
        let mut stopped = false;

        if frontier.min_lhs.iter().zip(&space.rhs).any(|(m, r)| m > r) {
            debug!("Model is infeasible before branching");
            return Solution {
                status: SolveStatus::NoSolution,
                objective: 0,
                values,
                nodes_explored: 0,
                solve_time: start.elapsed(),
            };
        }

        // applied[d]: value currently held by order[d], if any
        // tried[d]: 0 = nothing yet, 1 = one tried, 2 = both tried
        let mut applied: Vec<Option<bool>> = vec![None; n];
        let mut tried = vec![0u8; n];
        let mut current: i64 = 0;
        let mut depth = 0;

        loop {
            if depth == n {
                if best.as_ref().map_or(true, |(b, _)| current > *b) {
                    best = Some((current, values.clone()));
                }
                if n == 0 {
                    break;
                }
                depth -= 1;
                continue;
            }

            let var = space.order[depth];
            if let Some(value) = applied[depth].take() {
                space.revert(&mut frontier, var, value);
                if value {
                    current -= space.weights[var];
                    values[var] = false;
                }
            }

            let value = match tried[depth] {
                0 => true,
                1 => false,
                _ => {
                    tried[depth] = 0;
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    continue;
                }
            };
            tried[depth] += 1;

            nodes += 1;
            if config.node_limit.is_some_and(|limit| nodes > limit)
                || ((nodes - 1) % DEADLINE_CHECK_INTERVAL == 0
                    && deadline.is_some_and(|d| Instant::now() >= d))
            {
                stopped = true;
                break;
            }

            if !space.fits(&frontier.min_lhs, var, value) {
                continue;
            }
            let gain = if value { space.weights[var] } else { 0 };
            space.apply(&mut frontier, var, value);
            let promising = best
                .as_ref()
                .map_or(true, |(b, _)| current + gain + frontier.bound() > *b);
            if !promising {
                space.revert(&mut frontier, var, value);
                continue;
            }
            applied[depth] = Some(value);
            if value {
                current += gain;
                values[var] = true;
            }
            depth += 1;
        }

        let solve_time = start.elapsed();
        let (status, objective, values) = match (best, stopped) {
            (Some((objective, values)), false) => (SolveStatus::Optimal, objective, values),
            (Some((objective, values)), true) => (SolveStatus::Feasible, objective, values),
            (None, false) => (SolveStatus::NoSolution, 0, vec![false; model.variables().len()]),
            (None, true) => (SolveStatus::TimedOut, 0, vec![false; model.variables().len()]),
        };

        if stopped {
            warn!(
                "Search stopped after {} nodes ({:.3}s): {}",
                nodes,
                solve_time.as_secs_f64(),
                status.describe()
            );
        } else {
            debug!(
                "Search finished: {} over {} open variables, {} nodes, objective {}",
                status, n, nodes, objective
            );
        }

        Solution {
            status,
            objective,
            values,
            nodes_explored: nodes,
            solve_time,
        }
    }
}
