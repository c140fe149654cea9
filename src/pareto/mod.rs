/*
    satplan, satellite tasking as a Markov decision process
    Copyright (C) 2023 The satplan developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::adversary::TeamingPlan;
use crate::io::export::plan_to_string;
use itertools::Itertools;
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Success probability against number of agents used.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub probability: f64,
    pub agents: u32,
}

impl ParetoPoint {
    pub const fn new(probability: f64, agents: u32) -> Self {
        Self {
            probability,
            agents,
        }
    }

    /// True if `self` is at least as likely with at most as many agents, and strictly better in one of them.
    pub fn dominates(&self, other: &Self) -> bool {
        self.probability >= other.probability
            && self.agents <= other.agents
            && (self.probability > other.probability || self.agents < other.agents)
    }
}

impl fmt::Display for ParetoPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.6}, {})", self.probability, self.agents)
    }
}

/// A point of a front together with the plan realizing it.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontOption {
    pub point: ParetoPoint,
    pub plan: TeamingPlan,
    /// Set when the point was filled in rather than reported by the checker.
    pub synthetic: bool,
}

/// Pareto front of a single timestep.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalFront {
    pub timestep: i64,
    pub options: Vec<FrontOption>,
}

impl LocalFront {
    pub fn new(timestep: i64, options: Vec<FrontOption>) -> Self {
        Self { timestep, options }
    }

    /// One option per agent count from zero up to the largest count of the front.
    ///
    /// Using no agent is always possible with probability zero. A count missing from the front, or less likely than
    /// a smaller count, takes the probability and plan of the previous count.
    pub fn normalized(&self) -> Vec<FrontOption> {
        let mut best: BTreeMap<u32, &FrontOption> = BTreeMap::new();
        for option in &self.options {
            match best.get(&option.point.agents) {
                Some(b) if b.point.probability >= option.point.probability => {}
                _ => {
                    best.insert(option.point.agents, option);
                }
            }
        }

        let idle = FrontOption {
            point: ParetoPoint::new(0.0, 0),
            plan: TeamingPlan::from([(self.timestep, Default::default())]),
            synthetic: true,
        };
        let max_agents = best.keys().next_back().copied().unwrap_or(0);

        let mut normalized: Vec<FrontOption> = Vec::with_capacity(max_agents as usize + 1);
        for agents in 0..=max_agents {
            let previous = normalized.last().unwrap_or(&idle);
            let option = match best.get(&agents) {
                Some(option)
                    if agents == 0 || option.point.probability >= previous.point.probability =>
                {
                    (*option).clone()
                }
                _ if agents == 0 => idle.clone(),
                _ => FrontOption {
                    point: ParetoPoint::new(previous.point.probability, agents),
                    plan: previous.plan.clone(),
                    synthetic: true,
                },
            };
            normalized.push(option);
        }
        normalized
    }
}

/// How the per-timestep fronts are combined into a mission-wide front.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CombinationPolicy {
    /// Exact: keeps the most likely combination of each total agent count after every timestep.
    #[default]
    Incremental,
    /// Exact: enumerates the full cross product of the normalized fronts.
    Exhaustive,
    /// Approximate: draws random combinations, plus the all-idle and all-maximum ones.
    Sampled { draws: usize, seed: u64 },
}

/// One choice per timestep: the product of their probabilities and the sum of their agent counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Combination {
    pub point: ParetoPoint,
    pub plan: TeamingPlan,
}

impl Combination {
    fn start() -> Self {
        Self {
            point: ParetoPoint::new(1.0, 0),
            plan: TeamingPlan::new(),
        }
    }

    fn with(&self, option: &FrontOption) -> Self {
        let mut plan = self.plan.clone();
        plan.extend(option.plan.iter().map(|(t, agents)| (*t, agents.clone())));
        Self {
            point: ParetoPoint::new(
                self.point.probability * option.point.probability,
                self.point.agents + option.point.agents,
            ),
            plan,
        }
    }
}

/// Combines the per-timestep fronts according to `policy`.
pub fn combine(fronts: &[LocalFront], policy: &CombinationPolicy) -> Vec<Combination> {
    let normalized: Vec<Vec<FrontOption>> = fronts.iter().map(LocalFront::normalized).collect();
    if normalized.is_empty() {
        return vec![Combination::start()];
    }

    let from_choices = |choices: &[usize]| {
        choices
            .iter()
            .zip(&normalized)
            .fold(Combination::start(), |acc, (&i, options)| acc.with(&options[i]))
    };

    match policy {
        CombinationPolicy::Incremental => {
            let mut frontier: BTreeMap<u32, Combination> =
                BTreeMap::from([(0, Combination::start())]);
            for options in &normalized {
                let mut next: BTreeMap<u32, Combination> = BTreeMap::new();
                for partial in frontier.values() {
                    for option in options {
                        let candidate = partial.with(option);
                        match next.get(&candidate.point.agents) {
                            Some(kept) if kept.point.probability >= candidate.point.probability => {}
                            _ => {
                                next.insert(candidate.point.agents, candidate);
                            }
                        }
                    }
                }
                frontier = next;
            }
            frontier.into_values().collect()
        }
        CombinationPolicy::Exhaustive => normalized
            .iter()
            .map(|options| 0..options.len())
            .multi_cartesian_product()
            .map(|choices| from_choices(&choices))
            .collect(),
        CombinationPolicy::Sampled { draws, seed } => {
            let mut rng = Pcg64Mcg::new((*seed).into());
            let mut combos = Vec::with_capacity(draws + 2);
            let idle = vec![0; normalized.len()];
            let top: Vec<usize> = normalized.iter().map(|o| o.len() - 1).collect();
            combos.push(from_choices(&idle));
            combos.push(from_choices(&top));
            for _ in 0..*draws {
                let choices: Vec<usize> = normalized
                    .iter()
                    .map(|options| rng.gen_range(0..options.len()))
                    .collect();
                combos.push(from_choices(&choices));
            }
            combos
        }
    }
}

/// A point of the mission-wide frontier.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierPoint {
    pub point: ParetoPoint,
    pub plan: TeamingPlan,
    /// Set when the probability was raised to that of a point using fewer agents, whose plan is then used.
    pub raised: bool,
}

/// Most likely plan for every total agent count, with probability non-decreasing in the count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParetoFrontier {
    pub points: Vec<FrontierPoint>,
}

impl ParetoFrontier {
    pub fn from_combinations<I>(combinations: I) -> Self
    where
        I: IntoIterator<Item = Combination>,
    {
        let mut best: BTreeMap<u32, Combination> = BTreeMap::new();
        for combo in combinations {
            match best.get(&combo.point.agents) {
                Some(kept) if kept.point.probability >= combo.point.probability => {}
                _ => {
                    best.insert(combo.point.agents, combo);
                }
            }
        }

        let mut points: Vec<FrontierPoint> = Vec::with_capacity(best.len());
        for (agents, combo) in best {
            let point = match points.last() {
                Some(prev) if prev.point.probability > combo.point.probability => FrontierPoint {
                    point: ParetoPoint::new(prev.point.probability, agents),
                    plan: prev.plan.clone(),
                    raised: true,
                },
                _ => FrontierPoint {
                    point: combo.point,
                    plan: combo.plan,
                    raised: false,
                },
            };
            points.push(point);
        }

        Self { points }
    }

    /// Points not dominated by any other, i.e. where adding agents strictly increases the probability.
    pub fn optimal(&self) -> Vec<&FrontierPoint> {
        let mut optimal: Vec<&FrontierPoint> = Vec::new();
        for fp in &self.points {
            if optimal
                .last()
                .map_or(true, |last| fp.point.probability > last.point.probability)
            {
                optimal.push(fp);
            }
        }
        optimal
    }

    /// Most likely plan using at most `max_agents` agents.
    pub fn best_within(&self, max_agents: u32) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .take_while(|fp| fp.point.agents <= max_agents)
            .last()
    }
}

impl fmt::Display for ParetoFrontier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for fp in self.optimal() {
            writeln!(f, "{} {}", fp.point, plan_to_string(&fp.plan))?;
        }
        Ok(())
    }
}
