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

use super::PlannerConfig;
use crate::adversary::{summarize_strategies, StateDecoder, StrategySummary};
use crate::checker::{CheckerResult, ModelChecker, MODEL_FILE, PROPERTY_FILE};
use crate::errors::{
    NoStrategySnafu, PlanAdversarySnafu, PlanCheckerSnafu, PlanModelSnafu, PlanningError,
    ScratchSnafu, UnrealizedPointSnafu,
};
use crate::mdp::{EncodedModel, Naming, ProbabilityModel, StateSpace};
use crate::pareto::{FrontOption, LocalFront, ParetoPoint};
use crate::team::TeamIndex;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// Label of the single model spanning the whole horizon.
pub const WHOLE_HORIZON: i64 = -1;

/// Largest difference between a reported reward and the reward of the strategy realizing it.
pub const REWARD_TOLERANCE: f64 = 1e-6;

/// Encoded model of one planning window, ready to be checked.
#[derive(Clone, Debug)]
pub struct PreparedModel {
    /// Timestep of the window, or [WHOLE_HORIZON].
    pub label: i64,
    pub start: i64,
    pub final_time: i64,
    /// Team restricted to the window.
    pub index: TeamIndex,
    pub text: String,
}

/// Encodes, checks and decodes planning windows.
///
/// Each check owns a fresh scratch directory, so solvers sharing a checker may run concurrently.
pub struct TimestepSolver<'a, C: ModelChecker> {
    cfg: &'a PlannerConfig,
    checker: &'a C,
}

impl<'a, C: ModelChecker> TimestepSolver<'a, C> {
    pub fn new(cfg: &'a PlannerConfig, checker: &'a C) -> Self {
        Self { cfg, checker }
    }

    /// Encodes `index` for time running from `start` to `final_time`, with global identifiers.
    ///
    /// Fails with `UnsatisfiableMission` when no assignment can detect every measurement.
    pub fn prepare(
        &self,
        index: TeamIndex,
        start: i64,
        final_time: i64,
        label: i64,
    ) -> Result<PreparedModel, PlanningError> {
        let space = StateSpace::enumerate(&index, self.cfg.prune_by_visibility, self.cfg.max_states)
            .context(PlanModelSnafu { timestep: label })?;
        let model = ProbabilityModel::build(&index, &space, label)
            .context(PlanModelSnafu { timestep: label })?;
        let text = EncodedModel::new(&index, &model, start, final_time).render(Naming::Global);
        Ok(PreparedModel {
            label,
            start,
            final_time,
            index,
            text,
        })
    }

    /// Model of the single timestep `t`, built from the sensors visible at `t`.
    pub fn prepare_timestep(&self, index: &TeamIndex, t: i64) -> Result<PreparedModel, PlanningError> {
        let sub = index.at_timestep(t);
        debug!("t = {t}: {sub}");
        self.prepare(sub, t, t + 1, t)
    }

    /// Model spanning `[0, horizon)` with the full visibility schedules.
    pub fn prepare_horizon(&self, index: &TeamIndex, horizon: u32) -> Result<PreparedModel, PlanningError> {
        self.prepare(index.clone(), 0, i64::from(horizon), WHOLE_HORIZON)
    }

    /// Writes the model and property files into `dir`, returning their paths.
    pub fn write_model(
        &self,
        prepared: &PreparedModel,
        dir: &Path,
    ) -> Result<(PathBuf, PathBuf), PlanningError> {
        let model = dir.join(MODEL_FILE);
        let property = dir.join(PROPERTY_FILE);
        std::fs::write(&model, &prepared.text).context(ScratchSnafu { path: &model })?;
        std::fs::write(&property, format!("{}\n", self.cfg.objectives))
            .context(ScratchSnafu { path: &property })?;
        Ok((model, property))
    }

    /// Checks a prepared model and decodes its local front.
    pub fn solve(&self, prepared: &PreparedModel) -> Result<LocalFront, PlanningError> {
        let label = prepared.label;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("t{label}-"))
            .tempdir_in(&self.cfg.scratch_dir)
            .context(ScratchSnafu {
                path: &self.cfg.scratch_dir,
            })?;

        let (model, property) = self.write_model(prepared, scratch.path())?;
        let artifacts = self
            .checker
            .check(&model, &property, scratch.path())
            .context(PlanCheckerSnafu { timestep: label })?;
        let result = artifacts
            .result()
            .context(PlanCheckerSnafu { timestep: label })?;

        let decoder = StateDecoder::new(&prepared.index, Naming::Global);
        let summaries = summarize_strategies(&artifacts.strategies, &artifacts.states, &decoder)
            .context(PlanAdversarySnafu { timestep: label })?;

        let front = build_front(prepared.start, &result, &summaries)?;
        ensure!(
            !front.options.is_empty(),
            NoStrategySnafu {
                timestep: label,
                log: &artifacts.log,
            }
        );

        if self.cfg.keep_scratch {
            let kept = scratch.keep();
            info!("t = {label}: artifacts kept in {}", kept.display());
        }

        Ok(front)
    }
}

/// Number of agents a strategy tasks, summed over the timesteps of its plan.
fn tasked_agents(strategy: &StrategySummary) -> u32 {
    strategy.plan.values().map(|agents| agents.len() as u32).sum()
}

/// Pairs every point reported by the checker with the strategy realizing it.
///
/// A strategy realizes a point when its reward matches the point's within [REWARD_TOLERANCE]. Among those, the one
/// whose path probability is closest to the point is used. The point then counts the agents tasked by that
/// strategy's plan. A point that no strategy realizes is an error.
pub fn build_front(
    timestep: i64,
    result: &CheckerResult,
    summaries: &[StrategySummary],
) -> Result<LocalFront, PlanningError> {
    let options = match result {
        CheckerResult::Pareto(points) => {
            let mut options = Vec::with_capacity(points.len());
            for &(probability, reward) in points {
                let tolerance = REWARD_TOLERANCE * reward.abs().max(1.0);
                let strategy = summaries
                    .iter()
                    .filter(|s| (s.reward - reward).abs() <= tolerance)
                    .min_by(|a, b| {
                        (a.probability - probability)
                            .abs()
                            .total_cmp(&(b.probability - probability).abs())
                    })
                    .context(UnrealizedPointSnafu {
                        timestep,
                        probability,
                        reward,
                    })?;
                options.push(FrontOption {
                    point: ParetoPoint::new(probability, tasked_agents(strategy)),
                    plan: strategy.plan.clone(),
                    synthetic: false,
                });
            }
            options
        }
        CheckerResult::Scalar(probability) => summaries
            .first()
            .map(|strategy| FrontOption {
                point: ParetoPoint::new(*probability, tasked_agents(strategy)),
                plan: strategy.plan.clone(),
                synthetic: false,
            })
            .into_iter()
            .collect(),
    };

    Ok(LocalFront::new(timestep, options))
}

#[cfg(test)]
mod ut_solver {
    use super::build_front;
    use crate::adversary::{StrategySummary, TeamingPlan};
    use crate::checker::CheckerResult;
    use crate::PlanningError;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn summary(probability: f64, reward: f64, plan: &[(i64, &[&str])]) -> StrategySummary {
        StrategySummary {
            source: PathBuf::from("adv.tra"),
            probability,
            reward,
            actions: Vec::new(),
            plan: plan
                .iter()
                .map(|(t, agents)| (*t, agents.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>()))
                .collect::<TeamingPlan>(),
        }
    }

    #[test]
    fn pareto_points_matched_by_reward() {
        let summaries = [
            summary(1.0, 0.0, &[(3, &[])]),
            summary(0.5, 1.0, &[(3, &["Aqua"])]),
            summary(0.72, 1.0, &[(3, &["Terra"])]),
            summary(0.9, 2.0, &[(3, &["Aqua", "Terra"])]),
        ];
        let result = CheckerResult::Pareto(vec![(0.0, 0.0), (0.7, 0.9999999), (0.85, 2.0)]);
        let front = build_front(3, &result, &summaries).unwrap();

        assert_eq!(front.timestep, 3);
        let agents: Vec<u32> = front.options.iter().map(|o| o.point.agents).collect();
        assert_eq!(agents, [0, 1, 2]);
        assert!(front.options[1].plan[&3].contains("Terra"));
        assert_eq!(front.options[1].point.probability, 0.7);
        assert!(front.options.iter().all(|o| !o.synthetic));
    }

    #[test]
    fn fractional_rewards_are_not_rounded() {
        // Over several timesteps the expected reward is weighted by the path probability
        let summaries = [
            summary(1.0, 0.0, &[]),
            summary(0.9, 1.0, &[(0, &["Aqua"])]),
            summary(0.63, 1.9, &[(0, &["Aqua"]), (1, &["Terra"])]),
        ];
        let result = CheckerResult::Pareto(vec![(0.0, 0.0), (0.9, 1.0), (0.63, 1.9)]);
        let front = build_front(0, &result, &summaries).unwrap();
        let agents: Vec<u32> = front.options.iter().map(|o| o.point.agents).collect();
        assert_eq!(agents, [0, 1, 2]);
        assert!(front.options[2].plan[&1].contains("Terra"));

        // 1.6 would round to the two-agent strategy
        let result = CheckerResult::Pareto(vec![(0.0, 0.0), (0.5, 1.6)]);
        let err = build_front(0, &result, &summaries).unwrap_err();
        assert!(
            matches!(err, PlanningError::UnrealizedPoint { timestep: 0, reward, .. } if reward == 1.6),
            "{err}"
        );
    }

    #[test]
    fn unrealized_point_is_an_error() {
        let summaries = [summary(1.0, 0.0, &[(3, &[])]), summary(0.9, 1.0, &[(3, &["Aqua"])])];
        let result = CheckerResult::Pareto(vec![(0.0, 0.0), (0.9, 1.0), (0.99, 3.0)]);
        let err = build_front(3, &result, &summaries).unwrap_err();
        assert!(
            matches!(err, PlanningError::UnrealizedPoint { timestep: 3, .. }),
            "{err}"
        );
    }

    #[test]
    fn scalar_uses_first_strategy() {
        let summaries = [summary(0.8, 1.0, &[(3, &["Aqua"])]), summary(0.2, 0.0, &[])];
        let front = build_front(3, &CheckerResult::Scalar(0.8), &summaries).unwrap();
        assert_eq!(front.options.len(), 1);
        assert_eq!(front.options[0].point.agents, 1);

        let front = build_front(3, &CheckerResult::Scalar(0.8), &[]).unwrap();
        assert!(front.options.is_empty());
    }
}
