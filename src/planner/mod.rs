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

use crate::checker::{ModelChecker, PrismConfig};
use crate::errors::{PlanningError, ScratchSnafu};
use crate::io::{
    AccessIntervals, ConfigError, ConfigRepr, EntityDictionary, InputError, InvalidConfigSnafu, Mission,
    TimeUnit,
};
use crate::mdp::Objectives;
use crate::pareto::{combine, CombinationPolicy, LocalFront, ParetoFrontier};
use crate::team::{IdPrefixes, Team, TeamIndex, VisibilityTable};
use crate::time::Unit;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant as StdInstant;
use typed_builder::TypedBuilder;

/// Encoding, check and decoding of a single planning window.
pub mod solver;

pub use solver::{PreparedModel, TimestepSolver, REWARD_TOLERANCE, WHOLE_HORIZON};

/// How the mission horizon is split into models.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decomposition {
    /// One independent model per timestep, fronts combined afterwards.
    #[default]
    PerTimestep,
    /// A single model over the whole horizon with the real visibility windows.
    WholeHorizon,
}

/// Settings of a planning run.
///
/// Every field has a default, so an empty YAML document is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct PlannerConfig {
    #[builder(default)]
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[builder(default)]
    #[serde(default)]
    pub decomposition: Decomposition,
    /// Only keep assignments whose sensors have pairwise overlapping windows.
    #[builder(default = true)]
    #[serde(default = "default_true")]
    pub prune_by_visibility: bool,
    #[builder(default)]
    #[serde(default)]
    pub objectives: Objectives,
    #[builder(default)]
    #[serde(default)]
    pub combination: CombinationPolicy,
    /// Upper bound on the number of assignments of a single model.
    #[builder(default = default_max_states())]
    #[serde(default = "default_max_states")]
    pub max_states: usize,
    #[builder(default)]
    #[serde(default)]
    pub prefixes: IdPrefixes,
    #[builder(default)]
    #[serde(default)]
    pub checker: PrismConfig,
    /// Parent of the per-timestep scratch directories.
    #[builder(default = std::env::temp_dir(), setter(into))]
    #[serde(default = "std::env::temp_dir")]
    pub scratch_dir: PathBuf,
    /// Keep the scratch directories, and the checker artifacts in them, after the run.
    #[builder(default)]
    #[serde(default)]
    pub keep_scratch: bool,
    #[builder(default = true)]
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_states() -> usize {
    1 << 20
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for PlannerConfig {}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.max_states > 0,
            InvalidConfigSnafu {
                msg: "max_states must be positive"
            }
        );
        if let CombinationPolicy::Sampled { draws, .. } = self.combination {
            ensure!(
                draws > 0,
                InvalidConfigSnafu {
                    msg: "sampled combination needs at least one draw"
                }
            );
        }
        if let Some(timeout) = self.checker.timeout_s {
            ensure!(
                timeout > 0.0,
                InvalidConfigSnafu {
                    msg: format!("checker timeout must be positive, got {timeout} s")
                }
            );
        }
        Ok(())
    }
}

/// Canonical index of `team` over the mission target, and the mission horizon in the configured time unit.
pub fn index_mission(
    team: &Team,
    mission: &Mission,
    access: &AccessIntervals,
    dictionary: &EntityDictionary,
    cfg: &PlannerConfig,
) -> Result<(TeamIndex, u32), InputError> {
    team.validate()?;
    let horizon = mission.horizon(cfg.time_unit);
    let qualified = team.qualified();
    let visibility =
        VisibilityTable::from_access(&qualified, access, &mission.target, cfg.time_unit, horizon)?;
    let index = TeamIndex::build(&qualified, dictionary, &visibility, &cfg.prefixes)?;
    info!(
        "{} over {horizon} {} timesteps: {index}",
        mission.target, cfg.time_unit
    );
    Ok((index, horizon))
}

/// Outcome of a planning run.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanReport {
    pub horizon: u32,
    /// Front of every solved model, in timestep order.
    pub fronts: Vec<LocalFront>,
    pub frontier: ParetoFrontier,
}

/// Plans a mission: solves every planning window with the model checker, then combines their fronts.
pub struct MissionPlanner<C: ModelChecker> {
    pub cfg: PlannerConfig,
    pub checker: C,
}

impl<C: ModelChecker> MissionPlanner<C> {
    pub fn new(cfg: PlannerConfig, checker: C) -> Self {
        Self { cfg, checker }
    }

    // Just the template for the progress bar
    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.cfg.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:100.cyan/blue} {pos:>7}/{len:7} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        pb.set_message("models");
        pb
    }

    /// Encodes every planning window of `[0, horizon)`, before any of them is checked.
    ///
    /// Every timestep is part of the plan: one where the visible sensors cannot detect every measurement, including
    /// one where no sensor is visible at all, fails the run with `UnsatisfiableMission`. The first failing window in
    /// timestep order is reported.
    pub fn prepare(
        &self,
        solver: &TimestepSolver<'_, C>,
        index: &TeamIndex,
        horizon: u32,
    ) -> Result<Vec<PreparedModel>, PlanningError> {
        match self.cfg.decomposition {
            Decomposition::PerTimestep => {
                let timesteps: Vec<i64> = (0..i64::from(horizon)).collect();
                let models: Vec<Result<PreparedModel, PlanningError>> = timesteps
                    .par_iter()
                    .map(|&t| solver.prepare_timestep(index, t))
                    .collect();
                models.into_iter().collect()
            }
            Decomposition::WholeHorizon => Ok(vec![solver.prepare_horizon(index, horizon)?]),
        }
    }

    /// Solves the mission over `[0, horizon)` and builds its Pareto frontier.
    ///
    /// Every model is encoded before the checker runs. The first failing timestep, in timestep order, aborts the run.
    pub fn plan(&self, index: &TeamIndex, horizon: u32) -> Result<PlanReport, PlanningError> {
        self.cfg.validate()?;
        std::fs::create_dir_all(&self.cfg.scratch_dir).context(ScratchSnafu {
            path: &self.cfg.scratch_dir,
        })?;

        let solver = TimestepSolver::new(&self.cfg, &self.checker);
        let models = self.prepare(&solver, index, horizon)?;
        info!("{} models encoded", models.len());
        let fronts = self.solve_models(&solver, &models)?;

        let combinations = combine(&fronts, &self.cfg.combination);
        debug!(
            "{} combinations of {} fronts ({:?})",
            combinations.len(),
            fronts.len(),
            self.cfg.combination
        );
        let frontier = ParetoFrontier::from_combinations(combinations);
        info!(
            "frontier holds {} points, {} optimal",
            frontier.points.len(),
            frontier.optimal().len()
        );

        Ok(PlanReport {
            horizon,
            fronts,
            frontier,
        })
    }

    fn solve_models(
        &self,
        solver: &TimestepSolver<'_, C>,
        models: &[PreparedModel],
    ) -> Result<Vec<LocalFront>, PlanningError> {
        let num_models = models.len();
        let pb = self.progress_bar(num_models);
        let (tx, rx) = channel();

        let start = StdInstant::now();
        models
            .par_iter()
            .progress_with(pb)
            .for_each_with(tx, |tx, model| {
                let result = solver.solve(model);
                if tx.send((model.label, result)).is_err() {
                    error!("t = {}: result lost, the planner stopped listening", model.label);
                }
            });

        let clock_time = StdInstant::now() - start;
        info!(
            "checked {num_models} models in {}",
            clock_time.as_secs_f64() * Unit::Second
        );

        let mut results = rx.iter().collect::<Vec<_>>();
        results.par_sort_by_key(|(t, _)| *t);
        results.into_iter().map(|(_, front)| front).collect()
    }

    /// Writes the model and property of every planning window into `out_dir`, without checking them.
    ///
    /// Each timestep gets its own `t<k>` subdirectory. A whole-horizon model is written to `out_dir` itself. Returns
    /// the paths of the model files.
    pub fn encode_only(
        &self,
        index: &TeamIndex,
        horizon: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, PlanningError> {
        self.cfg.validate()?;
        let solver = TimestepSolver::new(&self.cfg, &self.checker);

        let mut paths = Vec::new();
        for prepared in self.prepare(&solver, index, horizon)? {
            let dir = if prepared.label == WHOLE_HORIZON {
                out_dir.to_path_buf()
            } else {
                out_dir.join(format!("t{}", prepared.label))
            };
            std::fs::create_dir_all(&dir).context(ScratchSnafu { path: &dir })?;
            let (model, _) = solver.write_model(&prepared, &dir)?;
            info!("wrote {}", model.display());
            paths.push(model);
        }
        Ok(paths)
    }
}
