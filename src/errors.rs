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

use crate::adversary::AdversaryError;
use crate::checker::CheckerError;
use crate::io::export::ExportError;
use crate::io::{ConfigError, InputError};
use crate::mdp::ModelError;
use snafu::prelude::*;
use std::path::PathBuf;

/// Failure of a planning run. Failures tied to a timestep carry it, `-1` standing for the whole horizon.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PlanningError {
    #[snafu(display("planning failed on its inputs: {source}"))]
    PlanInput { source: InputError },
    #[snafu(display("planning failed because {source}"))]
    PlanConfig { source: ConfigError },
    #[snafu(display("model of t = {timestep} failed: {source}"))]
    PlanModel { timestep: i64, source: ModelError },
    #[snafu(display("model check of t = {timestep} failed: {source}"))]
    PlanChecker {
        timestep: i64,
        source: CheckerError,
    },
    #[snafu(display("strategies of t = {timestep} are unusable: {source}"))]
    PlanAdversary {
        timestep: i64,
        source: AdversaryError,
    },
    #[snafu(display("no exported strategy realizes the result of t = {timestep}, see {}", log.display()))]
    NoStrategy { timestep: i64, log: PathBuf },
    #[snafu(display(
        "no exported strategy of t = {timestep} earns the reward {reward} of the point ({probability}, {reward})"
    ))]
    UnrealizedPoint {
        timestep: i64,
        probability: f64,
        reward: f64,
    },
    #[snafu(display("scratch directory {} failed: {source}", path.display()))]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("planning could not export its result: {source}"))]
    PlanExport { source: ExportError },
}

impl From<InputError> for PlanningError {
    fn from(source: InputError) -> Self {
        Self::PlanInput { source }
    }
}

impl From<ConfigError> for PlanningError {
    fn from(source: ConfigError) -> Self {
        Self::PlanConfig { source }
    }
}

impl From<ExportError> for PlanningError {
    fn from(source: ExportError) -> Self {
        Self::PlanExport { source }
    }
}
