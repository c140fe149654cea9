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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Formula holding when every measurement flag is set.
pub const ALL_MEASURED: &str = "allM";
/// Reward structure counting the agents used by each action.
pub const AGENT_REWARD: &str = "numAgents";

/// What the checker is asked to optimize.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objectives {
    /// Maximize the probability of always holding every measurement.
    Success,
    /// Pareto front of that probability against the total number of agents used.
    #[default]
    SuccessAndAgents,
}

impl Objectives {
    pub fn is_multi(self) -> bool {
        matches!(self, Self::SuccessAndAgents)
    }
}

/// Property file content for the given objectives.
impl fmt::Display for Objectives {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Pmax=? [ G {ALL_MEASURED} ]"),
            Self::SuccessAndAgents => write!(
                f,
                "multi(Pmax=? [ G {ALL_MEASURED} ], R{{\"{AGENT_REWARD}\"}}min=? [ C ])"
            ),
        }
    }
}
