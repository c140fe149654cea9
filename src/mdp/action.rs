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

use super::assignment::Assignment;
use crate::team::TeamIndex;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Label of the action switching every sensor off.
pub const NO_AGENTS: &str = "NOAGENTS";

lazy_static! {
    static ref ACTION_CELL: Regex = Regex::new(r"(?:^|_)A([0-9]+)S([0-9]+(?:__[0-9]+)?)").unwrap();
}

/// How identifiers are spelled in a rendered model.
///
/// `Local` uses one-based positions in the [TeamIndex] (`a1_s2`, `m1`, `A1S2`), `Global` uses the short IDs of the
/// entities (`a355_s742__1`, `m12`, `A355S742__1`). Rendering with `Global` is what remaps a model onto the entities.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Naming {
    Local,
    Global,
}

impl Naming {
    /// State variable of an agent-sensor cell.
    pub fn flag(self, index: &TeamIndex, agent: usize, sensor: usize) -> String {
        match self {
            Self::Local => format!("a{}_s{}", agent + 1, sensor + 1),
            Self::Global => format!("{}_{}", index.agents()[agent].id, index.sensors()[sensor].id),
        }
    }

    /// State variable of a measurement.
    pub fn measurement(self, index: &TeamIndex, measurement: usize) -> String {
        match self {
            Self::Local => format!("m{}", measurement + 1),
            Self::Global => index.measurements()[measurement].id.clone(),
        }
    }

    fn cell(self, index: &TeamIndex, agent: usize, sensor: usize) -> String {
        match self {
            Self::Local => format!("A{}S{}", agent + 1, sensor + 1),
            Self::Global => format!(
                "A{}S{}",
                numeric_part(&index.agents()[agent].id),
                numeric_part(&index.sensors()[sensor].id)
            ),
        }
    }

    /// Action label of an assignment: its cells joined by `_`, or [NO_AGENTS].
    pub fn action(self, index: &TeamIndex, assignment: &Assignment) -> String {
        if assignment.is_empty() {
            return NO_AGENTS.to_string();
        }
        assignment
            .cells()
            .iter()
            .map(|&(a, s)| self.cell(index, a, s))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Drops the alphabetic prefix of a short ID: `s742__1` becomes `742__1`.
fn numeric_part(id: &str) -> &str {
    id.trim_start_matches(|c: char| !c.is_ascii_digit())
}

/// Agent numbers appearing in an action label, e.g. `{"355", "36"}` for `A355S742__1_A36S742__2`.
///
/// An optional `TO_` prefix is accepted, and [NO_AGENTS] has no agent.
pub fn action_agents(label: &str) -> BTreeSet<String> {
    let label = label.strip_prefix("TO_").unwrap_or(label);
    if label == NO_AGENTS {
        return BTreeSet::new();
    }
    ACTION_CELL
        .captures_iter(label)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Number of distinct agents used by an action, which is also its reward.
pub fn num_agents(label: &str) -> usize {
    action_agents(label).len()
}
