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

use super::{ModelError, StateSpaceTooLargeSnafu};
use crate::team::TeamIndex;
use snafu::prelude::*;
use std::collections::BTreeSet;
use std::fmt;

/// Agent-sensor cell: `(agent index, sensor index)` in a [TeamIndex].
pub type Cell = (usize, usize);

/// Which sensors of which agents are switched on, stored as its active cells in row-major order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Assignment {
    cells: Vec<Cell>,
}

impl Assignment {
    /// The assignment using no agent at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(mut cells: Vec<Cell>) -> Self {
        cells.sort_unstable();
        cells.dedup();
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_active(&self, agent: usize, sensor: usize) -> bool {
        self.cells.binary_search(&(agent, sensor)).is_ok()
    }

    pub fn sensor_active(&self, sensor: usize) -> bool {
        self.cells.iter().any(|&(_, s)| s == sensor)
    }

    /// Indices of the agents with at least one active sensor.
    pub fn agents(&self) -> BTreeSet<usize> {
        self.cells.iter().map(|&(a, _)| a).collect()
    }

    pub fn num_agents(&self) -> usize {
        self.agents().len()
    }

    pub fn to_matrix(&self, num_agents: usize, num_sensors: usize) -> Vec<Vec<bool>> {
        (0..num_agents)
            .map(|a| (0..num_sensors).map(|s| self.is_active(a, s)).collect())
            .collect()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cells: Vec<String> = self.cells.iter().map(|(a, s)| format!("({a},{s})")).collect();
        write!(f, "{{{}}}", cells.join(" "))
    }
}

/// Every feasible assignment of a team, in a deterministic order.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpace {
    assignments: Vec<Assignment>,
}

impl StateSpace {
    /// Enumerates the assignments of `index`: the empty one first, then every non-empty subset of the feasible cells
    /// ordered by size, then lexicographically.
    ///
    /// With `prune_by_visibility`, a subset of two or more cells is kept only if the schedules of every pair of its
    /// sensors overlap. Pairwise overlap is hereditary, so incompatible subsets are never extended.
    pub fn enumerate(
        index: &TeamIndex,
        prune_by_visibility: bool,
        max_states: usize,
    ) -> Result<Self, ModelError> {
        let cells = index.cells();
        let compatible: Vec<Vec<bool>> = cells
            .iter()
            .map(|&(_, si)| {
                cells
                    .iter()
                    .map(|&(_, sj)| {
                        !prune_by_visibility || index.schedule(si).overlaps(index.schedule(sj))
                    })
                    .collect()
            })
            .collect();

        let mut subsets: Vec<Vec<usize>> = vec![Vec::new()];
        let mut current = Vec::with_capacity(cells.len());
        extend(0, &compatible, &mut current, &mut subsets, max_states)?;
        subsets.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let assignments: Vec<Assignment> = subsets
            .into_iter()
            .map(|subset| Assignment {
                cells: subset.into_iter().map(|i| cells[i]).collect(),
            })
            .collect();

        debug!(
            "{} feasible cells yield {} assignments (visibility pruning {})",
            cells.len(),
            assignments.len(),
            if prune_by_visibility { "on" } else { "off" }
        );

        Ok(Self { assignments })
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter()
    }
}

fn extend(
    start: usize,
    compatible: &[Vec<bool>],
    current: &mut Vec<usize>,
    subsets: &mut Vec<Vec<usize>>,
    max_states: usize,
) -> Result<(), ModelError> {
    for i in start..compatible.len() {
        if current.iter().all(|&j| compatible[j][i]) {
            current.push(i);
            subsets.push(current.clone());
            ensure!(
                subsets.len() <= max_states,
                StateSpaceTooLargeSnafu {
                    cells: compatible.len(),
                    limit: max_states
                }
            );
            extend(i + 1, compatible, current, subsets, max_states)?;
            current.pop();
        }
    }
    Ok(())
}
