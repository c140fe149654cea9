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

use super::assignment::{Assignment, StateSpace};
use super::expr::{Bindings, ProbExpr};
use super::{ModelError, TooManyMeasurementsSnafu, UnsatisfiableMissionSnafu};
use crate::team::TeamIndex;
use snafu::prelude::*;
use std::collections::BTreeMap;

/// Above this many measurements the outcome enumeration is refused.
pub const MAX_MEASUREMENTS: usize = 24;

/// Detection outcome of every measurement, in the order of [TeamIndex::measurements].
pub type Outcome = Vec<bool>;

/// Miss probability of each measurement and probability of each possible outcome, for one assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct OutcomeTable {
    pub miss: Vec<ProbExpr>,
    /// Outcomes of non-zero probability in lexicographic order, missed before detected.
    pub outcomes: Vec<(Outcome, ProbExpr)>,
}

impl OutcomeTable {
    /// Probability that every measurement is detected, if that outcome is possible.
    pub fn all_detected(&self) -> Option<&ProbExpr> {
        self.outcomes
            .iter()
            .find(|(outcome, _)| outcome.iter().all(|&d| d))
            .map(|(_, p)| p)
    }
}

/// Transition probabilities of every retained assignment of a state space.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityModel {
    bindings: Bindings,
    tables: BTreeMap<Assignment, OutcomeTable>,
    retained: Vec<Assignment>,
}

impl ProbabilityModel {
    /// Builds the outcome table of each assignment and keeps those able to detect every measurement.
    ///
    /// The empty assignment is always kept. Fails with `UnsatisfiableMission` when no kept assignment can detect
    /// every measurement.
    pub fn build(
        index: &TeamIndex,
        space: &StateSpace,
        timestep: i64,
    ) -> Result<Self, ModelError> {
        let num_meas = index.num_measurements();
        ensure!(
            num_meas <= MAX_MEASUREMENTS,
            TooManyMeasurementsSnafu {
                count: num_meas,
                limit: MAX_MEASUREMENTS
            }
        );

        let relation = index.miss_relation();
        let bindings = relation.bindings;

        let mut tables = BTreeMap::new();
        let mut retained = Vec::new();

        for assignment in space.iter() {
            let mut miss = Vec::with_capacity(num_meas);
            for row in &relation.terms {
                let expr = ProbExpr::product(
                    row.iter()
                        .enumerate()
                        .filter(|(s, _)| assignment.sensor_active(*s))
                        .map(|(_, term)| term.clone()),
                );
                miss.push(expr.collapse(&bindings)?);
            }

            let mut outcomes = Vec::new();
            for code in 0..(1_usize << num_meas) {
                let outcome: Outcome = (0..num_meas)
                    .map(|m| code & (1 << (num_meas - 1 - m)) != 0)
                    .collect();

                let expr = ProbExpr::product(outcome.iter().zip(&miss).map(|(&detected, miss)| {
                    if detected {
                        miss.clone().complement()
                    } else {
                        miss.clone()
                    }
                }));

                if expr.is_zero() {
                    continue;
                }
                let expr = expr.collapse(&bindings)?;
                if !expr.is_zero() {
                    outcomes.push((outcome, expr));
                }
            }

            let table = OutcomeTable { miss, outcomes };
            if assignment.is_empty() || table.all_detected().is_some() {
                retained.push(assignment.clone());
            } else {
                trace!("t = {timestep}: {assignment} can never detect every measurement");
            }
            tables.insert(assignment.clone(), table);
        }

        let satisfiable = retained
            .iter()
            .any(|a| tables.get(a).and_then(OutcomeTable::all_detected).is_some());
        ensure!(satisfiable, UnsatisfiableMissionSnafu { timestep });

        debug!(
            "t = {timestep}: kept {} of {} assignments",
            retained.len(),
            space.len()
        );

        Ok(Self {
            bindings,
            tables,
            retained,
        })
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Retained assignments, in state-space order.
    pub fn retained(&self) -> &[Assignment] {
        &self.retained
    }

    pub fn table(&self, assignment: &Assignment) -> Option<&OutcomeTable> {
        self.tables.get(assignment)
    }

    /// Numerical probability that `assignment` detects every measurement.
    pub fn success_probability(&self, assignment: &Assignment) -> Result<f64, ModelError> {
        match self.table(assignment).and_then(OutcomeTable::all_detected) {
            Some(expr) => expr.evaluate(&self.bindings),
            None => Ok(0.0),
        }
    }
}

#[cfg(test)]
mod ut_outcomes {
    use super::ProbabilityModel;
    use crate::io::{ConfigRepr, EntityDictionary};
    use crate::mdp::assignment::{Assignment, StateSpace};
    use crate::mdp::ModelError;
    use crate::team::{IdPrefixes, Team, TeamIndex, VisibilitySchedule, VisibilityTable};
    use approx::assert_abs_diff_eq;

    const DICT: &str = "Platform1: Aqua\nPlatform2: Terra\nSensor1: AMSR\nSensor2: MODIS\n\
        ObservableProperty1: Sea ice\nObservableProperty2: Cloud\n";

    fn index(team: &str) -> TeamIndex {
        let team = Team::loads(team).unwrap().qualified();
        let mut vis = VisibilityTable::new("target");
        for (agent, sensor) in team.sensors() {
            vis.insert(&agent.name, &sensor.name, VisibilitySchedule::at(0));
        }
        let dict = EntityDictionary::parse(DICT).unwrap();
        TeamIndex::build(&team, &dict, &vis, &IdPrefixes::default()).unwrap()
    }

    #[test]
    fn two_complementary_sensors() {
        let index = index("Aqua:\n  - AMSR:\n      Sea ice: 0.9\nTerra:\n  - MODIS:\n      Cloud: 0.7\n");
        let space = StateSpace::enumerate(&index, true, 100).unwrap();
        let model = ProbabilityModel::build(&index, &space, 0).unwrap();

        // Only the pair of both satellites can see both measurements
        assert_eq!(model.retained().len(), 2);
        assert!(model.retained()[0].is_empty());
        let both = &model.retained()[1];
        assert_eq!(both.len(), 2);

        let table = model.table(both).unwrap();
        assert_eq!(table.outcomes.len(), 4);
        let rendered: Vec<String> = table.outcomes.iter().map(|(_, p)| format!("{p}")).collect();
        assert_eq!(rendered, ["(1-P1)*(1-P2)", "(1-P1)*P2", "P1*(1-P2)", "P1*P2"]);
        assert_abs_diff_eq!(model.success_probability(both).unwrap(), 0.63, epsilon = 1e-12);

        let total: f64 = table
            .outcomes
            .iter()
            .map(|(_, p)| p.evaluate(model.bindings()).unwrap())
            .sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_assignment_misses_everything() {
        let index = index("Aqua:\n  - AMSR:\n      Sea ice: 0.8\n");
        let space = StateSpace::enumerate(&index, true, 100).unwrap();
        let model = ProbabilityModel::build(&index, &space, 0).unwrap();
        let empty = model.table(&Assignment::empty()).unwrap();
        assert_eq!(empty.outcomes.len(), 1);
        assert_eq!(empty.outcomes[0].0, vec![false]);
        assert!(empty.outcomes[0].1.is_one());
        assert_eq!(model.success_probability(&Assignment::empty()).unwrap(), 0.0);
        assert_eq!(model.retained().len(), 2);
    }

    #[test]
    fn certain_detection_drops_miss_outcome() {
        let index = index("Aqua:\n  - AMSR:\n      Sea ice: 1.0\n");
        let space = StateSpace::enumerate(&index, true, 100).unwrap();
        let model = ProbabilityModel::build(&index, &space, 0).unwrap();
        let single = &model.retained()[1];
        let table = model.table(single).unwrap();
        assert_eq!(table.outcomes.len(), 1);
        assert!(table.outcomes[0].1.is_one());
    }

    #[test]
    fn unsatisfiable() {
        // Nobody can see the cloud cover
        let index = index("Aqua:\n  - AMSR:\n      Sea ice: 0.9\n  - MODIS:\n      Sea ice: 0.5\nTerra:\n  - MODIS:\n      Cloud: 0.0\n");
        let space = StateSpace::enumerate(&index, true, 100).unwrap();
        let err = ProbabilityModel::build(&index, &space, 3).unwrap_err();
        assert!(matches!(err, ModelError::UnsatisfiableMission { timestep: 3 }));
    }

    #[test]
    fn deterministic() {
        let index = index("Aqua:\n  - AMSR:\n      Sea ice: 0.9\nTerra:\n  - MODIS:\n      Cloud: 0.7\n      Sea ice: 0.2\n");
        let space = StateSpace::enumerate(&index, true, 100).unwrap();
        let first = ProbabilityModel::build(&index, &space, 0).unwrap();
        let second = ProbabilityModel::build(&index, &space, 0).unwrap();
        assert_eq!(first, second);
    }
}
