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

use super::visibility::VisibilitySchedule;
use super::{natural_cmp, split_qualified, QualifiedTeam, SENSOR_SUFFIX};
use crate::io::{AccessIntervals, EntityDictionary, InputError, TimeUnit};
use crate::mdp::expr::{Bindings, ProbExpr};
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Prefixes of the short identifiers used in the encoded model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPrefixes {
    pub agent: String,
    pub sensor: String,
    pub measurement: String,
}

impl Default for IdPrefixes {
    fn default() -> Self {
        Self {
            agent: "a".to_string(),
            sensor: "s".to_string(),
            measurement: "m".to_string(),
        }
    }
}

/// Visibility schedule of every `(agent, qualified sensor)` pair of a team over one target.
#[derive(Clone, Debug, Default)]
pub struct VisibilityTable {
    pub target: String,
    schedules: HashMap<(String, String), VisibilitySchedule>,
}

impl VisibilityTable {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            schedules: HashMap::new(),
        }
    }

    /// Discretizes the access intervals of every sensor of the team, looked up by its unqualified name.
    pub fn from_access(
        team: &QualifiedTeam,
        access: &AccessIntervals,
        target: &str,
        unit: TimeUnit,
        horizon: u32,
    ) -> Result<Self, InputError> {
        let mut table = Self::new(target);
        for (agent, sensor) in team.sensors() {
            let (base, _) = split_qualified(&sensor.name);
            let schedule = access.schedule(&agent.name, base, target, unit, horizon)?;
            debug!("{}/{} sees {target} during {schedule}", agent.name, sensor.name);
            table.insert(&agent.name, &sensor.name, schedule);
        }
        Ok(table)
    }

    pub fn insert(&mut self, agent: &str, sensor: &str, schedule: VisibilitySchedule) {
        self.schedules
            .insert((agent.to_string(), sensor.to_string()), schedule);
    }

    pub fn get(&self, agent: &str, sensor: &str) -> Option<&VisibilitySchedule> {
        self.schedules.get(&(agent.to_string(), sensor.to_string()))
    }
}

/// Identifier and display name of an agent or a measurement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SensorEntry {
    pub id: String,
    pub name: String,
    /// Index of the owning agent in [TeamIndex::agents].
    pub agent: usize,
    pub schedule: VisibilitySchedule,
}

/// Measurement-by-sensor miss probabilities: `One` where the sensor cannot produce the measurement, `1-Pk` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct MissRelation {
    pub terms: Vec<Vec<ProbExpr>>,
    pub bindings: Bindings,
}

/// Canonical view of a qualified team: naturally sorted identifiers, relation matrices and per-sensor schedules.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamIndex {
    agents: Vec<Entity>,
    sensors: Vec<SensorEntry>,
    measurements: Vec<Entity>,
    /// Detection probability, indexed by measurement then sensor.
    detection: Vec<Vec<Option<f64>>>,
}

impl TeamIndex {
    pub fn build(
        team: &QualifiedTeam,
        dictionary: &EntityDictionary,
        visibility: &VisibilityTable,
        prefixes: &IdPrefixes,
    ) -> Result<Self, InputError> {
        let mut agents = Vec::with_capacity(team.agents().len());
        for agent in team.agents() {
            agents.push(Entity {
                id: dictionary.short_id(&agent.name, &prefixes.agent)?,
                name: agent.name.clone(),
            });
        }
        agents.sort_by(|a, b| natural_cmp(&a.id, &b.id));

        let mut sensors = Vec::new();
        let mut measurement_ids: BTreeMap<String, String> = BTreeMap::new();
        // Detection probabilities keyed by measurement ID, then by qualified sensor ID
        let mut probabilities: HashMap<(String, String), f64> = HashMap::new();

        for (agent, sensor) in team.sensors() {
            let (base, k) = split_qualified(&sensor.name);
            let mut id = dictionary.short_id(base, &prefixes.sensor)?;
            if let Some(k) = k {
                id = format!("{id}{SENSOR_SUFFIX}{k}");
            }

            let schedule = visibility
                .get(&agent.name, &sensor.name)
                .filter(|s| !s.is_empty())
                .cloned()
                .ok_or_else(|| InputError::EmptyVisibility {
                    agent: agent.name.clone(),
                    sensor: sensor.name.clone(),
                    target: visibility.target.clone(),
                })?;

            let owner = agents
                .iter()
                .position(|a| a.name == agent.name)
                .ok_or_else(|| InputError::UnknownEntity {
                    name: agent.name.clone(),
                })?;

            for (measurement, p) in &sensor.measurements {
                let m_id = dictionary.short_id(measurement, &prefixes.measurement)?;
                probabilities.insert((m_id.clone(), id.clone()), *p);
                measurement_ids.entry(m_id).or_insert_with(|| measurement.clone());
            }

            sensors.push(SensorEntry {
                id,
                name: sensor.name.clone(),
                agent: owner,
                schedule,
            });
        }
        sensors.sort_by(|a, b| natural_cmp(&a.id, &b.id));

        let mut measurements: Vec<Entity> = measurement_ids
            .into_iter()
            .map(|(id, name)| Entity { id, name })
            .collect();
        measurements.sort_by(|a, b| natural_cmp(&a.id, &b.id));

        let detection = measurements
            .iter()
            .map(|m| {
                sensors
                    .iter()
                    .map(|s| probabilities.get(&(m.id.clone(), s.id.clone())).copied())
                    .collect()
            })
            .collect();

        Ok(Self {
            agents,
            sensors,
            measurements,
            detection,
        })
    }

    /// Sub-team of the sensors visible at timestep `t`, each with the single window `[t, t+1)`.
    ///
    /// Agents without any visible sensor are dropped. The measurement list is kept whole since mission success
    /// still requires all of them.
    pub fn at_timestep(&self, t: i64) -> Self {
        let kept: Vec<usize> = (0..self.sensors.len())
            .filter(|&s| self.sensors[s].schedule.contains(t))
            .collect();

        let mut agent_map: BTreeMap<usize, usize> = BTreeMap::new();
        for &s in &kept {
            agent_map.entry(self.sensors[s].agent).or_insert(0);
        }
        for (new_idx, slot) in agent_map.values_mut().enumerate() {
            *slot = new_idx;
        }

        let agents = agent_map
            .keys()
            .map(|&a| self.agents[a].clone())
            .collect();

        let sensors = kept
            .iter()
            .map(|&s| SensorEntry {
                id: self.sensors[s].id.clone(),
                name: self.sensors[s].name.clone(),
                agent: agent_map[&self.sensors[s].agent],
                schedule: VisibilitySchedule::at(t),
            })
            .collect();

        let detection = self
            .detection
            .iter()
            .map(|row| kept.iter().map(|&s| row[s]).collect())
            .collect();

        Self {
            agents,
            sensors,
            measurements: self.measurements.clone(),
            detection,
        }
    }

    pub fn agents(&self) -> &[Entity] {
        &self.agents
    }

    pub fn sensors(&self) -> &[SensorEntry] {
        &self.sensors
    }

    pub fn measurements(&self) -> &[Entity] {
        &self.measurements
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn num_sensors(&self) -> usize {
        self.sensors.len()
    }

    pub fn num_measurements(&self) -> usize {
        self.measurements.len()
    }

    /// Agent-by-sensor relation matrix: `true` where the sensor is mounted on the agent.
    pub fn relation_as(&self) -> Vec<Vec<bool>> {
        (0..self.agents.len())
            .map(|a| self.sensors.iter().map(|s| s.agent == a).collect())
            .collect()
    }

    /// Feasible `(agent, sensor)` cells in row-major order.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let mut cells: Vec<(usize, usize)> = self
            .sensors
            .iter()
            .enumerate()
            .map(|(s, sensor)| (sensor.agent, s))
            .collect();
        cells.sort();
        cells
    }

    pub fn detection(&self) -> &[Vec<Option<f64>>] {
        &self.detection
    }

    pub fn schedule(&self, sensor: usize) -> &VisibilitySchedule {
        &self.sensors[sensor].schedule
    }

    /// Builds the miss relation, numbering the detection constants `Pk` row-major over measurements then sensors.
    pub fn miss_relation(&self) -> MissRelation {
        let mut values = Vec::new();
        let terms = self
            .detection
            .iter()
            .map(|row| {
                row.iter()
                    .map(|p| match p {
                        Some(p) => {
                            values.push(*p);
                            ProbExpr::Param(values.len()).complement()
                        }
                        None => ProbExpr::One,
                    })
                    .collect()
            })
            .collect();

        MissRelation {
            terms,
            bindings: Bindings::new(values),
        }
    }
}

impl fmt::Display for TeamIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ids = |entities: Vec<&str>| entities.join(", ");
        write!(
            f,
            "agents [{}] sensors [{}] measurements [{}]",
            ids(self.agents.iter().map(|a| a.id.as_str()).collect()),
            ids(self.sensors.iter().map(|s| s.id.as_str()).collect()),
            ids(self.measurements.iter().map(|m| m.id.as_str()).collect()),
        )
    }
}
