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

use crate::io::{ConfigRepr, InputError, InvalidProbabilitySnafu};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Canonical, sorted identifiers and relation matrices of a team.
pub mod index;
/// Visibility windows and schedules.
pub mod visibility;

pub use index::{IdPrefixes, TeamIndex, VisibilityTable};
pub use visibility::{VisibilitySchedule, VisibilityWindow};

/// Separator between a sensor name and its occurrence count, as in `ABI__2`.
pub const SENSOR_SUFFIX: &str = "__";

/// A sensor of an agent, with the detection probability of each measurement it can produce.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorSpec {
    pub name: String,
    pub measurements: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentSpec {
    pub name: String,
    pub sensors: Vec<SensorSpec>,
}

/// The candidate team, in input order.
///
/// In YAML, each agent maps to a list of sensors, and each sensor maps measurement names to detection probabilities:
///
/// ```yaml
/// GOES-17:
///   - ABI:
///       Cloud type: 0.84
/// Terra:
///   - MODIS:
///       Cloud type: 0.7
///       Sea ice cover: 0.9
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Team {
    agents: Vec<AgentSpec>,
}

impl Team {
    pub fn new(agents: Vec<AgentSpec>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[AgentSpec] {
        &self.agents
    }

    /// Ensures every detection probability is a finite number in `[0, 1]`.
    pub fn validate(&self) -> Result<(), InputError> {
        for agent in &self.agents {
            for sensor in &agent.sensors {
                for (measurement, &value) in &sensor.measurements {
                    ensure!(
                        (0.0..=1.0).contains(&value),
                        InvalidProbabilitySnafu {
                            agent: &agent.name,
                            sensor: &sensor.name,
                            measurement,
                            value,
                        }
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns a copy of this team where every sensor is suffixed with `__k`, `k` counting the occurrences of that
    /// sensor name across the team in input order. Two GOES satellites carrying `ABI` get `ABI__1` and `ABI__2`.
    pub fn qualified(&self) -> QualifiedTeam {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let agents = self
            .agents
            .iter()
            .map(|agent| AgentSpec {
                name: agent.name.clone(),
                sensors: agent
                    .sensors
                    .iter()
                    .map(|sensor| {
                        let count = seen.entry(sensor.name.as_str()).or_insert(0);
                        *count += 1;
                        SensorSpec {
                            name: format!("{}{SENSOR_SUFFIX}{count}", sensor.name),
                            measurements: sensor.measurements.clone(),
                        }
                    })
                    .collect(),
            })
            .collect();

        QualifiedTeam { agents }
    }
}

impl ConfigRepr for Team {}

/// A team whose sensor names are unique, see [Team::qualified].
#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedTeam {
    agents: Vec<AgentSpec>,
}

impl QualifiedTeam {
    pub fn agents(&self) -> &[AgentSpec] {
        &self.agents
    }

    /// Iterates over every `(agent, sensor)` pair.
    pub fn sensors(&self) -> impl Iterator<Item = (&AgentSpec, &SensorSpec)> {
        self.agents
            .iter()
            .flat_map(|agent| agent.sensors.iter().map(move |sensor| (agent, sensor)))
    }
}

/// Splits a qualified sensor name into its base name and occurrence suffix.
pub fn split_qualified(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(SENSOR_SUFFIX) {
        Some((base, k)) if !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()) => (base, Some(k)),
        _ => (name, None),
    }
}

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").unwrap();
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk<'a> {
    Text(&'a str),
    // Significant digit count first, so that numbers of any size compare by value.
    Number(usize, &'a str),
}

fn natural_key(s: &str) -> Vec<Chunk<'_>> {
    let mut key = Vec::new();
    let mut last = 0;
    for digits in DIGIT_RUN.find_iter(s) {
        key.push(Chunk::Text(&s[last..digits.start()]));
        let value = digits.as_str().trim_start_matches('0');
        key.push(Chunk::Number(value.len(), value));
        last = digits.end();
    }
    key.push(Chunk::Text(&s[last..]));
    key
}

/// Natural ordering: embedded digit runs compare numerically, so `s2` sorts before `s15`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

impl Serialize for Team {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.agents.len()))?;
        for agent in &self.agents {
            let sensors: Vec<BTreeMap<&str, &BTreeMap<String, f64>>> = agent
                .sensors
                .iter()
                .map(|s| BTreeMap::from([(s.name.as_str(), &s.measurements)]))
                .collect();
            map.serialize_entry(&agent.name, &sensors)?;
        }
        map.end()
    }
}

struct TeamVisitor;

impl<'de> Visitor<'de> for TeamVisitor {
    type Value = Team;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of agent names to lists of sensors")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut agents = Vec::new();
        while let Some((name, entries)) =
            access.next_entry::<String, Vec<BTreeMap<String, BTreeMap<String, f64>>>>()?
        {
            let sensors = entries
                .into_iter()
                .flat_map(|entry| entry.into_iter())
                .map(|(name, measurements)| SensorSpec { name, measurements })
                .collect();
            agents.push(AgentSpec { name, sensors });
        }
        Ok(Team { agents })
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TeamVisitor)
    }
}
