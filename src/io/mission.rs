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

use super::{
    epoch_from_str, epoch_to_str, parse_epoch, InputError, IoSnafu, JsonSnafu, MalformedMissionSnafu,
};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Granularity of the discretized mission horizon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Day,
    Hour,
}

impl TimeUnit {
    pub fn seconds(self) -> f64 {
        match self {
            Self::Day => 86_400.0,
            Self::Hour => 3_600.0,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Hour => write!(f, "hour"),
        }
    }
}

/// The observation window and target of a mission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    pub start: Epoch,
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    pub end: Epoch,
    /// Name of the observed location, used as the key of the access intervals.
    pub target: String,
}

impl Mission {
    /// Reads the first observation and the first location of a mission document.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).context(IoSnafu { path })?;
        let doc: Value = serde_json::from_reader(BufReader::new(file)).context(JsonSnafu { path })?;
        Self::from_value(&doc)
    }

    pub fn from_value(doc: &Value) -> Result<Self, InputError> {
        let observation = &doc["observations"][0];
        let start = date_field(observation, "startDate")?;
        let end = date_field(observation, "endDate")?;
        let target = doc["locations"][0]["name"]
            .as_str()
            .ok_or_else(|| InputError::MalformedMission {
                msg: "missing locations[0].name".to_string(),
            })?
            .to_string();

        ensure!(
            end > start,
            MalformedMissionSnafu {
                msg: format!("mission ends ({end}) before it starts ({start})")
            }
        );

        Ok(Self { start, end, target })
    }

    /// Number of discrete timesteps covering the mission: seconds are rounded, then the unit count is ceiled.
    pub fn horizon(&self, unit: TimeUnit) -> u32 {
        let seconds = (self.end - self.start).to_seconds().round();
        (seconds / unit.seconds()).ceil() as u32
    }
}

fn date_field(observation: &Value, key: &str) -> Result<Epoch, InputError> {
    let raw = observation[key]
        .as_str()
        .ok_or_else(|| InputError::MalformedMission {
            msg: format!("missing observations[0].{key}"),
        })?;
    parse_epoch(raw)
}
