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

use crate::time::Epoch;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads the access intervals computed by the coverage tool.
pub mod access;
/// Entity dictionary mapping internal identifiers to display names.
pub mod dictionary;
/// CSV export of the Pareto frontier.
pub mod export;
/// Mission horizon and target, read from the mission document.
pub mod mission;

pub use access::AccessIntervals;
pub use dictionary::EntityDictionary;
pub use mission::{Mission, TimeUnit};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputError {
    #[snafu(display("could not read {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("could not parse JSON in {}: {source}", path.display()))]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("could not parse YAML: {source}"))]
    Yaml { source: serde_yaml::Error },
    #[snafu(display("malformed mission document: {msg}"))]
    MalformedMission { msg: String },
    #[snafu(display("no access data for {agent}/{sensor} over {target}"))]
    MissingAccess {
        agent: String,
        sensor: String,
        target: String,
    },
    #[snafu(display("{agent}/{sensor} never sees {target}: empty visibility"))]
    EmptyVisibility {
        agent: String,
        sensor: String,
        target: String,
    },
    #[snafu(display("{agent}/{sensor} detects {measurement} with probability {value}, outside [0, 1]"))]
    InvalidProbability {
        agent: String,
        sensor: String,
        measurement: String,
        value: f64,
    },
    #[snafu(display("`{name}` is not in the entity dictionary"))]
    UnknownEntity { name: String },
    #[snafu(display("entity dictionary line {line_no} is malformed: `{line}`"))]
    MalformedDictionary { line_no: usize, line: String },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: std::io::Error },

    #[snafu(display("failed to parse YAML configuration file: {source}"))]
    ParseError { source: serde_yaml::Error },

    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds the configuration representation from a yaml string
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}

/// Parses an ISO 8601 date as written by the mission tools, tolerating a trailing `Z`.
pub(crate) fn parse_epoch(s: &str) -> Result<Epoch, InputError> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    Epoch::from_gregorian_str(trimmed).map_err(|e| InputError::MalformedMission {
        msg: format!("invalid date `{s}`: {e}"),
    })
}

pub(crate) fn epoch_to_str<S>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{epoch}"))
}

/// A deserializer from Epoch string
pub(crate) fn epoch_from_str<'de, D>(deserializer: D) -> Result<Epoch, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_epoch(&s).map_err(serde::de::Error::custom)
}
