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
    EmptyVisibilitySnafu, InputError, IoSnafu, JsonSnafu, MissingAccessSnafu, TimeUnit,
};
use crate::team::visibility::{VisibilitySchedule, VisibilityWindow};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A rise or set of a sensor over the target, in seconds from the mission start.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    #[serde(rename = "isRise")]
    pub is_rise: bool,
    pub time: f64,
}

/// Access intervals document, keyed by agent, then sensor, then target.
#[derive(Clone, Debug)]
pub struct AccessIntervals {
    doc: Value,
}

impl AccessIntervals {
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).context(IoSnafu { path })?;
        let doc = serde_json::from_reader(BufReader::new(file)).context(JsonSnafu { path })?;
        Ok(Self { doc })
    }

    pub fn from_value(doc: Value) -> Self {
        Self { doc }
    }

    /// Chronological rise/set events of `sensor` on `agent` over `target`.
    pub fn events(
        &self,
        agent: &str,
        sensor: &str,
        target: &str,
    ) -> Result<Vec<AccessEvent>, InputError> {
        let raw = self
            .doc
            .get("output")
            .and_then(|o| o.get(agent))
            .and_then(|a| a.get(sensor))
            .and_then(|s| s.get(target))
            .and_then(|t| t.get("timeArray"))
            .context(MissingAccessSnafu {
                agent,
                sensor,
                target,
            })?;

        let mut events: Vec<AccessEvent> = serde_json::from_value(raw.clone())
            .map_err(|_| InputError::MissingAccess {
                agent: agent.to_string(),
                sensor: sensor.to_string(),
                target: target.to_string(),
            })?;
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(events)
    }

    /// Discretizes the events into a visibility schedule.
    ///
    /// Rise times are floored and set times are ceiled to `unit`, so a window is never shorter than the true pass.
    /// A set without a preceding rise opens at zero, and a rise never followed by a set closes at `horizon`.
    pub fn schedule(
        &self,
        agent: &str,
        sensor: &str,
        target: &str,
        unit: TimeUnit,
        horizon: u32,
    ) -> Result<VisibilitySchedule, InputError> {
        let events = self.events(agent, sensor, target)?;
        let windows = discretize(&events, unit, horizon);

        ensure!(
            !windows.is_empty(),
            EmptyVisibilitySnafu {
                agent,
                sensor,
                target,
            }
        );

        Ok(VisibilitySchedule::new(windows))
    }
}

pub(crate) fn discretize(events: &[AccessEvent], unit: TimeUnit, horizon: u32) -> Vec<VisibilityWindow> {
    let to_window = |rise: f64, set: f64| {
        let start = (rise / unit.seconds()).floor() as i64;
        let end = (set / unit.seconds()).ceil() as i64;
        VisibilityWindow::new(start, end.max(start + 1))
    };

    let mut windows = Vec::with_capacity(events.len() / 2 + 1);
    let mut open: Option<f64> = None;
    for event in events {
        if event.is_rise {
            open.get_or_insert(event.time);
        } else {
            let rise = open.take().unwrap_or(0.0);
            windows.push(to_window(rise, event.time));
        }
    }

    if let Some(rise) = open {
        windows.push(to_window(rise, f64::from(horizon) * unit.seconds()));
    }

    windows
}
