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

/// Half-open interval `[start, end)` of discrete timesteps during which a sensor sees the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisibilityWindow {
    pub start: i64,
    pub end: i64,
}

impl VisibilityWindow {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The single timestep window `[t, t+1)`.
    pub const fn at(t: i64) -> Self {
        Self::new(t, t + 1)
    }

    pub fn duration(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn contains(&self, t: i64) -> bool {
        self.start <= t && t < self.end
    }

    /// Length of the intersection of both windows, zero if they are disjoint.
    pub fn overlap(&self, other: &Self) -> i64 {
        (self.end.min(other.end) - self.start.max(other.start)).max(0)
    }
}

impl fmt::Display for VisibilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Sorted, disjoint visibility windows of one agent-sensor pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisibilitySchedule {
    windows: Vec<VisibilityWindow>,
}

impl VisibilitySchedule {
    /// Builds a schedule, sorting the windows and merging those that overlap or touch.
    pub fn new(mut windows: Vec<VisibilityWindow>) -> Self {
        windows.retain(|w| w.duration() > 0);
        windows.sort();

        let mut merged: Vec<VisibilityWindow> = Vec::with_capacity(windows.len());
        for window in windows {
            match merged.last_mut() {
                Some(last) if window.start <= last.end => last.end = last.end.max(window.end),
                _ => merged.push(window),
            }
        }

        Self { windows: merged }
    }

    /// Schedule of a single timestep, used when each timestep is solved on its own.
    pub fn at(t: i64) -> Self {
        Self {
            windows: vec![VisibilityWindow::at(t)],
        }
    }

    pub fn windows(&self) -> &[VisibilityWindow] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn duration(&self) -> i64 {
        self.windows.iter().map(VisibilityWindow::duration).sum()
    }

    pub fn contains(&self, t: i64) -> bool {
        self.windows.iter().any(|w| w.contains(t))
    }

    /// Total overlapping time between both schedules.
    pub fn overlap(&self, other: &Self) -> i64 {
        self.windows
            .iter()
            .flat_map(|a| other.windows.iter().map(move |b| a.overlap(b)))
            .sum()
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.overlap(other) > 0
    }
}

impl fmt::Display for VisibilitySchedule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let windows: Vec<String> = self.windows.iter().map(|w| format!("{w}")).collect();
        write!(f, "{}", windows.join(" "))
    }
}
