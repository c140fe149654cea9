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

use super::{CheckerError, CheckerExecutionSnafu, CheckerIoSnafu, MalformedResultSnafu};
use lazy_static::lazy_static;
use regex::Regex;
use snafu::prelude::*;
use std::path::Path;

lazy_static! {
    static ref PAIR: Regex =
        Regex::new(r"\(\s*([-+0-9.eE]+|NaN|Infinity)\s*,\s*([-+0-9.eE]+|NaN|Infinity)\s*\)").unwrap();
}

/// Marker of the line holding the value of the checked property.
pub const RESULT_MARKER: &str = "Result:";

/// Value of the checked property as reported in the checker log.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckerResult {
    /// Pareto points of a multi-objective query, as `(probability, reward)`.
    Pareto(Vec<(f64, f64)>),
    /// Optimal value of a single-objective query.
    Scalar(f64),
}

impl CheckerResult {
    pub fn from_log<P: AsRef<Path>>(log: P) -> Result<Self, CheckerError> {
        let log = log.as_ref();
        let text = std::fs::read_to_string(log).context(CheckerIoSnafu { path: log })?;
        Self::parse(&text, log)
    }

    /// Finds the first `Result:` line and parses either its list of tuples or its leading number.
    pub fn parse(text: &str, log: &Path) -> Result<Self, CheckerError> {
        let line = text
            .lines()
            .find(|line| line.contains(RESULT_MARKER))
            .context(CheckerExecutionSnafu { log })?;

        let (_, value) = line.split_once(RESULT_MARKER).context(CheckerExecutionSnafu { log })?;
        let value = value.trim();

        if value.starts_with('[') {
            let list = value.split(']').next().unwrap_or(value);
            let mut points = Vec::new();
            for cap in PAIR.captures_iter(list) {
                let p = parse_number(&cap[1]).context(MalformedResultSnafu { line, log })?;
                let r = parse_number(&cap[2]).context(MalformedResultSnafu { line, log })?;
                points.push((p, r));
            }
            Ok(Self::Pareto(points))
        } else {
            let first = value.split_whitespace().next().unwrap_or_default();
            let scalar = parse_number(first).context(MalformedResultSnafu { line, log })?;
            Ok(Self::Scalar(scalar))
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    match s {
        "true" => Some(1.0),
        "false" => Some(0.0),
        _ => s.parse().ok().filter(|v: &f64| v.is_finite()),
    }
}
