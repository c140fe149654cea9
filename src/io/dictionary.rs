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

use super::{InputError, IoSnafu, MalformedDictionarySnafu, UnknownEntitySnafu};
use lazy_static::lazy_static;
use regex::Regex;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

lazy_static! {
    static ref DIGITS: Regex = Regex::new(r"[0-9]+").unwrap();
}

/// Maps the display names of platforms, sensors and observable properties to the internal entity identifiers.
///
/// Each line of the dictionary reads `<InternalID>: <DisplayName>`, for example `Platform355: GOES-17`.
#[derive(Clone, Debug, Default)]
pub struct EntityDictionary {
    by_name: HashMap<String, String>,
}

impl EntityDictionary {
    /// Loads the dictionary, decoding bytes as latin-1 since the exporter does not write UTF-8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(IoSnafu { path })?;
        let text: String = bytes.iter().map(|&b| b as char).collect();
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, InputError> {
        let mut by_name = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (id, name) = line.split_once(':').context(MalformedDictionarySnafu {
                line_no: line_no + 1,
                line,
            })?;
            let (id, name) = (id.trim(), name.trim());
            ensure!(
                !id.is_empty() && !name.is_empty(),
                MalformedDictionarySnafu {
                    line_no: line_no + 1,
                    line,
                }
            );
            // First definition wins, later duplicates are exporter noise.
            by_name
                .entry(name.to_string())
                .or_insert_with(|| id.to_string());
        }
        Ok(Self { by_name })
    }

    /// Internal identifier of `name`, e.g. `Sensor742`.
    pub fn internal_id(&self, name: &str) -> Result<&str, InputError> {
        self.by_name
            .get(name)
            .map(String::as_str)
            .context(UnknownEntitySnafu { name })
    }

    /// Short identifier: `prefix` followed by the digits of the internal identifier, e.g. `s742`.
    pub fn short_id(&self, name: &str, prefix: &str) -> Result<String, InputError> {
        let internal = self.internal_id(name)?;
        let digits: String = DIGITS.find_iter(internal).map(|m| m.as_str()).collect();
        ensure!(!digits.is_empty(), UnknownEntitySnafu { name });
        Ok(format!("{prefix}{digits}"))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
