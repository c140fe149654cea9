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

use crate::adversary::TeamingPlan;
use crate::pareto::ParetoFrontier;
use itertools::Itertools;
use serde_derive::Serialize;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExportError {
    #[snafu(display("could not write frontier to {}: {source}", path.display()))]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Serialize)]
struct FrontierRecord {
    agents: u32,
    probability: f64,
    raised: bool,
    plan: String,
}

/// Renders a teaming plan as `t0: Aqua, Terra; t2: GOES-17`, skipping idle timesteps.
pub fn plan_to_string(plan: &TeamingPlan) -> String {
    plan.iter()
        .filter(|(_, agents)| !agents.is_empty())
        .map(|(t, agents)| format!("t{t}: {}", agents.iter().join(", ")))
        .join("; ")
}

/// Writes one row per agent count of the frontier.
pub fn to_csv<P: AsRef<Path>>(frontier: &ParetoFrontier, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path).context(CsvSnafu { path })?;
    for fp in &frontier.points {
        wtr.serialize(FrontierRecord {
            agents: fp.point.agents,
            probability: fp.point.probability,
            raised: fp.raised,
            plan: plan_to_string(&fp.plan),
        })
        .context(CsvSnafu { path })?;
    }
    wtr.flush()
        .map_err(csv::Error::from)
        .context(CsvSnafu { path })?;
    info!("frontier written to {}", path.display());
    Ok(())
}
