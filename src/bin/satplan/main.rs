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

extern crate clap;
extern crate log;
extern crate pretty_env_logger;
extern crate satplan;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use log::{error, info};
use satplan::io::export::to_csv;
use satplan::io::{AccessIntervals, ConfigRepr, EntityDictionary, Mission};
use satplan::planner::index_mission;
use satplan::{MissionPlanner, PlannerConfig, PlanningError, PrismCli, Team};
use std::env::{set_var, var};
use std::path::PathBuf;

const LOG_VAR: &str = "SATPLAN_LOG";

fn cli() -> Command {
    Command::new("satplan")
        .version(crate_version!())
        .about("Pareto-optimal satellite teaming plans through probabilistic model checking.")
        .arg(
            Arg::new("team")
                .long("team")
                .required(true)
                .value_name("YAML")
                .value_parser(value_parser!(PathBuf))
                .help("Candidate team: agents, sensors and detection probabilities"),
        )
        .arg(
            Arg::new("mission")
                .long("mission")
                .required(true)
                .value_name("JSON")
                .value_parser(value_parser!(PathBuf))
                .help("Mission document with the observation window and target"),
        )
        .arg(
            Arg::new("access")
                .long("access")
                .required(true)
                .value_name("JSON")
                .value_parser(value_parser!(PathBuf))
                .help("Access intervals of every agent and sensor over the target"),
        )
        .arg(
            Arg::new("dict")
                .long("dict")
                .required(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Entity dictionary mapping internal identifiers to names"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("YAML")
                .value_parser(value_parser!(PathBuf))
                .help("Planner configuration, defaults are used when absent"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("CSV")
                .value_parser(value_parser!(PathBuf))
                .help("Write the frontier to this CSV file"),
        )
        .arg(
            Arg::new("encode-only")
                .long("encode-only")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("output")
                .action(ArgAction::Set)
                .help("Only write the models and properties to DIR, without running the checker"),
        )
}

fn run() -> Result<(), PlanningError> {
    let matches = cli().get_matches();
    let path = |id: &str| matches.get_one::<PathBuf>(id).cloned();

    let cfg = match path("config") {
        Some(cfg_path) => {
            info!("Loading configuration from {}", cfg_path.display());
            PlannerConfig::load(cfg_path)?
        }
        None => PlannerConfig::default(),
    };

    // Required arguments are enforced by clap
    let team = Team::load(path("team").unwrap_or_default())?;
    let mission = Mission::from_json(path("mission").unwrap_or_default())?;
    let access = AccessIntervals::from_json(path("access").unwrap_or_default())?;
    let dictionary = EntityDictionary::load(path("dict").unwrap_or_default())?;

    info!(
        "{} agents, mission over {} from {} to {}",
        team.agents().len(),
        mission.target,
        mission.start,
        mission.end
    );

    let (index, horizon) = index_mission(&team, &mission, &access, &dictionary, &cfg)?;
    let planner = MissionPlanner::new(cfg.clone(), PrismCli::new(cfg.checker.clone()));

    if let Some(out_dir) = path("encode-only") {
        let models = planner.encode_only(&index, horizon, &out_dir)?;
        info!("{} models written to {}", models.len(), out_dir.display());
        return Ok(());
    }

    let report = planner.plan(&index, horizon)?;
    info!("Pareto-optimal teaming plans:\n{}", report.frontier);

    if let Some(csv_path) = path("output") {
        to_csv(&report.frontier, csv_path)?;
    }

    Ok(())
}

fn main() {
    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }

    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
