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

/*! # satplan

Plans which Earth-observing satellites to task over a mission horizon so that every required measurement of a target
is collected with the highest probability, using as few satellites as possible.

Each planning window is encoded as a Markov decision process in the PRISM language, checked with a probabilistic
model checker, and the checker's optimal strategies are decoded back into teaming plans. The per-timestep Pareto
fronts of (success probability, number of agents) are then combined into a mission-wide frontier.
*/

/// Optimal strategies exported by the model checker, decoded into teaming plans.
pub mod adversary;

/// Invocation of the external model checker and parsing of its results.
pub mod checker;

mod errors;
/// Planning will (almost) never panic and functions which may fail will return an error.
pub use self::errors::PlanningError;

/// Mission, access and dictionary inputs, configuration loading and frontier export.
pub mod io;

/// State space, probability model and PRISM encoding of a planning window.
pub mod mdp;

/// Combination of per-timestep fronts into the mission frontier.
pub mod pareto;

/// Parallel per-timestep planning.
pub mod planner;

/// Team description, visibility and canonical indexing.
pub mod team;

#[macro_use]
extern crate log;
extern crate hifitime;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export some useful things
pub use self::checker::{ModelChecker, PrismCli, PrismConfig};
pub use self::pareto::{ParetoFrontier, ParetoPoint};
pub use self::planner::{MissionPlanner, PlanReport, PlannerConfig};
pub use self::team::{Team, TeamIndex};
