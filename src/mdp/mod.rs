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

use snafu::prelude::*;

/// Action labels and identifier naming.
pub mod action;
/// Enumeration of the feasible assignments.
pub mod assignment;
/// Textual encoding of the MDP.
pub mod encoder;
/// Exact probability expressions.
pub mod expr;
/// Outcome probabilities of each assignment.
pub mod outcomes;
/// Properties checked on the model.
pub mod property;

pub use action::{num_agents, Naming, NO_AGENTS};
pub use assignment::{Assignment, StateSpace};
pub use encoder::EncodedModel;
pub use expr::{Bindings, ProbExpr};
pub use outcomes::{OutcomeTable, ProbabilityModel};
pub use property::Objectives;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ModelError {
    #[snafu(display("no assignment detects every measurement at t = {timestep}"))]
    UnsatisfiableMission { timestep: i64 },
    #[snafu(display("{cells} feasible cells exceed the limit of {limit} assignments"))]
    StateSpaceTooLarge { cells: usize, limit: usize },
    #[snafu(display("{count} measurements exceed the limit of {limit}"))]
    TooManyMeasurements { count: usize, limit: usize },
    #[snafu(display("constant P{k} has no value"))]
    UnboundParameter { k: usize },
}
