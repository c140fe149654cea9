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

use super::action::Naming;
use super::assignment::Assignment;
use super::expr::ProbExpr;
use super::outcomes::{Outcome, ProbabilityModel};
use super::property::{AGENT_REWARD, ALL_MEASURED};
use crate::team::{TeamIndex, VisibilitySchedule};
use std::collections::BTreeSet;
use std::fmt;

/// Name of the module holding the state of the team.
pub const MODULE_NAME: &str = "KG";

/// One guarded command: the assignment it applies, the visibility guard and the weighted outcomes.
#[derive(Clone, Debug, PartialEq)]
pub struct Command<'a> {
    pub assignment: &'a Assignment,
    /// Schedules of the active sensors, all of which must contain the current time.
    pub guard: BTreeSet<&'a VisibilitySchedule>,
    pub outcomes: &'a [(Outcome, ProbExpr)],
}

/// MDP of one planning window in positional indices, ready to be rendered.
#[derive(Clone, Debug)]
pub struct EncodedModel<'a> {
    index: &'a TeamIndex,
    model: &'a ProbabilityModel,
    start: i64,
    final_time: i64,
    commands: Vec<Command<'a>>,
}

impl<'a> EncodedModel<'a> {
    /// Builds the commands of every retained assignment, for time running from `start` up to `final_time`.
    pub fn new(index: &'a TeamIndex, model: &'a ProbabilityModel, start: i64, final_time: i64) -> Self {
        let commands = model
            .retained()
            .iter()
            .filter_map(|assignment| {
                let table = model.table(assignment)?;
                Some(Command {
                    assignment,
                    guard: assignment
                        .cells()
                        .iter()
                        .map(|&(_, s)| index.schedule(s))
                        .collect(),
                    outcomes: &table.outcomes,
                })
            })
            .collect();

        Self {
            index,
            model,
            start,
            final_time,
            commands,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn final_time(&self) -> i64 {
        self.final_time
    }

    pub fn commands(&self) -> &[Command<'a>] {
        &self.commands
    }

    /// Action label and reward of every command.
    pub fn rewards(&self, naming: Naming) -> Vec<(String, usize)> {
        self.commands
            .iter()
            .map(|cmd| {
                (
                    naming.action(self.index, cmd.assignment),
                    cmd.assignment.num_agents(),
                )
            })
            .collect()
    }

    /// Renders the model in the input language of the checker.
    pub fn render(&self, naming: Naming) -> String {
        format!("{}", Prism { model: self, naming })
    }

    fn initially_on(&self, sensor: usize) -> bool {
        self.index.schedule(sensor).contains(self.start)
    }
}

struct Prism<'m, 'a> {
    model: &'m EncodedModel<'a>,
    naming: Naming,
}

impl Prism<'_, '_> {
    fn write_guard(&self, f: &mut fmt::Formatter, guard: &BTreeSet<&VisibilitySchedule>) -> fmt::Result {
        for schedule in guard {
            let windows: Vec<String> = schedule
                .windows()
                .iter()
                .map(|w| format!("((t >= {}) & (t < {}))", w.start, w.end))
                .collect();
            if windows.len() == 1 {
                write!(f, "{} & ", windows[0])?;
            } else {
                write!(f, "({}) & ", windows.join(" | "))?;
            }
        }
        write!(f, "t < finalTime")
    }

    fn write_update(&self, f: &mut fmt::Formatter, assignment: &Assignment, outcome: &Outcome) -> fmt::Result {
        let index = self.model.index;
        for (a, s) in index.cells() {
            let value = u8::from(assignment.is_active(a, s));
            write!(f, "({}' = {value}) & ", self.naming.flag(index, a, s))?;
        }
        for (m, detected) in outcome.iter().enumerate() {
            let value = u8::from(*detected);
            write!(f, "({}' = {value}) & ", self.naming.measurement(index, m))?;
        }
        write!(f, "(t' = t+1)")
    }
}

impl fmt::Display for Prism<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let model = self.model;
        let index = model.index;

        let relation: Vec<String> = index
            .relation_as()
            .iter()
            .map(|row| {
                let cells: Vec<&str> = row.iter().map(|&on| if on { "1" } else { "0" }).collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        let detection: Vec<String> = index
            .detection()
            .iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .map(|p| p.map_or_else(|| "0".to_string(), |p| format!("{p}")))
                    .collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        writeln!(f, "// agent-sensor relation: [{}]", relation.join(", "))?;
        writeln!(f, "// measurement-sensor detection: [{}]", detection.join(", "))?;
        writeln!(f, "mdp")?;
        writeln!(f)?;

        for (k, p) in model.model.bindings().iter() {
            writeln!(f, "const double P{k} = {p:?};")?;
        }
        writeln!(f, "const int finalTime = {};", model.final_time)?;
        writeln!(f)?;

        if index.num_measurements() == 0 {
            writeln!(f, "formula {ALL_MEASURED} = true;")?;
        } else {
            let all: Vec<String> = (0..index.num_measurements())
                .map(|m| format!("{}=1", self.naming.measurement(index, m)))
                .collect();
            writeln!(f, "formula {ALL_MEASURED} = ({});", all.join(" & "))?;
        }
        writeln!(f)?;

        writeln!(f, "module {MODULE_NAME}")?;
        for (a, s) in index.cells() {
            writeln!(
                f,
                "    {} : [0..1] init {};",
                self.naming.flag(index, a, s),
                u8::from(model.initially_on(s))
            )?;
        }
        for m in 0..index.num_measurements() {
            writeln!(f, "    {} : [0..1] init 1;", self.naming.measurement(index, m))?;
        }
        writeln!(f, "    t : [{}..finalTime] init {};", model.start, model.start)?;
        writeln!(f)?;

        for cmd in &model.commands {
            write!(f, "    [{}] ", self.naming.action(index, cmd.assignment))?;
            self.write_guard(f, &cmd.guard)?;
            writeln!(f, " ->")?;
            for (i, (outcome, p)) in cmd.outcomes.iter().enumerate() {
                if i == 0 {
                    write!(f, "        {p} : ")?;
                } else {
                    write!(f, "      + {p} : ")?;
                }
                self.write_update(f, cmd.assignment, outcome)?;
                if i + 1 == cmd.outcomes.len() {
                    writeln!(f, ";")?;
                } else {
                    writeln!(f)?;
                }
            }
        }
        writeln!(f, "endmodule")?;
        writeln!(f)?;

        writeln!(f, "rewards \"{AGENT_REWARD}\"")?;
        for (label, reward) in model.rewards(self.naming) {
            writeln!(f, "    [{label}] true : {reward};")?;
        }
        writeln!(f, "endrewards")
    }
}
