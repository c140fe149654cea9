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

use crate::mdp::{num_agents, Naming};
use crate::team::TeamIndex;
use snafu::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Agents tasked at each timestep, by display name.
pub type TeamingPlan = BTreeMap<i64, BTreeSet<String>>;

/// Name of the time variable in the state file.
pub const TIME_VAR: &str = "t";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AdversaryError {
    #[snafu(display("could not read {}: {source}", path.display()))]
    AdversaryIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{}:{line_no}: malformed transition `{line}`", path.display()))]
    MalformedTransition {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
    #[snafu(display("{}:{line_no}: malformed state `{line}`", path.display()))]
    MalformedStates {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
    #[snafu(display("state {state} is not in {}", path.display()))]
    UnknownState { state: usize, path: PathBuf },
    #[snafu(display("strategy in {} loops back to state {state}", path.display()))]
    CyclicStrategy { state: usize, path: PathBuf },
    #[snafu(display("strategies were exported without their state file {}", path.display()))]
    MissingStateFile { path: PathBuf },
}

/// One line of an exported strategy: `from choice to probability [action]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub from: usize,
    pub choice: usize,
    pub to: usize,
    pub probability: f64,
    pub action: Option<String>,
}

/// Transitions of an exported strategy, in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyFile {
    pub path: PathBuf,
    pub transitions: Vec<Transition>,
}

impl StrategyFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AdversaryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(AdversaryIoSnafu { path })?;
        Self::parse(&text, path)
    }

    /// Parses the transitions, skipping the `states choices transitions` header when present.
    pub fn parse(text: &str, path: &Path) -> Result<Self, AdversaryError> {
        let mut transitions = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() || (line_no == 0 && fields.len() == 3) {
                continue;
            }

            let malformed = || AdversaryError::MalformedTransition {
                path: path.to_path_buf(),
                line_no: line_no + 1,
                line: line.to_string(),
            };

            if fields.len() != 4 && fields.len() != 5 {
                return Err(malformed());
            }

            transitions.push(Transition {
                from: fields[0].parse().map_err(|_| malformed())?,
                choice: fields[1].parse().map_err(|_| malformed())?,
                to: fields[2].parse().map_err(|_| malformed())?,
                probability: fields[3].parse().map_err(|_| malformed())?,
                action: fields.get(4).map(|s| s.to_string()),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            transitions,
        })
    }

    /// Follows the most likely transition from the initial state.
    ///
    /// At each state, the transition of the first choice with the largest probability is taken (the first one in file
    /// order on ties). The walk stops when the state has no transition or when the selected transition carries no
    /// action label.
    pub fn most_likely_path(&self) -> Result<StrategyPath, AdversaryError> {
        let mut state = 0;
        let mut visited = HashSet::new();
        let mut steps = Vec::new();

        loop {
            let best = self
                .transitions
                .iter()
                .filter(|tr| tr.from == state && tr.choice == 0)
                .fold(None::<&Transition>, |best, tr| match best {
                    Some(b) if tr.probability <= b.probability => Some(b),
                    _ => Some(tr),
                });

            let Some(tr) = best else {
                break;
            };
            let Some(action) = &tr.action else {
                break;
            };

            ensure!(
                visited.insert(state),
                CyclicStrategySnafu {
                    state,
                    path: &self.path
                }
            );

            steps.push(PathStep {
                from: tr.from,
                to: tr.to,
                action: action.clone(),
                probability: tr.probability,
            });
            state = tr.to;
        }

        Ok(StrategyPath { steps })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathStep {
    pub from: usize,
    pub to: usize,
    pub action: String,
    pub probability: f64,
}

/// Most likely run of a strategy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyPath {
    pub steps: Vec<PathStep>,
}

impl StrategyPath {
    /// Product of the probabilities of every step.
    pub fn probability(&self) -> f64 {
        self.steps.iter().map(|s| s.probability).product()
    }

    /// Expected number of agents along the path: `sum_i R_i * prod_{j<i} p_j`.
    pub fn reward(&self) -> f64 {
        let mut reached = 1.0;
        let mut total = 0.0;
        for step in &self.steps {
            total += num_agents(&step.action) as f64 * reached;
            reached *= step.probability;
        }
        total
    }

    pub fn actions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.action.as_str()).collect()
    }
}

/// Exported state space: the variable names and the values of each state.
#[derive(Clone, Debug, PartialEq)]
pub struct StateFile {
    pub path: PathBuf,
    pub variables: Vec<String>,
    states: HashMap<usize, Vec<i64>>,
}

impl StateFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AdversaryError> {
        let path = path.as_ref();
        ensure!(path.exists(), MissingStateFileSnafu { path });
        let text = std::fs::read_to_string(path).context(AdversaryIoSnafu { path })?;
        Self::parse(&text, path)
    }

    /// Parses `(v1,v2,...)` followed by `index:(x1,x2,...)` lines. Booleans are read as 0 and 1.
    pub fn parse(text: &str, path: &Path) -> Result<Self, AdversaryError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let malformed = |line_no: usize, line: &str| AdversaryError::MalformedStates {
            path: path.to_path_buf(),
            line_no: line_no + 1,
            line: line.to_string(),
        };

        let (_, header) = lines.next().ok_or_else(|| malformed(0, ""))?;
        let variables: Vec<String> = unparenthesize(header)
            .split(',')
            .map(|v| v.trim().to_string())
            .collect();

        let mut states = HashMap::new();
        for (line_no, line) in lines {
            let (idx, values) = line.split_once(':').ok_or_else(|| malformed(line_no, line))?;
            let idx: usize = idx.trim().parse().map_err(|_| malformed(line_no, line))?;
            let values = unparenthesize(values)
                .split(',')
                .map(|v| match v.trim() {
                    "true" => Some(1),
                    "false" => Some(0),
                    other => other.parse().ok(),
                })
                .collect::<Option<Vec<i64>>>()
                .filter(|v| v.len() == variables.len())
                .ok_or_else(|| malformed(line_no, line))?;
            states.insert(idx, values);
        }

        Ok(Self {
            path: path.to_path_buf(),
            variables,
            states,
        })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Value of `var` in `state`, `None` if the variable does not exist.
    pub fn value(&self, state: usize, var: &str) -> Result<Option<i64>, AdversaryError> {
        let values = self.states.get(&state).context(UnknownStateSnafu {
            state,
            path: &self.path,
        })?;
        Ok(self
            .variables
            .iter()
            .position(|v| v == var)
            .map(|pos| values[pos]))
    }
}

fn unparenthesize(s: &str) -> &str {
    let s = s.trim();
    let s = s.strip_prefix('(').unwrap_or(s);
    s.strip_suffix(')').unwrap_or(s)
}

/// Maps the agent-sensor flags of the model back to the agents of the team.
#[derive(Clone, Debug, PartialEq)]
pub struct StateDecoder {
    flags: Vec<(String, String)>,
}

impl StateDecoder {
    pub fn new(index: &TeamIndex, naming: Naming) -> Self {
        let flags = index
            .cells()
            .into_iter()
            .map(|(a, s)| (naming.flag(index, a, s), index.agents()[a].name.clone()))
            .collect();
        Self { flags }
    }

    /// Agents switched on in `state`.
    pub fn active_agents(&self, states: &StateFile, state: usize) -> Result<BTreeSet<String>, AdversaryError> {
        let mut agents = BTreeSet::new();
        for (var, agent) in &self.flags {
            if states.value(state, var)?.unwrap_or(0) != 0 {
                agents.insert(agent.clone());
            }
        }
        Ok(agents)
    }

    /// Teaming plan of a path: for each step, the agents of the reached state keyed by the time of the left state.
    pub fn decode(&self, states: &StateFile, path: &StrategyPath) -> Result<TeamingPlan, AdversaryError> {
        let mut plan = TeamingPlan::new();
        for step in &path.steps {
            let t = states
                .value(step.from, TIME_VAR)?
                .ok_or_else(|| AdversaryError::MalformedStates {
                    path: states.path.clone(),
                    line_no: 1,
                    line: format!("no `{TIME_VAR}` in ({})", states.variables.join(",")),
                })?;
            plan.insert(t, self.active_agents(states, step.to)?);
        }
        Ok(plan)
    }
}

/// A recovered strategy, reduced to its probability, reward and plan.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategySummary {
    pub source: PathBuf,
    pub probability: f64,
    pub reward: f64,
    pub actions: Vec<String>,
    pub plan: TeamingPlan,
}

impl fmt::Display for StrategySummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "p = {:.6}, reward = {:.3} via {}",
            self.probability,
            self.reward,
            self.actions.join(" -> ")
        )
    }
}

/// Parses every strategy against the state file and keeps the first one of each `(probability, reward)` pair.
pub fn summarize_strategies(
    strategies: &[PathBuf],
    states: &Path,
    decoder: &StateDecoder,
) -> Result<Vec<StrategySummary>, AdversaryError> {
    if strategies.is_empty() {
        return Ok(Vec::new());
    }

    let state_file = StateFile::load(states)?;
    let mut seen = HashSet::new();
    let mut summaries = Vec::new();

    for source in strategies {
        let path = StrategyFile::load(source)?.most_likely_path()?;
        let probability = path.probability();
        let reward = path.reward();
        if !seen.insert((probability.to_bits(), reward.to_bits())) {
            trace!("{} duplicates an earlier strategy", source.display());
            continue;
        }

        let summary = StrategySummary {
            source: source.clone(),
            probability,
            reward,
            actions: path.actions().iter().map(|a| a.to_string()).collect(),
            plan: decoder.decode(&state_file, &path)?,
        };
        debug!("{}: {summary}", source.display());
        summaries.push(summary);
    }

    Ok(summaries)
}
