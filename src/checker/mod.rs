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

use crate::io::ConfigRepr;
use crate::team::natural_cmp;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration as StdDuration, Instant as StdInstant};
use typed_builder::TypedBuilder;

/// Parsing of the checker log.
pub mod output;

pub use output::CheckerResult;

/// File names used in the scratch directory of a model check.
pub const MODEL_FILE: &str = "model.prism";
pub const PROPERTY_FILE: &str = "property.props";
pub const LOG_FILE: &str = "checker.log";
pub const STRATEGY_FILE: &str = "adv.tra";
pub const STATES_FILE: &str = "prod.sta";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CheckerError {
    #[snafu(display("could not launch {}: {source}", binary.display()))]
    CheckerLaunch {
        binary: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    CheckerIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("model checker produced no result, see {}", log.display()))]
    CheckerExecution { log: PathBuf },
    #[snafu(display("model checker killed after {seconds} s, see {}", log.display()))]
    CheckerTimeout { seconds: f64, log: PathBuf },
    #[snafu(display("cannot parse `{line}` in {}", log.display()))]
    MalformedResult { line: String, log: PathBuf },
}

/// Files left by a model check in its working directory.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckerArtifacts {
    pub log: PathBuf,
    /// Every exported strategy, in natural order of file name.
    pub strategies: Vec<PathBuf>,
    pub states: PathBuf,
}

impl CheckerArtifacts {
    /// Gathers the artifacts present in `workdir`.
    pub fn collect(workdir: &Path) -> Result<Self, CheckerError> {
        let mut strategies: Vec<PathBuf> = std::fs::read_dir(workdir)
            .context(CheckerIoSnafu { path: workdir })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "tra"))
            .collect();
        strategies.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

        Ok(Self {
            log: workdir.join(LOG_FILE),
            strategies,
            states: workdir.join(STATES_FILE),
        })
    }

    pub fn result(&self) -> Result<CheckerResult, CheckerError> {
        CheckerResult::from_log(&self.log)
    }
}

/// A probabilistic model checker able to export its optimal strategies.
pub trait ModelChecker: Send + Sync {
    /// Checks the property file on the model file. Every artifact, the log included, is written to `workdir`.
    fn check(&self, model: &Path, property: &Path, workdir: &Path) -> Result<CheckerArtifacts, CheckerError>;
}

/// Settings of the PRISM command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct PrismConfig {
    /// Path to the `prism` launcher.
    #[builder(default = PathBuf::from("prism"), setter(into))]
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    #[builder(default = "4g".to_string(), setter(into))]
    #[serde(default = "default_mem")]
    pub cudd_max_mem: String,
    #[builder(default = "4g".to_string(), setter(into))]
    #[serde(default = "default_mem")]
    pub java_max_mem: String,
    /// Kill the checker after this many seconds. Unset means no limit.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub timeout_s: Option<f64>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("prism")
}

fn default_mem() -> String {
    "4g".to_string()
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for PrismConfig {}

/// Runs the PRISM command line, one process per check.
#[derive(Clone, Debug, Default)]
pub struct PrismCli {
    pub cfg: PrismConfig,
}

impl PrismCli {
    pub fn new(cfg: PrismConfig) -> Self {
        Self { cfg }
    }

    fn wait(&self, child: &mut std::process::Child, log: &Path) -> Result<ExitStatus, CheckerError> {
        let io_err = |source| CheckerError::CheckerIo {
            path: log.to_path_buf(),
            source,
        };

        let Some(seconds) = self.cfg.timeout_s else {
            return child.wait().map_err(io_err);
        };

        let limit = StdDuration::from_secs_f64(seconds);
        let start = StdInstant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                return Ok(status);
            }
            if start.elapsed() > limit {
                warn!("killing {} after {seconds} s", self.cfg.binary.display());
                // The process may have exited in between
                let _ = child.kill();
                child.wait().map_err(io_err)?;
                return CheckerTimeoutSnafu { seconds, log }.fail();
            }
            std::thread::sleep(StdDuration::from_millis(50));
        }
    }
}

impl ModelChecker for PrismCli {
    fn check(&self, model: &Path, property: &Path, workdir: &Path) -> Result<CheckerArtifacts, CheckerError> {
        let log = workdir.join(LOG_FILE);
        let stdout = File::create(&log).context(CheckerIoSnafu { path: &log })?;
        let stderr = stdout.try_clone().context(CheckerIoSnafu { path: &log })?;

        let mut cmd = Command::new(&self.cfg.binary);
        cmd.arg("-cuddmaxmem")
            .arg(&self.cfg.cudd_max_mem)
            .arg("-javamaxmem")
            .arg(&self.cfg.java_max_mem)
            .arg(model)
            .arg("-pctl")
            .arg(std::fs::read_to_string(property).context(CheckerIoSnafu { path: property })?.trim())
            .arg("-exportadvmdp")
            .arg(workdir.join(STRATEGY_FILE))
            .arg("-exportprodstates")
            .arg(workdir.join(STATES_FILE))
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        debug!("running {cmd:?}");
        let mut child = cmd.spawn().context(CheckerLaunchSnafu {
            binary: &self.cfg.binary,
        })?;

        let status = self.wait(&mut child, &log)?;
        if !status.success() {
            warn!("{} exited with {status}, see {}", self.cfg.binary.display(), log.display());
        }

        CheckerArtifacts::collect(workdir)
    }
}
