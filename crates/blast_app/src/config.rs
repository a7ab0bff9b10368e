//! Run configuration: defaults, then an optional RON file, then command-line
//! flags, each layer overriding the one before.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use blast_core::{PollPolicy, UnknownStatePolicy};
use blast_engine::ServiceSettings;
use blast_logging::blast_debug;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::logging::LogDestination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownState {
    #[default]
    KeepPolling,
    Fail,
}

impl From<UnknownState> for UnknownStatePolicy {
    fn from(value: UnknownState) -> Self {
        match value {
            UnknownState::KeepPolling => UnknownStatePolicy::KeepPolling,
            UnknownState::Fail => UnknownStatePolicy::Fail,
        }
    }
}

/// On-disk form of the configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: String,
    pub email: String,
    pub program: String,
    pub database: String,
    pub stype: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub max_wait_secs: Option<u64>,
    pub max_consecutive_errors: u32,
    pub unknown_state: UnknownState,
    pub output_dir: PathBuf,
    pub log: LogDestination,
}

impl Default for FileConfig {
    fn default() -> Self {
        let service = ServiceSettings::default();
        let poll = PollPolicy::default();
        Self {
            base_url: service.base_url,
            email: service.email,
            program: service.program,
            database: service.database,
            stype: service.stype,
            connect_timeout_secs: service.connect_timeout.as_secs(),
            request_timeout_secs: service.request_timeout.as_secs(),
            poll_interval_secs: poll.interval.as_secs(),
            max_wait_secs: poll.max_wait.map(|wait| wait.as_secs()),
            max_consecutive_errors: poll.max_consecutive_errors,
            unknown_state: UnknownState::KeepPolling,
            output_dir: PathBuf::from("."),
            log: LogDestination::Terminal,
        }
    }
}

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub poll: PollPolicy,
    pub output_dir: PathBuf,
    pub log: LogDestination,
}

impl FileConfig {
    /// Reads `path` if given, otherwise starts from defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = ron::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        blast_debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies the flags that were given on the command line.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(email) = &cli.email {
            self.email = email.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(secs) = cli.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = cli.max_wait_secs {
            self.max_wait_secs = Some(secs);
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
        self
    }

    pub fn resolve(self) -> anyhow::Result<AppConfig> {
        let email = self.email.trim().to_string();
        if email.is_empty() {
            bail!("a contact e-mail is required: pass --email or set `email` in the config file");
        }
        if !email.contains('@') {
            bail!("`{email}` is not an e-mail address");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll interval must be at least one second");
        }

        Ok(AppConfig {
            service: ServiceSettings {
                base_url: self.base_url,
                program: self.program,
                database: self.database,
                stype: self.stype,
                email,
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            poll: PollPolicy {
                interval: Duration::from_secs(self.poll_interval_secs),
                max_wait: self.max_wait_secs.map(Duration::from_secs),
                max_consecutive_errors: self.max_consecutive_errors,
                unknown_state: self.unknown_state.into(),
            },
            output_dir: self.output_dir,
            log: self.log,
        })
    }
}
