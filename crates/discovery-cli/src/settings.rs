//! Command-line settings: flags layered over an optional TOML file

use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::ArgMatches;
use discovery_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_DATA_DIR: &str = ".discovery";

/// Shape of the `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) engine: EngineConfig,
}

impl FileConfig {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid config file")
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&raw)
    }
}

#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) data_dir: PathBuf,
    pub(crate) engine: EngineConfig,
}

impl Settings {
    /// An explicit `--data-dir` wins over the file, which wins over the default
    pub(crate) fn resolve(matches: &ArgMatches) -> Result<Self> {
        let file = match matches.get_one::<PathBuf>("config") {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        let flag = matches.get_one::<PathBuf>("data-dir").cloned();
        let explicit = matches.value_source("data-dir") == Some(ValueSource::CommandLine);
        let data_dir = match (explicit, file.data_dir) {
            (false, Some(dir)) => dir,
            _ => flag.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        };
        Ok(Self {
            data_dir,
            engine: file.engine,
        })
    }
}
