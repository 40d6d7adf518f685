use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::ArtifactKind;

/// Command-line arguments for the rs-triage tool.
///
/// Global options come first; the work itself is selected by a subcommand.
#[derive(Parser, Debug)]
#[clap(name = "rs-triage", version, about = "Cross-platform incident-response triage tool")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Continue even without elevated privileges
    #[clap(long, global = true)]
    pub force: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect host artifacts
    Collect(CollectOpts),

    /// Parse a Windows event log file
    #[clap(name = "parse-evtx")]
    ParseEvtx(ParseEvtxOpts),

    /// Write the default configuration as YAML
    InitConfig {
        /// Path to save the configuration file
        #[clap(default_value = "triage.yaml")]
        path: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
pub struct CollectOpts {
    /// Artifact kind to collect, repeatable (default: every kind)
    #[clap(short = 'k', long = "kind")]
    pub kinds: Vec<ArtifactKind>,

    /// SQLite database (default: database_path from the config)
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Do not persist collected records
    #[clap(long)]
    pub no_store: bool,

    /// Write collected records as JSON to this file
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

impl CollectOpts {
    /// Requested kinds, every kind when none was given
    pub fn selected_kinds(&self) -> Vec<ArtifactKind> {
        if self.kinds.is_empty() {
            ArtifactKind::ALL.to_vec()
        } else {
            self.kinds.clone()
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct ParseEvtxOpts {
    /// Event log file (.evtx)
    pub path: PathBuf,

    /// Parse a private copy instead of the file in place
    #[clap(long)]
    pub stage: bool,

    /// Also save the events to this SQLite database
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Write the events as JSON to this file instead of stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}
