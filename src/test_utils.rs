//! Helpers shared by unit tests

#![cfg(test)]

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::collectors::command::{CommandOutput, CommandRunner};
use crate::collectors::platforms::Platform;
use crate::config::TriageConfig;
use crate::constants::test::{TEST_NOW, TEST_USER};
use crate::constants::TIMESTAMP_FORMAT;
use crate::context::CollectionContext;
use crate::error::{Result, TriageError};

pub fn fixed_now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str(TEST_NOW, TIMESTAMP_FORMAT).unwrap()
}

/// Runner answering by program name; unknown programs are not found
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: HashMap<String, CommandOutput>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, program: &str, stdout: &str) -> Self {
        self.outputs.insert(program.to_string(), CommandOutput::ok(stdout));
        self
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, _args: &[&str]) -> Result<CommandOutput> {
        self.outputs
            .get(program)
            .cloned()
            .ok_or_else(|| TriageError::NotFound(format!("command `{}`", program)))
    }
}

/// Context for a simulated platform with a fixed clock and identity
pub fn context_for(platform: Platform, home: &Path, runner: ScriptedRunner) -> CollectionContext {
    CollectionContext::new(TriageConfig::default())
        .with_platform(platform)
        .with_runner(Arc::new(runner))
        .with_identity(TEST_USER, home, "/bin/bash")
        .with_now(fixed_now())
}
