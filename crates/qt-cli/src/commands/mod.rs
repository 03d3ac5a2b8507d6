pub mod dashboard;
pub mod history;
pub mod project;
pub mod reset;
pub mod run;
pub mod sample;
pub mod tool;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use qt_core::config::{Config, CredentialProvider};
use qt_core::lockfile::{LockError, WriterLock};
use qt_core::Memory;
use qt_intelligence::{LlmError, OpenAiProvider};

/// Resolved settings shared by every subcommand.
pub struct Context {
    pub config: Config,
    pub memory_path: PathBuf,
}

impl Context {
    pub fn new(config: Config, memory_path: PathBuf) -> Self {
        Self {
            config,
            memory_path,
        }
    }

    pub fn memory_path(&self) -> &Path {
        &self.memory_path
    }

    pub fn open_memory(&self) -> anyhow::Result<Memory> {
        Memory::open_path(&self.memory_path)
            .with_context(|| format!("failed to open memory at {}", self.memory_path.display()))
    }

    /// Take the single-writer lock before any mutating command.
    pub fn lock(&self, command: &str) -> anyhow::Result<WriterLock> {
        WriterLock::acquire(&self.memory_path, command).map_err(|e| match e {
            LockError::Held(holder) => anyhow::anyhow!(
                "another quartet process (pid {}, `{}`) is writing {}. Wait for it to finish.",
                holder.pid,
                holder.command,
                self.memory_path.display()
            ),
            other => anyhow::Error::new(other).context("failed to lock memory"),
        })
    }

    /// Chat-completion client for the configured endpoint. Fails when the
    /// API key env var is unset.
    pub fn provider(&self) -> anyhow::Result<OpenAiProvider> {
        let settings = &self.config.llm;
        let key = CredentialProvider::llm_api_key(settings)
            .ok_or_else(|| LlmError::MissingApiKey(settings.api_key_env.clone()))?;
        Ok(OpenAiProvider::from_settings(settings, key)?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Context over a fresh temp dir. Keep the `TempDir` alive for the test.
    pub fn context() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut config = Config::default();
        config.llm.api_key_env = "QUARTET_TEST_SURELY_UNSET_KEY".into();
        let ctx = Context::new(config, dir.path().join("four_agent_memory.json"));
        (dir, ctx)
    }
}
