//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command with extra environment variables and an optional timeout
    async fn run_command(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<Output>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for RealExecutor {
    async fn run_command(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command(program, args, envs, timeout).await
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
    }

    impl CommandCall {
        /// Value of an `--name=value` style argument
        pub fn flag_value(&self, name: &str) -> Option<&str> {
            let prefix = format!("{}=", name);
            self.args
                .iter()
                .find_map(|a| a.strip_prefix(prefix.as_str()))
        }

        pub fn env(&self, key: &str) -> Option<&str> {
            self.envs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Configured responses by program name
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Content written to the `--result-file` argument on success
        result_file_content: Arc<Mutex<Option<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// On success, write `content` to the path given by `--result-file=`,
        /// imitating a dump tool
        pub fn writing_result_file(self, content: &str) -> Self {
            *self.result_file_content.lock().unwrap() = Some(content.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.program == program)
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn get_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run_command(
            &self,
            program: &str,
            args: &[String],
            envs: &[(String, String)],
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            let call = CommandCall {
                program: program.to_string(),
                args: args.to_vec(),
                envs: envs.to_vec(),
            };
            let result_file = call.flag_value("--result-file").map(PathBuf::from);
            self.calls.lock().unwrap().push(call);

            match self.get_response(program) {
                MockResponse::Success { stdout, stderr } => {
                    let content = self.result_file_content.lock().unwrap().clone();
                    if let (Some(path), Some(content)) = (result_file, content) {
                        std::fs::write(path, content)?;
                    }
                    Ok(Output {
                        status: std::process::ExitStatus::default(),
                        stdout: stdout.into_bytes(),
                        stderr: stderr.into_bytes(),
                    })
                }
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", Some(exit_code), stderr)
                }
                MockResponse::Timeout => {
                    anyhow::bail!("Command timed out")
                }
            }
        }
    }
}
