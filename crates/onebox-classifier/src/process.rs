//! Classifier backed by an external command.
//!
//! The command receives the email text on stdin and must print one JSON
//! object `{"category": .., "confidence": .., "error": ..}` on stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use onebox_core::Classification;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Classifier, ClassifierError, ClassifierResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ClassifierOutput {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    error: Option<String>,
}

impl ProcessClassifier {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse a whitespace-separated command line. `None` when blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    /// Built from `ONEBOX_CLASSIFIER_CMD` when set.
    pub fn from_env() -> Option<Self> {
        std::env::var("ONEBOX_CLASSIFIER_CMD")
            .ok()
            .and_then(|command| Self::from_command_line(&command))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, text: &str) -> ClassifierResult<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClassifierError::Spawn(format!("{}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClassifierError::Io("stdin not captured".to_string()))?;
        let input = text.to_owned();
        let feed = async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                // The command may exit without reading everything.
                debug!(error = %e, "Classifier closed stdin early");
            }
            drop(stdin);
        };

        let (_, output) = tokio::join!(feed, child.wait_with_output());
        output.map_err(|e| ClassifierError::Io(e.to_string()))
    }
}

fn parse_output(stdout: &[u8]) -> ClassifierResult<Classification> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ClassifierError::Decode("no output".to_string()))?;

    let output: ClassifierOutput =
        serde_json::from_str(line).map_err(|e| ClassifierError::Decode(format!("{e}: {line}")))?;

    if let Some(error) = output.error {
        return Err(ClassifierError::Reported(error));
    }
    let category = output
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ClassifierError::Decode(format!("missing category: {line}")))?;

    let mut classification = Classification::new(category);
    classification.confidence = output.confidence;
    Ok(classification)
}

#[async_trait]
impl Classifier for ProcessClassifier {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn classify(&self, text: &str) -> ClassifierResult<Classification> {
        let output = tokio::time::timeout(self.timeout, self.run(text))
            .await
            .map_err(|_| ClassifierError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(ClassifierError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let classification = parse_output(&output.stdout)?;
        debug!(category = %classification.category, "Email classified");
        Ok(classification)
    }
}
