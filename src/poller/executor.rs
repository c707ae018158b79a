use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs a released payload.
#[async_trait]
pub trait PayloadExecutor: Send + Sync {
    async fn execute(&self, payload: Bytes) -> anyhow::Result<()>;
}

/// Pipes the payload into an interpreter's stdin.
///
/// The payload is whatever the gate served, executed with no signature or
/// integrity check. Whoever controls the server, or the network path to it,
/// controls what runs here.
pub struct ScriptExecutor {
    interpreter: String,
    args: Vec<String>,
}

impl ScriptExecutor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl PayloadExecutor for ScriptExecutor {
    async fn execute(&self, payload: Bytes) -> anyhow::Result<()> {
        tracing::warn!(
            interpreter = %self.interpreter,
            bytes = payload.len(),
            "executing unverified payload from gate"
        );

        let mut child = Command::new(&self.interpreter)
            .args(&self.args)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start interpreter '{}'", self.interpreter))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .context("failed to hand payload to interpreter")?;
            // stdin closes here so the interpreter sees EOF
        }

        let status = child.wait().await.context("interpreter did not exit cleanly")?;
        if !status.success() {
            anyhow::bail!("payload exited with {}", status);
        }
        Ok(())
    }
}
