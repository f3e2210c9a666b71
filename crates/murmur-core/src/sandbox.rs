//! Sandboxed code execution via the public Piston API.
//!
//! Requests carry caller-set compile and run ceilings. Before anything goes
//! over the wire, the code is screened for a short list of obviously
//! destructive constructs; the screen is advisory only, the sandbox itself
//! is the boundary.

use serde::Deserialize;

use crate::constants::{PISTON_API_BASE, SANDBOX_COMPILE_TIMEOUT_MS, SANDBOX_RUN_TIMEOUT_MS};
use crate::error::{Error, Result};

/// Outcome of one sandboxed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    run: StageOutput,
    #[serde(default)]
    compile: Option<StageOutput>,
}

#[derive(Debug, Deserialize)]
struct StageOutput {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    code: Option<i32>,
}

/// Constructs we refuse to submit. Matching is case-insensitive.
const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf",
    ":(){",
    "mkfs",
    "shutdown",
    "reboot",
    "os.system",
    "subprocess.popen",
    "child_process",
];

/// Reject code containing a blocked pattern.
pub fn screen_code(code: &str) -> Result<()> {
    let lowered = code.to_lowercase();
    if let Some(pattern) = BLOCKED_PATTERNS.iter().find(|p| lowered.contains(**p)) {
        return Err(Error::InvalidInput(format!(
            "refusing to run code containing '{pattern}'"
        )));
    }
    Ok(())
}

pub struct SandboxClient {
    base_url: String,
    client: reqwest::Client,
}

impl SandboxClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, PISTON_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Screen, submit and normalize one execution.
    pub async fn execute(&self, code: &str, language: &str) -> Result<RunOutcome> {
        screen_code(code)?;

        let url = format!("{}/execute", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "language": language,
            "version": "*",
            "files": [{ "content": code }],
            "compile_timeout": SANDBOX_COMPILE_TIMEOUT_MS,
            "run_timeout": SANDBOX_RUN_TIMEOUT_MS,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let parsed: ExecuteResponse = response.json().await?;
        Ok(normalize(parsed))
    }
}

/// Collapse compile and run stages into a single outcome. A non-zero compile
/// stage short-circuits; otherwise the run stage decides.
fn normalize(response: ExecuteResponse) -> RunOutcome {
    if let Some(compile) = &response.compile {
        if compile.code.unwrap_or(0) != 0 {
            return RunOutcome {
                success: false,
                output: String::new(),
                error: Some(compile.stderr.clone()),
                exit_code: compile.code,
            };
        }
    }

    let run = &response.run;
    RunOutcome {
        success: run.code == Some(0),
        output: run.stdout.clone(),
        error: (!run.stderr.is_empty()).then(|| run.stderr.clone()),
        exit_code: run.code,
    }
}
