use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde_json::Value as JsonValue;

use super::loader::ERROR_KEY;

/// Default converter: a Python script printing the archive as JSON.
pub const DEFAULT_CONVERTER: &str = "python3 scripts/npz_to_json.py";

// ---------------------------------------------------------------------------
// External archive converter
// ---------------------------------------------------------------------------

/// Command that turns a binary array archive into JSON on stdout.
///
/// Invoked as `<program> <args...> <archive path>`. One blocking call per
/// import; no retries or timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    program: String,
    args: Vec<String>,
}

impl Converter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Converter {
            program: program.into(),
            args,
        }
    }

    /// Build from a whitespace-separated command line.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().context("empty converter command")?;
        Ok(Converter::new(program, parts.collect()))
    }

    /// Run the converter on `archive` and parse its output.
    pub fn convert(&self, archive: &Path) -> Result<JsonValue> {
        log::info!("converting {} with {}", archive.display(), self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(archive)
            .output()
            .with_context(|| format!("spawning converter {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("converter exited with {}: {}", output.status, stderr.trim());
        }

        let value: JsonValue =
            serde_json::from_slice(&output.stdout).context("parsing converter output")?;
        if let Some(err) = value.get(ERROR_KEY) {
            let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            bail!("converter error: {msg}");
        }
        Ok(value)
    }
}

impl Default for Converter {
    fn default() -> Self {
        // DEFAULT_CONVERTER is a non-empty literal.
        let mut parts = DEFAULT_CONVERTER.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Converter::new(program, parts.collect())
    }
}
