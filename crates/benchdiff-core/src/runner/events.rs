//! Structured tool output (`go test -json`, as produced by `test2json`).

use serde::Deserialize;

/// Action of an event carrying printed output.
pub const ACTION_OUTPUT: &str = "output";

/// One structured record from the tool's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    #[serde(default)]
    pub time: Option<String>,
    pub action: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub elapsed: Option<f64>,
}

impl TestEvent {
    /// Decode one stdout line. Free text yields `None`.
    #[must_use]
    pub fn decode(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    /// The printed payload, for output events only.
    #[must_use]
    pub fn output_payload(&self) -> Option<&str> {
        if self.action == ACTION_OUTPUT {
            self.output.as_deref()
        } else {
            None
        }
    }
}

/// Joins output fragments back into whole lines.
///
/// The tool may emit a single printed line as several output events (a
/// benchmark's name is flushed before its timing columns), so payloads are
/// buffered until a newline arrives.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: String,
}

impl LineAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fragment, returning every line it completes (without the
    /// trailing newline).
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.pending.push_str(fragment);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let rest = self.pending.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.truncate(pos);
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Flush a trailing unterminated fragment, if any.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

/// Extract the printed lines from a structured stdout capture.
///
/// Lines that are not events, and events other than output, are skipped.
#[must_use]
pub fn output_lines(stdout: &str) -> Vec<String> {
    let mut assembler = LineAssembler::new();
    let mut lines = Vec::new();

    for raw in stdout.lines() {
        let Some(event) = TestEvent::decode(raw) else {
            tracing::trace!(line = raw, "skipping non-event line");
            continue;
        };
        if let Some(payload) = event.output_payload() {
            lines.extend(assembler.push(payload));
        }
    }
    lines.extend(assembler.finish());
    lines
}
