//! Shared value types handed to and returned from chained operations

use bollard::container::LogOutput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition a wait operation blocks on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    /// Container is not running (created or exited)
    #[default]
    NotRunning,
    /// Next time the container exits
    NextExit,
    /// Container has been removed
    Removed,
}

impl WaitCondition {
    /// Wire value understood by the engine
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitCondition::NotRunning => "not-running",
            WaitCondition::NextExit => "next-exit",
            WaitCondition::Removed => "removed",
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log frames collected from a container's log stream
#[derive(Debug, Clone, Default)]
pub struct ContainerLogs {
    frames: Vec<LogOutput>,
}

impl ContainerLogs {
    pub fn new(frames: Vec<LogOutput>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[LogOutput] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Concatenated stdout frames
    pub fn stdout(&self) -> String {
        self.collect(|frame| matches!(frame, LogOutput::StdOut { .. }))
    }

    /// Concatenated stderr frames
    pub fn stderr(&self) -> String {
        self.collect(|frame| matches!(frame, LogOutput::StdErr { .. }))
    }

    fn collect(&self, keep: impl Fn(&LogOutput) -> bool) -> String {
        self.frames
            .iter()
            .filter(|frame| keep(frame))
            .map(frame_text)
            .collect()
    }
}

impl fmt::Display for ContainerLogs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            f.write_str(&frame_text(frame))?;
        }
        Ok(())
    }
}

fn frame_text(frame: &LogOutput) -> String {
    let message = match frame {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => message,
    };
    String::from_utf8_lossy(message).into_owned()
}
