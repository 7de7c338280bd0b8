// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Deserialize;

#[derive(ValueEnum, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Print nothing.
    Silent,
    /// Print progress and errors.
    #[default]
    Normal,
    /// Print progress, errors, and details.
    Verbose,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Verbosity::Silent => write!(f, "silent"),
            Verbosity::Normal => write!(f, "normal"),
            Verbosity::Verbose => write!(f, "verbose"),
        }
    }
}

/// Where feedback for the user goes.
pub trait Reporter {
    /// A progress message.
    fn progress(&mut self, message: &str);

    /// Extra detail, interesting only when the user asks for it.
    fn detail(&mut self, message: &str);

    /// Something went wrong.
    fn error(&mut self, message: &str);
}

/// Prints to the terminal according to a verbosity level.
pub struct ConsoleReporter {
    verbosity: Verbosity,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Reporter for ConsoleReporter {
    fn progress(&mut self, message: &str) {
        if self.verbosity != Verbosity::Silent {
            println!("{message}");
        }
    }

    fn detail(&mut self, message: &str) {
        if self.verbosity == Verbosity::Verbose {
            println!("{message}");
        }
    }

    fn error(&mut self, message: &str) {
        if self.verbosity != Verbosity::Silent {
            eprintln!("{message}");
        }
    }
}

/// Discards everything.
#[allow(dead_code)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn progress(&mut self, _message: &str) {}

    fn detail(&mut self, _message: &str) {}

    fn error(&mut self, _message: &str) {}
}

/// Remembers every message, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingReporter {
    pub progress: Vec<String>,
    pub details: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
    }

    fn detail(&mut self, message: &str) {
        self.details.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_verbosity() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
        assert_eq!(Verbosity::Verbose.to_string(), "verbose");
    }

    #[test]
    fn test_recording_reporter() {
        let mut reporter = RecordingReporter::default();
        let sink: &mut dyn Reporter = &mut reporter;
        sink.progress("a");
        sink.detail("b");
        sink.error("c");
        assert_eq!(reporter.progress, vec!["a"]);
        assert_eq!(reporter.details, vec!["b"]);
        assert_eq!(reporter.errors, vec!["c"]);
    }
}
