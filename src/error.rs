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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

/// The broad category of an error. The pipeline driver uses this to decide
/// what to tell the user; fatality is decided per stage, not per kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// The card dataset is malformed.
    DataFormat,
    /// The dictionary is missing, unreadable, or unusable.
    DictionaryLoad,
    /// A single card's text is not well-formed markup.
    Markup,
    /// The deck cannot be serialized to HTML.
    Render,
    /// Reading or writing a file failed.
    Io,
    /// The configuration file is invalid.
    Config,
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DataFormat => write!(f, "data format error"),
            ErrorKind::DictionaryLoad => write!(f, "dictionary error"),
            ErrorKind::Markup => write!(f, "markup error"),
            ErrorKind::Render => write!(f, "render error"),
            ErrorKind::Io => write!(f, "I/O error"),
            ErrorKind::Config => write!(f, "configuration error"),
            ErrorKind::Other => write!(f, "error"),
        }
    }
}

#[derive(Debug)]
pub struct ErrorReport {
    kind: ErrorKind,
    message: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Other, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::DataFormat, message)
    }

    pub fn dictionary_load(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::DictionaryLoad, message)
    }

    pub fn markup(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Markup, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Render, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

pub fn fail<T>(message: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport::new(message))
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport::with_kind(ErrorKind::Io, value.to_string())
    }
}

impl From<toml::de::Error> for ErrorReport {
    fn from(value: toml::de::Error) -> Self {
        ErrorReport::with_kind(ErrorKind::Config, format!("invalid configuration: {value}"))
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport::new(format!("JSON error: {value}"))
    }
}
