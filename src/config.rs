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

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::ErrorKind;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::reporter::Verbosity;

/// The name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cahcards.toml";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The name of the HTML file.
    pub output_file: String,
    /// The directory, relative to the HTML file, for static assets.
    pub assets_dir: String,
    /// How many cards fit on a printed sheet.
    pub cards_per_sheet: usize,
    /// Page title and card branding.
    pub title: String,
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_file: "cards_against_humanity.html".to_string(),
            assets_dir: "assets".to_string(),
            cards_per_sheet: 9,
            title: "Cards Against Humanity".to_string(),
            verbosity: Verbosity::Normal,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        if config.output_file.trim().is_empty() {
            return Err(ErrorReport::with_kind(
                ErrorKind::Config,
                "output_file must not be empty.",
            ));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Fallible<Self> {
        let content = read_to_string(path).map_err(|e| {
            ErrorReport::with_kind(
                ErrorKind::Config,
                format!("unable to read {}: {e}", path.display()),
            )
        })?;
        log::debug!("Loading configuration from {}.", path.display());
        Self::from_toml(&content)
    }

    /// Loads `path` if given, otherwise the default configuration file in
    /// `directory` if it exists, otherwise the defaults.
    pub fn discover(path: Option<&Path>, directory: &Path) -> Fallible<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = directory.join(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
