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

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::Fallible;
use crate::pipeline::GenerateOptions;
use crate::pipeline::generate;
use crate::reporter::ConsoleReporter;
use crate::reporter::Verbosity;
use crate::types::locale::Locale;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the card dataset.
    data: PathBuf,
    /// Path to the dictionary. Defaults to `dictionary_<language>.xml` next to the dataset.
    #[arg(short, long)]
    dictionary: Option<PathBuf>,
    /// The language to translate the cards into, e.g. `fr`.
    #[arg(short = 'l', long)]
    output_language: Option<Locale>,
    /// How much to print. Overrides the configuration file.
    #[arg(short, long, value_enum)]
    verbosity: Option<Verbosity>,
    /// Where to write the HTML file and its assets. Defaults to the current directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Path to the configuration file. Defaults to `cahcards.toml` in the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write the terms the dictionary could not translate to this JSON file.
    #[arg(long)]
    untranslated_report: Option<PathBuf>,
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let current_dir: PathBuf = std::env::current_dir()?;
    let mut config: Config = Config::discover(cli.config.as_deref(), &current_dir)?;
    if let Some(verbosity) = cli.verbosity {
        config.verbosity = verbosity;
    }
    let options = GenerateOptions {
        data: cli.data,
        dictionary: cli.dictionary,
        language: cli.output_language,
        output_dir: cli.output_dir.unwrap_or(current_dir),
        untranslated_report: cli.untranslated_report,
    };
    let mut reporter = ConsoleReporter::new(config.verbosity);
    let outcome = generate(&options, &config, &mut reporter)?;
    log::debug!("Generated {}.", outcome.html_path.display());
    if let Some(path) = &outcome.assets_path {
        log::debug!("Assets in {}.", path.display());
    }
    if let Some(report) = &outcome.translation {
        log::debug!("Translated from {} into {}.", report.source, report.target);
    }
    Ok(())
}
