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

use std::fs::create_dir_all;
use std::fs::write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::assets::write_assets;
use crate::blanks::standardize_blanks;
use crate::config::Config;
use crate::dedupe::dedupe;
use crate::dictionary::Dictionary;
use crate::error::Fallible;
use crate::error::fail;
use crate::parser::parse_deck_file;
use crate::render::RenderOptions;
use crate::render::render;
use crate::reporter::Reporter;
use crate::translate::TranslationReport;
use crate::translate::translate;
use crate::types::deck::Deck;
use crate::types::locale::Locale;

/// What to generate, and where.
pub struct GenerateOptions {
    /// Path to the card dataset.
    pub data: PathBuf,
    /// Path to the dictionary. Defaults to `dictionary_<tag>.xml` next to
    /// the dataset.
    pub dictionary: Option<PathBuf>,
    /// The language to translate into, if any.
    pub language: Option<Locale>,
    pub output_dir: PathBuf,
    /// Where to write the untranslated terms, if anywhere.
    pub untranslated_report: Option<PathBuf>,
}

#[derive(Debug)]
pub struct GenerateOutcome {
    pub html_path: PathBuf,
    /// `None` if the assets could not be written.
    pub assets_path: Option<PathBuf>,
    /// `None` if translation did not run or failed.
    pub translation: Option<TranslationReport>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    Parse,
    Translate,
    Blanks,
    Dedupe,
    Render,
    Style,
    Report,
}

impl Stage {
    /// Whether a failure of this stage aborts the run.
    fn is_fatal(self) -> bool {
        matches!(self, Stage::Parse | Stage::Render)
    }

    fn failure_message(self) -> &'static str {
        match self {
            Stage::Parse => "Unable to parse the card dataset",
            Stage::Translate => "Unable to translate",
            Stage::Blanks => "Unable to standardize blanks",
            Stage::Dedupe => "Unable to remove duplicates",
            Stage::Render => "Unable to render",
            Stage::Style => "Unable to style",
            Stage::Report => "Unable to write the untranslated terms report",
        }
    }
}

/// Runs a stage. A fatal failure is reported and returned; any other failure
/// is reported and swallowed, and the caller carries on with `None`.
fn run_stage<T>(
    stage: Stage,
    reporter: &mut dyn Reporter,
    body: impl FnOnce(&mut dyn Reporter) -> Fallible<T>,
) -> Fallible<Option<T>> {
    log::debug!("Running stage {stage:?}.");
    let start = Instant::now();
    let result = body(reporter);
    let duration = Instant::now().duration_since(start).as_millis();
    log::debug!("Stage {stage:?} finished in {duration}ms.");
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            log::warn!("Stage {stage:?} failed with a {}: {error}", error.kind());
            reporter.error(&format!("{}: {error}", stage.failure_message()));
            if stage.is_fatal() {
                Err(error)
            } else {
                Ok(None)
            }
        }
    }
}

/// Parses the dataset, optionally translates it, cleans it up, and writes
/// the printable HTML and its assets into the output directory.
pub fn generate(
    options: &GenerateOptions,
    config: &Config,
    reporter: &mut dyn Reporter,
) -> Fallible<GenerateOutcome> {
    let Some(mut deck): Option<Deck> = run_stage(Stage::Parse, reporter, |reporter| {
        reporter.progress(&format!("Reading {}.", options.data.display()));
        let deck = parse_deck_file(&options.data)?;
        reporter.detail(&format!(
            "Found {} white and {} black cards in {}.",
            deck.white().len(),
            deck.black().len(),
            deck.locale()
        ));
        Ok(deck)
    })?
    else {
        return fail("the card dataset could not be parsed.");
    };

    let translation: Option<TranslationReport> = match &options.language {
        Some(target) if target == deck.locale() => {
            reporter.detail(&format!("The deck is already in {target}; not translating."));
            None
        }
        Some(target) => run_stage(Stage::Translate, reporter, |reporter| {
            let path = match &options.dictionary {
                Some(path) => path.clone(),
                None => Dictionary::default_path(&options.data, target),
            };
            reporter.progress(&format!("Translating into {target}."));
            let dictionary = Dictionary::load(&path, target)?;
            let report = translate(&mut deck, target, &dictionary)?;
            reporter.detail(&format!(
                "Replaced {} terms in {} cards; {} terms untranslated.",
                report.replaced,
                report.cards_changed,
                report.untranslated.len()
            ));
            Ok(report)
        })?,
        None => None,
    };

    run_stage(Stage::Blanks, reporter, |reporter| {
        let report = standardize_blanks(&mut deck);
        for failure in &report.failures {
            reporter.error(&format!(
                "Unable to standardize black card {}: {}",
                failure.index, failure.error
            ));
        }
        reporter.detail(&format!(
            "Rewrote {} black cards and corrected {} blank counts.",
            report.rewritten, report.corrected
        ));
        Ok(())
    })?;

    run_stage(Stage::Dedupe, reporter, |reporter| {
        let report = dedupe(&mut deck);
        reporter.detail(&format!(
            "Removed {} white and {} black duplicates.",
            report.removed_white, report.removed_black
        ));
        Ok(())
    })?;

    let html_path = options.output_dir.join(&config.output_file);
    run_stage(Stage::Render, reporter, |reporter| {
        let rendered = render(&deck, &RenderOptions::from_config(config))?;
        for card in &rendered.skipped {
            reporter.error(&format!(
                "Unable to render {} card {}: {}",
                card.colour, card.index, card.error
            ));
        }
        create_dir_all(&options.output_dir)?;
        write(&html_path, rendered.html)?;
        reporter.progress(&format!("Wrote {}.", html_path.display()));
        Ok(())
    })?;

    let assets_path = run_stage(Stage::Style, reporter, |_| {
        write_assets(&options.output_dir.join(&config.assets_dir))
    })?;

    if let Some(path) = &options.untranslated_report {
        match &translation {
            Some(report) => {
                run_stage(Stage::Report, reporter, |reporter| {
                    write_report(path, report)?;
                    reporter.detail(&format!("Wrote {}.", path.display()));
                    Ok(())
                })?;
            }
            None => {
                reporter.detail("No translation ran; not writing the untranslated terms report.");
            }
        }
    }

    Ok(GenerateOutcome {
        html_path,
        assets_path,
        translation,
    })
}

fn write_report(path: &Path, report: &TranslationReport) -> Fallible<()> {
    let json: String = serde_json::to_string_pretty(report)?;
    write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;
    use crate::error::ErrorKind;
    use crate::error::ErrorReport;
    use crate::helper::create_tmp_copy_of_test_directory;
    use crate::helper::create_tmp_directory;
    use crate::reporter::NullReporter;
    use crate::reporter::RecordingReporter;

    fn options(directory: &Path, language: Option<&str>) -> Fallible<GenerateOptions> {
        Ok(GenerateOptions {
            data: directory.join("deck.xml"),
            dictionary: None,
            language: language.map(Locale::parse).transpose()?,
            output_dir: directory.join("out"),
            untranslated_report: None,
        })
    }

    #[test]
    fn test_generate() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let options = options(&directory, None)?;
        let mut reporter = RecordingReporter::default();
        let outcome = generate(&options, &Config::default(), &mut reporter)?;
        assert_eq!(
            outcome.html_path,
            directory.join("out").join("cards_against_humanity.html")
        );
        assert_eq!(outcome.assets_path, Some(directory.join("out").join("assets")));
        assert!(outcome.translation.is_none());
        assert!(reporter.errors.is_empty());

        let html = read_to_string(&outcome.html_path)?;
        assert!(html.contains("<html lang=\"en\">"));
        assert_eq!(html.matches("<div class=\"card white\">").count(), 2);
        assert_eq!(html.matches("<div class=\"card black\">").count(), 2);
        assert!(html.contains(
            "I love <span class=\"blank\"></span> and <span class=\"blank\"></span>."
        ));
        assert!(!html.contains("___"));
        assert!(directory.join("out/assets/style.css").exists());
        Ok(())
    }

    #[test]
    fn test_generate_translated() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let mut options = options(&directory, Some("fr"))?;
        let report_path = directory.join("untranslated.json");
        options.untranslated_report = Some(report_path.clone());
        let mut reporter = RecordingReporter::default();
        let outcome = generate(&options, &Config::default(), &mut reporter)?;
        assert!(reporter.errors.is_empty());

        let translation = outcome
            .translation
            .ok_or_else(|| ErrorReport::new("translation should have run"))?;
        assert_eq!(translation.target.as_str(), "fr");
        assert!(translation.untranslated.iter().any(|term| term.contains("love")));

        let html = read_to_string(&outcome.html_path)?;
        assert!(html.contains("<html lang=\"fr\">"));
        assert!(html.contains(">Chiens</p>"));
        assert!(html.contains(">Chats</p>"));
        assert!(!html.contains(">Dogs</p>"));
        assert!(html.contains(">Why am I collant?</p>"));
        assert_eq!(html.matches("<div class=\"card white\">").count(), 2);

        let json = read_to_string(&report_path)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["target"], "fr");
        assert!(value["untranslated"].is_array());
        Ok(())
    }

    #[test]
    fn test_same_language_skips_translation() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let options = options(&directory, Some("en"))?;
        let mut reporter = RecordingReporter::default();
        let outcome = generate(&options, &Config::default(), &mut reporter)?;
        assert!(outcome.translation.is_none());
        assert!(reporter.errors.is_empty());
        assert!(reporter.details.iter().any(|d| d.contains("already in en")));
        Ok(())
    }

    #[test]
    fn test_missing_dictionary_is_not_fatal() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let options = options(&directory, Some("de"))?;
        let mut reporter = RecordingReporter::default();
        let outcome = generate(&options, &Config::default(), &mut reporter)?;
        assert!(outcome.translation.is_none());
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].starts_with("Unable to translate"));

        let html = read_to_string(&outcome.html_path)?;
        assert!(html.contains("<html lang=\"en\">"));
        assert!(html.contains(">Dogs</p>"));
        Ok(())
    }

    #[test]
    fn test_malformed_dataset_writes_nothing() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let mut options = options(&directory, None)?;
        options.data = directory.join("malformed.xml");
        let mut reporter = RecordingReporter::default();
        let err = generate(&options, &Config::default(), &mut reporter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].starts_with("Unable to parse"));
        assert!(!directory.join("out").exists());
        Ok(())
    }

    #[test]
    fn test_missing_dataset() -> Fallible<()> {
        let directory = create_tmp_directory()?;
        let options = options(&directory, None)?;
        let err = generate(&options, &Config::default(), &mut NullReporter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        Ok(())
    }

    #[test]
    fn test_render_failure_writes_nothing() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let options = options(&directory, None)?;
        let config = Config {
            cards_per_sheet: 0,
            ..Config::default()
        };
        let err = generate(&options, &config, &mut NullReporter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(!directory.join("out").exists());
        Ok(())
    }

    #[test]
    fn test_styling_failure_is_not_fatal() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let options = options(&directory, None)?;
        create_dir_all(&options.output_dir)?;
        write(options.output_dir.join("assets"), "in the way")?;
        let mut reporter = RecordingReporter::default();
        let outcome = generate(&options, &Config::default(), &mut reporter)?;
        assert!(outcome.assets_path.is_none());
        assert!(outcome.html_path.exists());
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].starts_with("Unable to style"));
        Ok(())
    }

    #[test]
    fn test_report_without_translation() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        let mut options = options(&directory, None)?;
        let report_path = directory.join("untranslated.json");
        options.untranslated_report = Some(report_path.clone());
        generate(&options, &Config::default(), &mut NullReporter)?;
        assert!(!report_path.exists());
        Ok(())
    }

    #[test]
    fn test_run_stage_fatality() {
        let mut reporter = RecordingReporter::default();
        let result: Fallible<Option<()>> = run_stage(Stage::Dedupe, &mut reporter, |_| {
            Err(ErrorReport::new("boom"))
        });
        assert!(matches!(result, Ok(None)));
        let result: Fallible<Option<()>> = run_stage(Stage::Render, &mut reporter, |_| {
            Err(ErrorReport::render("boom"))
        });
        assert!(result.is_err());
        assert_eq!(
            reporter.errors,
            vec!["Unable to remove duplicates: boom", "Unable to render: boom"]
        );
    }
}
