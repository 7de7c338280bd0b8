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
use std::str::FromStr;

use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

/// A language tag such as `en`, `fr` or `en-GB`.
///
/// Tags are normalized on construction: the primary subtag is lowercased,
/// two-letter region subtags are uppercased, and `_` is accepted as a
/// separator. Two locales are equal iff their normalized tags are equal.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Locale {
    tag: String,
}

impl Locale {
    pub fn parse(tag: &str) -> Fallible<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return fail("empty language tag.");
        }
        let mut subtags: Vec<String> = Vec::new();
        for (index, subtag) in tag.split(['-', '_']).enumerate() {
            if subtag.is_empty() || subtag.len() > 8 {
                return fail(format!("invalid language tag: {tag:?}"));
            }
            if !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
                return fail(format!("invalid language tag: {tag:?}"));
            }
            let normalized = if index == 0 {
                if !subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                    return fail(format!("invalid language tag: {tag:?}"));
                }
                subtag.to_ascii_lowercase()
            } else if subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                subtag.to_ascii_uppercase()
            } else {
                subtag.to_ascii_lowercase()
            };
            subtags.push(normalized);
        }
        Ok(Self {
            tag: subtags.join("-"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)
    }
}

impl FromStr for Locale {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse(s)
    }
}

impl Serialize for Locale {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() -> Fallible<()> {
        assert_eq!(Locale::parse("EN")?.as_str(), "en");
        assert_eq!(Locale::parse("en_gb")?.as_str(), "en-GB");
        assert_eq!(Locale::parse(" fr-CA ")?.to_string(), "fr-CA");
        Ok(())
    }

    #[test]
    fn test_equality_after_normalization() -> Fallible<()> {
        assert_eq!(Locale::parse("pt_BR")?, Locale::parse("pt-br")?);
        assert_ne!(Locale::parse("en")?, Locale::parse("en-GB")?);
        Ok(())
    }

    #[test]
    fn test_invalid_tags() {
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("en--GB").is_err());
        assert!(Locale::parse("12").is_err());
        assert!(Locale::parse("en GB").is_err());
    }
}
