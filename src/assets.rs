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

use crate::error::Fallible;

/// The static files the HTML document links to, by file name.
const ASSETS: [(&str, &[u8]); 4] = [
    ("style.css", include_bytes!("assets/style.css")),
    (
        "branding_on_white.svg",
        include_bytes!("assets/branding_on_white.svg"),
    ),
    (
        "branding_on_black.svg",
        include_bytes!("assets/branding_on_black.svg"),
    ),
    (
        "branding_on_black_cards.svg",
        include_bytes!("assets/branding_on_black_cards.svg"),
    ),
];

/// Writes the stylesheet and branding images into `directory`, creating
/// it if needed. Existing files are overwritten.
pub fn write_assets(directory: &Path) -> Fallible<PathBuf> {
    create_dir_all(directory)?;
    for (name, bytes) in ASSETS {
        let path = directory.join(name);
        write(&path, bytes)?;
        log::debug!("Wrote {}.", path.display());
    }
    Ok(directory.to_path_buf())
}
