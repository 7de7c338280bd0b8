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

use std::fs::copy;
use std::path::PathBuf;

use tempfile::tempdir;

use crate::error::Fallible;

/// Creates an empty temporary directory that outlives the call.
pub fn create_tmp_directory() -> Fallible<PathBuf> {
    let dir: PathBuf = tempdir()?.keep();
    Ok(dir.canonicalize()?)
}

/// Copies the fixtures in `./test` into a fresh temporary directory.
pub fn create_tmp_copy_of_test_directory() -> Fallible<PathBuf> {
    let source: PathBuf = PathBuf::from("./test").canonicalize()?;
    let target: PathBuf = create_tmp_directory()?;
    for entry in source.read_dir()? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if let Some(file_name) = path.file_name() {
                copy(&path, target.join(file_name))?;
            }
        }
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tmp_directory() -> Fallible<()> {
        let directory = create_tmp_directory()?;
        assert!(directory.exists());
        assert_eq!(directory.read_dir()?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_create_tmp_copy_of_test_directory() -> Fallible<()> {
        let directory = create_tmp_copy_of_test_directory()?;
        assert!(directory.join("deck.xml").exists());
        Ok(())
    }
}
