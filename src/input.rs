// Archive input sources for Reflector
// Files, directories of .har files (via walkdir), or standard input

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::ArchiveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// Name used to tag diagnostics for this source
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn read_to_string(&self) -> Result<String, ArchiveError> {
        let result = match self {
            InputSource::Stdin => {
                let mut content = String::new();
                std::io::stdin().read_to_string(&mut content).map(|_| content)
            }
            InputSource::File(path) => std::fs::read_to_string(path),
        };
        result.map_err(|error| ArchiveError::Read {
            source_name: self.name(),
            error,
        })
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => f.write_str("<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Turn command-line paths into input sources.
///
/// No paths means standard input. Directories are walked recursively for
/// `.har` files in file-name order; anything else is passed through so a
/// missing file is reported when it is read.
pub fn expand_inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<InputSource> {
    if paths.is_empty() {
        return vec![InputSource::Stdin];
    }

    let mut sources = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            sources.push(InputSource::File(path.to_path_buf()));
            continue;
        }

        let before = sources.len();
        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    let is_har = entry.path().extension().map_or(false, |ext| ext == "har");
                    if entry.file_type().is_file() && is_har {
                        sources.push(InputSource::File(entry.into_path()));
                    }
                }
                Err(e) => warn!(dir = %path.display(), "skipping unreadable entry: {}", e),
            }
        }
        debug!(dir = %path.display(), found = sources.len() - before, "expanded directory");
    }
    sources
}
