use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Manages the directory of shared-library archives plugin code may link
/// against.
///
/// Library identifiers are file names. Every operation is best-effort: a
/// missing directory is created lazily on first write, and failures
/// surface as empty listings or a `false` return rather than errors.
/// Adding a library takes effect at the next plugin (re)load; already
/// loaded plugin instances are unaffected.
#[derive(Debug, Clone)]
pub struct LibraryManager {
    libraries_dir: PathBuf,
}

impl LibraryManager {
    pub fn new(libraries_dir: PathBuf) -> Self {
        Self { libraries_dir }
    }

    /// The managed libraries directory.
    pub fn libraries_dir(&self) -> &Path {
        &self.libraries_dir
    }

    /// File names of every installed library, lexicographic order. Never
    /// fails; an unreadable or missing directory yields an empty list.
    pub fn list_available_libraries(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.libraries_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    "Libraries directory '{}' not readable: {}",
                    self.libraries_dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    /// Copy an archive into the managed directory. Returns `false` on any
    /// I/O failure; contents are not validated here, the loader validates
    /// at actual use time.
    pub fn add_library(&self, source: &Path) -> bool {
        if !source.is_file() {
            warn!("Cannot add library: '{}' is not a readable file", source.display());
            return false;
        }
        let file_name = match source.file_name() {
            Some(name) => name,
            None => {
                warn!("Cannot add library: '{}' has no file name", source.display());
                return false;
            }
        };
        if let Err(e) = fs::create_dir_all(&self.libraries_dir) {
            warn!(
                "Failed to create libraries directory '{}': {}",
                self.libraries_dir.display(),
                e
            );
            return false;
        }
        let dest = self.libraries_dir.join(file_name);
        match fs::copy(source, &dest) {
            Ok(_) => {
                debug!("Added library '{}'", dest.display());
                true
            }
            Err(e) => {
                warn!("Failed to copy library '{}' to '{}': {}", source.display(), dest.display(), e);
                false
            }
        }
    }

    /// Absolute paths of the installed libraries, in listing order. This
    /// is the additive search path the loader exposes to plugin load
    /// contexts.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.list_available_libraries()
            .into_iter()
            .map(|name| self.libraries_dir.join(name))
            .collect()
    }

    /// Human-readable summary for display. Side-effect free.
    pub fn library_info(&self) -> String {
        let libraries = self.list_available_libraries();
        if libraries.is_empty() {
            format!(
                "No shared libraries installed.\nLibraries directory: {}",
                self.libraries_dir.display()
            )
        } else {
            format!(
                "{} shared librar{} installed:\n{}\nLibraries directory: {}",
                libraries.len(),
                if libraries.len() == 1 { "y" } else { "ies" },
                libraries
                    .iter()
                    .map(|name| format!("  - {}", name))
                    .collect::<Vec<_>>()
                    .join("\n"),
                self.libraries_dir.display()
            )
        }
    }
}
