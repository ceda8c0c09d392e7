use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use crate::command_builder::ToolSet;
use crate::error::{ToolError, WallthemeError};
use crate::Result;

/// Which of the configured programs were found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    found: BTreeSet<String>,
}

impl ToolAvailability {
    pub fn is_available(&self, name: &str) -> bool {
        self.found.contains(name)
    }
}

impl FromIterator<String> for ToolAvailability {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self { found: iter.into_iter().collect() }
    }
}

/// Resolves the configured tools against the current `PATH`.
pub fn preflight(tools: &ToolSet) -> Result<ToolAvailability> {
    preflight_with(tools, |name| which::which(name).ok())
}

pub fn is_installed(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Like [`preflight`], but searches `paths` instead of the process `PATH`.
pub fn preflight_in(tools: &ToolSet, paths: impl AsRef<OsStr>) -> Result<ToolAvailability> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    preflight_with(tools, |name| which::which_in(name, Some(paths.as_ref()), &cwd).ok())
}

fn preflight_with<F>(tools: &ToolSet, locate: F) -> Result<ToolAvailability>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let mut availability = ToolAvailability::default();

    for name in tools.required() {
        match locate(name) {
            Some(path) => {
                log::debug!("Found required command {} at {:?}", name, path);
                availability.found.insert(name.to_string());
            }
            None => {
                return Err(WallthemeError::Tool(ToolError::MissingRequired {
                    name: name.to_string(),
                }));
            }
        }
    }

    for name in tools.optional() {
        match locate(name) {
            Some(path) => {
                log::debug!("Found optional command {} at {:?}", name, path);
                availability.found.insert(name.to_string());
            }
            None => log::warn!("Optional command '{}' not found in PATH", name),
        }
    }

    Ok(availability)
}
