use std::path::{Path, PathBuf};
use walltheme_common::error::ValidationError;
use walltheme_common::{
    CommandRunner, ImageDiscovery, Result, ThemeMapping, Wallpaper, WallthemeError,
};

use crate::pipeline::{ApplyPipeline, ApplyReport};

/// Selection state of the picker.
pub struct PickerSession {
    wallpapers: Vec<Wallpaper>,
    selected: Option<usize>,
    mapping: ThemeMapping,
    mapping_path: PathBuf,
}

impl PickerSession {
    pub fn new(wallpapers: Vec<Wallpaper>, mapping_path: PathBuf) -> Self {
        let mapping = ThemeMapping::load_or_create(&mapping_path);
        Self {
            wallpapers,
            selected: None,
            mapping,
            mapping_path,
        }
    }

    pub fn wallpapers(&self) -> &[Wallpaper] {
        &self.wallpapers
    }

    pub fn selected(&self) -> Option<&Wallpaper> {
        self.selected.and_then(|i| self.wallpapers.get(i))
    }

    pub fn mapping(&self) -> &ThemeMapping {
        &self.mapping
    }

    /// Selects by position and returns the theme info for the wallpaper.
    pub fn select(&mut self, index: usize) -> Result<String> {
        if index >= self.wallpapers.len() {
            return Err(WallthemeError::Validation(ValidationError::General {
                message: format!("no wallpaper #{} (have {})", index + 1, self.wallpapers.len()),
            }));
        }

        self.selected = Some(index);
        log::debug!("Selected {:?}", self.wallpapers[index].path);
        Ok(self.theme_info().unwrap_or_default())
    }

    pub fn theme_info(&self) -> Option<String> {
        self.selected()
            .map(|w| self.mapping.describe(&w.file_name, &self.mapping_path))
    }

    /// Re-reads the mapping document and returns the refreshed info text for
    /// the current selection, if any.
    pub fn reload(&mut self) -> Option<String> {
        self.mapping = ThemeMapping::load_or_create(&self.mapping_path);
        self.theme_info()
    }

    /// Re-lists the wallpaper directory, keeping the selected file selected
    /// when it still exists.
    pub fn rescan(&mut self, dir: &Path, active_file: &str) -> Result<()> {
        let previous = self.selected().map(|w| w.path.clone());
        self.wallpapers = ImageDiscovery::discover_wallpapers(dir, active_file)?;
        self.selected = previous.and_then(|p| self.wallpapers.iter().position(|w| w.path == p));
        Ok(())
    }

    /// Runs the pipeline for the selection on the caller's thread.
    pub fn apply<R: CommandRunner>(&self, pipeline: &ApplyPipeline<'_, R>) -> Option<ApplyReport> {
        self.selected().map(|wallpaper| pipeline.apply(wallpaper, &self.mapping))
    }
}
