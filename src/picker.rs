// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::error::{Result, VidmetaError};
use crossterm::event::{Event, KeyCode, KeyEvent};
use dialoguer::FuzzySelect;
use ratatui::style::Style;
use ratatui_explorer::{FileExplorer, Theme};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const PICKER_TITLE: &str = "Select Video";

/// Filename filter for the chooser. Matched against the file name only,
/// case-sensitive.
#[derive(Debug, Clone)]
pub struct FileFilter {
    regex: Regex,
}

impl FileFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| VidmetaError::InvalidFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.regex.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

pub fn list_matching(start_dir: &Path, filter: &FileFilter, max_depth: usize) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(start_dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && filter.matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Terminal list chooser. `Ok(None)` means the user backed out.
pub fn pick_from_list(
    start_dir: &Path,
    filter: &FileFilter,
    max_depth: usize,
) -> Result<Option<PathBuf>> {
    let files = list_matching(start_dir, filter, max_depth);
    if files.is_empty() {
        tracing::info!("No matching videos under {}", start_dir.display());
        eprintln!("No videos found under {}", start_dir.display());
        return Ok(None);
    }

    let labels: Vec<String> = files
        .iter()
        .map(|p| {
            p.strip_prefix(start_dir)
                .unwrap_or(p)
                .to_string_lossy()
                .to_string()
        })
        .collect();

    let selection = FuzzySelect::new()
        .with_prompt(PICKER_TITLE)
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(selection.map(|index| files[index].clone()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Browsing,
    Selected(PathBuf),
    Rejected(String),
    Cancelled,
}

/// File browser overlay for the TUI.
pub struct ExplorerPicker {
    explorer: FileExplorer,
    filter: FileFilter,
}

impl ExplorerPicker {
    pub fn open(start_dir: &Path, filter: FileFilter, background: Style) -> Result<Self> {
        let mut explorer = FileExplorer::with_theme(
            Theme::default()
                .add_default_title()
                .with_style(background),
        )?;
        explorer.set_cwd(start_dir)?;
        Ok(Self { explorer, filter })
    }

    pub fn explorer(&self) -> &FileExplorer {
        &self.explorer
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<PickerOutcome> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Ok(PickerOutcome::Cancelled),
            KeyCode::Enter if !self.explorer.current().is_dir() => {
                let path = self.explorer.current().path().clone();
                if self.filter.matches(&path) {
                    Ok(PickerOutcome::Selected(path))
                } else {
                    Ok(PickerOutcome::Rejected(format!(
                        "{} is not a supported video",
                        self.explorer.current().name()
                    )))
                }
            }
            _ => {
                self.explorer.handle(&Event::Key(key))?;
                Ok(PickerOutcome::Browsing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILE_FILTER;
    use std::fs;

    #[test]
    fn test_default_filter_accepts_mp4_and_mkv_only() {
        let filter = FileFilter::new(DEFAULT_FILE_FILTER).unwrap();
        assert!(filter.matches(Path::new("/videos/a.mp4")));
        assert!(filter.matches(Path::new("b.mkv")));
        assert!(filter.matches(Path::new("archive.tar.mp4")));
        assert!(!filter.matches(Path::new("c.avi")));
        assert!(!filter.matches(Path::new("notes.mp4.txt")));
        assert!(!filter.matches(Path::new("upper.MP4")));
        assert!(!filter.matches(Path::new("mp4")));
    }

    #[test]
    fn test_filter_looks_at_name_not_directory() {
        let filter = FileFilter::new(DEFAULT_FILE_FILTER).unwrap();
        assert!(!filter.matches(Path::new("/clips.mp4/readme")));
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        assert!(matches!(
            FileFilter::new("(mp4"),
            Err(VidmetaError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_list_matching_walks_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("trip");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.mkv"), b"x").unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join("skip.mov"), b"x").unwrap();
        fs::write(nested.join("c.mp4"), b"x").unwrap();

        let filter = FileFilter::new(DEFAULT_FILE_FILTER).unwrap();
        let found = list_matching(dir.path(), &filter, 3);
        assert_eq!(
            found,
            vec![
                dir.path().join("a.mp4"),
                dir.path().join("b.mkv"),
                nested.join("c.mp4"),
            ]
        );

        let shallow = list_matching(dir.path(), &filter, 1);
        assert_eq!(shallow.len(), 2);
    }

    fn press(picker: &mut ExplorerPicker, code: KeyCode) -> PickerOutcome {
        picker
            .handle_key(KeyEvent::new(code, crossterm::event::KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn test_explorer_selects_rejects_and_navigates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("clips")).unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join("b.txt"), b"x").unwrap();

        let filter = FileFilter::new(DEFAULT_FILE_FILTER).unwrap();
        let mut picker = ExplorerPicker::open(dir.path(), filter, Style::default()).unwrap();

        // Entries: ../, clips/, a.mp4, b.txt
        assert_eq!(press(&mut picker, KeyCode::Down), PickerOutcome::Browsing);
        assert_eq!(press(&mut picker, KeyCode::Down), PickerOutcome::Browsing);
        assert_eq!(
            press(&mut picker, KeyCode::Enter),
            PickerOutcome::Selected(dir.path().join("a.mp4"))
        );

        assert_eq!(press(&mut picker, KeyCode::Down), PickerOutcome::Browsing);
        assert_eq!(
            press(&mut picker, KeyCode::Enter),
            PickerOutcome::Rejected("b.txt is not a supported video".to_string())
        );
        assert_eq!(picker.explorer().current().name(), "b.txt");

        press(&mut picker, KeyCode::Up);
        press(&mut picker, KeyCode::Up);
        assert_eq!(picker.explorer().current().name(), "clips/");
        assert_eq!(press(&mut picker, KeyCode::Enter), PickerOutcome::Browsing);
        // Inside the empty directory only the parent entry is left
        assert_eq!(picker.explorer().current().name(), "../");
        assert_eq!(picker.explorer().current().path(), dir.path());

        assert_eq!(press(&mut picker, KeyCode::Esc), PickerOutcome::Cancelled);
        assert_eq!(press(&mut picker, KeyCode::Char('q')), PickerOutcome::Cancelled);
    }
}
