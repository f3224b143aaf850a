//! Background reference chosen by the user.
//!
//! A background is either a remote image (`http…`/`data:`) or a wallpaper
//! from the local `wallpapers/` directory, recorded as `wallpapers/<file>`.

use std::fs;
use std::path::Path;

use crate::error::ValidationError;

pub const WALLPAPERS_DIR: &str = "wallpapers";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Background {
    Remote(String),
    Wallpaper(String),
}

impl Background {
    /// The value written to storage.
    pub fn reference(&self) -> String {
        match self {
            Background::Remote(url) => url.clone(),
            Background::Wallpaper(file) => format!("{WALLPAPERS_DIR}/{file}"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Background::Remote(url) if url.starts_with("data:") => "inline image".into(),
            Background::Remote(url) => url.clone(),
            Background::Wallpaper(file) => filename_to_label(file),
        }
    }
}

/// A wallpaper found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallpaper {
    pub file: String,
    pub label: String,
}

/// Interpret user input. `Ok(None)` means clear the background.
pub fn parse_background(
    input: &str,
    wallpapers: &[Wallpaper],
) -> Result<Option<Background>, ValidationError> {
    let value = input.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Some(file) = value.strip_prefix(&format!("{WALLPAPERS_DIR}/")) {
        return if wallpapers.iter().any(|w| w.file == file) {
            Ok(Some(Background::Wallpaper(file.to_string())))
        } else {
            Err(ValidationError::UnknownWallpaper(file.to_string()))
        };
    }
    if value.starts_with("http") || value.starts_with("data:") {
        return Ok(Some(Background::Remote(value.to_string())));
    }
    Err(ValidationError::InvalidBackground)
}

/// Image files in `dir`, sorted by name. A missing directory yields none.
pub fn scan_wallpapers(dir: &Path) -> Vec<Wallpaper> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<Wallpaper> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .map(|file| Wallpaper {
            label: filename_to_label(&file),
            file,
        })
        .collect();
    found.sort_by(|a, b| a.file.cmp(&b.file));
    found
}

/// `misty-forest_02.jpg` becomes `Misty Forest 02`.
pub fn filename_to_label(name: &str) -> String {
    let stem = name.split('.').next().unwrap_or(name);
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
