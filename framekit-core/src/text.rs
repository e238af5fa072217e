//! Indexed loading of `.txt` files from a directory, line counting and
//! trigger words taken from adapter file names.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const TEXT_EXTENSION: &str = ".txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedText {
    pub text:     String,
    pub filename: String,
    /// Zero-based position of the file among the matching files.
    pub index:    usize,
    pub total:    usize,
}

/// Names of the `.txt` files in `dir` whose name contains `filter`, sorted.
///
/// Both the extension and the filter are matched case-insensitively; an
/// empty filter matches everything.
#[inline]
pub fn list_text_files(dir: &Path, filter: &str) -> Result<Vec<String>, TextError> {
    if !dir.is_dir() {
        return Err(TextError::InvalidDirectory(dir.to_path_buf()));
    }
    let filter = filter.to_lowercase();
    let entries = fs::read_dir(dir).map_err(|source| TextError::List {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| TextError::List {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.path().is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let lower = name.to_lowercase();
        if lower.ends_with(TEXT_EXTENSION) && lower.contains(&filter) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

#[inline]
pub fn load_text_file(dir: &Path, index: usize, filter: &str) -> Result<LoadedText, TextError> {
    debug!("Scanning {} with filter {:?}", dir.display(), filter);
    let files = list_text_files(dir, filter)?;
    if files.is_empty() {
        return Err(TextError::NoTextFiles {
            path:   dir.to_path_buf(),
            filter: filter.to_owned(),
        });
    }
    let total = files.len();
    let filename = files
        .into_iter()
        .nth(index)
        .ok_or(TextError::IndexOutOfRange {
            index,
            total,
        })?;

    let path = dir.join(&filename);
    let text = fs::read_to_string(&path).map_err(|source| TextError::Read {
        path,
        source,
    })?;
    info!("Loaded text file ({}/{}): {}", index + 1, total, filename);

    Ok(LoadedText {
        text,
        filename,
        index,
        total,
    })
}

/// Position in a directory of text files that survives between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCursor {
    pub index: usize,
}

impl TextCursor {
    #[inline]
    pub fn current(&self) -> usize {
        self.index
    }

    /// Step forward, wrapping after `total` files.
    #[inline]
    pub fn advance(&mut self, total: usize) -> usize {
        self.index = if total == 0 { 0 } else { (self.index + 1) % total };
        self.index
    }

    #[inline]
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Number of lines, splitting on every Unicode line boundary.
///
/// `\r\n` counts as one break and a trailing break does not open another
/// line.
#[inline]
pub fn line_count(text: &str) -> usize {
    let mut lines = 0;
    let mut in_line = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_line_break(c) {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            lines += 1;
            in_line = false;
        } else {
            in_line = true;
        }
    }
    lines + usize::from(in_line)
}

/// The part of an adapter file name before `_lora`, without the extension.
///
/// Names without the marker give the whole stem back.
#[inline]
pub fn trigger_word(filename: &str) -> &str {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);
    stem.split("_lora").next().unwrap_or(stem)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

#[derive(Debug, Error)]
pub enum TextError {
    #[error("Directory path '{}' is invalid or not found", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("Could not list '{}': {source}", .path.display())]
    List {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No '.txt' files found in '{}' matching filter '{filter}'", .path.display())]
    NoTextFiles { path: PathBuf, filter: String },
    #[error("File index {index} out of range, it needs to be between 0 and {}", .total.saturating_sub(1))]
    IndexOutOfRange { index: usize, total: usize },
    #[error("Error reading file '{}': {source}", .path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
}
