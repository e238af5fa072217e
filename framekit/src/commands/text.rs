use std::{fs, path::Path};

use anyhow::{Context, Result};
use framekit_core::text::{
    line_count,
    list_text_files,
    load_text_file,
    trigger_word,
    LoadedText,
    TextCursor,
};
use tracing::{debug, info};

/// Load by explicit index, or from the position stored in `cursor` and then
/// advance it.
pub fn load_text_handler(
    directory: &Path,
    index: Option<usize>,
    filter: &str,
    cursor: Option<&Path>,
) -> Result<LoadedText> {
    let loaded = match (index, cursor) {
        (Some(index), _) => load_text_file(directory, index, filter)?,
        (None, Some(cursor_path)) => {
            let mut cursor = read_cursor(cursor_path)?;
            let total = list_text_files(directory, filter)?.len();
            // The directory may have shrunk since the cursor was saved.
            if total > 0 && cursor.current() >= total {
                debug!("Cursor {} past {} files, starting over", cursor.current(), total);
                cursor.reset();
            }
            let loaded = load_text_file(directory, cursor.current(), filter)?;
            cursor.advance(loaded.total);
            write_cursor(cursor_path, &cursor)?;
            loaded
        },
        (None, None) => load_text_file(directory, 0, filter)?,
    };
    info!("{} ({}/{})", loaded.filename, loaded.index + 1, loaded.total);
    print!("{}", loaded.text);

    Ok(loaded)
}

fn read_cursor(path: &Path) -> Result<TextCursor> {
    if !path.exists() {
        return Ok(TextCursor::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read cursor {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid cursor file {}", path.display()))
}

fn write_cursor(path: &Path, cursor: &TextCursor) -> Result<()> {
    fs::write(path, serde_json::to_string(cursor)?)
        .with_context(|| format!("failed to write cursor {}", path.display()))
}

pub fn line_count_handler(file: &Path) -> Result<usize> {
    let text =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let count = line_count(&text);
    println!("{}", count);

    Ok(count)
}

pub fn trigger_word_handler(filename: &str) {
    println!("{}", trigger_word(filename));
}
