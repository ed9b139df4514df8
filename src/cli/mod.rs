// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{Args, OutputFormat};
pub use output::{format_failure, format_json, format_report, format_summary, Summary};

use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions picked up when walking directories
pub const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "mp3", "m4a", "flac", "ogg", "aac"];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand files and directories into a sorted, de-duplicated list of audio
/// files. Explicit file arguments are kept whatever their extension.
pub fn collect_audio_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            warn!("Skipping {}: not found", input.display());
        }
    }

    files.sort();
    files.dedup();
    files
}
