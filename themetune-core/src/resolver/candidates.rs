use std::path::{Component, Path};

use crate::domain::{LibraryEntity, MetadataProvider};

/// Audio extensions recognised as theme songs, in probe priority order.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp3", "m4a", "ogg", "wav"];

/// Replacement for characters that cannot appear in a file name.
pub const PLACEHOLDER: char = '_';

fn is_invalid_file_name_char(ch: char) -> bool {
    ch.is_control() || matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|ch| if is_invalid_file_name_char(ch) { PLACEHOLDER } else { ch })
        .collect()
}

/// Ordered, sanitized file names probed inside the custom path for `entity`.
///
/// The TVDB-named file written by the acquisition pipeline comes last.
pub fn candidate_file_names(entity: &LibraryEntity) -> Vec<String> {
    let name = entity.name.as_str();
    let id = entity.id.to_string();

    let mut raw = vec![
        format!("{name}.mp3"),
        format!("{name} theme.mp3"),
        format!("{name}_theme.mp3"),
        format!("{id}.mp3"),
        format!("{name}.m4a"),
        format!("{name}.ogg"),
        format!("{name}.wav"),
        format!("{id}.m4a"),
        format!("{id}.ogg"),
        format!("{id}.wav"),
    ];
    if let Some(tvdb_id) = entity.provider_id(MetadataProvider::Tvdb) {
        raw.push(format!("{tvdb_id}.mp3"));
    }

    raw.iter().map(|file_name| sanitize_file_name(file_name)).collect()
}

/// Name of the per-series folder probed inside the custom path.
///
/// The display name is used verbatim when it is a single ordinary path
/// component; anything that could leave the custom path is sanitized.
pub fn series_folder_name(entity: &LibraryEntity) -> String {
    let name = entity.name.as_str();
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => {
            name.to_string()
        }
        _ => {
            let sanitized = sanitize_file_name(name);
            if sanitized.chars().all(|ch| ch == '.') {
                PLACEHOLDER.to_string().repeat(sanitized.len().max(1))
            } else {
                sanitized
            }
        }
    }
}
