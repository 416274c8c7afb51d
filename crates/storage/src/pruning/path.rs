// Path: crates/storage/src/pruning/path.rs

//! Epoch-directory naming and opportunistic cleanup.

use epochdb_api::storage::Epoch;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Directory-name stem of the epoch placeholder in database path templates.
pub const EPOCH_DIRECTORY_PREFIX: &str = "Epoch";

fn epoch_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"Epoch_\d+").expect("static pattern compiles"))
}

/// Substitutes every `Epoch_<digits>` token in `template` with the directory
/// name for `epoch`. A template without the token is returned unchanged, in
/// which case all epochs collide on one path.
pub fn epoch_file_path(template: &str, epoch: Epoch) -> String {
    let dir_name = format!("{EPOCH_DIRECTORY_PREFIX}_{epoch}");
    epoch_token()
        .replace_all(template, dir_name.as_str())
        .into_owned()
}

/// Removes the directory containing `path` if it exists and is empty.
/// Failures are ignored; non-empty directories are left intact.
pub fn remove_directory_if_empty(path: &str) {
    let Some(parent) = Path::new(path).parent() else {
        return;
    };
    let Ok(mut entries) = fs::read_dir(parent) else {
        return;
    };
    if entries.next().is_none() {
        let _ = fs::remove_dir(parent);
    }
}
