// ABOUTME: Where dragme keeps its registry, logs and config file on this machine
// ABOUTME: Uses the platform's per-user directories, falling back to the working directory

use directories::ProjectDirs;
use std::path::PathBuf;

fn dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "dragme", "dragme")
}

/// Per-user state directory; `./data` when no home directory can be found
pub fn data_dir() -> PathBuf {
    dirs().map_or_else(|| PathBuf::from("./data"), |d| d.data_dir().to_path_buf())
}

pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn registry_file() -> PathBuf {
    data_dir().join("request_channels.json")
}

/// `config.toml` in the per-user config directory, or the working directory
pub fn config_file() -> PathBuf {
    dirs()
        .map_or_else(|| PathBuf::from("."), |d| d.config_dir().to_path_buf())
        .join("config.toml")
}
