pub mod parse;
pub mod types;

use std::path::{Path, PathBuf};

pub use parse::{load_config, ConfigError};
pub use types::Config;

/// Expands tilde (~) in paths to the user's home directory.
/// Returns the path unchanged if it doesn't start with tilde or the home
/// directory cannot be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if path_str.starts_with("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(&path_str[2..]);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path based on explicit argument or default
/// locations:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/n2kplay/config.yml
/// 3. /etc/n2kplay/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/n2kplay/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/n2kplay/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
