//! Where lingua-relay keeps its files.
//!
//! Settings live in the platform config dir, converted Marian models in the
//! local data dir, each under a `lingua-relay` subdirectory:
//!
//! | Platform | `settings.toml`                            | `models/`                                  |
//! |----------|--------------------------------------------|--------------------------------------------|
//! | Linux    | `~/.config/lingua-relay/`                  | `~/.local/share/lingua-relay/`             |
//! | macOS    | `~/Library/Application Support/lingua-relay/` | same                                    |
//! | Windows  | `%APPDATA%\lingua-relay\`                  | `%LOCALAPPDATA%\lingua-relay\`             |

use std::path::{Path, PathBuf};

const APP_DIR: &str = "lingua-relay";
const SETTINGS_FILE: &str = "settings.toml";
const MODELS_SUBDIR: &str = "models";

/// Resolved locations of the settings file and the models directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// One subdirectory per converted opus-mt pair (`opus-mt-en-ur/`).
    /// Overridden by `marian.models_dir`.
    pub models_dir: PathBuf,
}

impl AppPaths {
    /// Platform locations; a platform without a standard dir uses `.`.
    pub fn new() -> Self {
        let base = |dir: Option<PathBuf>| dir.unwrap_or_else(|| PathBuf::from("."));
        Self::rooted_at(&base(dirs::config_dir()), &base(dirs::data_local_dir()))
    }

    /// Layout below explicit config and data roots.
    pub fn rooted_at(config_root: &Path, data_root: &Path) -> Self {
        let config_dir = config_root.join(APP_DIR);
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
            models_dir: data_root.join(APP_DIR).join(MODELS_SUBDIR),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_below_roots() {
        let paths = AppPaths::rooted_at(Path::new("/cfg"), Path::new("/data"));
        assert_eq!(paths.config_dir, Path::new("/cfg/lingua-relay"));
        assert_eq!(paths.settings_file, Path::new("/cfg/lingua-relay/settings.toml"));
        assert_eq!(paths.models_dir, Path::new("/data/lingua-relay/models"));
    }

    #[test]
    fn platform_paths_share_the_layout() {
        let paths = AppPaths::new();
        assert!(paths.settings_file.starts_with(&paths.config_dir));
        assert!(paths.models_dir.ends_with("lingua-relay/models"));
    }
}
