use std::path::PathBuf;
use std::sync::OnceLock;

/// XDG-compliant directory layout for quickpick.
///
/// On Linux this follows the XDG Base Directory Specification:
///   Config:  $XDG_CONFIG_HOME/quickpick  (~/.config/quickpick)
///   Data:    $XDG_DATA_HOME/quickpick    (~/.local/share/quickpick)
///
/// On macOS both resolve under ~/Library/Application Support/quickpick.
/// The resolved base paths are cached in OnceLock cells.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root data directory: $XDG_DATA_HOME/quickpick
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickpick")
    })
}

/// Root config directory: $XDG_CONFIG_HOME/quickpick
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickpick")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default database path: <data_dir>/quickpick.db
pub fn db_path() -> PathBuf {
    data_dir().join("quickpick.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert!(config_file().ends_with("quickpick/config.toml"));
        assert!(db_path().ends_with("quickpick/quickpick.db"));
        assert_eq!(data_dir(), data_dir());
    }
}
