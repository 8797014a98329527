//! Facts about the host process that path logic depends on.
//!
//! Nothing in `storage/` or `config/` queries the OS directly — they take a
//! `HostEnvironment` so tests can describe any platform layout by hand.

use std::path::PathBuf;

/// Application name used for default directories.
pub const APP_NAME: &str = "HdSome";

/// Env var that forces packaged (`1`) or development (`0`) path layout.
pub const PACKAGED_ENV_VAR: &str = "HDSOME_PACKAGED";

/// Snapshot of the environment the app is running in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub app_name: String,
    /// Installed/packaged build vs. a development run.
    pub is_packaged: bool,
    /// OS application-data root (`%APPDATA%`, `~/Library/Application Support`, `~/.local/share`).
    pub app_data_root: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    /// Directory holding the running executable.
    pub exe_dir: Option<PathBuf>,
    /// OS user-config directory.
    pub user_config_dir: Option<PathBuf>,
}

impl HostEnvironment {
    /// Reads the real environment.
    pub fn detect() -> Self {
        let is_packaged = match std::env::var(PACKAGED_ENV_VAR).as_deref() {
            Ok("1") | Ok("true") => true,
            Ok("0") | Ok("false") => false,
            _ => !cfg!(debug_assertions),
        };

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()));

        let env = Self {
            app_name: APP_NAME.to_string(),
            is_packaged,
            app_data_root: dirs::data_dir(),
            home_dir: dirs::home_dir(),
            exe_dir,
            user_config_dir: dirs::config_dir(),
        };

        log::debug!(
            "Host environment: packaged={}, data_root={:?}, exe_dir={:?}",
            env.is_packaged,
            env.app_data_root,
            env.exe_dir
        );
        env
    }

    /// Environment rooted entirely under `root`, for tests and portable runs.
    pub fn rooted_at(root: impl Into<PathBuf>, is_packaged: bool) -> Self {
        let root = root.into();
        Self {
            app_name: APP_NAME.to_string(),
            is_packaged,
            app_data_root: Some(root.join("appdata")),
            home_dir: Some(root.join("home")),
            exe_dir: Some(root.join("bin")),
            user_config_dir: Some(root.join("config")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_environment_keeps_everything_under_root() {
        let env = HostEnvironment::rooted_at("/sandbox", true);
        assert!(env.is_packaged);
        for dir in [
            &env.app_data_root,
            &env.home_dir,
            &env.exe_dir,
            &env.user_config_dir,
        ] {
            assert!(dir.as_ref().unwrap().starts_with("/sandbox"));
        }
    }

    #[test]
    fn detect_uses_app_name() {
        let env = HostEnvironment::detect();
        assert_eq!(env.app_name, APP_NAME);
    }
}
