//! Base-path and category-folder resolution.
//!
//! Precedence: an enabled, non-empty `customPath` wins; otherwise
//!   packaged build:  <OS app-data root>/HdSome
//!   development run: <home>/.hdsome-dev

use super::{FileCategory, StorageError};
use crate::config::{is_valid_folder_name, AppConfig, FolderNames};
use crate::host_env::HostEnvironment;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Data root used by development runs, relative to the home directory.
pub const DEV_DATA_DIR: &str = ".hdsome-dev";

/// Absolute folder per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFolders {
    pub messages: PathBuf,
    pub audio: PathBuf,
    pub images: PathBuf,
    pub videos: PathBuf,
    pub files: PathBuf,
}

/// Resolved storage layout. Not persisted; recomputed on every initialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDataPaths {
    pub base_path: PathBuf,
    pub folders: CategoryFolders,
}

impl AppDataPaths {
    /// Compute the layout without touching the filesystem.
    pub fn plan(config: Option<&AppConfig>, env: &HostEnvironment) -> Result<Self, StorageError> {
        let base_path = match config.and_then(|c| c.file_storage.effective_custom_path()) {
            Some(custom) => PathBuf::from(custom),
            None => default_base_path(env)?,
        };

        let default_names = FolderNames::default();
        let names = config
            .map(|c| &c.file_storage.folders)
            .unwrap_or(&default_names);
        let folder = |name: &str, fallback: &str| {
            if is_valid_folder_name(name) {
                return base_path.join(name);
            }
            if !name.is_empty() {
                log::warn!("[STORAGE] Ignoring folder name {:?}, using {:?}", name, fallback);
            }
            base_path.join(fallback)
        };

        let folders = CategoryFolders {
            messages: folder(&names.messages, &default_names.messages),
            audio: folder(&names.audio, &default_names.audio),
            images: folder(&names.images, &default_names.images),
            videos: folder(&names.videos, &default_names.videos),
            files: folder(&names.files, &default_names.files),
        };

        Ok(Self { base_path, folders })
    }

    pub fn folder(&self, category: FileCategory) -> &Path {
        match category {
            FileCategory::Message => &self.folders.messages,
            FileCategory::Audio => &self.folders.audio,
            FileCategory::Image => &self.folders.images,
            FileCategory::Video => &self.folders.videos,
            FileCategory::File => &self.folders.files,
        }
    }

    /// Create the base path and every category folder.
    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        let all = std::iter::once(self.base_path.as_path())
            .chain(FileCategory::ALL.iter().map(|c| self.folder(*c)));
        for dir in all {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

fn default_base_path(env: &HostEnvironment) -> Result<PathBuf, StorageError> {
    if env.is_packaged {
        env.app_data_root
            .as_ref()
            .map(|root| root.join(&env.app_name))
            .ok_or(StorageError::NoDataRoot)
    } else {
        env.home_dir
            .as_ref()
            .map(|home| home.join(DEV_DATA_DIR))
            .ok_or(StorageError::NoDataRoot)
    }
}

/// Resolve the storage layout and make sure every folder exists.
pub fn resolve_paths(
    config: Option<&AppConfig>,
    env: &HostEnvironment,
) -> Result<AppDataPaths, StorageError> {
    let paths = AppDataPaths::plan(config, env)?;
    paths.ensure_dirs()?;
    log::debug!("[STORAGE] Resolved base path {}", paths.base_path.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(path: &str, enabled: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.file_storage.custom_path = Some(path.to_string());
        config.file_storage.use_custom_path = enabled;
        config
    }

    #[test]
    fn custom_path_wins_regardless_of_packaging() {
        let config = custom("/tmp/x", true);
        for packaged in [true, false] {
            let env = HostEnvironment::rooted_at("/sandbox", packaged);
            let paths = AppDataPaths::plan(Some(&config), &env).unwrap();
            assert_eq!(paths.base_path, PathBuf::from("/tmp/x"));
            assert_eq!(paths.folders.images, PathBuf::from("/tmp/x/images"));
        }
    }

    #[test]
    fn disabled_custom_path_is_ignored() {
        let config = custom("/tmp/x", false);
        let env = HostEnvironment::rooted_at("/sandbox", true);
        let paths = AppDataPaths::plan(Some(&config), &env).unwrap();
        assert_eq!(paths.base_path, PathBuf::from("/sandbox/appdata/HdSome"));
    }

    #[test]
    fn dev_run_uses_home_fallback() {
        let env = HostEnvironment::rooted_at("/sandbox", false);
        let paths = AppDataPaths::plan(None, &env).unwrap();
        assert_eq!(paths.base_path, PathBuf::from("/sandbox/home/.hdsome-dev"));
        assert_eq!(
            paths.folders.messages,
            PathBuf::from("/sandbox/home/.hdsome-dev/messages")
        );
    }

    #[test]
    fn configured_folder_names_are_used() {
        let mut config = AppConfig::default();
        config.file_storage.folders.videos = "clips".to_string();
        config.file_storage.folders.audio = "  ".to_string();
        let env = HostEnvironment::rooted_at("/sandbox", true);
        let paths = AppDataPaths::plan(Some(&config), &env).unwrap();
        assert!(paths.folders.videos.ends_with("clips"));
        assert!(paths.folders.audio.ends_with("audio"));
    }

    #[test]
    fn escaping_folder_names_fall_back_to_defaults() {
        let mut config = custom("/data/chat", true);
        config.file_storage.folders.images = "/etc".to_string();
        config.file_storage.folders.files = "../outside".to_string();
        config.file_storage.folders.audio = "..".to_string();
        let env = HostEnvironment::rooted_at("/sandbox", false);

        let paths = AppDataPaths::plan(Some(&config), &env).unwrap();
        assert_eq!(paths.folders.images, PathBuf::from("/data/chat/images"));
        assert_eq!(paths.folders.files, PathBuf::from("/data/chat/files"));
        assert_eq!(paths.folders.audio, PathBuf::from("/data/chat/audio"));
        for category in FileCategory::ALL {
            assert_eq!(paths.folder(category).parent(), Some(paths.base_path.as_path()));
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let config = custom("/tmp/y", true);
        let env = HostEnvironment::rooted_at("/sandbox", false);
        assert_eq!(
            AppDataPaths::plan(Some(&config), &env).unwrap(),
            AppDataPaths::plan(Some(&config), &env).unwrap()
        );
    }

    #[test]
    fn missing_data_root_is_an_error() {
        let mut env = HostEnvironment::rooted_at("/sandbox", true);
        env.app_data_root = None;
        assert!(matches!(
            AppDataPaths::plan(None, &env),
            Err(StorageError::NoDataRoot)
        ));
    }

    #[test]
    fn resolve_creates_every_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = custom(&dir.path().join("root").to_string_lossy(), true);
        let env = HostEnvironment::rooted_at(dir.path(), false);

        let paths = resolve_paths(Some(&config), &env).unwrap();
        assert!(paths.base_path.is_dir());
        for category in FileCategory::ALL {
            assert!(paths.folder(category).is_dir());
        }
    }

    #[test]
    fn resolve_fails_when_base_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = custom(&blocker.to_string_lossy(), true);
        let env = HostEnvironment::rooted_at(dir.path(), false);

        assert!(matches!(
            resolve_paths(Some(&config), &env),
            Err(StorageError::CreateDir { .. })
        ));
    }
}
