mod file_config;

pub use file_config::{FetchConfig, FileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Values taken from the process environment.
/// This struct mirrors the environment variables that can be overridden by
/// TOML config.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub data_dir: Option<PathBuf>,
    pub media_root: Option<PathBuf>,
    pub photo_cache_dir: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub fetch_program: Option<PathBuf>,
    pub fetch_workdir: Option<PathBuf>,
    pub fetch_source: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        fn path(name: &str) -> Option<PathBuf> {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        }
        fn string(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            data_dir: path("LISTS_DIR"),
            media_root: path("MUSIC_DIR"),
            photo_cache_dir: path("LISTS_PHOTO_DIR"),
            webhook_url: string("DISCORD_WEBHOOK_URL"),
            fetch_program: path("FETCH_PROGRAM"),
            fetch_workdir: path("FETCH_WORKDIR"),
            fetch_source: string("FETCH_SOURCE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub media_root: PathBuf,
    pub photo_cache_dir: PathBuf,
    pub webhook_url: Option<String>,

    // Fetch settings (with defaults)
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub enabled: bool, // true if program is set
    pub program: Option<PathBuf>,
    pub workdir: PathBuf,
    pub source: String,
}

impl AppConfig {
    /// Resolve configuration from the environment and optional TOML file
    /// config. TOML values override environment values where present.
    pub fn resolve(env: &EnvConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides environment for each field
        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| env.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via LISTS_DIR or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let media_root = file
            .media_root
            .map(PathBuf::from)
            .or_else(|| env.media_root.clone())
            .unwrap_or_else(|| data_dir.clone());

        let photo_cache_dir = file
            .photo_cache_dir
            .map(PathBuf::from)
            .or_else(|| env.photo_cache_dir.clone())
            .unwrap_or_else(|| data_dir.join("photo_cache"));

        let webhook_url = file.webhook_url.or_else(|| env.webhook_url.clone());

        // Fetch settings - merge file config with environment and defaults
        let fetch_file = file.fetch.unwrap_or_default();
        let program = fetch_file
            .program
            .map(PathBuf::from)
            .or_else(|| env.fetch_program.clone());
        let workdir = fetch_file
            .workdir
            .map(PathBuf::from)
            .or_else(|| env.fetch_workdir.clone())
            .or_else(|| program.as_ref().and_then(|p| p.parent().map(PathBuf::from)))
            .unwrap_or_else(|| data_dir.clone());
        let source = fetch_file
            .source
            .or_else(|| env.fetch_source.clone())
            .unwrap_or_else(|| "qobuz".to_string());

        if let Some(ref program) = program {
            if !program.exists() {
                bail!("Fetch program not found: {:?}", program);
            }
        }

        let fetch = FetchSettings {
            enabled: program.is_some(),
            program,
            workdir,
            source,
        };

        Ok(Self {
            data_dir,
            media_root,
            photo_cache_dir,
            webhook_url,
            fetch,
        })
    }

    pub fn watchlist_db_path(&self) -> PathBuf {
        self.data_dir.join("watchlist.db")
    }

    /// Location of the pre-database flat artist list, imported once.
    pub fn legacy_artists_path(&self) -> PathBuf {
        self.data_dir.join("artists.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_data_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_resolve_env_only() {
        let temp_dir = make_temp_data_dir();
        let env = EnvConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            media_root: Some(PathBuf::from("/music")),
            photo_cache_dir: Some(PathBuf::from("/photos")),
            webhook_url: Some("https://discord.example/hook".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&env, None).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.media_root, PathBuf::from("/music"));
        assert_eq!(config.photo_cache_dir, PathBuf::from("/photos"));
        assert_eq!(
            config.webhook_url,
            Some("https://discord.example/hook".to_string())
        );
        assert!(!config.fetch.enabled);
    }

    #[test]
    fn test_resolve_toml_overrides_env() {
        let temp_dir = make_temp_data_dir();
        let env = EnvConfig {
            data_dir: Some(PathBuf::from("/should/be/overridden")),
            media_root: Some(PathBuf::from("/env/music")),
            ..Default::default()
        };
        let file_config = FileConfig {
            data_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            media_root: Some("/toml/music".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&env, Some(file_config)).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.media_root, PathBuf::from("/toml/music"));
    }

    #[test]
    fn test_resolve_missing_data_dir_error() {
        let result = AppConfig::resolve(&EnvConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("data_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_data_dir_error() {
        let env = EnvConfig {
            data_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&env, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_defaults_derive_from_data_dir() {
        let temp_dir = make_temp_data_dir();
        let env = EnvConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&env, None).unwrap();
        assert_eq!(config.media_root, temp_dir.path());
        assert_eq!(config.photo_cache_dir, temp_dir.path().join("photo_cache"));
        assert_eq!(config.fetch.workdir, temp_dir.path());
        assert_eq!(config.fetch.source, "qobuz");
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_resolve_fetch_program_must_exist() {
        let temp_dir = make_temp_data_dir();
        let env = EnvConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            fetch_program: Some(PathBuf::from("/no/such/orpheus.py")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&env, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Fetch program not found"));
    }

    #[test]
    fn test_resolve_fetch_workdir_defaults_to_program_parent() {
        let temp_dir = make_temp_data_dir();
        let program = temp_dir.path().join("dl").join("run.py");
        std::fs::create_dir_all(program.parent().unwrap()).unwrap();
        std::fs::write(&program, b"#!/usr/bin/env python3\n").unwrap();

        let env = EnvConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            fetch_program: Some(program.clone()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&env, None).unwrap();
        assert!(config.fetch.enabled);
        assert_eq!(config.fetch.workdir, temp_dir.path().join("dl"));
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_data_dir();
        let env = EnvConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&env, None).unwrap();

        assert_eq!(
            config.watchlist_db_path(),
            temp_dir.path().join("watchlist.db")
        );
        assert_eq!(
            config.legacy_artists_path(),
            temp_dir.path().join("artists.txt")
        );
    }

    #[test]
    fn test_file_config_load() {
        let temp_dir = make_temp_data_dir();
        let path = temp_dir.path().join("listarr.toml");
        std::fs::write(
            &path,
            r#"
media_root = "/srv/music"

[fetch]
source = "tidal"
"#,
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.media_root.as_deref(), Some("/srv/music"));
        assert_eq!(file.fetch.unwrap().source.as_deref(), Some("tidal"));
    }
}
