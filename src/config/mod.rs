use std::env;
use std::path::PathBuf;

/// Service configuration, loaded from the environment with coded defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum upload size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Scratch directory for uploaded files (default: "uploads")
    pub upload_dir: PathBuf,

    /// Scratch directory for unlocked output files (default: "outputs")
    pub output_dir: PathBuf,

    /// Age in hours after which stale scratch files are swept (default: 1)
    pub scratch_max_age_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100 MB
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            scratch_max_age_hours: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.output_dir),

            scratch_max_age_hours: env::var("SCRATCH_MAX_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.scratch_max_age_hours),
        }
    }

    /// Create config for development and tests (small uploads only)
    pub fn development() -> Self {
        Self {
            max_file_size: 16 * 1024 * 1024, // 16 MB
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.scratch_max_age_hours, 1);
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.max_file_size, 16 * 1024 * 1024);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_from_env_fallback() {
        unsafe { env::remove_var("MAX_FILE_SIZE") };
        unsafe { env::remove_var("SCRATCH_MAX_AGE_HOURS") };
        let config = AppConfig::from_env();
        let default_config = AppConfig::default();
        assert_eq!(config.max_file_size, default_config.max_file_size);
        assert_eq!(
            config.scratch_max_age_hours,
            default_config.scratch_max_age_hours
        );
    }
}
