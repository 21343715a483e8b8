//! runtime configuration, loaded from an optional toml file.

use {
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

/// the environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "RKTOP_CONFIG";

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// the refresh period, in milliseconds.
    pub interval_ms: u64,
    /// how many rows the process table shows.
    pub top_processes: usize,
    /// refuse to start unless running as root.
    pub require_root: bool,
    /// how long an external tool may run before it is killed, in milliseconds.
    pub command_timeout_ms: u64,
    /// the tool used to scan the npu runtime library for its version.
    pub strings_program: String,
    /// where logs are written. the dashboard owns the terminal, so without this, nothing is
    /// logged.
    pub log_file: Option<PathBuf>,
    pub paths: Paths,
}

/// the files each source reads.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub model: PathBuf,
    pub cpuinfo: PathBuf,
    pub stat: PathBuf,
    pub npu_load: PathBuf,
    pub npu_version: PathBuf,
    pub npu_runtime: PathBuf,
    pub gpu_load: PathBuf,
    pub zram: PathBuf,
    pub thermal: PathBuf,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            top_processes: 8,
            require_root: true,
            command_timeout_ms: 2000,
            strings_program: "strings".to_owned(),
            log_file: None,
            paths: Paths::default(),
        }
    }
}

impl Config {
    /// loads configuration from `path`, or from [`CONFIG_ENV`], or else uses the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_owned()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// parses and validates configuration from a string.
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.interval_ms > 0,
            "interval_ms must be > 0, got {}",
            self.interval_ms
        );
        anyhow::ensure!(
            self.top_processes > 0,
            "top_processes must be > 0, got {}",
            self.top_processes
        );
        anyhow::ensure!(
            self.command_timeout_ms > 0,
            "command_timeout_ms must be > 0, got {}",
            self.command_timeout_ms
        );
        anyhow::ensure!(
            !self.strings_program.is_empty(),
            "strings_program must be non-empty"
        );
        Ok(())
    }
}

// === impl Paths ===

impl Default for Paths {
    fn default() -> Self {
        Self {
            model: "/proc/device-tree/compatible".into(),
            cpuinfo: "/proc/cpuinfo".into(),
            stat: "/proc/stat".into(),
            npu_load: "/sys/kernel/debug/rknpu/load".into(),
            npu_version: "/sys/kernel/debug/rknpu/version".into(),
            npu_runtime: "/usr/lib/librknnrt.so".into(),
            gpu_load: "/sys/kernel/debug/mali0/dvfs_utilization".into(),
            zram: "/sys/block/zram0/mm_stat".into(),
            thermal: "/sys/class/thermal".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.top_processes, 8);
        assert!(config.require_root);
        assert_eq!(config.paths.stat, PathBuf::from("/proc/stat"));
    }

    #[test]
    fn overrides() {
        let config = Config::load_from_str(
            r#"
interval_ms = 500
require_root = false
log_file = "/tmp/rktop.log"

[paths]
npu_load = "/tmp/load"
"#,
        )
        .unwrap();
        assert_eq!(config.interval_ms, 500);
        assert!(!config.require_root);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/rktop.log")));
        assert_eq!(config.paths.npu_load, PathBuf::from("/tmp/load"));
        // untouched paths keep their defaults.
        assert_eq!(config.paths.zram, PathBuf::from("/sys/block/zram0/mm_stat"));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = Config::load_from_str("interval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn rejects_zero_top_processes() {
        let err = Config::load_from_str("top_processes = 0").unwrap_err();
        assert!(err.to_string().contains("top_processes"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config::load_from_str("command_timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("command_timeout_ms"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Config::load_from_str("intervl_ms = 10").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rktop.toml");
        std::fs::write(&path, "top_processes = 3\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.top_processes, 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/no/such/rktop.toml"))).is_err());
    }
}
