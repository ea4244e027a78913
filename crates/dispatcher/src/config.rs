use serde::{Deserialize, Serialize};

use jobq_domain::{QueueError, QueueResult};

const MAX_CONCURRENT_JOBS_LIMIT: usize = 10_000;

/// 调度引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 并发上限：同时处于 RUNNING 状态的任务数不超过该值
    pub max_concurrent_jobs: usize,
    /// 调度循环的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 创建任务未指定超时时使用的默认超时（毫秒）
    pub default_timeout_ms: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            poll_interval_ms: 1000,
            default_timeout_ms: 300_000,
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> QueueResult<()> {
        if self.max_concurrent_jobs == 0 || self.max_concurrent_jobs > MAX_CONCURRENT_JOBS_LIMIT {
            return Err(QueueError::config_error(format!(
                "queue.max_concurrent_jobs must be between 1 and {MAX_CONCURRENT_JOBS_LIMIT}"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(QueueError::config_error(
                "queue.poll_interval_ms must be greater than 0",
            ));
        }
        if self.default_timeout_ms <= 0 {
            return Err(QueueError::config_error(
                "queue.default_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// 从 TOML 文件加载配置并校验
    pub fn from_toml_file(path: &str) -> QueueResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QueueError::config_error(format!("读取配置文件失败: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| QueueError::config_error(format!("解析配置文件失败: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_config_validation() {
        let config = QueueConfig {
            max_concurrent_jobs: 8,
            poll_interval_ms: 500,
            default_timeout_ms: 60_000,
        };
        assert!(config.validate().is_ok());

        // Test invalid max_concurrent_jobs
        let mut invalid_config = config.clone();
        invalid_config.max_concurrent_jobs = 0;
        assert!(invalid_config.validate().is_err());

        // Test invalid poll_interval_ms
        let mut invalid_config = config.clone();
        invalid_config.poll_interval_ms = 0;
        assert!(invalid_config.validate().is_err());

        // Test invalid default_timeout_ms
        let mut invalid_config = config.clone();
        invalid_config.default_timeout_ms = -1;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = QueueConfig {
            max_concurrent_jobs: 3,
            poll_interval_ms: 250,
            default_timeout_ms: 10_000,
        };

        let serialized = serde_json::to_string(&config).expect("Failed to serialize");
        let deserialized: QueueConfig =
            serde_json::from_str(&serialized).expect("Failed to deserialize");

        assert_eq!(config.max_concurrent_jobs, deserialized.max_concurrent_jobs);
        assert_eq!(config.poll_interval_ms, deserialized.poll_interval_ms);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_concurrent_jobs = 2\npoll_interval_ms = 100\ndefault_timeout_ms = 5000"
        )
        .unwrap();

        let config = QueueConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.default_timeout_ms, 5000);
    }

    #[test]
    fn test_from_toml_file_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_jobs = 7").unwrap();

        let config = QueueConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.max_concurrent_jobs, 7);
        assert_eq!(config.poll_interval_ms, 1000);
    }
}
