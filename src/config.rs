use crate::error::{ConfigError, Result};
use serde::Deserialize;
use serde::Serialize;

/// 持久化相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// 存储 blob 的 JSON 文件路径（支持 `~` 展开）
    pub path: String,
    /// 是否以 pretty JSON 落盘
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

/// 通知通道配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventsConfig {
    /// 每个 broadcast 通道的缓冲容量
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        let config: Config = serde_yaml::from_reader(file)?;
        if config.events.buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "events.buffer".to_string(),
                message: "buffer 必须大于 0".to_string(),
            }
            .into());
        }
        Ok(config)
    }
}

fn default_pretty() -> bool {
    true
}

fn default_buffer() -> usize {
    64
}
