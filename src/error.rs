use std::fmt;

/// Checkpoint Store 的统一错误类型
#[derive(Debug)]
pub enum CheckpointError {
    /// 存储结构相关错误
    Store(StoreError),
    /// 持久化错误
    Persist(PersistError),
    /// 配置错误
    Config(ConfigError),
    /// IO 错误
    Io(std::io::Error),
    /// 其他错误
    Other(String),
}

/// 存储结构相关错误
#[derive(Debug)]
pub enum StoreError {
    /// 文件条目不存在
    FileNotFound(String),
    /// Checkpoint 不存在
    CheckpointNotFound(String),
    /// 持久化数据损坏或形态不符
    Corrupted(String),
}

/// 持久化错误
#[derive(Debug)]
pub enum PersistError {
    /// 序列化/反序列化失败
    Serialization(String),
    /// 底层槽位读写失败
    Io(String),
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),
    /// 配置解析失败
    ParseFailed(String),
    /// 配置值无效
    InvalidValue { field: String, message: String },
}

// 实现 Display trait
impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Store(e) => write!(f, "Store Error: {}", e),
            CheckpointError::Persist(e) => write!(f, "Persist Error: {}", e),
            CheckpointError::Config(e) => write!(f, "Config Error: {}", e),
            CheckpointError::Io(e) => write!(f, "IO Error: {}", e),
            CheckpointError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::FileNotFound(id) => write!(f, "File '{}' not found", id),
            StoreError::CheckpointNotFound(id) => write!(f, "Checkpoint '{}' not found", id),
            StoreError::Corrupted(msg) => write!(f, "Corrupted store data: {}", msg),
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            PersistError::Io(msg) => write!(f, "Slot IO error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseFailed(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid config value for '{}': {}", field, message)
            }
        }
    }
}

// 实现 std::error::Error trait
impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckpointError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for StoreError {}
impl std::error::Error for PersistError {}
impl std::error::Error for ConfigError {}

// From 转换实现
impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::Io(err)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(err: serde_json::Error) -> Self {
        CheckpointError::Persist(PersistError::Serialization(err.to_string()))
    }
}

impl From<serde_yaml::Error> for CheckpointError {
    fn from(err: serde_yaml::Error) -> Self {
        CheckpointError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

impl From<StoreError> for CheckpointError {
    fn from(err: StoreError) -> Self {
        CheckpointError::Store(err)
    }
}

impl From<PersistError> for CheckpointError {
    fn from(err: PersistError) -> Self {
        CheckpointError::Persist(err)
    }
}

impl From<ConfigError> for CheckpointError {
    fn from(err: ConfigError) -> Self {
        CheckpointError::Config(err)
    }
}

// 便捷的 Result 类型别名
pub type Result<T> = std::result::Result<T, CheckpointError>;
