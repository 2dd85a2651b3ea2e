//! # Config 模块
//!
//! 播放器配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (player.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 预先登记的角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// 角色 id（对话中 `id: 文本` 的前缀）
    pub id: String,
    /// 显示名
    #[serde(default)]
    pub name: String,
    /// 颜色
    #[serde(default)]
    pub color: String,
}

/// 播放器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// 对话资源目录
    #[serde(default = "default_dialogue_root")]
    pub dialogue_root: PathBuf,

    /// 起始节点
    #[serde(default = "default_start_node")]
    pub start_node: String,

    /// 逐字显示间隔（毫秒）
    #[serde(default = "default_scroll_interval_ms")]
    pub scroll_interval_ms: u64,

    /// 选项光标
    #[serde(default = "default_option_cursor")]
    pub option_cursor: String,

    /// 存档文件
    #[serde(default)]
    pub save_path: Option<PathBuf>,

    /// 播放前登记的角色
    #[serde(default)]
    pub actors: Vec<ActorConfig>,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// 默认值函数
fn default_dialogue_root() -> PathBuf {
    PathBuf::from("dialogues")
}

fn default_start_node() -> String {
    "Start".to_string()
}

fn default_scroll_interval_ms() -> u64 {
    30
}

fn default_option_cursor() -> String {
    "> ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            dialogue_root: default_dialogue_root(),
            start_node: default_start_node(),
            scroll_interval_ms: default_scroll_interval_ms(),
            option_cursor: default_option_cursor(),
            save_path: None,
            actors: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl PlayerConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 日志级别
    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::ValidationFailed(format!("无效的日志级别: {}", self.log_level)))
    }

    /// 解析对话文件路径：存在则直接使用，否则相对于对话资源目录
    pub fn resolve_dialogue_path(&self, file: &Path) -> PathBuf {
        if file.exists() || file.is_absolute() {
            file.to_path_buf()
        } else {
            self.dialogue_root.join(file)
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_node.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "必须配置 start_node（起始节点）".to_string(),
            ));
        }

        if self.option_cursor.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "option_cursor 不能为空".to_string(),
            ));
        }

        self.tracing_level()?;

        for actor in &self.actors {
            if actor.id.is_empty()
                || actor.id.contains('.')
                || actor.id.chars().any(char::is_whitespace)
            {
                return Err(ConfigError::ValidationFailed(format!(
                    "无效的角色 id: '{}'（不能为空，不能包含 '.' 或空白）",
                    actor.id
                )));
            }
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// 序列化失败
    SerializationFailed(String),
    /// 解析失败
    ParseFailed(String),
    /// IO 错误
    IoError(String),
    /// 验证失败
    ValidationFailed(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::SerializationFailed(e) => write!(f, "配置序列化失败: {}", e),
            ConfigError::ParseFailed(e) => write!(f, "配置解析失败: {}", e),
            ConfigError::IoError(e) => write!(f, "配置 IO 错误: {}", e),
            ConfigError::ValidationFailed(e) => write!(f, "配置验证失败: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
