//! # Resource 模块
//!
//! 异步 JSON 资源加载的接缝。
//!
//! 会话把一个 [`JsonResponder`] 交给资源管理器后立即返回；
//! 资源管理器在任意时刻（可以是另一个线程）调用 `respond`，
//! 结果在会话下一次轮询（`is_running` / `end_frame` / `poll_resources`）时生效。

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use thiserror::Error;
use tracing::debug;

/// 资源错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 读取失败
    #[error("读取资源 '{name}' 失败: {message}")]
    Io { name: String, message: String },

    /// 内容不是合法 JSON
    #[error("资源 '{name}' 不是合法的 JSON: {message}")]
    InvalidJson { name: String, message: String },
}

/// 一次加载完成的结果
pub(crate) struct LoadedResource {
    pub start: String,
    pub result: Result<serde_json::Value, ResourceError>,
}

/// 加载结果回传句柄
///
/// 只能回传一次。
pub struct JsonResponder {
    name: String,
    start: String,
    sender: Sender<LoadedResource>,
}

impl JsonResponder {
    pub(crate) fn new(name: String, start: String, sender: Sender<LoadedResource>) -> Self {
        Self {
            name,
            start,
            sender,
        }
    }

    /// 请求的资源名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 回传加载结果
    pub fn respond(self, result: Result<serde_json::Value, ResourceError>) {
        // 会话已被销毁时接收端不存在，结果直接丢弃
        if self
            .sender
            .send(LoadedResource {
                start: self.start,
                result,
            })
            .is_err()
        {
            debug!(resource = %self.name, "会话已销毁，丢弃加载结果");
        }
    }
}

/// JSON 资源管理器
pub trait JsonResourceManager {
    /// 请求加载资源，完成后通过 `responder` 回传
    fn load_json(&mut self, name: &str, responder: JsonResponder);
}

/// 基于文件系统的资源管理器
///
/// 读取 `<root>/<name>`，立即回传。
#[derive(Debug, Clone)]
pub struct FsJsonResources {
    root: PathBuf,
}

impl FsJsonResources {
    /// 创建资源管理器
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 资源根目录
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// 同步读取并解析资源
    pub fn read(&self, name: &str) -> Result<serde_json::Value, ResourceError> {
        let path = self.root.join(name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.display().to_string())
            } else {
                ResourceError::Io {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        serde_json::from_str(&text).map_err(|e| ResourceError::InvalidJson {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

impl JsonResourceManager for FsJsonResources {
    fn load_json(&mut self, name: &str, responder: JsonResponder) {
        responder.respond(self.read(name));
    }
}
