//! 标准链路的装配配置。
//!
//! # 教案式概览
//! - **意图（Why）**：宿主需要在不改代码的前提下开关线程诊断、日志 span 等包装层，
//!   因此装配参数以 TOML 文档承载；
//! - **结构（How）**：[`PipelineSettings`] 通过 `serde` 反序列化，缺省字段取默认值，未知字段被拒绝；
//!   加载后立即校验；
//! - **契约（What）**：加载失败以 [`SettingsError`] 返回，可经 `?` 转换为 `settings.invalid` 核心错误。

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tenon_core::error::codes;
use tenon_core::thread_info::DEFAULT_WORKER_PREFIX;
use tenon_core::{CoreError, CoreResult, JobDescriptor, observability};
use thiserror::Error;

/// 标准链路装配参数。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// 是否装配线程命名层。
    pub thread_naming: bool,
    /// 是否装配诊断 span 层。
    pub diagnostic_span: bool,
    /// 由本配置创建的作业描述是否开启“失败时记录”。
    pub log_on_error: bool,
    /// 日志过滤指令，语法同 `RUST_LOG`。
    pub log_filter: String,
    /// 匿名工作线程的名称前缀。
    pub worker_prefix: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            thread_naming: true,
            diagnostic_span: true,
            log_on_error: true,
            log_filter: observability::DEFAULT_FILTER.to_owned(),
            worker_prefix: DEFAULT_WORKER_PREFIX.to_owned(),
        }
    }
}

impl PipelineSettings {
    /// 从 TOML 文本加载并校验。
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从 TOML 文件加载并校验。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.worker_prefix.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "worker_prefix",
                reason: "must not be blank",
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "log_filter",
                reason: "must not be blank",
            });
        }
        Ok(())
    }

    /// 以本配置的默认值创建作业描述。
    pub fn job(&self, name: impl Into<Cow<'static, str>>) -> JobDescriptor {
        JobDescriptor::new(name).log_on_error(self.log_on_error)
    }

    /// 以 `log_filter` 安装全局日志订阅者。
    pub fn init_logging(&self) -> CoreResult<()> {
        observability::init_logging(&self.log_filter)
    }
}

/// 配置加载错误。
#[derive(Debug, Error)]
pub enum SettingsError {
    /// 配置文件无法读取。
    #[error("failed to read settings from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 文档不是合法的 TOML，或字段类型不符、存在未知字段。
    #[error("malformed settings document: {0}")]
    Parse(#[from] toml::de::Error),
    /// 字段取值非法。
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl From<SettingsError> for CoreError {
    fn from(err: SettingsError) -> Self {
        CoreError::new(codes::SETTINGS_INVALID, err.to_string()).with_cause(err)
    }
}
