use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// 错误根因的对象安全形态，可在线程间移动。
pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

/// `tenon` 全部公共契约共享的结果别名。
pub type CoreResult<T> = Result<T, CoreError>;

/// `CoreError` 是 `tenon` 跨模块共享的稳定错误形态。
///
/// # 设计背景（Why）
/// - 代理解析、Bean 调用与 Pipeline 执行都会产生故障，异常处理层需要在不感知具体来源的前提下
///   记录、翻译并重新抛出它们，因此必须合流为同一种错误货币。
/// - 稳定错误码让日志与上层策略按语义分流，而不是解析自然语言描述。
///
/// # 契约说明（What）
/// - `code`：`'static` 点分错误码，优先使用 [`codes`] 中的常量；
/// - `message`：面向排障人员的描述，不应包含敏感信息；
/// - `cause`：可选底层原因，经由 [`StdError::source`] 暴露。
///
/// # 设计取舍（Trade-offs）
/// - 结构体只承载信息，不负责日志或翻译；这些职责属于 Pipeline 的异常处理层。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 示例（Examples）
    /// ```rust
    /// use tenon_core::{CoreError, error::codes};
    ///
    /// let err = CoreError::new(codes::PROXY_TARGET_ABSENT, "no target bound");
    /// assert_eq!(err.code(), codes::PROXY_TARGET_ABSENT);
    /// assert!(err.cause().is_none());
    /// ```
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 沿错误链向下查找首个 `CoreError`（包括自身）中码值匹配的节点。
    ///
    /// # 契约说明（What）
    /// - 翻译器经常把原始错误包进 `pipeline.processing`，调用方借此在不展开链路的情况下找回业务错误；
    /// - 仅识别以 `CoreError` 形态出现在链上的节点，其他错误类型会被跳过。
    pub fn find_code(&self, code: &str) -> Option<&CoreError> {
        let mut current: Option<&(dyn StdError + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(core) = err.downcast_ref::<CoreError>() {
                if core.code == code {
                    return Some(core);
                }
            }
            current = err.source();
        }
        None
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

/// 稳定错误码目录。
///
/// # 命名约定
/// - 采用 `<域>.<语义>` 形式，域对应模块：`proxy`、`bean`、`pipeline`、`settings`；
/// - 码值一经发布不得改名，只能新增。
pub mod codes {
    /// 调用需要目标实例，但代理未绑定目标（或目标解析为空）。
    pub const PROXY_TARGET_ABSENT: &str = "proxy.target_absent";
    /// 分发表中不存在对应 `(接口, 方法)` 的转发入口。
    pub const PROXY_UNSUPPORTED_CALL: &str = "proxy.unsupported_call";
    /// 参数位置越界或参数已被取走。
    pub const PROXY_ARGUMENT_MISSING: &str = "proxy.argument_missing";
    /// 参数类型与期望类型不一致。
    pub const PROXY_ARGUMENT_TYPE: &str = "proxy.argument_type";
    /// 处理器返回值类型与能力接口声明不一致。
    pub const PROXY_RETURN_TYPE: &str = "proxy.return_type";
    /// Bean 注册无法提供实例。
    pub const BEAN_INSTANCE_UNAVAILABLE: &str = "bean.instance_unavailable";
    /// 经异常翻译后的统一处理失败。
    pub const PIPELINE_PROCESSING: &str = "pipeline.processing";
    /// 执行上下文激活失败。
    pub const PIPELINE_CONTEXT: &str = "pipeline.context";
    /// 配置非法或无法加载。
    pub const SETTINGS_INVALID: &str = "settings.invalid";
}
