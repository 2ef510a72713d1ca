use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 会话状态错误（例如空试卷提交）
    #[error("会话错误: {0}")]
    Session(String),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
///
/// 与后端交互时的四类失败：资源不存在、传输失败、服务端拒绝、结果为空。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 资源不存在（试卷或成绩）
    #[error("资源不存在: {resource}")]
    NotFound { resource: String },

    /// 网络或解析失败，没有结构化的服务端消息
    #[error("API请求失败 ({endpoint}): {reason}")]
    TransportFailure { endpoint: String, reason: String },

    /// 非 2xx 响应，可能带有服务端 `error` 字段
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    ServerRejected {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    /// 响应格式正确但内容为空（例如空白摘要）
    #[error("API返回空结果: {endpoint}")]
    EmptyResult { endpoint: String },
}

impl ApiError {
    pub fn transport(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        ApiError::TransportFailure {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn rejected(endpoint: impl Into<String>, status: u16, message: Option<String>) -> Self {
        ApiError::ServerRejected {
            endpoint: endpoint.into(),
            status,
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn empty(endpoint: impl Into<String>) -> Self {
        ApiError::EmptyResult {
            endpoint: endpoint.into(),
        }
    }

    /// 服务端给出的错误消息（仅 `ServerRejected` 才有）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::ServerRejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// 面向用户展示的消息
    ///
    /// 优先使用服务端消息，否则按错误类别给出通用文案。
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound { resource } => format!("{} not found.", resource),
            ApiError::ServerRejected {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::ServerRejected { .. } | ApiError::TransportFailure { .. } => {
                "Request failed.".to_string()
            }
            ApiError::EmptyResult { .. } => "No data returned.".to_string(),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {reason}")]
    ReadFailed { path: String, reason: String },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {reason}")]
    TomlParseFailed { path: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        AppError::Api(ApiError::transport(endpoint, err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::transport("json", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(),
            reason: err.to_string(),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== Result 类型别名 ==========

/// API 结果类型
pub type ApiResult<T> = Result<T, ApiError>;

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
