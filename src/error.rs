use std::fmt;
use std::error::Error as StdError;
use serde::{Serialize, Deserialize};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};

/// 服务错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerError {
    /// 内部错误
    Internal(String),
    /// 配置错误
    Configuration(String),
    /// 网络错误（请求未到达或响应读取失败）
    Network(String),
    /// 序列化错误
    Serialization(String),
    /// 推送网关返回的错误
    Gateway(String),
    /// 文档存储读取错误
    Store(String),
    /// 无效的请求
    InvalidRequest(String),
    /// 资源未找到
    NotFound(String),
    /// 未授权
    Unauthorized(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ServerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Network(msg) => write!(f, "Network error: {}", msg),
            ServerError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ServerError::Gateway(msg) => write!(f, "Gateway error: {}", msg),
            ServerError::Store(msg) => write!(f, "Store error: {}", msg),
            ServerError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl StdError for ServerError {}

impl ServerError {
    /// 错误码（用于 HTTP 响应体）
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Internal(_) => "INTERNAL",
            ServerError::Configuration(_) => "CONFIGURATION",
            ServerError::Network(_) => "NETWORK",
            ServerError::Serialization(_) => "SERIALIZATION",
            ServerError::Gateway(_) => "GATEWAY",
            ServerError::Store(_) => "STORE",
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidRequest(_) | ServerError::Serialization(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Gateway(_) | ServerError::Network(_) | ServerError::Store(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::new(&self);
        (status_code, Json(error_response)).into_response()
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ServerError {
    fn from(err: toml::de::Error) -> Self {
        ServerError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServerError::Serialization(err.to_string())
        } else {
            ServerError::Network(err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ServerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServerError::Configuration(format!("service account signing failed: {}", err))
    }
}

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(err: &ServerError) -> Self {
        Self {
            error: ErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
