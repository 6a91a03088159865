use thiserror::Error;

/// 持久化层错误
///
/// 仓储实现将底层存储错误统一收敛成这三类，应用层据此决定
/// 返回 404、409 还是 500。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
