//! 领域模型错误定义
//!
//! 定义了系统中所有可能的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("group not found")]
    GroupNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("user is not a member of the group")]
    NotGroupMember,

    #[error("only the group admin may perform this action")]
    NotGroupAdmin,

    #[error("only the sender may delete a message for everyone")]
    NotMessageSender,

    #[error("operation not allowed")]
    OperationNotAllowed,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
