//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - JWT 认证
//! - 数据库连接（可选，未配置时退化为内存存储）

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: Option<u32>,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

/// 数据库配置。`url` 为空时使用内存仓储。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl AppConfig {
    /// 从环境变量加载配置
    /// JWT_SECRET 如果不存在将会 panic，确保生产环境不会使用不安全的默认值
    pub fn from_env() -> Self {
        Self {
            server: Self::server_from_env(),
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .expect("JWT_SECRET environment variable is required for production safety"),
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24),
            },
            database: Self::database_from_env(),
        }
    }

    /// 从环境变量加载配置，开发环境版本
    /// 提供不安全的默认值，仅用于测试和开发
    pub fn from_env_with_defaults() -> Self {
        Self {
            server: Self::server_from_env(),
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                    "dev-secret-key-not-for-production-use-minimum-32-chars".to_string()
                }),
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24),
            },
            database: Self::database_from_env(),
        }
    }

    fn server_from_env() -> ServerConfig {
        ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            bcrypt_cost: env::var("BCRYPT_COST").ok().and_then(|s| s.parse().ok()),
        }
    }

    fn database_from_env() -> DatabaseConfig {
        DatabaseConfig {
            url: env::var("DATABASE_URL").ok(),
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}
