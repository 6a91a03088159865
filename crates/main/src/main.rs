//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。配置了 DATABASE_URL 时使用
//! PostgreSQL 仓储，否则退化为内存存储（开发/演示模式）。

use std::sync::Arc;

use application::{
    CallService, CallServiceDependencies, GroupRepository, GroupService, GroupServiceDependencies,
    MessageRepository, MessageService, MessageServiceDependencies, PresenceRegistry,
    ReactionService, ReactionServiceDependencies, ReceiptService, ReceiptServiceDependencies,
    SystemClock, UserRepository, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, InMemoryGroupRepository, InMemoryMessageRepository,
    InMemoryUserRepository, PgGroupRepository, PgMessageRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();

    // 仓储选择：有数据库用 PostgreSQL，没有就退化为内存存储
    let (message_repository, group_repository, user_repository): (
        Arc<dyn MessageRepository>,
        Arc<dyn GroupRepository>,
        Arc<dyn UserRepository>,
    ) = match &config.database.url {
        Some(url) => {
            tracing::info!(
                "连接数据库: {}",
                url.split('@').next_back().unwrap_or("unknown")
            );
            let pool = create_pg_pool(url, config.database.max_connections).await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            (
                Arc::new(PgMessageRepository::new(pool.clone())),
                Arc::new(PgGroupRepository::new(pool.clone())),
                Arc::new(PgUserRepository::new(pool)),
            )
        }
        None => {
            tracing::warn!("未配置 DATABASE_URL，使用内存存储（重启后数据丢失）");
            (
                Arc::new(InMemoryMessageRepository::new()),
                Arc::new(InMemoryGroupRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
            )
        }
    };

    let presence = Arc::new(PresenceRegistry::new());
    let clock = Arc::new(SystemClock);
    let password_hasher = Arc::new(match config.server.bcrypt_cost {
        Some(cost) => BcryptPasswordHasher::new(cost),
        None => BcryptPasswordHasher::default(),
    });

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository,
        password_hasher,
        presence: presence.clone(),
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
        group_repository: group_repository.clone(),
        message_repository: message_repository.clone(),
        presence: presence.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: message_repository.clone(),
        group_repository: group_repository.clone(),
        presence: presence.clone(),
        clock,
    }));
    let receipt_service = Arc::new(ReceiptService::new(ReceiptServiceDependencies {
        message_repository: message_repository.clone(),
        group_repository: group_repository.clone(),
        presence: presence.clone(),
    }));
    let reaction_service = Arc::new(ReactionService::new(ReactionServiceDependencies {
        message_repository,
        group_repository,
        presence: presence.clone(),
    }));
    let call_service = Arc::new(CallService::new(CallServiceDependencies {
        presence: presence.clone(),
    }));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState {
        user_service,
        group_service,
        message_service,
        receipt_service,
        reaction_service,
        call_service,
        presence,
        jwt_service,
    };

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
