//! Web API 层。
//!
//! axum HTTP 路由 + WebSocket 实时通道。REST 负责外围的
//! 请求/响应操作，WebSocket 承载登录握手之后的全部实时事件。

mod auth;
mod error;
mod routes;
mod state;
mod websocket;
mod ws_connection;

pub use auth::{Claims, JwtService, LoginResponse};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use websocket::ClientEvent;
