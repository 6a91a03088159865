//! WebSocket 连接管理
//!
//! 封装单个连接的完整生命周期：升级完成即视为登录握手成功，
//! 注册在线状态并触发 user_list 广播；之后接收循环逐帧串行
//! 处理客户端事件（保证同一发送方的消息顺序），发送任务独占
//! socket 写端转发推送帧；断开时携带连接 id 注销，迟到的
//! 断开不会挤掉同一用户的新登录。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use application::{ConnectionHandle, ServerEvent};
use domain::UserId;

use crate::state::AppState;
use crate::websocket::dispatch_client_event;

pub struct ClientConnection {
    socket: Option<WebSocket>,
    state: AppState,
    user_id: UserId,
    connection_id: Uuid,
}

impl ClientConnection {
    pub fn new(socket: WebSocket, state: AppState, user_id: Uuid) -> Self {
        Self {
            socket: Some(socket),
            state,
            user_id: UserId::from(user_id),
            connection_id: Uuid::new_v4(),
        }
    }

    /// 运行连接主循环，直到任一方向关闭。
    pub async fn run(mut self) {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => return,
        };
        let (mut sender, mut incoming) = socket.split();

        // 推送通道就是在线状态注册表里的连接句柄
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
        self.state
            .presence
            .set_online(
                self.user_id,
                ConnectionHandle::new(self.connection_id, event_tx),
            )
            .await;

        tracing::info!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            "WebSocket 连接已建立"
        );

        // 发送任务：统一序列化所有推送帧
        let send_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "推送帧序列化失败");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        // 接收任务：逐帧处理，单条连接上的事件严格按提交顺序执行
        let recv_state = self.state.clone();
        let recv_user = self.user_id;
        let recv_task = tokio::spawn(async move {
            while let Some(Ok(frame)) = incoming.next().await {
                match frame {
                    WsMessage::Text(text) => {
                        dispatch_client_event(&recv_state, recv_user, text.as_str()).await;
                    }
                    WsMessage::Close(_) => {
                        tracing::debug!(user_id = %recv_user, "客户端主动关闭连接");
                        break;
                    }
                    // ping/pong 由底层协议栈自动应答
                    WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                    WsMessage::Binary(_) => {
                        tracing::debug!(user_id = %recv_user, "忽略二进制帧");
                    }
                }
            }
        });

        // 任一方向结束即视为连接断开
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }

        // 只有句柄仍然匹配才注销，保护同一用户的新登录
        self.state
            .presence
            .set_offline(self.user_id, self.connection_id)
            .await;

        tracing::info!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            "WebSocket 连接已断开"
        );
    }
}
