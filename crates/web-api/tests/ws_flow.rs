//! WebSocket 实时流程端到端测试
//!
//! 起一个真实监听的服务，经 REST 注册登录，再用 WebSocket
//! 客户端验证：登录握手后的 user_list 广播、私聊消息推送与
//! 确认、已读通知。

mod support;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream,
    WebSocketStream};
use uuid::Uuid;

use support::build_router;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 读下一条文本帧并解析成 JSON。
async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for websocket frame")
            .expect("websocket closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).expect("invalid json frame");
        }
    }
}

/// 一直读到指定类型的事件为止，跳过中间的其他广播。
async fn wait_for(ws: &mut WsClient, event_type: &str) -> Value {
    loop {
        let event = next_json(ws).await;
        if event["type"] == event_type {
            return event;
        }
    }
}

async fn register_and_login(client: &Client, base: &str, name: &str) -> (Uuid, String) {
    let email = format!("{name}@example.com");
    let user = client
        .post(format!("{base}/api/v1/auth/register"))
        .json(&json!({"name": name, "email": email, "password": "secret"}))
        .send()
        .await
        .expect("register")
        .json::<Value>()
        .await
        .expect("register json");
    let user_id = user["id"].as_str().unwrap().parse::<Uuid>().unwrap();

    let login = client
        .post(format!("{base}/api/v1/auth/login"))
        .json(&json!({"email": email, "password": "secret"}))
        .send()
        .await
        .expect("login")
        .json::<Value>()
        .await
        .expect("login json");
    let token = login["token"].as_str().unwrap().to_owned();

    (user_id, token)
}

#[tokio::test]
async fn private_message_flow_over_websocket() {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    let base_http = format!("http://{addr}");
    let client = Client::new();

    let (alice_id, alice_token) = register_and_login(&client, &base_http, "alice").await;
    let (bob_id, bob_token) = register_and_login(&client, &base_http, "bob").await;

    // 登录握手 = 带 token 的升级；成功后立即收到在线列表
    let (mut alice_ws, _) = connect_async(format!(
        "ws://{addr}/api/v1/ws?token={alice_token}"
    ))
    .await
    .expect("alice connect");
    let user_list = wait_for(&mut alice_ws, "user_list").await;
    assert_eq!(user_list["users"].as_array().unwrap().len(), 1);

    let (mut bob_ws, _) = connect_async(format!("ws://{addr}/api/v1/ws?token={bob_token}"))
        .await
        .expect("bob connect");
    let user_list = wait_for(&mut bob_ws, "user_list").await;
    assert!(user_list["users"]
        .as_array()
        .unwrap()
        .iter()
        .any(|id| id == &json!(alice_id)));

    // A 发私聊，B 在线：B 收到推送，A 收到 delivered=true 的确认
    alice_ws
        .send(WsMessage::Text(
            json!({
                "type": "private_message",
                "to": bob_id,
                "message": "hello bob"
            })
            .to_string()
            .into(),
        ))
        .await
        .expect("send private_message");

    let received = wait_for(&mut bob_ws, "receive_private_message").await;
    assert_eq!(received["message"]["body"], "hello bob");
    assert_eq!(received["message"]["sender_id"], json!(alice_id));

    let ack = wait_for(&mut alice_ws, "message_sent_ack").await;
    assert_eq!(ack["delivered"], json!(true));

    // B 打开会话标记已读，A 收到已读通知
    bob_ws
        .send(WsMessage::Text(
            json!({
                "type": "mark_read",
                "chat_id": alice_id,
                "is_group": false
            })
            .to_string()
            .into(),
        ))
        .await
        .expect("send mark_read");

    let read_update = wait_for(&mut alice_ws, "private_read_update").await;
    assert_eq!(read_update["reader"], json!(bob_id));

    // 历史接口里这条消息的回执已经补齐
    let history = client
        .get(format!(
            "{base_http}/api/v1/messages?chat_id={bob_id}&is_group=false"
        ))
        .header("authorization", format!("Bearer {alice_token}"))
        .send()
        .await
        .expect("history")
        .json::<Value>()
        .await
        .expect("history json");
    let messages = history.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0]["read_by"]
        .as_array()
        .unwrap()
        .iter()
        .any(|id| id == &json!(bob_id)));

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn disconnect_broadcasts_updated_user_list() {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    let base_http = format!("http://{addr}");
    let client = Client::new();

    let (_alice_id, alice_token) = register_and_login(&client, &base_http, "alice").await;
    let (bob_id, bob_token) = register_and_login(&client, &base_http, "bob").await;

    let (mut alice_ws, _) = connect_async(format!(
        "ws://{addr}/api/v1/ws?token={alice_token}"
    ))
    .await
    .expect("alice connect");
    wait_for(&mut alice_ws, "user_list").await;

    let (mut bob_ws, _) = connect_async(format!("ws://{addr}/api/v1/ws?token={bob_token}"))
        .await
        .expect("bob connect");
    wait_for(&mut bob_ws, "user_list").await;

    // A 看到 B 上线
    loop {
        let event = wait_for(&mut alice_ws, "user_list").await;
        if event["users"].as_array().unwrap().len() == 2 {
            break;
        }
    }

    // B 断开后 A 收到缩小的在线列表
    bob_ws.close(None).await.expect("close bob");
    loop {
        let event = wait_for(&mut alice_ws, "user_list").await;
        let users = event["users"].as_array().unwrap();
        if users.len() == 1 && !users.iter().any(|id| id == &json!(bob_id)) {
            break;
        }
    }

    let _ = shutdown_tx.send(());
}
