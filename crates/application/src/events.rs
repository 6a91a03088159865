//! 服务端推送帧定义
//!
//! 所有经由存活连接推送给客户端的事件。事件名沿用线上协议：
//! 聊天类事件用 snake_case，呼叫信令沿用 callUser/callAccepted
//! 一族的驼峰命名。

use domain::{GroupId, Message, MessageId, Reaction, UserId};
use serde::{Deserialize, Serialize};

/// 服务端 → 客户端事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// 在线用户集合，任何登录/断开后全量广播
    #[serde(rename = "user_list")]
    UserList { users: Vec<UserId> },

    #[serde(rename = "receive_private_message")]
    ReceivePrivateMessage { message: Message },

    #[serde(rename = "receive_group_message")]
    ReceiveGroupMessage { message: Message },

    /// 发送方收到的投递确认
    #[serde(rename = "message_sent_ack")]
    MessageSentAck { msg_id: MessageId, delivered: bool },

    /// 私聊已读通知；chat_id 是读者一侧的会话标识
    #[serde(rename = "private_read_update")]
    PrivateReadUpdate { chat_id: UserId, reader: UserId },

    #[serde(rename = "group_read_update")]
    GroupReadUpdate { chat_id: GroupId, reader: UserId },

    /// 全量回应集合广播，而不是增量
    #[serde(rename = "reaction_updated")]
    ReactionUpdated {
        msg_id: MessageId,
        reactions: Vec<Reaction>,
    },

    /// 彻底删除后的撤回事件
    #[serde(rename = "message_deleted")]
    MessageDeleted { msg_id: MessageId },

    /// 来电通知，携带不透明的 offer 负载
    #[serde(rename = "callUser")]
    IncomingCall {
        from: UserId,
        name: String,
        signal: serde_json::Value,
    },

    #[serde(rename = "callAccepted")]
    CallAccepted { signal: serde_json::Value },

    #[serde(rename = "callFailed")]
    CallFailed { reason: String },

    #[serde(rename = "callEnded")]
    CallEnded,

    #[serde(rename = "new_follow_request")]
    NewFollowRequest { from: UserId },

    #[serde(rename = "follow_request_accepted")]
    FollowRequestAccepted { from: UserId },

    #[serde(rename = "friend_removed")]
    FriendRemoved { friend_id: UserId },

    /// 群资料变化，提示客户端刷新
    #[serde(rename = "group_data_updated")]
    GroupDataUpdated { group_id: GroupId },

    /// 群已解散或自己被移出，客户端应关闭会话
    #[serde(rename = "force_group_close")]
    ForceGroupClose { group_id: GroupId },
}
