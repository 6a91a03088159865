//! 群组管理与社交关系的场景测试

mod support;

use application::services::{
    AddMembersRequest, CreateGroupRequest, DeleteGroupRequest, HistoryRequest, LeaveGroupRequest,
    RegisterUserRequest, RemoveMemberRequest, RequestFollowRequest, RespondFollowRequest,
    SendGroupRequest, UpdateGroupRequest,
};
use application::{ApplicationError, ServerEvent};
use domain::DomainError;
use uuid::Uuid;

use support::{drain, TestApp};

#[tokio::test]
async fn only_admin_may_rename_group() {
    let app = TestApp::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = app
        .group_service
        .create_group(CreateGroupRequest {
            name: "old name".into(),
            member_ids: vec![member],
            admin_id: admin,
        })
        .await
        .unwrap();

    let denied = app
        .group_service
        .update_group(UpdateGroupRequest {
            group_id: group.id.into(),
            operator_id: member,
            name: Some("hijacked".into()),
            icon: None,
        })
        .await;
    assert!(matches!(
        denied,
        Err(ApplicationError::Domain(DomainError::NotGroupAdmin))
    ));

    let mut member_rx = app.connect(member).await;
    drain(&mut member_rx);

    let updated = app
        .group_service
        .update_group(UpdateGroupRequest {
            group_id: group.id.into(),
            operator_id: admin,
            name: Some("new name".into()),
            icon: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "new name");

    // 在线成员收到刷新提示
    let events = drain(&mut member_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::GroupDataUpdated { group_id } if *group_id == group.id
    )));
}

#[tokio::test]
async fn removed_member_is_told_to_close_the_chat() {
    let app = TestApp::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = app
        .group_service
        .create_group(CreateGroupRequest {
            name: "team".into(),
            member_ids: vec![member],
            admin_id: admin,
        })
        .await
        .unwrap();

    let mut member_rx = app.connect(member).await;
    drain(&mut member_rx);

    let updated = app
        .group_service
        .remove_member(RemoveMemberRequest {
            group_id: group.id.into(),
            operator_id: admin,
            target_id: member,
        })
        .await
        .unwrap();
    assert!(!updated.is_member(member.into()));

    let events = drain(&mut member_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::ForceGroupClose { group_id } if *group_id == group.id
    )));
}

#[tokio::test]
async fn any_member_may_leave_but_admin_may_not() {
    let app = TestApp::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = app
        .group_service
        .create_group(CreateGroupRequest {
            name: "team".into(),
            member_ids: vec![member],
            admin_id: admin,
        })
        .await
        .unwrap();

    app.group_service
        .leave_group(LeaveGroupRequest {
            group_id: group.id.into(),
            user_id: member,
        })
        .await
        .unwrap();

    // 管理员必须是成员：只能解散群组，不能退出
    let denied = app
        .group_service
        .leave_group(LeaveGroupRequest {
            group_id: group.id.into(),
            user_id: admin,
        })
        .await;
    assert!(matches!(
        denied,
        Err(ApplicationError::Domain(DomainError::OperationNotAllowed))
    ));
}

#[tokio::test]
async fn deleting_group_cascades_messages_and_closes_sessions() {
    let app = TestApp::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = app
        .group_service
        .create_group(CreateGroupRequest {
            name: "doomed".into(),
            member_ids: vec![member],
            admin_id: admin,
        })
        .await
        .unwrap();

    let mut member_rx = app.connect(member).await;
    app.message_service
        .send_group(SendGroupRequest {
            sender_id: admin,
            group_id: group.id.into(),
            body: "last words".into(),
        })
        .await
        .unwrap();
    drain(&mut member_rx);

    // 普通成员无权解散
    let denied = app
        .group_service
        .delete_group(DeleteGroupRequest {
            group_id: group.id.into(),
            operator_id: member,
        })
        .await;
    assert!(matches!(
        denied,
        Err(ApplicationError::Domain(DomainError::NotGroupAdmin))
    ));

    app.group_service
        .delete_group(DeleteGroupRequest {
            group_id: group.id.into(),
            operator_id: admin,
        })
        .await
        .unwrap();

    // 消息级联删除，成员收到关闭事件
    let history = app
        .message_service
        .history(HistoryRequest {
            requester_id: member,
            chat_id: group.id.into(),
            is_group: true,
        })
        .await
        .unwrap();
    assert!(history.is_empty());

    let events = drain(&mut member_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::ForceGroupClose { group_id } if *group_id == group.id
    )));
}

#[tokio::test]
async fn added_members_are_deduplicated() {
    let app = TestApp::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();
    let newcomer = Uuid::new_v4();

    let group = app
        .group_service
        .create_group(CreateGroupRequest {
            name: "team".into(),
            member_ids: vec![member],
            admin_id: admin,
        })
        .await
        .unwrap();

    let updated = app
        .group_service
        .add_members(AddMembersRequest {
            group_id: group.id.into(),
            operator_id: admin,
            member_ids: vec![member, newcomer, newcomer],
        })
        .await
        .unwrap();

    assert_eq!(updated.members.len(), 3);
    assert!(updated.is_member(newcomer.into()));
}

#[tokio::test]
async fn follow_request_round_trip_notifies_both_sides() {
    let app = TestApp::new();

    let alice = app
        .user_service
        .register(RegisterUserRequest {
            name: "alice".into(),
            email: "alice@example.com".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();
    let bob = app
        .user_service
        .register(RegisterUserRequest {
            name: "bob".into(),
            email: "bob@example.com".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();

    let mut alice_rx = app.connect(alice.id.into()).await;
    let mut bob_rx = app.connect(bob.id.into()).await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    app.user_service
        .request_follow(RequestFollowRequest {
            sender_id: alice.id.into(),
            target_id: bob.id.into(),
        })
        .await
        .unwrap();

    let events = drain(&mut bob_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::NewFollowRequest { from } if *from == alice.id
    )));

    // 重复请求被拒绝
    let duplicate = app
        .user_service
        .request_follow(RequestFollowRequest {
            sender_id: alice.id.into(),
            target_id: bob.id.into(),
        })
        .await;
    assert!(duplicate.is_err());

    let bob_after = app
        .user_service
        .respond_follow(RespondFollowRequest {
            user_id: bob.id.into(),
            requester_id: alice.id.into(),
            accept: true,
        })
        .await
        .unwrap();
    assert!(bob_after.followers.contains(&alice.id));
    assert!(bob_after.follow_requests.is_empty());

    let events = drain(&mut alice_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::FollowRequestAccepted { from } if *from == bob.id
    )));

    let alice_after = app.user_service.get_user(alice.id.into()).await.unwrap();
    assert!(alice_after.following.contains(&bob.id));
}
