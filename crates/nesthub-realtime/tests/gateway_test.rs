//! Gateway behavior tests against an in-memory store.

mod helpers;

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use nesthub_core::config::ratelimit::WindowConfig;
use nesthub_entity::chat::MessageCategory;
use nesthub_realtime::audit::{AuditCategory, AuditQuery};
use nesthub_realtime::event::{ClientEvent, ErrorCode, ServerEvent};
use uuid::Uuid;

use helpers::*;

fn send_message_event(room_id: Uuid, body: &str, target: Option<Uuid>) -> ClientEvent {
    ClientEvent::SendMessage {
        room_id,
        message: body.to_string(),
        category: MessageCategory::RealTimeChat,
        target_user_id: target,
        file_url: None,
        metadata: None,
    }
}

#[tokio::test]
async fn test_register_sends_connected_ack() {
    let store = FakeStore::new();
    let gateway = build_gateway(store, generous_limits());
    let user = parent("Robin");

    let (_handle, mut rx) = connect(&gateway, &user);
    let events = drain(&mut rx);

    assert!(matches!(
        events.as_slice(),
        [ServerEvent::Connected { user_id, .. }] if *user_id == user.id
    ));
}

#[tokio::test]
async fn test_reconnect_replaces_existing_session() {
    let store = FakeStore::new();
    let gateway = build_gateway(store, generous_limits());
    let user = parent("Robin");

    let (first_handle, mut first_rx) = connect(&gateway, &user);
    drain(&mut first_rx);

    let (second_handle, _second_rx) = connect(&gateway, &user);

    let first_events = drain(&mut first_rx);
    assert!(first_events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::SessionReplaced, .. }
    )));
    assert!(!first_handle.is_alive());
    assert!(second_handle.is_alive());
    assert_eq!(gateway.pool().connection_count(), 1);
}

#[tokio::test]
async fn test_join_room_requires_membership() {
    let store = FakeStore::new();
    let gateway = build_gateway(store, generous_limits());
    let user = parent("Robin");
    let room = Uuid::new_v4();

    let (handle, mut rx) = connect(&gateway, &user);
    drain(&mut rx);

    gateway
        .handle_event(&handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::RoomAccessDenied, .. }
    )));

    let denials = gateway.audit().query(&AuditQuery {
        category: Some(AuditCategory::Authorization),
        success: Some(false),
        ..Default::default()
    });
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].user_id, Some(user.id));
}

#[tokio::test]
async fn test_join_room_broadcasts_user_joined() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    let gateway = build_gateway(store, generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);

    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(&bob_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;

    let alice_events = drain(&mut alice_rx);
    assert!(alice_events.iter().any(|e| matches!(
        e,
        ServerEvent::UserJoined { user_id, .. } if *user_id == bob.id
    )));

    // Only the other members hear about the join.
    let bob_events = drain(&mut bob_rx);
    assert!(!bob_events
        .iter()
        .any(|e| matches!(e, ServerEvent::UserJoined { .. })));
}

#[tokio::test]
async fn test_message_broadcast_to_room() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    let gateway = build_gateway(store.clone(), generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    gateway
        .handle_event(&bob_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(&alice_handle.id, send_message_event(room, "dinner at 6", None))
        .await;

    let alice_events = drain(&mut alice_rx);
    assert!(
        alice_events
            .iter()
            .any(|e| matches!(e, ServerEvent::MessageSent { .. })),
        "sender gets a message_sent echo"
    );
    assert!(
        !alice_events
            .iter()
            .any(|e| matches!(e, ServerEvent::NewMessage { .. })),
        "sender must not receive their own broadcast"
    );

    let bob_events = drain(&mut bob_rx);
    assert!(bob_events.iter().any(|e| matches!(
        e,
        ServerEvent::NewMessage { message, sender_id, .. }
            if message == "dinner at 6" && *sender_id == alice.id
    )));

    assert_eq!(store.message_count(), 1);
}

#[tokio::test]
async fn test_directed_message_requires_family_link() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    // No family link between the two.
    let gateway = build_gateway(store.clone(), generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    gateway
        .handle_event(&bob_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(
            &alice_handle.id,
            send_message_event(room, "psst", Some(bob.id)),
        )
        .await;

    let alice_events = drain(&mut alice_rx);
    assert!(alice_events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::InvalidRelationship, .. }
    )));
    assert!(drain(&mut bob_rx).is_empty(), "target must see nothing");
    assert_eq!(store.message_count(), 0, "denied message is not persisted");
}

#[tokio::test]
async fn test_directed_message_delivered_to_target_only() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let carol = child("Carol");
    let room = Uuid::new_v4();
    for user in [&alice, &bob, &carol] {
        store.add_membership(room, user.id);
    }
    store.add_link(alice.id, bob.id);
    let gateway = build_gateway(store.clone(), generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    let (carol_handle, mut carol_rx) = connect(&gateway, &carol);
    for handle in [&alice_handle, &bob_handle, &carol_handle] {
        gateway
            .handle_event(&handle.id, ClientEvent::JoinRoom { room_id: room })
            .await;
    }
    drain(&mut alice_rx);
    drain(&mut bob_rx);
    drain(&mut carol_rx);

    gateway
        .handle_event(
            &alice_handle.id,
            send_message_event(room, "psst", Some(bob.id)),
        )
        .await;

    assert!(drain(&mut bob_rx)
        .iter()
        .any(|e| matches!(e, ServerEvent::NewMessage { .. })));
    assert!(
        drain(&mut carol_rx).is_empty(),
        "directed message must not reach other members"
    );
    assert_eq!(store.message_count(), 1);
}

#[tokio::test]
async fn test_offline_target_message_still_persisted() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    store.add_link(alice.id, bob.id);
    let gateway = build_gateway(store.clone(), generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);

    // Bob never connects.
    gateway
        .handle_event(
            &alice_handle.id,
            send_message_event(room, "see you later", Some(bob.id)),
        )
        .await;

    assert!(drain(&mut alice_rx)
        .iter()
        .any(|e| matches!(e, ServerEvent::MessageSent { .. })));
    assert_eq!(store.message_count(), 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_and_audits() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);

    let mut limits = generous_limits();
    limits.categories = HashMap::from([(
        "real_time_chat".to_string(),
        WindowConfig::new(60_000, 2),
    )]);
    let gateway = build_gateway(store.clone(), limits);

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);

    for i in 0..3 {
        gateway
            .handle_event(
                &alice_handle.id,
                send_message_event(room, &format!("msg {i}"), None),
            )
            .await;
    }

    let events = drain(&mut alice_rx);
    let rejections: Vec<_> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                ServerEvent::Error { code: ErrorCode::RateLimitExceeded, reset_at: Some(_), .. }
            )
        })
        .collect();
    assert_eq!(rejections.len(), 1, "third message is rejected with a reset time");
    assert_eq!(store.message_count(), 2, "rejected message is not persisted");

    let audited = gateway.audit().query(&AuditQuery {
        category: Some(AuditCategory::RateLimit),
        ..Default::default()
    });
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].user_id, Some(alice.id));
}

#[tokio::test]
async fn test_store_error_fails_closed() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    let gateway = build_gateway(store.clone(), generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);

    store.fail.store(true, Ordering::SeqCst);
    gateway
        .handle_event(&alice_handle.id, send_message_event(room, "hello?", None))
        .await;

    let events = drain(&mut alice_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::MessageFailed, .. }
    )));
    assert_eq!(store.message_count(), 0);

    let errors = gateway.audit().query(&AuditQuery {
        category: Some(AuditCategory::Error),
        ..Default::default()
    });
    assert_eq!(errors.len(), 1, "store failure is audited as an error, not a denial");
}

#[tokio::test]
async fn test_typing_requires_joined_room() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let gateway = build_gateway(store, generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    drain(&mut alice_rx);

    gateway
        .handle_event(
            &alice_handle.id,
            ClientEvent::Typing {
                room_id: Uuid::new_v4(),
                is_typing: true,
            },
        )
        .await;

    assert!(drain(&mut alice_rx).iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::RoomAccessDenied, .. }
    )));
}

#[tokio::test]
async fn test_typing_broadcast_excludes_sender() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    let gateway = build_gateway(store, generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    gateway
        .handle_event(&bob_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(
            &alice_handle.id,
            ClientEvent::Typing {
                room_id: room,
                is_typing: true,
            },
        )
        .await;

    assert!(drain(&mut bob_rx).iter().any(|e| matches!(
        e,
        ServerEvent::UserTyping { user_id, .. } if *user_id == alice.id
    )));
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn test_task_completed_notifies_parent() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    store.add_link(alice.id, bob.id);
    let task = open_task(&alice, &bob);
    let task_id = task.id;
    store.add_task(task);
    let gateway = build_gateway(store, generous_limits());

    let (_alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(
            &bob_handle.id,
            ClientEvent::TaskCompleted {
                task_id,
                room_id: Uuid::new_v4(),
            },
        )
        .await;

    assert!(drain(&mut alice_rx).iter().any(|e| matches!(
        e,
        ServerEvent::TaskCompleted { task_id: id, actor_id, .. }
            if *id == task_id && *actor_id == bob.id
    )));
}

#[tokio::test]
async fn test_task_completed_requires_child_role() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    store.add_link(alice.id, bob.id);
    let task = open_task(&alice, &bob);
    let task_id = task.id;
    store.add_task(task);
    let gateway = build_gateway(store, generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    drain(&mut alice_rx);

    gateway
        .handle_event(
            &alice_handle.id,
            ClientEvent::TaskCompleted {
                task_id,
                room_id: Uuid::new_v4(),
            },
        )
        .await;

    assert!(drain(&mut alice_rx).iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::TaskAccessDenied, .. }
    )));
}

#[tokio::test]
async fn test_piggybank_update_notifies_counterpart() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    store.add_link(alice.id, bob.id);
    let goal = savings_goal(&bob, &alice);
    let goal_id = goal.id;
    store.add_goal(goal);
    let gateway = build_gateway(store, generous_limits());

    let (_alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway
        .handle_event(
            &bob_handle.id,
            ClientEvent::PiggybankUpdated {
                goal_id,
                room_id: Uuid::new_v4(),
            },
        )
        .await;

    assert!(drain(&mut alice_rx).iter().any(|e| matches!(
        e,
        ServerEvent::PiggybankUpdated { goal_id: id, saved_cents, .. }
            if *id == goal_id && *saved_cents == 7_500
    )));
}

#[tokio::test]
async fn test_unparseable_payload_gets_invalid_event() {
    let store = FakeStore::new();
    let gateway = build_gateway(store, generous_limits());
    let user = parent("Robin");

    let (handle, mut rx) = connect(&gateway, &user);
    drain(&mut rx);

    gateway.handle_raw(&handle.id, "{\"type\":\"mystery\"}").await;

    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::InvalidEvent, .. }
    )));
}

#[tokio::test]
async fn test_disconnect_broadcasts_user_left() {
    let store = FakeStore::new();
    let alice = parent("Alice");
    let bob = child("Bob");
    let room = Uuid::new_v4();
    store.add_membership(room, alice.id);
    store.add_membership(room, bob.id);
    let gateway = build_gateway(store, generous_limits());

    let (alice_handle, mut alice_rx) = connect(&gateway, &alice);
    let (bob_handle, mut bob_rx) = connect(&gateway, &bob);
    gateway
        .handle_event(&alice_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    gateway
        .handle_event(&bob_handle.id, ClientEvent::JoinRoom { room_id: room })
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    gateway.disconnect(&bob_handle.id);

    assert!(drain(&mut alice_rx).iter().any(|e| matches!(
        e,
        ServerEvent::UserLeft { user_id, .. } if *user_id == bob.id
    )));
    assert_eq!(gateway.pool().connection_count(), 1);
}
