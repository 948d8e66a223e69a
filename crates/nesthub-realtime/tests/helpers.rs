//! Shared test fixtures: an in-memory store fake and gateway builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use nesthub_core::config::gateway::GatewayConfig;
use nesthub_core::config::ratelimit::{RateLimitConfig, WindowConfig};
use nesthub_core::error::AppError;
use nesthub_core::result::AppResult;
use nesthub_database::MarketStore;
use nesthub_entity::chat::{ChatMessage, NewChatMessage, RoomMember};
use nesthub_entity::family::FamilyLink;
use nesthub_entity::goal::SavingsGoal;
use nesthub_entity::task::{Task, TaskStatus};
use nesthub_entity::user::{FamilyRole, User};
use nesthub_realtime::audit::TracingAlertSink;
use nesthub_realtime::connection::ConnectionHandle;
use nesthub_realtime::event::ServerEvent;
use nesthub_realtime::{ChatGateway, RateLimiter, SecurityAuditLog};

/// In-memory `MarketStore` fake. State is seeded by tests; setting
/// `fail` makes every lookup return a database error.
#[derive(Default)]
pub struct FakeStore {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub memberships: Mutex<Vec<RoomMember>>,
    pub links: Mutex<Vec<FamilyLink>>,
    pub tasks: Mutex<HashMap<Uuid, Task>>,
    pub goals: Mutex<HashMap<Uuid, SavingsGoal>>,
    pub messages: Mutex<Vec<ChatMessage>>,
    pub fail: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn check_fail(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(AppError::database("connection refused"))
        } else {
            Ok(())
        }
    }

    pub fn add_user(&self, user: &User) {
        self.users.lock().unwrap().insert(user.id, user.clone());
    }

    pub fn add_membership(&self, room_id: Uuid, user_id: Uuid) {
        self.memberships.lock().unwrap().push(RoomMember {
            room_id,
            user_id,
            is_active: true,
            joined_at: Utc::now(),
        });
    }

    pub fn add_link(&self, parent_id: Uuid, child_id: Uuid) {
        self.links.lock().unwrap().push(FamilyLink {
            id: Uuid::new_v4(),
            parent_id,
            child_id,
            family_id: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
        });
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn add_goal(&self, goal: SavingsGoal) {
        self.goals.lock().unwrap().insert(goal.id, goal);
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MarketStore for FakeStore {
    async fn find_active_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.check_fail()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user_id)
            .filter(|u| u.is_active)
            .cloned())
    }

    async fn find_active_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<RoomMember>> {
        self.check_fail()?;
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.room_id == room_id && m.user_id == user_id && m.is_active)
            .cloned())
    }

    async fn find_active_link_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Option<FamilyLink>> {
        self.check_fail()?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| {
                l.is_active
                    && ((l.parent_id == user_a && l.child_id == user_b)
                        || (l.parent_id == user_b && l.child_id == user_a))
            })
            .cloned())
    }

    async fn find_task(&self, task_id: Uuid) -> AppResult<Option<Task>> {
        self.check_fail()?;
        Ok(self.tasks.lock().unwrap().get(&task_id).cloned())
    }

    async fn find_goal(&self, goal_id: Uuid) -> AppResult<Option<SavingsGoal>> {
        self.check_fail()?;
        Ok(self.goals.lock().unwrap().get(&goal_id).cloned())
    }

    async fn create_message(&self, data: &NewChatMessage) -> AppResult<ChatMessage> {
        self.check_fail()?;
        let message = ChatMessage {
            id: Uuid::new_v4(),
            room_id: data.room_id,
            sender_id: data.sender_id,
            target_user_id: data.target_user_id,
            category: data.category,
            content: data.content.clone(),
            file_url: data.file_url.clone(),
            metadata: data.metadata.clone(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn touch_room(&self, _room_id: Uuid) -> AppResult<()> {
        self.check_fail()?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        self.check_fail()
    }
}

/// Rate-limit config with room to spare; tests that exercise limits
/// build their own tighter config.
pub fn generous_limits() -> RateLimitConfig {
    let mut config = RateLimitConfig::default();
    config.global = WindowConfig::new(60_000, 1_000);
    config.default = WindowConfig::new(60_000, 1_000);
    config.categories = HashMap::new();
    config
}

pub fn build_gateway(store: Arc<FakeStore>, limits: RateLimitConfig) -> Arc<ChatGateway> {
    let limiter = Arc::new(RateLimiter::new(limits));
    let audit = Arc::new(SecurityAuditLog::new(
        &GatewayConfig::default(),
        Arc::new(TracingAlertSink),
    ));
    Arc::new(ChatGateway::new(store, limiter, audit))
}

pub fn parent(name: &str) -> User {
    user_with_role(name, FamilyRole::Parent)
}

pub fn child(name: &str) -> User {
    user_with_role(name, FamilyRole::Child)
}

fn user_with_role(name: &str, role: FamilyRole) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        role,
        family_id: Uuid::new_v4(),
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn open_task(creator: &User, assignee: &User) -> Task {
    Task {
        id: Uuid::new_v4(),
        family_id: creator.family_id,
        creator_id: creator.id,
        assignee_id: assignee.id,
        title: "Rake the leaves".to_string(),
        status: TaskStatus::Open,
        reward_cents: 500,
        created_at: Utc::now(),
        completed_at: None,
    }
}

pub fn savings_goal(owner: &User, supervisor: &User) -> SavingsGoal {
    SavingsGoal {
        id: Uuid::new_v4(),
        family_id: owner.family_id,
        owner_id: owner.id,
        supervisor_id: supervisor.id,
        title: "New bicycle".to_string(),
        target_cents: 20_000,
        saved_cents: 7_500,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Register a user on the gateway, returning the handle and the client's
/// receive side.
pub fn connect(
    gateway: &ChatGateway,
    user: &User,
) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = gateway.register(user, tx);
    (handle, rx)
}

/// Drain everything currently queued for a client.
pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
