//! The chat gateway: session registration, event dispatch, authorization
//! enforcement, and fan-out.
//!
//! Every inbound event runs the same pipeline: rate-limit admission,
//! authorization against the current store state, the action itself, then
//! exactly one audit record for the terminal outcome. A store error during
//! a check denies the action (fail-closed) and is audited as an error,
//! distinct from an authorization denial.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nesthub_database::MarketStore;
use nesthub_entity::chat::{ChatMessage, MessageCategory, NewChatMessage};
use nesthub_entity::user::{FamilyRole, User};

use crate::audit::event::{AuditCategory, AuditRecord};
use crate::audit::log::SecurityAuditLog;
use crate::authorize::relationship::{AuthzOutcome, RelationshipAuthorizer};
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::pool::ConnectionPool;
use crate::connection::rooms::RoomRegistry;
use crate::event::{ClientEvent, ErrorCode, ServerEvent};
use crate::ratelimit::limiter::{RateCategory, RateLimiter};

/// Session manager for the realtime gateway.
///
/// Owns the live-connection pool and room registry, and coordinates the
/// authorizer, rate limiter, and audit log for every client event.
pub struct ChatGateway {
    store: Arc<dyn MarketStore>,
    authorizer: RelationshipAuthorizer,
    limiter: Arc<RateLimiter>,
    audit: Arc<SecurityAuditLog>,
    pool: ConnectionPool,
    rooms: RoomRegistry,
}

impl std::fmt::Debug for ChatGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGateway")
            .field("connections", &self.pool.connection_count())
            .field("rooms", &self.rooms.room_count())
            .finish()
    }
}

impl ChatGateway {
    pub fn new(
        store: Arc<dyn MarketStore>,
        limiter: Arc<RateLimiter>,
        audit: Arc<SecurityAuditLog>,
    ) -> Self {
        Self {
            authorizer: RelationshipAuthorizer::new(store.clone()),
            store,
            limiter,
            audit,
            pool: ConnectionPool::new(),
            rooms: RoomRegistry::new(),
        }
    }

    /// The live-connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// The audit log.
    pub fn audit(&self) -> &SecurityAuditLog {
        &self.audit
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Register an authenticated connection.
    ///
    /// A user may hold one active connection; a reconnect displaces the
    /// prior one, which is told it was replaced and removed from its
    /// rooms before being closed.
    pub fn register(
        &self,
        user: &User,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Arc<ConnectionHandle> {
        let handle = Arc::new(ConnectionHandle::new(user, sender));
        let displaced = self.pool.insert(handle.clone());

        if let Some(prev) = displaced {
            prev.send(ServerEvent::error(
                ErrorCode::SessionReplaced,
                "Session replaced by a newer connection",
            ));
            prev.mark_closed();
            for room_id in self.rooms.remove_connection(&prev.id) {
                self.broadcast_to_room(
                    room_id,
                    &ServerEvent::UserLeft {
                        room_id,
                        user_id: prev.user_id,
                        name: prev.name.clone(),
                    },
                    None,
                );
            }
            info!(user_id = %user.id, "Replaced prior connection for user");
        }

        handle.send(ServerEvent::Connected {
            user_id: user.id,
            role: user.role,
        });

        self.audit.record(
            AuditRecord::success(AuditCategory::Connection, "connect", user.id)
                .with_role(user.role),
        );
        info!(user_id = %user.id, conn_id = %handle.id, "Connection registered");
        handle
    }

    /// Tear down a connection: leave its rooms, drop it from the pool.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.mark_closed();

        for room_id in self.rooms.remove_connection(conn_id) {
            self.broadcast_to_room(
                room_id,
                &ServerEvent::UserLeft {
                    room_id,
                    user_id: handle.user_id,
                    name: handle.name.clone(),
                },
                None,
            );
        }

        self.audit.record(
            AuditRecord::success(AuditCategory::Connection, "disconnect", handle.user_id)
                .with_role(handle.role),
        );
        info!(user_id = %handle.user_id, conn_id = %conn_id, "Connection closed");
    }

    /// Parse and dispatch one raw inbound frame.
    pub async fn handle_raw(&self, conn_id: &ConnectionId, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => self.handle_event(conn_id, event).await,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Unparseable client event");
                self.send_to_conn(
                    conn_id,
                    ServerEvent::error(ErrorCode::InvalidEvent, "Unrecognized event payload"),
                );
            }
        }
    }

    /// Dispatch one parsed client event.
    pub async fn handle_event(&self, conn_id: &ConnectionId, event: ClientEvent) {
        let Some(conn) = self.pool.get(conn_id) else {
            return;
        };

        match event {
            ClientEvent::JoinRoom { room_id } => self.join_room(&conn, room_id).await,
            ClientEvent::LeaveRoom { room_id } => self.leave_room(&conn, room_id),
            ClientEvent::SendMessage {
                room_id,
                message,
                category,
                target_user_id,
                file_url,
                metadata,
            } => {
                self.send_message(
                    &conn,
                    NewChatMessage {
                        room_id,
                        sender_id: conn.user_id,
                        target_user_id,
                        category,
                        content: message,
                        file_url,
                        metadata,
                    },
                )
                .await
            }
            ClientEvent::Typing { room_id, is_typing } => {
                self.typing(&conn, room_id, is_typing)
            }
            ClientEvent::TaskCreated { task_id, room_id } => {
                self.task_event(&conn, "task_created", task_id, room_id, FamilyRole::Parent)
                    .await
            }
            ClientEvent::TaskCompleted { task_id, room_id } => {
                self.task_event(&conn, "task_completed", task_id, room_id, FamilyRole::Child)
                    .await
            }
            ClientEvent::PiggybankUpdated { goal_id, room_id } => {
                self.piggybank_updated(&conn, goal_id, room_id).await
            }
            ClientEvent::Ping { timestamp } => self.ping(&conn, timestamp),
        }
    }

    async fn join_room(&self, conn: &ConnectionHandle, room_id: Uuid) {
        if !self.admit(conn, RateCategory::JoinRoom, "join_room", None) {
            return;
        }

        match self.authorizer.room_membership(room_id, conn.user_id).await {
            Ok(AuthzOutcome::Allowed(_)) => {
                self.rooms.add(room_id, conn.id);
                self.broadcast_to_room(
                    room_id,
                    &ServerEvent::UserJoined {
                        room_id,
                        user_id: conn.user_id,
                        name: conn.name.clone(),
                    },
                    Some(conn.id),
                );
                self.audit.record(
                    AuditRecord::success(AuditCategory::Authorization, "join_room", conn.user_id)
                        .with_role(conn.role)
                        .with_metadata(json!({ "room_id": room_id })),
                );
            }
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, "join_room", reason);
                conn.send(ServerEvent::error(ErrorCode::RoomAccessDenied, reason));
            }
            Err(e) => {
                self.fail_closed(conn, "join_room", &e);
                conn.send(ServerEvent::error(
                    ErrorCode::JoinFailed,
                    "Could not join room",
                ));
            }
        }
    }

    fn leave_room(&self, conn: &ConnectionHandle, room_id: Uuid) {
        if !self.rooms.remove(&room_id, &conn.id) {
            return;
        }
        self.broadcast_to_room(
            room_id,
            &ServerEvent::UserLeft {
                room_id,
                user_id: conn.user_id,
                name: conn.name.clone(),
            },
            None,
        );
        self.audit.record(
            AuditRecord::success(AuditCategory::Connection, "leave_room", conn.user_id)
                .with_role(conn.role)
                .with_metadata(json!({ "room_id": room_id })),
        );
    }

    async fn send_message(&self, conn: &ConnectionHandle, data: NewChatMessage) {
        let category = data.category;
        if !self.admit(
            conn,
            RateCategory::Chat(category),
            "send_message",
            Some(category),
        ) {
            return;
        }

        // Membership is re-read from the store on every send; the room
        // registry only tracks who is listening over the socket.
        match self
            .authorizer
            .room_membership(data.room_id, conn.user_id)
            .await
        {
            Ok(AuthzOutcome::Allowed(_)) => {}
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, "send_message", reason);
                conn.send(ServerEvent::error(ErrorCode::RoomAccessDenied, reason));
                return;
            }
            Err(e) => {
                self.fail_closed(conn, "send_message", &e);
                conn.send(ServerEvent::error(
                    ErrorCode::MessageFailed,
                    "Could not send message",
                ));
                return;
            }
        }

        // Directed messages additionally require an active family link
        // between sender and target.
        if let Some(target) = data.target_user_id {
            match self
                .authorizer
                .direct_message_eligibility(conn.user_id, target)
                .await
            {
                Ok(AuthzOutcome::Allowed(_)) => {}
                Ok(AuthzOutcome::Denied(reason)) => {
                    self.audit.record(
                        AuditRecord::failure(
                            AuditCategory::Authorization,
                            "send_message",
                            Some(conn.user_id),
                            reason,
                        )
                        .with_role(conn.role)
                        .with_target(target)
                        .with_message_category(category),
                    );
                    conn.send(ServerEvent::error(ErrorCode::InvalidRelationship, reason));
                    return;
                }
                Err(e) => {
                    self.fail_closed(conn, "send_message", &e);
                    conn.send(ServerEvent::error(
                        ErrorCode::MessageFailed,
                        "Could not send message",
                    ));
                    return;
                }
            }
        }

        // Persist before fan-out; a failed insert must not reach anyone.
        let message = match self.store.create_message(&data).await {
            Ok(message) => message,
            Err(e) => {
                self.fail_closed(conn, "send_message", &e);
                conn.send(ServerEvent::error(
                    ErrorCode::MessageFailed,
                    "Could not send message",
                ));
                return;
            }
        };
        if let Err(e) = self.store.touch_room(data.room_id).await {
            warn!(room_id = %data.room_id, error = %e, "Failed to touch room activity");
        }

        self.deliver_message(conn, &message);

        let mut record =
            AuditRecord::success(AuditCategory::Message, "send_message", conn.user_id)
                .with_role(conn.role)
                .with_message_category(category)
                .with_metadata(json!({ "room_id": message.room_id, "message_id": message.id }));
        if let Some(target) = message.target_user_id {
            record = record.with_target(target);
        }
        self.audit.record(record);
    }

    /// Route a persisted message: directed messages go only to the target;
    /// room messages go to every joined member except the sender. The
    /// sender always gets a `message_sent` echo.
    fn deliver_message(&self, conn: &ConnectionHandle, message: &ChatMessage) {
        let outbound = ServerEvent::NewMessage {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: conn.name.clone(),
            target_user_id: message.target_user_id,
            category: message.category,
            message: message.content.clone(),
            file_url: message.file_url.clone(),
            metadata: message.metadata.clone(),
            timestamp: message.created_at,
        };

        match message.target_user_id {
            Some(target) => {
                // Offline target: the message is persisted, delivery waits
                // for their next history fetch.
                if let Some(target_conn) = self.pool.get_by_user(&target) {
                    target_conn.send(outbound);
                }
            }
            None => self.broadcast_to_room(message.room_id, &outbound, Some(conn.id)),
        }

        conn.send(ServerEvent::MessageSent {
            id: message.id,
            room_id: message.room_id,
            timestamp: message.created_at,
        });
    }

    fn typing(&self, conn: &ConnectionHandle, room_id: Uuid, is_typing: bool) {
        if !self.admit(conn, RateCategory::Typing, "typing", None) {
            return;
        }

        // Session-local check only: typing indicators are ephemeral and do
        // not warrant a store round-trip.
        if !self.rooms.contains(&room_id, &conn.id) {
            self.deny(
                conn,
                AuditCategory::Authorization,
                "typing",
                "not joined to room",
            );
            conn.send(ServerEvent::error(
                ErrorCode::RoomAccessDenied,
                "Join the room before sending typing updates",
            ));
            return;
        }

        let event = if is_typing {
            ServerEvent::UserTyping {
                room_id,
                user_id: conn.user_id,
                name: conn.name.clone(),
            }
        } else {
            ServerEvent::UserStoppedTyping {
                room_id,
                user_id: conn.user_id,
                name: conn.name.clone(),
            }
        };
        self.broadcast_to_room(room_id, &event, Some(conn.id));
    }

    async fn task_event(
        &self,
        conn: &ConnectionHandle,
        action: &'static str,
        task_id: Uuid,
        room_id: Uuid,
        required_role: FamilyRole,
    ) {
        if !self.admit(conn, RateCategory::TaskEvent, action, None) {
            return;
        }

        let task = match self
            .authorizer
            .task_access(conn.user_id, conn.role, task_id, Some(required_role))
            .await
        {
            Ok(AuthzOutcome::Allowed(task)) => task,
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, action, reason);
                conn.send(ServerEvent::error(ErrorCode::TaskAccessDenied, reason));
                return;
            }
            Err(e) => {
                self.fail_closed(conn, action, &e);
                conn.send(ServerEvent::error(
                    ErrorCode::EventFailed,
                    "Could not process task event",
                ));
                return;
            }
        };

        // The notification target is derived from the task itself, never
        // taken from the client.
        let target = match self
            .authorizer
            .notification_target(conn.user_id, task.counterpart_of(conn.user_id))
            .await
        {
            Ok(AuthzOutcome::Allowed(target)) => target,
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, action, reason);
                conn.send(ServerEvent::error(ErrorCode::InvalidRelationship, reason));
                return;
            }
            Err(e) => {
                self.fail_closed(conn, action, &e);
                conn.send(ServerEvent::error(
                    ErrorCode::EventFailed,
                    "Could not process task event",
                ));
                return;
            }
        };

        let notification = match action {
            "task_created" => ServerEvent::TaskCreated {
                task_id,
                room_id,
                actor_id: conn.user_id,
                title: task.title.clone(),
            },
            _ => ServerEvent::TaskCompleted {
                task_id,
                room_id,
                actor_id: conn.user_id,
                title: task.title.clone(),
            },
        };
        let delivered = self.send_to_user(&target, notification);
        if !delivered {
            debug!(target = %target, action, "Counterpart offline, notification dropped");
        }

        self.audit.record(
            AuditRecord::success(AuditCategory::Message, action, conn.user_id)
                .with_role(conn.role)
                .with_target(target)
                .with_metadata(json!({ "task_id": task_id, "delivered": delivered })),
        );
    }

    async fn piggybank_updated(&self, conn: &ConnectionHandle, goal_id: Uuid, room_id: Uuid) {
        let action = "piggybank_updated";
        if !self.admit(conn, RateCategory::GoalEvent, action, None) {
            return;
        }

        // Both the owner and the supervising parent may announce updates.
        let goal = match self
            .authorizer
            .goal_access(conn.user_id, conn.role, goal_id, None)
            .await
        {
            Ok(AuthzOutcome::Allowed(goal)) => goal,
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, action, reason);
                conn.send(ServerEvent::error(ErrorCode::GoalAccessDenied, reason));
                return;
            }
            Err(e) => {
                self.fail_closed(conn, action, &e);
                conn.send(ServerEvent::error(
                    ErrorCode::EventFailed,
                    "Could not process goal event",
                ));
                return;
            }
        };

        let target = match self
            .authorizer
            .notification_target(conn.user_id, goal.counterpart_of(conn.user_id))
            .await
        {
            Ok(AuthzOutcome::Allowed(target)) => target,
            Ok(AuthzOutcome::Denied(reason)) => {
                self.deny(conn, AuditCategory::Authorization, action, reason);
                conn.send(ServerEvent::error(ErrorCode::InvalidRelationship, reason));
                return;
            }
            Err(e) => {
                self.fail_closed(conn, action, &e);
                conn.send(ServerEvent::error(
                    ErrorCode::EventFailed,
                    "Could not process goal event",
                ));
                return;
            }
        };

        let delivered = self.send_to_user(
            &target,
            ServerEvent::PiggybankUpdated {
                goal_id,
                room_id,
                actor_id: conn.user_id,
                saved_cents: goal.saved_cents,
                target_cents: goal.target_cents,
            },
        );
        if !delivered {
            debug!(target = %target, action, "Counterpart offline, notification dropped");
        }

        self.audit.record(
            AuditRecord::success(AuditCategory::Message, action, conn.user_id)
                .with_role(conn.role)
                .with_target(target)
                .with_metadata(json!({ "goal_id": goal_id, "delivered": delivered })),
        );
    }

    fn ping(&self, conn: &ConnectionHandle, timestamp: i64) {
        if !self.admit(conn, RateCategory::Heartbeat, "ping", None) {
            return;
        }
        conn.send(ServerEvent::Pong { timestamp });
    }

    /// Rate-limit admission. On rejection, records the single audit event
    /// for this action and tells the client when to retry.
    fn admit(
        &self,
        conn: &ConnectionHandle,
        category: RateCategory,
        action: &'static str,
        message_category: Option<MessageCategory>,
    ) -> bool {
        let decision = self.limiter.check_and_consume(conn.user_id, category);
        if decision.allowed {
            return true;
        }

        let mut record = AuditRecord::failure(
            AuditCategory::RateLimit,
            action,
            Some(conn.user_id),
            format!("{} window exhausted", category.name()),
        )
        .with_role(conn.role);
        if let Some(mc) = message_category {
            record = record.with_message_category(mc);
        }
        self.audit.record(record);

        conn.send(ServerEvent::rate_limited(
            "Rate limit exceeded, slow down",
            decision.reset_at,
        ));
        false
    }

    /// Record an authorization denial.
    fn deny(
        &self,
        conn: &ConnectionHandle,
        category: AuditCategory,
        action: &'static str,
        reason: &'static str,
    ) {
        self.audit.record(
            AuditRecord::failure(category, action, Some(conn.user_id), reason)
                .with_role(conn.role),
        );
    }

    /// Record a store error during a check as an error-category failure.
    /// The caller denies the action.
    fn fail_closed(&self, conn: &ConnectionHandle, action: &'static str, error: &impl std::fmt::Display) {
        warn!(user_id = %conn.user_id, action, error = %error, "Check errored, denying action");
        self.audit.record(
            AuditRecord::failure(
                AuditCategory::Error,
                action,
                Some(conn.user_id),
                error.to_string(),
            )
            .with_role(conn.role),
        );
    }

    /// Fan an event out to every connection joined to a room.
    fn broadcast_to_room(&self, room_id: Uuid, event: &ServerEvent, exclude: Option<ConnectionId>) {
        for member in self.rooms.members(&room_id) {
            if Some(member) == exclude {
                continue;
            }
            if let Some(conn) = self.pool.get(&member) {
                conn.send(event.clone());
            }
        }
    }

    fn send_to_conn(&self, conn_id: &ConnectionId, event: ServerEvent) {
        if let Some(conn) = self.pool.get(conn_id) {
            conn.send(event);
        }
    }

    /// Deliver an event to a user's active connection, if any.
    fn send_to_user(&self, user_id: &Uuid, event: ServerEvent) -> bool {
        match self.pool.get_by_user(user_id) {
            Some(conn) => conn.send(event),
            None => false,
        }
    }

    /// Close every connection. Used on shutdown.
    pub fn close_all(&self) {
        for conn in self.pool.all_connections() {
            conn.mark_closed();
            self.pool.remove(&conn.id);
            self.rooms.remove_connection(&conn.id);
        }
    }
}
