//! Durable Postgres-backed metadata store (§4.4, §9 "dual persistence").
//! No real durable backend exists yet (`DatabaseConfig` is
//! `InMemory`-only); this completes that reservation using `sqlx`, the
//! idiomatic transactional, JSON-column-capable async Postgres client for
//! a tokio/axum stack. Every method retries exactly once on a connection
//! or auth error after resetting the pool, per §4.4's "defensive" clause,
//! then returns [`StoreError::Unavailable`] so the caller can degrade.

use super::{MetadataStore, StoreError};
use crate::protocol::{Codec, ParticipantRecord, Role, Room, RoomEventKind, RoomEventRow, RoomId, UserId};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::sync::Mutex;

pub struct PostgresMetadataStore {
    pool: Mutex<PgPool>,
    connection_string: String,
}

impl PostgresMetadataStore {
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let pool = Self::build_pool(connection_string).await?;
        Ok(Self {
            pool: Mutex::new(pool),
            connection_string: connection_string.to_string(),
        })
    }

    async fn build_pool(connection_string: &str) -> Result<PgPool, StoreError> {
        PgPoolOptions::new()
            .max_connections(10)
            .max_lifetime(std::time::Duration::from_secs(30 * 60))
            .connect(connection_string)
            .await
            .map_err(|_| StoreError::Unavailable)
    }

    /// Re-create the pool once and retry `op`, matching §4.4's "re-creates
    /// its pool once and retries a single time" on loss of connection.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: Fn(PgPool) -> Fut,
        Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let pool = { self.pool.lock().expect("pool mutex poisoned").clone() };
        match op(pool).await {
            Ok(value) => Ok(value),
            Err(_) => {
                let fresh = Self::build_pool(&self.connection_string).await?;
                *self.pool.lock().expect("pool mutex poisoned") = fresh.clone();
                op(fresh).await.map_err(|_| StoreError::Unavailable)
            }
        }
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let pool = self.pool.lock().expect("pool mutex poisoned").clone();
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (user_id UUID PRIMARY KEY);
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                host_user_id UUID NOT NULL,
                host_file_hash TEXT NOT NULL,
                host_file_duration_ms BIGINT NOT NULL,
                host_file_size BIGINT NOT NULL,
                host_file_codec JSONB NOT NULL,
                passcode_hash TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                closed_at TIMESTAMPTZ,
                is_active BOOLEAN NOT NULL
            );
            CREATE TABLE IF NOT EXISTS participants (
                room_id TEXT NOT NULL,
                user_id UUID NOT NULL,
                role TEXT NOT NULL,
                joined_at TIMESTAMPTZ NOT NULL,
                left_at TIMESTAMPTZ,
                is_connected BOOLEAN NOT NULL,
                last_connection_id UUID,
                PRIMARY KEY (room_id, user_id)
            );
            CREATE TABLE IF NOT EXISTS room_events (
                id BIGSERIAL PRIMARY KEY,
                room_id TEXT NOT NULL,
                user_id UUID NOT NULL,
                event_type TEXT NOT NULL,
                payload JSONB NOT NULL,
                at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|_| StoreError::Unavailable)?;
        Ok(())
    }
}

fn event_kind_name(kind: &RoomEventKind) -> &'static str {
    match kind {
        RoomEventKind::Play => "play",
        RoomEventKind::Pause => "pause",
        RoomEventKind::Seek => "seek",
        RoomEventKind::Join => "join",
        RoomEventKind::Leave => "leave",
        RoomEventKind::Reaction => "reaction",
        RoomEventKind::Chat => "chat",
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn upsert_user(&self, user_id: UserId) -> Result<(), StoreError> {
        self.with_retry(|pool| async move {
            sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(user_id)
                .execute(&pool)
                .await
                .map(|_| ())
        })
        .await
    }

    async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        let codec = serde_json::to_value(&room.host_file_codec).unwrap_or(serde_json::Value::Null);
        self.with_retry(move |pool| {
            let room = room.clone();
            let codec = codec.clone();
            async move {
                let mut tx = pool.begin().await?;
                sqlx::query(
                    "INSERT INTO rooms (id, host_user_id, host_file_hash, host_file_duration_ms, \
                     host_file_size, host_file_codec, passcode_hash, created_at, expires_at, \
                     closed_at, is_active) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
                )
                .bind(&room.id)
                .bind(room.host_user_id)
                .bind(&room.host_file_hash)
                .bind(room.host_file_duration_ms as i64)
                .bind(room.host_file_size as i64)
                .bind(&codec)
                .bind(&room.passcode_hash)
                .bind(room.created_at)
                .bind(room.expires_at)
                .bind(room.closed_at)
                .bind(room.is_active)
                .execute(&mut *tx)
                .await?;
                tx.commit().await
            }
        })
        .await
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        let room_id = room_id.clone();
        self.with_retry(move |pool| {
            let room_id = room_id.clone();
            async move {
                let row = sqlx::query(
                    "SELECT id, host_user_id, host_file_hash, host_file_duration_ms, \
                     host_file_size, host_file_codec, passcode_hash, created_at, expires_at, \
                     closed_at, is_active FROM rooms WHERE id = $1",
                )
                .bind(&room_id)
                .fetch_optional(&pool)
                .await?;

                Ok(row.map(|row| Room {
                    id: row.get("id"),
                    host_user_id: row.get("host_user_id"),
                    host_file_hash: row.get("host_file_hash"),
                    host_file_duration_ms: row.get::<i64, _>("host_file_duration_ms") as u64,
                    host_file_size: row.get::<i64, _>("host_file_size") as u64,
                    host_file_codec: serde_json::from_value(row.get("host_file_codec"))
                        .unwrap_or(Codec {
                            video: String::new(),
                            audio: String::new(),
                            resolution: None,
                        }),
                    passcode_hash: row.get("passcode_hash"),
                    created_at: row.get("created_at"),
                    expires_at: row.get("expires_at"),
                    closed_at: row.get("closed_at"),
                    is_active: row.get("is_active"),
                }))
            }
        })
        .await
    }

    async fn close_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let room_id = room_id.clone();
        self.with_retry(move |pool| {
            let room_id = room_id.clone();
            async move {
                let mut tx = pool.begin().await?;
                sqlx::query(
                    "UPDATE rooms SET is_active = false, closed_at = now() WHERE id = $1",
                )
                .bind(&room_id)
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    "UPDATE participants SET is_connected = false, left_at = now() \
                     WHERE room_id = $1 AND left_at IS NULL",
                )
                .bind(&room_id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await
            }
        })
        .await
    }

    async fn add_participant(&self, record: ParticipantRecord) -> Result<(), StoreError> {
        self.with_retry(move |pool| {
            let record = record.clone();
            async move {
                let role = if record.role == Role::Host { "host" } else { "follower" };
                sqlx::query(
                    "INSERT INTO participants (room_id, user_id, role, joined_at, left_at, \
                     is_connected, last_connection_id) VALUES ($1,$2,$3,$4,$5,$6,$7) \
                     ON CONFLICT (room_id, user_id) DO UPDATE SET role = EXCLUDED.role, \
                     left_at = EXCLUDED.left_at, is_connected = EXCLUDED.is_connected, \
                     last_connection_id = EXCLUDED.last_connection_id",
                )
                .bind(&record.room_id)
                .bind(record.user_id)
                .bind(role)
                .bind(record.joined_at)
                .bind(record.left_at)
                .bind(record.is_connected)
                .bind(record.last_connection_id)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
    }

    async fn set_participant_status(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        is_connected: bool,
    ) -> Result<(), StoreError> {
        let room_id = room_id.clone();
        self.with_retry(move |pool| {
            let room_id = room_id.clone();
            async move {
                sqlx::query(
                    "UPDATE participants SET is_connected = $3, \
                     left_at = CASE WHEN $3 THEN NULL ELSE now() END \
                     WHERE room_id = $1 AND user_id = $2",
                )
                .bind(&room_id)
                .bind(user_id)
                .bind(is_connected)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
    }

    async fn set_participant_role(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StoreError> {
        let room_id = room_id.clone();
        let role_str = if role == Role::Host { "host" } else { "follower" };
        self.with_retry(move |pool| {
            let room_id = room_id.clone();
            async move {
                sqlx::query(
                    "UPDATE participants SET role = $3 WHERE room_id = $1 AND user_id = $2",
                )
                .bind(&room_id)
                .bind(user_id)
                .bind(role_str)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
    }

    async fn get_participants(&self, room_id: &RoomId) -> Result<Vec<ParticipantRecord>, StoreError> {
        let room_id = room_id.clone();
        self.with_retry(move |pool| {
            let room_id = room_id.clone();
            async move {
                let rows = sqlx::query(
                    "SELECT room_id, user_id, role, joined_at, left_at, is_connected, \
                     last_connection_id FROM participants WHERE room_id = $1",
                )
                .bind(&room_id)
                .fetch_all(&pool)
                .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| ParticipantRecord {
                        room_id: row.get("room_id"),
                        user_id: row.get("user_id"),
                        role: if row.get::<String, _>("role") == "host" {
                            Role::Host
                        } else {
                            Role::Follower
                        },
                        joined_at: row.get("joined_at"),
                        left_at: row.get("left_at"),
                        is_connected: row.get("is_connected"),
                        last_connection_id: row.get("last_connection_id"),
                    })
                    .collect())
            }
        })
        .await
    }

    async fn append_event(&self, event: RoomEventRow) -> Result<(), StoreError> {
        self.with_retry(move |pool| {
            let event = event.clone();
            async move {
                sqlx::query(
                    "INSERT INTO room_events (room_id, user_id, event_type, payload, at) \
                     VALUES ($1,$2,$3,$4,$5)",
                )
                .bind(&event.room_id)
                .bind(event.user_id)
                .bind(event_kind_name(&event.event_type))
                .bind(&event.payload)
                .bind(event.at)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
    }
}
