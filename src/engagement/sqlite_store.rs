use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};

use super::models::*;
use super::recency::push_front_capped;
use super::store::*;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::{debug, info};

use rand::{rng, Rng};
use rand_distr::Alphanumeric;

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("avatar", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_username", "username")],
};

const VIDEO_TABLE: Table = Table {
    name: "video",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "owner_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("thumbnail", &SqlType::Text),
        sqlite_column!("video_file", &SqlType::Text),
        sqlite_column!("duration", &SqlType::Real),
        sqlite_column!(
            "views",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_published",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_video_owner_id", "owner_id")],
};

const AUTH_TOKEN_TABLE: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

const LIKED_TARGET_TABLE: Table = Table {
    name: "liked_target",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("target_id", &SqlType::Text, non_null = true),
        sqlite_column!("target_kind", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "target_id"]],
    indices: &[("idx_liked_target_target_id", "target_id")],
};

const COMMENT_TABLE: Table = Table {
    name: "comment",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "author_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("target_id", &SqlType::Text, non_null = true),
        sqlite_column!("target_kind", &SqlType::Integer, non_null = true),
        sqlite_column!("parent_id", &SqlType::Text),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_comment_target_id", "target_id")],
};

const SUBSCRIPTION_TABLE: Table = Table {
    name: "subscription",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "subscriber_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "channel_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["subscriber_id", "channel_id"]],
    indices: &[("idx_subscription_channel_id", "channel_id")],
};

/// V 1
const WATCH_HISTORY_TABLE: Table = Table {
    name: "watch_history",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("video_id", &SqlType::Text, non_null = true),
        sqlite_column!("watched_at", &SqlType::Integer, non_null = true),
        sqlite_column!("watch_duration", &SqlType::Real),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "video_id"]],
    indices: &[("idx_watch_history_user_id", "user_id")],
};

const RECENT_WATCHED_TABLE: Table = Table {
    name: "recent_watched",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("video_id", &SqlType::Text, non_null = true),
        sqlite_column!("watched_at", &SqlType::Integer, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["user_id", "video_id"]],
    indices: &[("idx_recent_watched_user_id", "user_id")],
};

const PLAYLIST_TABLE: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "owner_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!(
            "is_public",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_playlist_owner_id", "owner_id")],
};

const PLAYLIST_VIDEO_TABLE: Table = Table {
    name: "playlist_video",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "playlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("video_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["playlist_id", "video_id"]],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE,
            VIDEO_TABLE,
            AUTH_TOKEN_TABLE,
            LIKED_TARGET_TABLE,
            COMMENT_TABLE,
            SUBSCRIPTION_TABLE,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE,
            VIDEO_TABLE,
            AUTH_TOKEN_TABLE,
            LIKED_TARGET_TABLE,
            COMMENT_TABLE,
            SUBSCRIPTION_TABLE,
            WATCH_HISTORY_TABLE,
            RECENT_WATCHED_TABLE,
            PLAYLIST_TABLE,
            PLAYLIST_VIDEO_TABLE,
        ],
        migration: Some(|conn: &Connection| {
            WATCH_HISTORY_TABLE.create(conn)?;
            RECENT_WATCHED_TABLE.create(conn)?;
            PLAYLIST_TABLE.create(conn)?;
            PLAYLIST_VIDEO_TABLE.create(conn)?;
            Ok(())
        }),
    },
];

/// A random A-z0-9 string
pub(crate) fn random_string(len: usize) -> String {
    let bytes = rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .collect::<Vec<u8>>();
    String::from_utf8_lossy(&bytes).to_string()
}

impl AuthTokenValue {
    pub fn generate() -> Self {
        AuthTokenValue(random_string(40))
    }
}

fn system_time_from_secs(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value as u64)
}

#[derive(Clone)]
pub struct SqliteEngagementStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngagementStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is older than base version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", version);
        }
        VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteEngagementStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;

        Ok(())
    }

    fn now_secs() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }
}

impl AuthTokenStore for SqliteEngagementStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT user_id, value FROM auth_token WHERE value = ?1",
                params![value.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    fn add_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value) VALUES (?1, ?2)",
            params![token.user_id, token.value.0],
        )?;
        Ok(())
    }
}

impl CatalogStore for SqliteEngagementStore {
    fn create_user(&self, username: &str, avatar: Option<&str>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (username, avatar) VALUES (?1, ?2)",
            params![username, avatar],
        )
        .with_context(|| format!("Failed to create user {}", username))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, username, avatar FROM user WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, username, avatar FROM user WHERE lower(username) = lower(?1)",
                params![username],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn user_exists(&self, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_video(
        &self,
        owner_id: usize,
        title: &str,
        thumbnail: Option<&str>,
        video_file: Option<&str>,
        duration: Option<f64>,
    ) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        let video_id = random_string(16);
        conn.execute(
            "INSERT INTO video (id, owner_id, title, thumbnail, video_file, duration) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![video_id, owner_id, title, thumbnail, video_file, duration],
        )
        .context("Could not create video")?;
        Ok(video_id)
    }

    fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        let conn = self.conn.lock().unwrap();
        let video = conn
            .query_row(
                "SELECT id, owner_id, title, thumbnail, video_file, duration, views, is_published, created \
                 FROM video WHERE id = ?1",
                params![video_id],
                |row| {
                    Ok(Video {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        title: row.get(2)?,
                        thumbnail: row.get(3)?,
                        video_file: row.get(4)?,
                        duration: row.get(5)?,
                        views: row.get(6)?,
                        is_published: row.get::<usize, i64>(7)? != 0,
                        created: system_time_from_secs(row.get(8)?),
                    })
                },
            )
            .optional()?;
        Ok(video)
    }

    fn video_exists(&self, video_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM video WHERE id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn set_video_published(&self, video_id: &str, published: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE video SET is_published = ?1 WHERE id = ?2",
            params![published as i64, video_id],
        )?;
        if updated == 0 {
            bail!("Video {} does not exist", video_id);
        }
        Ok(())
    }
}

impl ReactionStore for SqliteEngagementStore {
    fn toggle_like(&self, user_id: usize, target: &TargetRef) -> Result<ToggleOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM liked_target WHERE user_id = ?1 AND target_id = ?2 AND target_kind = ?3",
            params![user_id, target.id, target.kind.to_int()],
        )?;

        let outcome = if deleted > 0 {
            ToggleOutcome::Removed
        } else {
            match tx.execute(
                "INSERT INTO liked_target (user_id, target_id, target_kind) VALUES (?1, ?2, ?3)",
                params![user_id, target.id, target.kind.to_int()],
            ) {
                Ok(_) => ToggleOutcome::Added,
                // A concurrent identical toggle won the insert; the like
                // exists, which is the outcome this caller asked for. Only
                // the uniqueness violation converts, FK failures propagate.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    debug!(
                        "toggle_like({user_id}, {}) lost an insert race, treating as liked",
                        target.id
                    );
                    ToggleOutcome::Added
                }
                Err(e) => return Err(e.into()),
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn is_liked(&self, user_id: usize, target: &TargetRef) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM liked_target WHERE user_id = ?1 AND target_id = ?2 AND target_kind = ?3",
            params![user_id, target.id, target.kind.to_int()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_likes(&self, target: &TargetRef) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM liked_target WHERE target_id = ?1 AND target_kind = ?2",
            params![target.id, target.kind.to_int()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_liked_videos(&self, user_id: usize) -> Result<Vec<LikedVideo>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT v.id, v.title, v.thumbnail, v.duration, v.views \
             FROM liked_target l JOIN video v ON v.id = l.target_id \
             WHERE l.user_id = ?1 AND l.target_kind = ?2 \
             ORDER BY l.created DESC, l.id DESC",
        )?;
        let videos = stmt
            .query_map(params![user_id, TargetKind::Video.to_int()], |row| {
                Ok(LikedVideo {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    thumbnail: row.get(2)?,
                    duration: row.get(3)?,
                    views: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(videos)
    }

    fn insert_comment(
        &self,
        author_id: usize,
        target: &TargetRef,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment> {
        let conn = self.conn.lock().unwrap();
        let comment_id = random_string(16);
        let now = Self::now_secs();
        conn.execute(
            "INSERT INTO comment (id, author_id, target_id, target_kind, parent_id, content, created) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                comment_id,
                author_id,
                target.id,
                target.kind.to_int(),
                parent_id,
                content,
                now
            ],
        )
        .context("Could not create comment")?;

        Ok(Comment {
            id: comment_id,
            author_id,
            target: target.clone(),
            parent_id: parent_id.map(|s| s.to_string()),
            content: content.to_string(),
            created: system_time_from_secs(now),
        })
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        let comment = conn
            .query_row(
                "SELECT id, author_id, target_id, target_kind, parent_id, content, created \
                 FROM comment WHERE id = ?1",
                params![comment_id],
                |row| {
                    let kind_int: i32 = row.get(3)?;
                    Ok((
                        row.get::<usize, String>(0)?,
                        row.get::<usize, usize>(1)?,
                        row.get::<usize, String>(2)?,
                        kind_int,
                        row.get::<usize, Option<String>>(4)?,
                        row.get::<usize, String>(5)?,
                        row.get::<usize, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        match comment {
            None => Ok(None),
            Some((id, author_id, target_id, kind_int, parent_id, content, created)) => {
                let kind = TargetKind::from_int(kind_int)
                    .with_context(|| format!("Comment {} has unknown target kind", id))?;
                Ok(Some(Comment {
                    id,
                    author_id,
                    target: TargetRef::new(kind, target_id),
                    parent_id,
                    content,
                    created: system_time_from_secs(created),
                }))
            }
        }
    }

    fn update_comment_content(&self, comment_id: &str, content: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE comment SET content = ?1 WHERE id = ?2",
            params![content, comment_id],
        )?;
        if updated == 0 {
            bail!("Comment {} does not exist", comment_id);
        }
        Ok(())
    }

    fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM comment WHERE id = ?1",
            params![comment_id],
        )?;
        if deleted == 0 {
            bail!("Comment {} does not exist", comment_id);
        }
        Ok(())
    }

    fn list_comments(
        &self,
        target: &TargetRef,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<CommentView>, usize)> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comment WHERE target_id = ?1 AND target_kind = ?2",
            params![target.id, target.kind.to_int()],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.content, c.parent_id, c.created, u.id, u.username, u.avatar \
             FROM comment c JOIN user u ON u.id = c.author_id \
             WHERE c.target_id = ?1 AND c.target_kind = ?2 \
             ORDER BY c.created DESC, c.id DESC \
             LIMIT ?3 OFFSET ?4",
        )?;
        let comments = stmt
            .query_map(
                params![target.id, target.kind.to_int(), limit, offset],
                |row| {
                    Ok(CommentView {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        parent_id: row.get(2)?,
                        created: system_time_from_secs(row.get(3)?),
                        author: UserProfile {
                            id: row.get(4)?,
                            username: row.get(5)?,
                            avatar: row.get(6)?,
                        },
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((comments, total as usize))
    }
}

impl SubscriptionGraph for SqliteEngagementStore {
    fn toggle_subscription(
        &self,
        subscriber_id: usize,
        channel_id: usize,
    ) -> Result<ToggleOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2",
            params![subscriber_id, channel_id],
        )?;

        let outcome = if deleted > 0 {
            ToggleOutcome::Removed
        } else {
            match tx.execute(
                "INSERT INTO subscription (subscriber_id, channel_id) VALUES (?1, ?2)",
                params![subscriber_id, channel_id],
            ) {
                Ok(_) => ToggleOutcome::Added,
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    debug!(
                        "toggle_subscription({subscriber_id}, {channel_id}) lost an insert race"
                    );
                    ToggleOutcome::Added
                }
                Err(e) => return Err(e.into()),
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn is_subscribed(&self, subscriber_id: usize, channel_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2",
            params![subscriber_id, channel_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn subscriber_count(&self, channel_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscription WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn subscription_count(&self, subscriber_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscription WHERE subscriber_id = ?1",
            params![subscriber_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_subscribers(&self, channel_id: usize) -> Result<Vec<ChannelCard>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.avatar \
             FROM subscription s JOIN user u ON u.id = s.subscriber_id \
             WHERE s.channel_id = ?1 \
             ORDER BY s.created ASC, s.id ASC",
        )?;
        let cards = stmt
            .query_map(params![channel_id], |row| {
                Ok(ChannelCard {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avatar: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn list_subscriptions(&self, subscriber_id: usize) -> Result<Vec<ChannelCard>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.avatar \
             FROM subscription s JOIN user u ON u.id = s.channel_id \
             WHERE s.subscriber_id = ?1 \
             ORDER BY s.created ASC, s.id ASC",
        )?;
        let cards = stmt
            .query_map(params![subscriber_id], |row| {
                Ok(ChannelCard {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avatar: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }
}

impl WatchStore for SqliteEngagementStore {
    fn upsert_watch_history(
        &self,
        user_id: usize,
        video_id: &str,
        watched_at_secs: i64,
        watch_duration: Option<f64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO watch_history (user_id, video_id, watched_at, watch_duration) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(user_id, video_id) DO UPDATE SET \
             watched_at = excluded.watched_at, watch_duration = excluded.watch_duration",
            params![user_id, video_id, watched_at_secs, watch_duration],
        )?;
        Ok(())
    }

    fn push_recent_watched(
        &self,
        user_id: usize,
        video_id: &str,
        watched_at_secs: i64,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current = {
            let mut stmt = tx.prepare(
                "SELECT video_id, watched_at FROM recent_watched \
                 WHERE user_id = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(RecentEntry {
                        video_id: row.get(0)?,
                        watched_at_secs: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let updated = push_front_capped(
            current,
            RecentEntry {
                video_id: video_id.to_string(),
                watched_at_secs,
            },
            RECENT_WATCHED_CAP,
        );

        tx.execute(
            "DELETE FROM recent_watched WHERE user_id = ?1",
            params![user_id],
        )?;
        for (position, entry) in updated.iter().enumerate() {
            tx.execute(
                "INSERT INTO recent_watched (user_id, video_id, watched_at, position) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, entry.video_id, entry.watched_at_secs, position],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_recent_watched(&self, user_id: usize) -> Result<Vec<RecentEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT video_id, watched_at FROM recent_watched \
             WHERE user_id = ?1 ORDER BY position ASC",
        )?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                Ok(RecentEntry {
                    video_id: row.get(0)?,
                    watched_at_secs: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn list_watch_history(
        &self,
        user_id: usize,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<WatchHistoryView>, usize)> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM watch_history h JOIN video v ON v.id = h.video_id \
             WHERE h.user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT h.video_id, v.title, v.thumbnail, v.duration, h.watched_at, h.watch_duration \
             FROM watch_history h JOIN video v ON v.id = h.video_id \
             WHERE h.user_id = ?1 \
             ORDER BY h.watched_at DESC, h.id DESC \
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit, offset], |row| {
                Ok(WatchHistoryView {
                    video_id: row.get(0)?,
                    title: row.get(1)?,
                    thumbnail: row.get(2)?,
                    duration: row.get(3)?,
                    watched_at: system_time_from_secs(row.get(4)?),
                    watch_duration: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total as usize))
    }

    fn list_continue_watching(&self, user_id: usize) -> Result<Vec<ContinueWatchingEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT r.watched_at, v.id, v.title, v.thumbnail, v.duration \
             FROM recent_watched r JOIN video v ON v.id = r.video_id \
             WHERE r.user_id = ?1 \
             ORDER BY r.position ASC",
        )?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                Ok(ContinueWatchingEntry {
                    watched_at: system_time_from_secs(row.get(0)?),
                    video_id: row.get(1)?,
                    title: row.get(2)?,
                    thumbnail: row.get(3)?,
                    duration: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn remove_watch_history_item(&self, user_id: usize, video_id: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM watch_history WHERE user_id = ?1 AND video_id = ?2",
            params![user_id, video_id],
        )?;
        tx.execute(
            "DELETE FROM recent_watched WHERE user_id = ?1 AND video_id = ?2",
            params![user_id, video_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn clear_watch_history(&self, user_id: usize) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM watch_history WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.execute(
            "DELETE FROM recent_watched WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl PlaylistStore for SqliteEngagementStore {
    fn create_playlist(
        &self,
        owner_id: usize,
        title: &str,
        description: &str,
        is_public: bool,
    ) -> Result<String> {
        let conn = self.conn.lock().unwrap();

        // Generate a random 16 A-z0-9 string that's not already a playlist id
        let mut playlist_id = random_string(16);
        while conn.query_row(
            "SELECT COUNT(*) FROM playlist WHERE id = ?1",
            params![playlist_id],
            |row| row.get::<usize, i64>(0),
        )? > 0
        {
            playlist_id = random_string(16);
        }

        conn.execute(
            "INSERT INTO playlist (id, owner_id, title, description, is_public) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![playlist_id, owner_id, title, description, is_public as i64],
        )
        .context("Could not create playlist")?;

        Ok(playlist_id)
    }

    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();

        let playlist = conn
            .query_row(
                "SELECT id, owner_id, title, description, is_public, created \
                 FROM playlist WHERE id = ?1",
                params![playlist_id],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get::<usize, Option<String>>(3)?.unwrap_or_default(),
                        is_public: row.get::<usize, i64>(4)? != 0,
                        created: system_time_from_secs(row.get(5)?),
                        video_ids: vec![],
                    })
                },
            )
            .optional()?;

        let mut playlist = match playlist {
            Some(p) => p,
            None => return Ok(None),
        };

        playlist.video_ids = conn
            .prepare(
                "SELECT video_id FROM playlist_video WHERE playlist_id = ?1 ORDER BY position",
            )?
            .query_map(params![playlist_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(playlist))
    }

    fn list_user_playlists(&self, owner_id: usize) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, description, is_public, created \
             FROM playlist WHERE owner_id = ?1 ORDER BY created ASC, id ASC",
        )?;
        let mut playlists = stmt
            .query_map(params![owner_id], |row| {
                Ok(Playlist {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get::<usize, Option<String>>(3)?.unwrap_or_default(),
                    is_public: row.get::<usize, i64>(4)? != 0,
                    created: system_time_from_secs(row.get(5)?),
                    video_ids: vec![],
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for playlist in &mut playlists {
            playlist.video_ids = conn
                .prepare(
                    "SELECT video_id FROM playlist_video WHERE playlist_id = ?1 ORDER BY position",
                )?
                .query_map(params![playlist.id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
        }

        Ok(playlists)
    }

    fn append_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_video WHERE playlist_id = ?1",
            params![playlist_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO playlist_video (playlist_id, video_id, position) VALUES (?1, ?2, ?3)",
            params![playlist_id, video_id, next_position],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM playlist_video WHERE playlist_id = ?1 AND video_id = ?2",
            params![playlist_id, video_id],
        )?;
        Ok(deleted > 0)
    }

    fn update_playlist(
        &self,
        playlist_id: &str,
        owner_id: usize,
        title: &str,
        description: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE playlist SET title = ?1, description = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![title, description, playlist_id, owner_id],
        )?;
        Ok(updated > 0)
    }

    fn delete_playlist(&self, playlist_id: &str, owner_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM playlist WHERE id = ?1 AND owner_id = ?2",
            params![playlist_id, owner_id],
        )?;
        Ok(deleted > 0)
    }

    fn get_playlist_owner(&self, playlist_id: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let owner = conn
            .query_row(
                "SELECT owner_id FROM playlist WHERE id = ?1",
                params![playlist_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }
}

impl FeedReader for SqliteEngagementStore {
    fn feed_page(
        &self,
        viewer_id: Option<usize>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<VideoCard>, usize)> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM video WHERE is_published = 1",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT v.id, v.title, v.thumbnail, v.duration, v.views, v.created, \
                    u.username, u.avatar, \
                    (SELECT COUNT(*) FROM liked_target l \
                     WHERE l.target_id = v.id AND l.target_kind = ?1) AS likes_count, \
                    CASE WHEN ?2 IS NULL THEN 0 ELSE EXISTS( \
                        SELECT 1 FROM liked_target l \
                        WHERE l.target_id = v.id AND l.target_kind = ?1 AND l.user_id = ?2 \
                    ) END AS is_liked \
             FROM video v LEFT JOIN user u ON u.id = v.owner_id \
             WHERE v.is_published = 1 \
             ORDER BY v.created DESC, v.id DESC \
             LIMIT ?3 OFFSET ?4",
        )?;
        let cards = stmt
            .query_map(
                params![TargetKind::Video.to_int(), viewer_id, limit, offset],
                row_to_video_card,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((cards, total as usize))
    }

    fn user_videos_page(
        &self,
        owner_id: usize,
        viewer_id: Option<usize>,
        search: Option<&str>,
        sort_field: VideoSortField,
        sort_dir: SortDirection,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<VideoCard>, usize)> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM video v \
             WHERE v.owner_id = ?1 AND (?2 IS NULL OR instr(lower(v.title), lower(?2)) > 0)",
            params![owner_id, search],
            |row| row.get(0),
        )?;

        // Sort column/direction come from closed enums, never caller input.
        let query = format!(
            "SELECT v.id, v.title, v.thumbnail, v.duration, v.views, v.created, \
                    u.username, u.avatar, \
                    (SELECT COUNT(*) FROM liked_target l \
                     WHERE l.target_id = v.id AND l.target_kind = ?3) AS likes_count, \
                    CASE WHEN ?4 IS NULL THEN 0 ELSE EXISTS( \
                        SELECT 1 FROM liked_target l \
                        WHERE l.target_id = v.id AND l.target_kind = ?3 AND l.user_id = ?4 \
                    ) END AS is_liked \
             FROM video v LEFT JOIN user u ON u.id = v.owner_id \
             WHERE v.owner_id = ?1 AND (?2 IS NULL OR instr(lower(v.title), lower(?2)) > 0) \
             ORDER BY v.{} {}, v.id ASC \
             LIMIT ?5 OFFSET ?6",
            sort_field.column(),
            sort_dir.keyword(),
        );
        let mut stmt = conn.prepare(&query)?;
        let cards = stmt
            .query_map(
                params![
                    owner_id,
                    search,
                    TargetKind::Video.to_int(),
                    viewer_id,
                    limit,
                    offset
                ],
                row_to_video_card,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((cards, total as usize))
    }

    fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<usize>,
    ) -> Result<Option<ChannelProfile>> {
        let conn = self.conn.lock().unwrap();
        let profile = conn
            .query_row(
                "SELECT u.id, u.username, u.avatar, \
                        (SELECT COUNT(*) FROM subscription s WHERE s.channel_id = u.id), \
                        (SELECT COUNT(*) FROM subscription s WHERE s.subscriber_id = u.id), \
                        (SELECT COUNT(*) FROM video v WHERE v.owner_id = u.id), \
                        CASE WHEN ?2 IS NULL THEN 0 ELSE EXISTS( \
                            SELECT 1 FROM subscription s \
                            WHERE s.channel_id = u.id AND s.subscriber_id = ?2 \
                        ) END \
                 FROM user u WHERE lower(u.username) = lower(?1)",
                params![username, viewer_id],
                |row| {
                    Ok(ChannelProfile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar: row.get(2)?,
                        subscribers_count: row.get::<usize, i64>(3)? as usize,
                        subscriptions_count: row.get::<usize, i64>(4)? as usize,
                        videos_count: row.get::<usize, i64>(5)? as usize,
                        is_subscribed: row.get::<usize, i64>(6)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}

fn row_to_video_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoCard> {
    Ok(VideoCard {
        id: row.get(0)?,
        title: row.get(1)?,
        thumbnail: row.get(2)?,
        duration: row.get(3)?,
        views: row.get(4)?,
        created: system_time_from_secs(row.get(5)?),
        username: row.get(6)?,
        avatar: row.get(7)?,
        likes_count: row.get::<usize, i64>(8)? as usize,
        is_liked_by_me: row.get::<usize, i64>(9)? != 0,
    })
}
