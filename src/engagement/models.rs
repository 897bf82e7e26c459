//! Engagement data models

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// How many entries the per-user "continue watching" list keeps.
pub const RECENT_WATCHED_CAP: usize = 10;

/// The kind half of a polymorphic target reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Video,
    Tweet,
    Comment,
}

impl TargetKind {
    pub fn to_int(&self) -> i32 {
        match self {
            TargetKind::Video => 1,
            TargetKind::Tweet => 2,
            TargetKind::Comment => 3,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(TargetKind::Video),
            2 => Some(TargetKind::Tweet),
            3 => Some(TargetKind::Comment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Video => "video",
            TargetKind::Tweet => "tweet",
            TargetKind::Comment => "comment",
        }
    }
}

/// A reference to "the thing a like or comment is attached to": a
/// discriminated (kind, id) pair. Resolution into the concrete entity is
/// always an explicit per-kind lookup, never inferred from the id alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: String,
}

impl TargetRef {
    pub fn new<S: Into<String>>(kind: TargetKind, id: S) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn video<S: Into<String>>(id: S) -> Self {
        Self::new(TargetKind::Video, id)
    }

    pub fn tweet<S: Into<String>>(id: S) -> Self {
        Self::new(TargetKind::Tweet, id)
    }

    pub fn comment<S: Into<String>>(id: S) -> Self {
        Self::new(TargetKind::Comment, id)
    }
}

/// Outcome of a like or subscription toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// A user in their public capacity: the display fields every join pulls in.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: usize,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: String,
    pub owner_id: usize,
    pub title: String,
    pub thumbnail: Option<String>,
    pub video_file: Option<String>,
    pub duration: Option<f64>,
    pub views: u64,
    pub is_published: bool,
    pub created: SystemTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: String,
    pub author_id: usize,
    pub target: TargetRef,
    pub parent_id: Option<String>,
    pub content: String,
    pub created: SystemTime,
}

/// A comment as listed under a target, with the author resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created: SystemTime,
    pub author: UserProfile,
}

/// A subscriber or subscribed-to channel as returned by graph listings.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCard {
    pub id: usize,
    pub name: String,
    pub avatar: Option<String>,
}

/// One row of the public feed or a per-owner video listing.
#[derive(Debug, Clone, Serialize)]
pub struct VideoCard {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub views: u64,
    pub created: SystemTime,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub likes_count: usize,
    pub is_liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelProfile {
    pub id: usize,
    pub username: String,
    pub avatar: Option<String>,
    pub subscribers_count: usize,
    pub subscriptions_count: usize,
    pub videos_count: usize,
    pub is_subscribed: bool,
}

/// A row of the full watch-history ledger, joined with video metadata.
#[derive(Debug, Clone, Serialize)]
pub struct WatchHistoryView {
    pub video_id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub watched_at: SystemTime,
    pub watch_duration: Option<f64>,
}

/// An entry of the bounded recency list, before the video join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub video_id: String,
    pub watched_at_secs: i64,
}

/// A "continue watching" row: recency entry joined with live video data.
#[derive(Debug, Clone, Serialize)]
pub struct ContinueWatchingEntry {
    pub watched_at: SystemTime,
    pub video_id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
}

/// A video the user liked, joined with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct LikedVideo {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id: String,
    pub owner_id: usize,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub created: SystemTime,
    pub video_ids: Vec<String>,
}

/// Sort key for per-owner video listings. A closed set so no caller input
/// ever reaches SQL as a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSortField {
    Created,
    Views,
    Title,
    Duration,
}

impl VideoSortField {
    pub fn column(&self) -> &'static str {
        match self {
            VideoSortField::Created => "created",
            VideoSortField::Views => "views",
            VideoSortField::Title => "title",
            VideoSortField::Duration => "duration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" | "created_at" => Some(VideoSortField::Created),
            "views" => Some(VideoSortField::Views),
            "title" => Some(VideoSortField::Title),
            "duration" => Some(VideoSortField::Duration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// The uniform pagination envelope every listing operation returns.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(rename = "totalItems")]
    pub total_items: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
    #[serde(rename = "currentPage")]
    pub current_page: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: usize, page: usize, limit: usize) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_items.div_ceil(limit),
            current_page: page,
        }
    }
}
