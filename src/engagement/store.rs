use super::models::{
    ChannelCard, ChannelProfile, Comment, CommentView, ContinueWatchingEntry, LikedVideo, Playlist,
    RecentEntry, SortDirection, TargetRef, ToggleOutcome, UserProfile, Video, VideoCard,
    VideoSortField, WatchHistoryView,
};
use anyhow::Result;

/// An opaque bearer token resolved to a verified user id.
///
/// Token issuance belongs to the external identity subsystem; this core
/// only resolves tokens it is handed. The admin CLI and test fixtures mint
/// tokens through [`AuthTokenStore::add_auth_token`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthTokenValue(pub String);

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub user_id: usize,
    pub value: AuthTokenValue,
}

pub trait AuthTokenStore: Send + Sync {
    /// Resolves a token to its owning user. Ok(None) if unknown.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Registers a token for a user (identity-provider seam).
    fn add_auth_token(&self, token: AuthToken) -> Result<()>;
}

/// Reference data owned by the account and publishing subsystems. The
/// engine never mutates these beyond the explicit seams below.
pub trait CatalogStore: Send + Sync {
    /// Creates a user and returns the user id.
    fn create_user(&self, username: &str, avatar: Option<&str>) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<UserProfile>>;

    /// Case-insensitive username lookup.
    fn find_user_by_username(&self, username: &str) -> Result<Option<UserProfile>>;

    fn user_exists(&self, user_id: usize) -> Result<bool>;

    /// Creates a video and returns its generated id. `video_file` and
    /// `thumbnail` are opaque URLs produced by the object-storage
    /// collaborator.
    fn create_video(
        &self,
        owner_id: usize,
        title: &str,
        thumbnail: Option<&str>,
        video_file: Option<&str>,
        duration: Option<f64>,
    ) -> Result<String>;

    /// Returns Ok(None) if the video does not exist.
    fn get_video(&self, video_id: &str) -> Result<Option<Video>>;

    fn video_exists(&self, video_id: &str) -> Result<bool>;

    /// Publish-toggle seam used by the external publishing flow.
    fn set_video_published(&self, video_id: &str, published: bool) -> Result<()>;
}

/// Likes and comments against polymorphic targets.
pub trait ReactionStore: Send + Sync {
    /// Creates the like if absent, deletes it if present, atomically. A
    /// uniqueness violation raced by a concurrent identical toggle resolves
    /// to `Added` (the like exists either way).
    fn toggle_like(&self, user_id: usize, target: &TargetRef) -> Result<ToggleOutcome>;

    fn is_liked(&self, user_id: usize, target: &TargetRef) -> Result<bool>;

    fn count_likes(&self, target: &TargetRef) -> Result<usize>;

    /// Videos the user liked, most recently liked first. Likes whose video
    /// no longer exists are dropped by the join.
    fn list_liked_videos(&self, user_id: usize) -> Result<Vec<LikedVideo>>;

    /// Inserts a comment and returns the stored record.
    fn insert_comment(
        &self,
        author_id: usize,
        target: &TargetRef,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment>;

    /// Returns Ok(None) if the comment does not exist.
    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    /// Replaces content only; author, target and created are immutable.
    fn update_comment_content(&self, comment_id: &str, content: &str) -> Result<()>;

    fn delete_comment(&self, comment_id: &str) -> Result<()>;

    /// One page of comments for a target, newest first, with the author
    /// resolved. Returns the page rows and the total count for the target.
    fn list_comments(
        &self,
        target: &TargetRef,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<CommentView>, usize)>;
}

/// Directed subscriber -> channel edges, queried in both directions.
/// Counts are always computed from the live edge set.
pub trait SubscriptionGraph: Send + Sync {
    fn toggle_subscription(&self, subscriber_id: usize, channel_id: usize)
        -> Result<ToggleOutcome>;

    fn is_subscribed(&self, subscriber_id: usize, channel_id: usize) -> Result<bool>;

    fn subscriber_count(&self, channel_id: usize) -> Result<usize>;

    fn subscription_count(&self, subscriber_id: usize) -> Result<usize>;

    fn list_subscribers(&self, channel_id: usize) -> Result<Vec<ChannelCard>>;

    fn list_subscriptions(&self, subscriber_id: usize) -> Result<Vec<ChannelCard>>;
}

/// The watch-history ledger and its bounded recency projection.
pub trait WatchStore: Send + Sync {
    /// Upserts the ledger row for (user, video): one row per pair, the
    /// latest watch wins.
    fn upsert_watch_history(
        &self,
        user_id: usize,
        video_id: &str,
        watched_at_secs: i64,
        watch_duration: Option<f64>,
    ) -> Result<()>;

    /// Applies move-to-front-and-cap to the recency list.
    fn push_recent_watched(&self, user_id: usize, video_id: &str, watched_at_secs: i64)
        -> Result<()>;

    /// Current recency list, most-recent-first.
    fn get_recent_watched(&self, user_id: usize) -> Result<Vec<RecentEntry>>;

    /// One page of the ledger joined with video metadata, most recently
    /// watched first. Returns the rows and the total count.
    fn list_watch_history(
        &self,
        user_id: usize,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<WatchHistoryView>, usize)>;

    /// The recency list joined with live video metadata; entries whose
    /// video no longer exists are silently dropped.
    fn list_continue_watching(&self, user_id: usize) -> Result<Vec<ContinueWatchingEntry>>;

    /// Removes the ledger row and any recency entry for the pair.
    fn remove_watch_history_item(&self, user_id: usize, video_id: &str) -> Result<()>;

    /// Deletes all ledger rows for the user and empties the recency list.
    fn clear_watch_history(&self, user_id: usize) -> Result<()>;
}

/// Ordered, duplicate-free membership of videos in user-owned collections.
pub trait PlaylistStore: Send + Sync {
    fn create_playlist(
        &self,
        owner_id: usize,
        title: &str,
        description: &str,
        is_public: bool,
    ) -> Result<String>;

    /// Returns Ok(None) if the playlist does not exist.
    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    fn list_user_playlists(&self, owner_id: usize) -> Result<Vec<Playlist>>;

    /// Appends the video at the end of the ordered sequence.
    fn append_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<()>;

    /// Removes by value. Returns false if the video was not a member.
    fn remove_playlist_video(&self, playlist_id: &str, video_id: &str) -> Result<bool>;

    /// Updates title/description iff `owner_id` owns the playlist. Returns
    /// false when no row matched (absent or not the owner).
    fn update_playlist(
        &self,
        playlist_id: &str,
        owner_id: usize,
        title: &str,
        description: &str,
    ) -> Result<bool>;

    /// Deletes iff `owner_id` owns the playlist. Returns false when no row
    /// matched (absent or not the owner).
    fn delete_playlist(&self, playlist_id: &str, owner_id: usize) -> Result<bool>;

    /// Owner lookup used to tell "absent" from "not owner" in logs.
    fn get_playlist_owner(&self, playlist_id: &str) -> Result<Option<usize>>;
}

/// Read-side composition of videos, owners, likes and subscriptions into
/// viewer-relative listing rows.
pub trait FeedReader: Send + Sync {
    /// One page of published videos, newest first, with owner display
    /// fields, like counts and the viewer-relative liked flag. Returns the
    /// rows and the total count of published videos.
    fn feed_page(
        &self,
        viewer_id: Option<usize>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<VideoCard>, usize)>;

    /// One page of a single owner's videos with optional case-insensitive
    /// title search and a caller-selected sort.
    #[allow(clippy::too_many_arguments)]
    fn user_videos_page(
        &self,
        owner_id: usize,
        viewer_id: Option<usize>,
        search: Option<&str>,
        sort_field: VideoSortField,
        sort_dir: SortDirection,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<VideoCard>, usize)>;

    /// Resolves a channel by case-insensitive username and aggregates its
    /// graph counts. Ok(None) if no user matches.
    fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<usize>,
    ) -> Result<Option<ChannelProfile>>;
}

/// Everything the engagement manager needs from persistence.
pub trait PlatformStore:
    AuthTokenStore
    + CatalogStore
    + ReactionStore
    + SubscriptionGraph
    + WatchStore
    + PlaylistStore
    + FeedReader
{
}

impl<T> PlatformStore for T where
    T: AuthTokenStore
        + CatalogStore
        + ReactionStore
        + SubscriptionGraph
        + WatchStore
        + PlaylistStore
        + FeedReader
{
}
