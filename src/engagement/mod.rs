mod error;
mod manager;
pub mod models;
mod recency;
mod sqlite_store;
mod store;

pub use error::{EngagementError, EngagementResult};
pub use manager::EngagementManager;
pub use models::{
    ChannelCard, ChannelProfile, Comment, CommentView, ContinueWatchingEntry, LikedVideo, Page,
    Playlist, RecentEntry, SortDirection, TargetKind, TargetRef, ToggleOutcome, UserProfile, Video,
    VideoCard, VideoSortField, WatchHistoryView, RECENT_WATCHED_CAP,
};
pub use sqlite_store::SqliteEngagementStore;
pub use store::{
    AuthToken, AuthTokenStore, AuthTokenValue, CatalogStore, FeedReader, PlatformStore,
    PlaylistStore, ReactionStore, SubscriptionGraph, WatchStore,
};
