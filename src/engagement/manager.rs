use super::error::{EngagementError, EngagementResult};
use super::models::*;
use super::store::PlatformStore;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Orchestrates every engagement operation over the platform store:
/// input validation, the error taxonomy, ownership checks, and the
/// two-projection watch update. Handlers talk to this, never to the store.
pub struct EngagementManager {
    store: Arc<dyn PlatformStore>,
}

fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

impl EngagementManager {
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PlatformStore> {
        &self.store
    }

    fn validate_target(&self, target: &TargetRef) -> EngagementResult<()> {
        if !is_well_formed_id(&target.id) {
            return Err(EngagementError::validation(format!(
                "Invalid {} ID.",
                target.kind.as_str()
            )));
        }
        Ok(())
    }

    fn validate_page(&self, page: usize, limit: usize) -> EngagementResult<usize> {
        if page == 0 || limit == 0 {
            return Err(EngagementError::validation(
                "Page and limit must be positive.",
            ));
        }
        Ok((page - 1) * limit)
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    /// Creates the like if absent, removes it if present. The target itself
    /// is not existence-checked: liking a deleted target is a harmless
    /// no-op for reads, since joins simply omit it.
    pub fn toggle_like(
        &self,
        user_id: usize,
        target: &TargetRef,
    ) -> EngagementResult<ToggleOutcome> {
        self.validate_target(target)?;
        Ok(self.store.toggle_like(user_id, target)?)
    }

    pub fn list_liked_videos(&self, user_id: usize) -> EngagementResult<Vec<LikedVideo>> {
        Ok(self.store.list_liked_videos(user_id)?)
    }

    pub fn create_comment(
        &self,
        author_id: usize,
        target: &TargetRef,
        content: &str,
        parent_id: Option<&str>,
    ) -> EngagementResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngagementError::validation("Content is required."));
        }
        self.validate_target(target)?;

        match target.kind {
            // Video targets are existence-checked before commenting; tweet
            // targets are not.
            TargetKind::Video => {
                if !self.store.video_exists(&target.id)? {
                    return Err(EngagementError::not_found("Video not found."));
                }
            }
            TargetKind::Tweet => {}
            TargetKind::Comment => {
                return Err(EngagementError::validation(
                    "Comments cannot target other comments.",
                ));
            }
        }

        Ok(self
            .store
            .insert_comment(author_id, target, content, parent_id)?)
    }

    pub fn update_comment(
        &self,
        comment_id: &str,
        author_id: usize,
        content: &str,
    ) -> EngagementResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngagementError::validation("Content is required."));
        }
        if !is_well_formed_id(comment_id) {
            return Err(EngagementError::validation("Invalid comment ID."));
        }

        let comment = self
            .store
            .get_comment(comment_id)?
            .ok_or_else(|| EngagementError::not_found("Comment not found."))?;
        if comment.author_id != author_id {
            return Err(EngagementError::forbidden(
                "You are not allowed to update this comment.",
            ));
        }

        self.store.update_comment_content(comment_id, content)?;
        Ok(Comment {
            content: content.to_string(),
            ..comment
        })
    }

    pub fn delete_comment(&self, comment_id: &str, author_id: usize) -> EngagementResult<()> {
        if !is_well_formed_id(comment_id) {
            return Err(EngagementError::validation("Invalid comment ID."));
        }

        let comment = self
            .store
            .get_comment(comment_id)?
            .ok_or_else(|| EngagementError::not_found("Comment not found."))?;
        if comment.author_id != author_id {
            return Err(EngagementError::forbidden(
                "You are not allowed to delete this comment.",
            ));
        }

        self.store.delete_comment(comment_id)?;
        Ok(())
    }

    /// Comments for a target, newest first. No target existence check: an
    /// absent target yields an empty page.
    pub fn list_comments(
        &self,
        target: &TargetRef,
        page: usize,
        limit: usize,
    ) -> EngagementResult<Page<CommentView>> {
        self.validate_target(target)?;
        let offset = self.validate_page(page, limit)?;
        let (items, total) = self.store.list_comments(target, offset, limit)?;
        Ok(Page::new(items, total, page, limit))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn toggle_subscription(
        &self,
        subscriber_id: usize,
        channel_id: usize,
    ) -> EngagementResult<ToggleOutcome> {
        if !self.store.user_exists(channel_id)? {
            return Err(EngagementError::not_found("Channel not found."));
        }
        Ok(self.store.toggle_subscription(subscriber_id, channel_id)?)
    }

    pub fn list_subscribers(&self, channel_id: usize) -> EngagementResult<Vec<ChannelCard>> {
        Ok(self.store.list_subscribers(channel_id)?)
    }

    pub fn list_subscriptions(&self, subscriber_id: usize) -> EngagementResult<Vec<ChannelCard>> {
        Ok(self.store.list_subscriptions(subscriber_id)?)
    }

    // =========================================================================
    // Watch recency
    // =========================================================================

    /// Records a watch event into both projections: the per-pair ledger
    /// upsert and the bounded recency list. Both are attempted even if the
    /// first fails; partial completion is logged and surfaced as an error,
    /// and heals on the next watch of the same video.
    pub fn record_watch(
        &self,
        user_id: usize,
        video_id: &str,
        watch_duration: Option<f64>,
    ) -> EngagementResult<()> {
        if !is_well_formed_id(video_id) {
            return Err(EngagementError::validation("Invalid video ID."));
        }
        let now = now_secs();

        let history = self
            .store
            .upsert_watch_history(user_id, video_id, now, watch_duration);
        let recency = self.store.push_recent_watched(user_id, video_id, now);

        match (history, recency) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => {
                warn!("record_watch({user_id}, {video_id}): ledger update failed: {e}");
                Err(e.into())
            }
            (Ok(()), Err(e)) => {
                warn!("record_watch({user_id}, {video_id}): recency update failed: {e}");
                Err(e.into())
            }
            (Err(e1), Err(e2)) => {
                warn!("record_watch({user_id}, {video_id}): both updates failed: {e1}; {e2}");
                Err(e1.into())
            }
        }
    }

    pub fn list_watch_history(
        &self,
        user_id: usize,
        page: usize,
        limit: usize,
    ) -> EngagementResult<Page<WatchHistoryView>> {
        let offset = self.validate_page(page, limit)?;
        let (items, total) = self.store.list_watch_history(user_id, offset, limit)?;
        Ok(Page::new(items, total, page, limit))
    }

    pub fn list_continue_watching(
        &self,
        user_id: usize,
    ) -> EngagementResult<Vec<ContinueWatchingEntry>> {
        Ok(self.store.list_continue_watching(user_id)?)
    }

    pub fn remove_watch_history_item(
        &self,
        user_id: usize,
        video_id: &str,
    ) -> EngagementResult<()> {
        if !is_well_formed_id(video_id) {
            return Err(EngagementError::validation("Invalid video ID."));
        }
        Ok(self.store.remove_watch_history_item(user_id, video_id)?)
    }

    pub fn clear_watch_history(&self, user_id: usize) -> EngagementResult<()> {
        Ok(self.store.clear_watch_history(user_id)?)
    }

    // =========================================================================
    // Feed & profiles
    // =========================================================================

    /// The public feed: published videos, newest first, viewable
    /// anonymously (the liked flag is false without a viewer).
    pub fn get_feed(
        &self,
        viewer_id: Option<usize>,
        page: usize,
        limit: usize,
    ) -> EngagementResult<Page<VideoCard>> {
        let offset = self.validate_page(page, limit)?;
        let (items, total) = self.store.feed_page(viewer_id, offset, limit)?;
        Ok(Page::new(items, total, page, limit))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn get_user_videos(
        &self,
        owner_id: usize,
        viewer_id: Option<usize>,
        search: Option<&str>,
        sort_field: VideoSortField,
        sort_dir: SortDirection,
        page: usize,
        limit: usize,
    ) -> EngagementResult<Page<VideoCard>> {
        // A listing always needs a bound owner.
        if !self.store.user_exists(owner_id)? {
            return Err(EngagementError::validation("Invalid or missing owner."));
        }
        let offset = self.validate_page(page, limit)?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (items, total) = self.store.user_videos_page(
            owner_id, viewer_id, search, sort_field, sort_dir, offset, limit,
        )?;
        Ok(Page::new(items, total, page, limit))
    }

    pub fn get_channel_profile(
        &self,
        username: &str,
        viewer_id: Option<usize>,
    ) -> EngagementResult<ChannelProfile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngagementError::validation("Username is required."));
        }
        self.store
            .channel_profile(username, viewer_id)?
            .ok_or_else(|| EngagementError::not_found("Channel doesn't exist."))
    }

    pub fn get_video(&self, video_id: &str) -> EngagementResult<Video> {
        if !is_well_formed_id(video_id) {
            return Err(EngagementError::validation("Invalid video ID."));
        }
        self.store
            .get_video(video_id)?
            .ok_or_else(|| EngagementError::not_found("Video not found."))
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    pub fn create_playlist(
        &self,
        owner_id: usize,
        title: &str,
        description: &str,
        is_public: bool,
    ) -> EngagementResult<Playlist> {
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() || description.is_empty() {
            return Err(EngagementError::validation(
                "Title and description cannot be empty.",
            ));
        }

        let playlist_id = self
            .store
            .create_playlist(owner_id, title, description, is_public)?;
        self.store
            .get_playlist(&playlist_id)?
            .ok_or_else(|| EngagementError::not_found("Playlist does not exist."))
    }

    pub fn get_playlist(&self, playlist_id: &str) -> EngagementResult<Playlist> {
        if !is_well_formed_id(playlist_id) {
            return Err(EngagementError::validation("Invalid playlist ID."));
        }
        self.store
            .get_playlist(playlist_id)?
            .ok_or_else(|| EngagementError::not_found("Playlist does not exist."))
    }

    pub fn list_user_playlists(&self, user_id: usize) -> EngagementResult<Vec<Playlist>> {
        Ok(self.store.list_user_playlists(user_id)?)
    }

    /// Membership mutations are not ownership-gated; only delete/update
    /// are. See DESIGN.md.
    pub fn add_playlist_video(
        &self,
        playlist_id: &str,
        video_id: &str,
        _requester_id: usize,
    ) -> EngagementResult<Playlist> {
        if !is_well_formed_id(playlist_id) || !is_well_formed_id(video_id) {
            return Err(EngagementError::validation("Invalid playlist or video ID."));
        }

        let playlist = self
            .store
            .get_playlist(playlist_id)?
            .ok_or_else(|| EngagementError::not_found("Playlist does not exist."))?;
        if playlist.video_ids.iter().any(|v| v == video_id) {
            return Err(EngagementError::conflict(
                "Video already exists in playlist.",
            ));
        }

        self.store.append_playlist_video(playlist_id, video_id)?;
        self.get_playlist(playlist_id)
    }

    pub fn remove_playlist_video(
        &self,
        playlist_id: &str,
        video_id: &str,
        _requester_id: usize,
    ) -> EngagementResult<Playlist> {
        if !is_well_formed_id(playlist_id) || !is_well_formed_id(video_id) {
            return Err(EngagementError::validation("Invalid playlist or video ID."));
        }

        if self.store.get_playlist(playlist_id)?.is_none() {
            return Err(EngagementError::not_found("Playlist does not exist."));
        }
        if !self.store.remove_playlist_video(playlist_id, video_id)? {
            return Err(EngagementError::not_found(
                "Video does not exist in playlist.",
            ));
        }
        self.get_playlist(playlist_id)
    }

    pub fn update_playlist(
        &self,
        playlist_id: &str,
        requester_id: usize,
        title: &str,
        description: &str,
    ) -> EngagementResult<Playlist> {
        if !is_well_formed_id(playlist_id) {
            return Err(EngagementError::validation("Invalid playlist ID."));
        }
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() || description.is_empty() {
            return Err(EngagementError::validation(
                "Title and description cannot be empty.",
            ));
        }

        if self
            .store
            .update_playlist(playlist_id, requester_id, title, description)?
        {
            return self.get_playlist(playlist_id);
        }
        Err(self.playlist_refusal(playlist_id, requester_id, "update"))
    }

    pub fn delete_playlist(
        &self,
        playlist_id: &str,
        requester_id: usize,
    ) -> EngagementResult<()> {
        if !is_well_formed_id(playlist_id) {
            return Err(EngagementError::validation("Invalid playlist ID."));
        }

        if self.store.delete_playlist(playlist_id, requester_id)? {
            return Ok(());
        }
        Err(self.playlist_refusal(playlist_id, requester_id, "delete"))
    }

    /// Ownership failure and non-existence are indistinguishable to the
    /// caller; the real reason goes to the logs only.
    fn playlist_refusal(
        &self,
        playlist_id: &str,
        requester_id: usize,
        op: &str,
    ) -> EngagementError {
        match self.store.get_playlist_owner(playlist_id) {
            Ok(Some(owner_id)) => debug!(
                "playlist {op} refused: user {requester_id} is not the owner ({owner_id}) of {playlist_id}"
            ),
            Ok(None) => debug!("playlist {op} refused: {playlist_id} does not exist"),
            Err(e) => return e.into(),
        }
        EngagementError::not_found("Playlist not found or unauthorized.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::sqlite_store::SqliteEngagementStore;
    use tempfile::TempDir;

    fn create_manager() -> (EngagementManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteEngagementStore::new(temp_dir.path().join("test.db")).unwrap();
        (EngagementManager::new(Arc::new(store)), temp_dir)
    }

    fn user(manager: &EngagementManager, name: &str) -> usize {
        manager.store().create_user(name, None).unwrap()
    }

    fn video(manager: &EngagementManager, owner: usize, title: &str) -> String {
        manager
            .store()
            .create_video(owner, title, None, None, None)
            .unwrap()
    }

    #[test]
    fn toggle_like_rejects_malformed_id() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");

        let result = manager.toggle_like(alice, &TargetRef::video("no/such/id"));
        assert!(matches!(result, Err(EngagementError::Validation(_))));

        let result = manager.toggle_like(alice, &TargetRef::video(""));
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }

    #[test]
    fn double_toggle_leaves_no_like_behind() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v = video(&manager, alice, "first");
        let target = TargetRef::video(&v);

        assert_eq!(
            manager.toggle_like(alice, &target).unwrap(),
            ToggleOutcome::Added
        );
        assert_eq!(
            manager.toggle_like(alice, &target).unwrap(),
            ToggleOutcome::Removed
        );

        let feed = manager.get_feed(Some(alice), 1, 10).unwrap();
        assert_eq!(feed.items[0].likes_count, 0);
        assert!(!feed.items[0].is_liked_by_me);
    }

    #[test]
    fn liking_an_absent_target_is_allowed() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");

        // No existence check by design; reads simply omit it.
        let outcome = manager
            .toggle_like(alice, &TargetRef::video("aaaabbbbccccdddd"))
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        assert!(manager.list_liked_videos(alice).unwrap().is_empty());
    }

    #[test]
    fn comment_requires_content_and_existing_video() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v = video(&manager, alice, "first");

        let result = manager.create_comment(alice, &TargetRef::video(&v), "   ", None);
        assert!(matches!(result, Err(EngagementError::Validation(_))));

        let result = manager.create_comment(
            alice,
            &TargetRef::video("aaaabbbbccccdddd"),
            "hello",
            None,
        );
        assert!(matches!(result, Err(EngagementError::NotFound(_))));

        // Tweet targets are not existence-checked.
        let comment = manager
            .create_comment(alice, &TargetRef::tweet("sometweetid12345"), "hello", None)
            .unwrap();
        assert_eq!(comment.content, "hello");

        // Comments cannot target comments.
        let result =
            manager.create_comment(alice, &TargetRef::comment(&comment.id), "reply?", None);
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }

    #[test]
    fn comment_content_is_trimmed() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v = video(&manager, alice, "first");

        let comment = manager
            .create_comment(alice, &TargetRef::video(&v), "  hello  ", None)
            .unwrap();
        assert_eq!(comment.content, "hello");
    }

    #[test]
    fn comment_mutations_are_author_gated() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let bob = user(&manager, "bob");
        let v = video(&manager, alice, "first");
        let target = TargetRef::video(&v);

        let comment = manager
            .create_comment(alice, &target, "original", None)
            .unwrap();

        let result = manager.update_comment(&comment.id, bob, "hijacked");
        assert!(matches!(result, Err(EngagementError::Forbidden(_))));
        let result = manager.delete_comment(&comment.id, bob);
        assert!(matches!(result, Err(EngagementError::Forbidden(_))));

        // The comment is untouched and still listed.
        let page = manager.list_comments(&target, 1, 10).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].content, "original");

        let updated = manager.update_comment(&comment.id, alice, "edited").unwrap();
        assert_eq!(updated.content, "edited");
        manager.delete_comment(&comment.id, alice).unwrap();

        let result = manager.update_comment(&comment.id, alice, "gone");
        assert!(matches!(result, Err(EngagementError::NotFound(_))));
    }

    #[test]
    fn subscription_toggle_requires_existing_channel() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let bob = user(&manager, "bob");

        assert_eq!(
            manager.toggle_subscription(alice, bob).unwrap(),
            ToggleOutcome::Added
        );
        assert_eq!(
            manager.toggle_subscription(alice, bob).unwrap(),
            ToggleOutcome::Removed
        );

        let result = manager.toggle_subscription(alice, 999);
        assert!(matches!(result, Err(EngagementError::NotFound(_))));
    }

    #[test]
    fn self_subscription_is_not_rejected() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");

        assert_eq!(
            manager.toggle_subscription(alice, alice).unwrap(),
            ToggleOutcome::Added
        );
        let profile = manager.get_channel_profile("alice", Some(alice)).unwrap();
        assert_eq!(profile.subscribers_count, 1);
    }

    #[test]
    fn rewatching_moves_to_front_and_updates_ledger_in_place() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v1 = video(&manager, alice, "first");
        let v2 = video(&manager, alice, "second");

        manager.record_watch(alice, &v1, Some(5.0)).unwrap();
        manager.record_watch(alice, &v2, Some(7.0)).unwrap();
        manager.record_watch(alice, &v1, Some(9.0)).unwrap();

        let recent = manager.store().get_recent_watched(alice).unwrap();
        let order: Vec<_> = recent.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(order, vec![v1.as_str(), v2.as_str()]);

        let history = manager.list_watch_history(alice, 1, 10).unwrap();
        assert_eq!(history.total_items, 2);
        let v1_row = history
            .items
            .iter()
            .find(|r| r.video_id == v1)
            .unwrap();
        assert_eq!(v1_row.watch_duration, Some(9.0));
    }

    #[test]
    fn watch_history_pagination_envelope() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        for i in 0..5 {
            let v = video(&manager, alice, &format!("video {i}"));
            manager.record_watch(alice, &v, None).unwrap();
        }

        let page = manager.list_watch_history(alice, 2, 2).unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.items.len(), 2);

        let result = manager.list_watch_history(alice, 0, 10);
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }

    #[test]
    fn feed_is_anonymous_friendly() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v = video(&manager, alice, "first");
        manager.toggle_like(alice, &TargetRef::video(&v)).unwrap();

        let feed = manager.get_feed(None, 1, 10).unwrap();
        assert_eq!(feed.items[0].likes_count, 1);
        assert!(!feed.items[0].is_liked_by_me);
    }

    #[test]
    fn user_videos_requires_known_owner() {
        let (manager, _tmp) = create_manager();

        let result = manager.get_user_videos(
            42,
            None,
            None,
            VideoSortField::Created,
            SortDirection::Desc,
            1,
            10,
        );
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }

    #[test]
    fn channel_profile_not_found() {
        let (manager, _tmp) = create_manager();
        let result = manager.get_channel_profile("ghost", None);
        assert!(matches!(result, Err(EngagementError::NotFound(_))));

        let result = manager.get_channel_profile("  ", None);
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }

    #[test]
    fn playlist_membership_conflicts_and_not_found() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let v = video(&manager, alice, "first");

        let playlist = manager
            .create_playlist(alice, "mine", "stuff", true)
            .unwrap();

        let playlist2 = manager
            .add_playlist_video(&playlist.id, &v, alice)
            .unwrap();
        assert_eq!(playlist2.video_ids, vec![v.clone()]);

        let result = manager.add_playlist_video(&playlist.id, &v, alice);
        assert!(matches!(result, Err(EngagementError::Conflict(_))));

        let result = manager.add_playlist_video("aaaabbbbccccdddd", &v, alice);
        assert!(matches!(result, Err(EngagementError::NotFound(_))));

        let result = manager.remove_playlist_video(&playlist.id, "aaaabbbbccccdddd", alice);
        assert!(matches!(result, Err(EngagementError::NotFound(_))));

        manager
            .remove_playlist_video(&playlist.id, &v, alice)
            .unwrap();
    }

    #[test]
    fn playlist_ownership_failures_look_like_not_found() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");
        let bob = user(&manager, "bob");

        let playlist = manager
            .create_playlist(alice, "mine", "stuff", true)
            .unwrap();

        let update = manager.update_playlist(&playlist.id, bob, "stolen", "nope");
        assert!(matches!(update, Err(EngagementError::NotFound(_))));
        let delete = manager.delete_playlist(&playlist.id, bob);
        assert!(matches!(delete, Err(EngagementError::NotFound(_))));

        // Identical error kind for a playlist that does not exist at all.
        let missing = manager.delete_playlist("aaaabbbbccccdddd", bob);
        assert!(matches!(missing, Err(EngagementError::NotFound(_))));

        // The playlist survives the refused mutations.
        let fetched = manager.get_playlist(&playlist.id).unwrap();
        assert_eq!(fetched.title, "mine");
    }

    #[test]
    fn playlist_create_validates_fields() {
        let (manager, _tmp) = create_manager();
        let alice = user(&manager, "alice");

        let result = manager.create_playlist(alice, "  ", "desc", true);
        assert!(matches!(result, Err(EngagementError::Validation(_))));
        let result = manager.create_playlist(alice, "title", "", true);
        assert!(matches!(result, Err(EngagementError::Validation(_))));
    }
}
