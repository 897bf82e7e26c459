//! Move-to-front-and-cap semantics for the bounded recency list.
//!
//! Kept as a pure function over `(current list, new entry) -> new list` so
//! the invariants (cap, no duplicates, most-recent-first) are testable
//! without a database; the store applies the result transactionally.

use super::models::RecentEntry;

/// Removes any existing entry for the same video, prepends the new entry,
/// and truncates to `cap`. The input list is expected most-recent-first and
/// the output preserves that order.
pub fn push_front_capped(
    mut list: Vec<RecentEntry>,
    entry: RecentEntry,
    cap: usize,
) -> Vec<RecentEntry> {
    list.retain(|e| e.video_id != entry.video_id);
    list.insert(0, entry);
    list.truncate(cap);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(video_id: &str, watched_at_secs: i64) -> RecentEntry {
        RecentEntry {
            video_id: video_id.to_string(),
            watched_at_secs,
        }
    }

    #[test]
    fn prepends_new_entry() {
        let list = push_front_capped(vec![entry("a", 1)], entry("b", 2), 10);
        assert_eq!(
            list.iter().map(|e| e.video_id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
    }

    #[test]
    fn rewatching_moves_to_front_without_duplicating() {
        let list = vec![entry("a", 3), entry("b", 2), entry("c", 1)];
        let list = push_front_capped(list, entry("c", 4), 10);
        assert_eq!(
            list.iter().map(|e| e.video_id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn never_exceeds_cap() {
        let mut list = Vec::new();
        for i in 0..25 {
            list = push_front_capped(list, entry(&format!("v{i}"), i as i64), 10);
            assert!(list.len() <= 10);
        }
        // Most recent first, oldest fell off.
        assert_eq!(list[0].video_id, "v24");
        assert_eq!(list[9].video_id, "v15");
        assert!(!list.iter().any(|e| e.video_id == "v14"));
    }

    #[test]
    fn no_duplicates_after_arbitrary_sequence() {
        let watches = ["a", "b", "a", "c", "b", "a", "d"];
        let mut list = Vec::new();
        for (i, v) in watches.iter().enumerate() {
            list = push_front_capped(list, entry(v, i as i64), 10);
        }
        let mut ids: Vec<_> = list.iter().map(|e| e.video_id.clone()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), list.len());
    }
}
