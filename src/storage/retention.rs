//! Retention sweeps and index maintenance
//!
//! Nothing here runs on its own; the embedding application decides when
//! to call [`MemoryStore::cleanup`].

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use crate::Result;
use super::search::{self, IndexReport};
use super::sqlite::{MemoryStore, format_timestamp, now};

/// Default age after which an unused fact becomes eligible for removal
pub const DEFAULT_MAX_AGE_DAYS: i64 = 90;

/// Which facts a retention sweep removes.
///
/// A fact is removed when it was last accessed strictly before
/// `now - max_age` *and* has been accessed at most `min_access_count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub min_access_count: u32,
    /// Apply the predicate to superseded facts too
    pub include_superseded: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            min_access_count: 0,
            include_superseded: true,
        }
    }
}

impl MemoryStore {
    /// Remove stale, rarely used facts. Returns the number removed.
    pub fn cleanup(&mut self, max_age: Duration, min_access_count: u32) -> Result<usize> {
        self.cleanup_with(&RetentionPolicy {
            max_age,
            min_access_count,
            ..RetentionPolicy::default()
        })
    }

    /// Remove facts according to `policy`, relative to the current time.
    ///
    /// An age reaching past the earliest representable time removes nothing.
    pub fn cleanup_with(&mut self, policy: &RetentionPolicy) -> Result<usize> {
        let cutoff = now()
            .checked_sub_signed(policy.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.cleanup_before(cutoff, policy.min_access_count, policy.include_superseded)
    }

    /// Remove facts last accessed strictly before `cutoff` with
    /// `access_count <= min_access_count`.
    ///
    /// Rows and their index entries are deleted in one transaction.
    pub fn cleanup_before(
        &mut self,
        cutoff: DateTime<Utc>,
        min_access_count: u32,
        include_superseded: bool,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                r#"
                SELECT id FROM facts
                WHERE accessed_at < ?1
                  AND access_count <= ?2
                  AND (?3 OR superseded_by IS NULL)
                "#,
            )?;
            let ids = stmt
                .query_map(
                    params![format_timestamp(cutoff), min_access_count, include_superseded],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };

        let mut removed = 0;
        for id in &ids {
            search::remove_fact(&tx, *id)?;
            removed += tx.execute("DELETE FROM facts WHERE id = ?1", [id])?;
        }
        tx.commit()?;

        tracing::info!(
            "Retention sweep removed {} facts (cutoff {}, max access {})",
            removed,
            format_timestamp(cutoff),
            min_access_count
        );
        Ok(removed)
    }

    /// Compare the search index with the facts table
    pub fn check_index(&self) -> Result<IndexReport> {
        search::verify_consistency(&self.conn)
    }

    /// Re-create the search index from the facts table
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let indexed = search::rebuild(&tx)?;
        tx.commit()?;
        tracing::info!("Rebuilt search index ({} facts)", indexed);
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RememberOptions;

    fn backdate(store: &MemoryStore, id: i64, accessed_at: DateTime<Utc>, access_count: u32) {
        store
            .conn
            .execute(
                "UPDATE facts SET accessed_at = ?1, access_count = ?2 WHERE id = ?3",
                params![format_timestamp(accessed_at), access_count, id],
            )
            .unwrap();
    }

    #[test]
    fn test_cleanup_boundary() {
        let mut store = MemoryStore::open_in_memory().unwrap();
        let cutoff = now() - Duration::days(30);

        let at_cutoff_popular = store.remember("at cutoff, popular", RememberOptions::default()).unwrap();
        let at_cutoff_unused = store.remember("at cutoff, unused", RememberOptions::default()).unwrap();
        let old_unused = store.remember("old and unused", RememberOptions::default()).unwrap();
        let old_at_threshold = store.remember("old, at threshold", RememberOptions::default()).unwrap();
        let old_popular = store.remember("old but popular", RememberOptions::default()).unwrap();
        let fresh = store.remember("fresh", RememberOptions::default()).unwrap();

        let old = cutoff - Duration::seconds(1);
        backdate(&store, at_cutoff_popular, cutoff, 5);
        backdate(&store, at_cutoff_unused, cutoff, 0);
        backdate(&store, old_unused, old, 0);
        backdate(&store, old_at_threshold, old, 1);
        backdate(&store, old_popular, old, 2);

        let removed = store.cleanup_before(cutoff, 1, true).unwrap();
        assert_eq!(removed, 2);

        for survivor in [at_cutoff_popular, at_cutoff_unused, old_popular, fresh] {
            assert!(store.get_fact(survivor).unwrap().is_some());
        }
        for gone in [old_unused, old_at_threshold] {
            assert!(store.get_fact(gone).unwrap().is_none());
        }
        assert!(store.check_index().unwrap().is_consistent());
    }

    #[test]
    fn test_cleanup_by_age() {
        let mut store = MemoryStore::open_in_memory().unwrap();
        let stale = store.remember("stale note", RememberOptions::default()).unwrap();
        store.remember("recent note", RememberOptions::default()).unwrap();
        backdate(&store, stale, now() - Duration::days(120), 0);

        assert_eq!(store.cleanup(Duration::days(90), 0).unwrap(), 1);
        assert_eq!(store.stats().unwrap().facts, 1);
        // Removed facts are gone from the index too
        let hits = store.recall("note", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fact.content, "recent note");
    }

    #[test]
    fn test_cleanup_superseded_rows() {
        let mut store = MemoryStore::open_in_memory().unwrap();
        let old = store.remember("config lives in /etc", RememberOptions::default()).unwrap();
        let new = store.supersede(old, "config lives in ~/.config", RememberOptions::default()).unwrap();
        let long_ago = now() - Duration::days(365);
        backdate(&store, old, long_ago, 0);

        let live_only = RetentionPolicy {
            include_superseded: false,
            ..RetentionPolicy::default()
        };
        assert_eq!(store.cleanup_with(&live_only).unwrap(), 0);
        assert!(store.get_fact(old).unwrap().is_some());

        assert_eq!(store.cleanup_with(&RetentionPolicy::default()).unwrap(), 1);
        assert!(store.get_fact(old).unwrap().is_none());
        assert_eq!(store.fact_history(new).unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_nothing_to_do() {
        let mut store = MemoryStore::open_in_memory().unwrap();
        store.remember("kept", RememberOptions::default()).unwrap();
        assert_eq!(store.cleanup_with(&RetentionPolicy::default()).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_with_huge_age_removes_nothing() {
        let mut store = MemoryStore::open_in_memory().unwrap();
        let ancient = store.remember("written centuries ago", RememberOptions::default()).unwrap();
        backdate(&store, ancient, now() - Duration::days(365 * 200), 0);

        // Past the earliest representable time, nothing is old enough
        assert_eq!(store.cleanup(Duration::days(100_000_000), 0).unwrap(), 0);
        assert!(store.get_fact(ancient).unwrap().is_some());
    }
}
