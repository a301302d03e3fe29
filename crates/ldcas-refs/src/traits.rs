//! The [`PointerStore`] trait defining the named pointer interface.

use ldcas_types::{Cid, Owner, Slug};

use crate::error::RefResult;
use crate::history::History;
use crate::types::HistoryEntry;

/// Storage backend for named pointers.
///
/// Implementations must be thread-safe (`Send + Sync`). Updates to one
/// `(owner, slug)` key are serialized: the history append and the `latest`
/// update form a single critical section, so history order matches the order
/// in which updates completed and `latest` is always the newest entry.
/// Updates to different keys never contend.
pub trait PointerStore: Send + Sync {
    /// Point `slug` at `cid` and record the change in its history.
    fn set_named_pointer(&self, owner: &Owner, slug: &Slug, cid: &Cid) -> RefResult<HistoryEntry>;

    /// The CID `slug` currently points at.
    fn resolve_named_pointer(&self, owner: &Owner, slug: &Slug) -> RefResult<Cid>;

    /// Every CID `slug` has pointed at, oldest first.
    fn read_history(&self, owner: &Owner, slug: &Slug) -> RefResult<History>;

    /// All slugs `owner` has set, sorted.
    fn list_slugs(&self, owner: &Owner) -> RefResult<Vec<Slug>>;

    /// Whether `cid` appears in any of `owner`'s histories.
    fn owns(&self, owner: &Owner, cid: &Cid) -> RefResult<bool> {
        for slug in self.list_slugs(owner)? {
            if self.read_history(owner, &slug)?.contains(cid)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
