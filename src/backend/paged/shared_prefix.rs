//! Per-group shared-prefix table.
//!
//! Each group id in `[0, num_groups)` holds, once materialized, the ordered
//! list of pages encoding the group's common prompt prefix. The first
//! sequence to touch a group builds the entry while holding the table
//! lock; every later sequence in the group observes the built entry and
//! aliases its pages.

use parking_lot::Mutex;

use super::allocator::{PageAllocator, PageHandle};

struct SharedPrefixEntry {
    pages: Vec<PageHandle>,
    prefix_tokens: usize,
}

/// Lazily-built per-group prefix pages.
pub struct SharedPrefixTable {
    entries: Mutex<Vec<Option<SharedPrefixEntry>>>,
}

impl SharedPrefixTable {
    /// Create a table with `num_groups` uninitialized entries.
    pub fn new(num_groups: usize) -> Self {
        Self {
            entries: Mutex::new((0..num_groups).map(|_| None).collect()),
        }
    }

    /// Attach to group `gid`'s prefix, building it on first use with
    /// `requested_tokens` (already page-aligned) pages. If the group was
    /// already built with a different length, the caller silently adopts
    /// the existing value instead of retroactively splitting the group
    /// (a group's prefix is defined by whichever sequence claims the group
    /// first; this avoids retroactively splitting it).
    ///
    /// Returns the prefix's page handles, each already carrying one extra
    /// refcount share for the attaching sequence, and the prefix's actual
    /// token length.
    pub fn attach(
        &self,
        gid: usize,
        requested_tokens: usize,
        allocator: &PageAllocator,
        tokens_per_page: usize,
    ) -> (Vec<PageHandle>, usize) {
        let mut entries = self.entries.lock();
        let entry = entries[gid].get_or_insert_with(|| {
            let pages_needed = requested_tokens / tokens_per_page;
            let pages: Vec<PageHandle> = (0..pages_needed).map(|_| allocator.alloc()).collect();
            crate::log_info!(
                "group {} prefix materialized: {} pages ({} tokens)",
                gid,
                pages_needed,
                requested_tokens
            );
            SharedPrefixEntry {
                pages,
                prefix_tokens: requested_tokens,
            }
        });

        for page in &entry.pages {
            allocator.inc_ref(*page);
        }
        (entry.pages.clone(), entry.prefix_tokens)
    }

    /// Release every initialized group's table-held share of its prefix
    /// pages (one `dec_ref` per page), used by backend teardown.
    pub fn release_all(&self, allocator: &PageAllocator) {
        let mut entries = self.entries.lock();
        for slot in entries.iter_mut() {
            if let Some(entry) = slot.take() {
                for page in entry.pages {
                    allocator.dec_ref(page);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attacher_aliases_first_attacher_pages() {
        let allocator = PageAllocator::create(64, 64 * 8).unwrap();
        let table = SharedPrefixTable::new(1);
        let (pages_a, tokens_a) = table.attach(0, 128, &allocator, 16);
        let (pages_b, tokens_b) = table.attach(0, 128, &allocator, 16);
        assert_eq!(tokens_a, tokens_b);
        assert_eq!(pages_a, pages_b);
        assert_eq!(allocator.pages_in_use(), pages_a.len());
    }

    #[test]
    fn divergent_request_adopts_prebuilt_length() {
        let allocator = PageAllocator::create(64, 64 * 8).unwrap();
        let table = SharedPrefixTable::new(1);
        let (pages_a, tokens_a) = table.attach(0, 96, &allocator, 16);
        let (pages_b, tokens_b) = table.attach(0, 32, &allocator, 16);
        assert_eq!(tokens_a, 96);
        assert_eq!(tokens_b, 96, "later attacher must adopt the already-built length");
        assert_eq!(pages_a, pages_b);
    }

    #[test]
    fn release_all_frees_table_held_shares() {
        let allocator = PageAllocator::create(64, 64 * 8).unwrap();
        let table = SharedPrefixTable::new(1);
        let (pages, _) = table.attach(0, 64, &allocator, 16);
        for p in &pages {
            allocator.dec_ref(*p); // drop the attacher's own share
        }
        assert_eq!(allocator.pages_in_use(), pages.len(), "table's own share still held");
        table.release_all(&allocator);
        assert_eq!(allocator.pages_in_use(), 0);
    }
}
