//! Fixed-arena page allocator with refcount-based reclamation.
//!
//! A single anonymous mapping is sliced into `num_pages` equal-size pages.
//! Allocation hands out a page with refcount 1; `inc_ref`/`dec_ref` manage
//! shared ownership; a page returns to the free pool exactly when its
//! refcount reaches zero. The free-list is a LIFO stack (popped from the
//! tail) for cache warmth, mirroring how page-pool allocators elsewhere in
//! this codebase structure their free lists.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use memmap2::MmapMut;
use parking_lot::Mutex;

use crate::core::error::{Result, SimError};

/// A handle to one page in a `PageAllocator`'s arena. Carries no data of
/// its own; it is only ever used as an index into the allocator it came
/// from. Pages never point back at their holders -- ownership flows one
/// way, from sequence/table to allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(u32);

impl PageHandle {
    /// The raw page index this handle addresses.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Owns one contiguous arena, sliced into `page_bytes`-size pages, plus the
/// refcount descriptor table and free-list for them.
pub struct PageAllocator {
    // Never read or written; its only purpose is to make "reserve N bytes
    // of address space" a real OS-level operation.
    _arena: MmapMut,
    page_bytes: usize,
    num_pages: usize,
    refcounts: Box<[AtomicU32]>,
    free: Mutex<Vec<u32>>,
    pages_in_use: AtomicUsize,
}

impl PageAllocator {
    /// Create an allocator with `num_pages = arena_bytes / page_bytes`,
    /// all pages free. Fails if the OS refuses the mapping.
    pub fn create(page_bytes: usize, arena_bytes: usize) -> Result<Self> {
        let num_pages = arena_bytes / page_bytes;
        let mapped_len = (num_pages * page_bytes).max(page_bytes);
        let arena = MmapMut::map_anon(mapped_len).map_err(|source| SimError::ArenaMappingFailed {
            arena_bytes,
            source,
        })?;

        let refcounts = (0..num_pages).map(|_| AtomicU32::new(0)).collect::<Vec<_>>().into_boxed_slice();
        let free = Mutex::new((0..num_pages as u32).collect());

        Ok(Self {
            _arena: arena,
            page_bytes,
            num_pages,
            refcounts,
            free,
            pages_in_use: AtomicUsize::new(0),
        })
    }

    /// Allocate a page with refcount 1. Running out of pages is fatal: the
    /// simulator's purpose is to surface the capacity envelope, not model
    /// eviction.
    pub fn alloc(&self) -> PageHandle {
        let mut free = self.free.lock();
        let idx = free.pop().unwrap_or_else(|| {
            panic!(
                "kvsim: page allocator exhausted ({} pages, {} in use) -- out-of-pages is fatal by design",
                self.num_pages,
                self.pages_in_use.load(Ordering::Relaxed)
            )
        });
        self.refcounts[idx as usize].store(1, Ordering::Release);
        self.pages_in_use.fetch_add(1, Ordering::Relaxed);
        PageHandle(idx)
    }

    /// Increment a page's refcount. Safe to call without the free-list lock
    /// only because the caller already holds at least one reference to
    /// `page`, so the refcount cannot reach zero (and the page cannot be
    /// reclaimed) concurrently with this call.
    pub fn inc_ref(&self, page: PageHandle) {
        self.refcounts[page.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement a page's refcount, returning it to the free pool at zero.
    /// Panics on underflow (a `dec_ref` on a page already at 0 indicates a
    /// bookkeeping bug, not a recoverable condition).
    pub fn dec_ref(&self, page: PageHandle) {
        let mut free = self.free.lock();
        let idx = page.index();
        let prev = self.refcounts[idx].load(Ordering::Acquire);
        if prev == 0 {
            panic!("kvsim: refcount underflow on page {idx}: dec_ref called on a page already at 0");
        }
        self.refcounts[idx].store(prev - 1, Ordering::Release);
        if prev == 1 {
            free.push(page.0);
            self.pages_in_use.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Count of descriptors with refcount > 0.
    pub fn pages_in_use(&self) -> usize {
        self.pages_in_use.load(Ordering::Relaxed)
    }

    /// Count of descriptors with refcount == 0.
    pub fn free_count(&self) -> usize {
        self.num_pages - self.pages_in_use()
    }

    /// Configured page size, in bytes.
    pub fn page_bytes(&self) -> usize {
        self.page_bytes
    }

    /// Total number of pages the arena was sliced into.
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_allocator(num_pages: usize) -> PageAllocator {
        PageAllocator::create(64, num_pages * 64).unwrap()
    }

    #[test]
    fn conservation_holds_through_alloc_and_free() {
        let alloc = small_allocator(4);
        assert_eq!(alloc.pages_in_use() + alloc.free_count(), 4);
        let a = alloc.alloc();
        let b = alloc.alloc();
        assert_eq!(alloc.pages_in_use(), 2);
        assert_eq!(alloc.pages_in_use() + alloc.free_count(), 4);
        alloc.dec_ref(a);
        alloc.dec_ref(b);
        assert_eq!(alloc.pages_in_use(), 0);
        assert_eq!(alloc.free_count(), 4);
    }

    #[test]
    fn inc_ref_keeps_page_alive_until_every_holder_releases() {
        let alloc = small_allocator(2);
        let p = alloc.alloc();
        alloc.inc_ref(p);
        alloc.dec_ref(p);
        assert_eq!(alloc.pages_in_use(), 1, "page must survive one of two releases");
        alloc.dec_ref(p);
        assert_eq!(alloc.pages_in_use(), 0);
    }

    #[test]
    #[should_panic(expected = "out-of-pages")]
    fn exhausting_the_arena_is_fatal() {
        let alloc = small_allocator(1);
        let _p = alloc.alloc();
        alloc.alloc();
    }

    #[test]
    #[should_panic(expected = "refcount underflow")]
    fn double_free_panics() {
        let alloc = small_allocator(1);
        let p = alloc.alloc();
        alloc.dec_ref(p);
        alloc.dec_ref(p);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: pages_in_use + free_count == num_pages after every
            /// alloc/dec_ref in an arbitrary interleaving.
            #[test]
            fn conservation_holds_across_random_alloc_dec_ref_sequences(
                num_pages in 1usize..32,
                ops in prop::collection::vec(any::<bool>(), 1..200),
            ) {
                let alloc = small_allocator(num_pages);
                let mut held: Vec<PageHandle> = Vec::new();

                for (i, want_alloc) in ops.iter().enumerate() {
                    if (*want_alloc || held.is_empty()) && alloc.free_count() > 0 {
                        held.push(alloc.alloc());
                    } else if !held.is_empty() {
                        let idx = i % held.len();
                        alloc.dec_ref(held.swap_remove(idx));
                    }
                    prop_assert_eq!(alloc.pages_in_use() + alloc.free_count(), num_pages);
                }
            }
        }
    }
}
