//! Frontier (C9). A FIFO work queue paired with an `in_queue` membership
//! set, both guarded by mutexes held only across pointer-level
//! operations. A page id is "tracked" (`contains` returns true) from the
//! moment it's enqueued until `complete` is called for it — spanning both
//! time spent waiting in the queue and time spent being processed by a
//! worker after `dequeue`. This keeps a second `enqueue` for the same
//! page id from being accepted while a worker is still mid-item, which
//! would otherwise let two workers race to fetch and write the same page.
//! Dedup of *discovered* URLs lives in the Store (`normalized_url_hash`);
//! this structure only prevents a page id from being queued or processed
//! twice at once.
//!
//! Simplified from the teacher's `crates/frontier/src/lib.rs`
//! (per-network `PriorityQueue` + `GrowableBloom` dedup): this crawler
//! runs a single pool of workers draining one host (or the whole Store in
//! continue mode), ordered purely by the Store's `next_uncrawled` (depth,
//! then discovery time), so neither per-network sharding nor a
//! probabilistic membership filter earns its keep here — dedup is exact
//! and lives where the uniqueness invariant does.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use webcrawler_core::FrontierItem;

pub struct Frontier {
    queue: Mutex<VecDeque<FrontierItem>>,
    in_queue: Mutex<HashSet<i64>>,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            in_queue: Mutex::new(HashSet::new()),
        }
    }

    /// Enqueue `item` if its page id is not already tracked (queued or
    /// mid-processing). Returns `true` if it was newly added.
    pub fn enqueue(&self, item: FrontierItem) -> bool {
        let mut in_queue = self.in_queue.lock().expect("frontier mutex poisoned");
        if !in_queue.insert(item.page_id) {
            return false;
        }
        drop(in_queue);
        self.queue.lock().expect("frontier mutex poisoned").push_back(item);
        true
    }

    /// `true` iff `page_id` is currently tracked — either waiting in the
    /// queue or checked out by a worker that hasn't called `complete` yet.
    pub fn contains(&self, page_id: i64) -> bool {
        self.in_queue.lock().expect("frontier mutex poisoned").contains(&page_id)
    }

    /// Take the next item, if any. The item's page id stays tracked (so a
    /// second `enqueue` for it is rejected) until `complete` is called —
    /// dequeue alone does not release it.
    pub fn dequeue(&self) -> Option<FrontierItem> {
        self.queue.lock().expect("frontier mutex poisoned").pop_front()
    }

    /// Release `page_id`'s tracking once a worker has finished processing
    /// the item it dequeued. Only after this does `page_id` become
    /// eligible to be enqueued again.
    pub fn complete(&self, page_id: i64) {
        self.in_queue.lock().expect("frontier mutex poisoned").remove(&page_id);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("frontier mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64) -> FrontierItem {
        FrontierItem {
            page_id: id,
            url: format!("http://example.com/{id}"),
            depth: 0,
        }
    }

    #[test]
    fn enqueue_rejects_already_queued_page_id() {
        let frontier = Frontier::new();
        assert!(frontier.enqueue(item(1)));
        assert!(!frontier.enqueue(item(1)));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn dequeue_is_fifo_and_keeps_page_id_tracked() {
        let frontier = Frontier::new();
        frontier.enqueue(item(1));
        frontier.enqueue(item(2));
        assert_eq!(frontier.dequeue().unwrap().page_id, 1);
        assert!(frontier.contains(1));
        assert_eq!(frontier.dequeue().unwrap().page_id, 2);
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn a_dequeued_but_not_completed_id_rejects_requeue() {
        let frontier = Frontier::new();
        frontier.enqueue(item(1));
        frontier.dequeue();
        assert!(frontier.contains(1));
        assert!(!frontier.enqueue(item(1)));
    }

    #[test]
    fn a_completed_id_is_accepted_again() {
        let frontier = Frontier::new();
        frontier.enqueue(item(1));
        frontier.dequeue();
        frontier.complete(1);
        assert!(!frontier.contains(1));
        assert!(frontier.enqueue(item(1)));
    }
}
