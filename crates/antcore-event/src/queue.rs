use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Fixed-capacity FIFO that keeps the newest entries.
///
/// When a push would exceed the capacity, the oldest entries are dropped
/// until exactly `capacity` remain. Every read-modify sequence happens under
/// one lock, so readers never see a partially updated queue.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    pushed: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.saturating_add(1))),
            pushed: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append `item`, then trim the front back down to capacity.
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        let mut overflow = 0u64;
        while items.len() > self.capacity {
            items.pop_front();
            overflow += 1;
        }
        drop(items);

        if overflow > 0 {
            self.dropped.fetch_add(overflow, Ordering::Relaxed);
        }
        self.pushed.notify_all();
    }

    /// Remove and return the oldest entry matching `predicate`.
    pub fn take_first<F>(&self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.lock();
        take_from(&mut *items, predicate)
    }

    /// Like [`take_first`](Self::take_first), but if nothing matches, release
    /// the lock for up to `wait` (or until the next push) and scan once more.
    pub fn take_first_or_wait<F>(&self, mut predicate: F, wait: Duration) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.lock();
        if let Some(item) = take_from(&mut *items, &mut predicate) {
            return Some(item);
        }
        if wait.is_zero() {
            return None;
        }

        let (mut items, _) = self
            .pushed
            .wait_timeout(items, wait)
            .unwrap_or_else(PoisonError::into_inner);
        take_from(&mut *items, &mut predicate)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries discarded on overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn take_from<T, F>(items: &mut VecDeque<T>, mut predicate: F) -> Option<T>
where
    F: FnMut(&T) -> bool,
{
    let index = items.iter().position(|item| predicate(item))?;
    items.remove(index)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn overflow_keeps_newest_in_order() {
        let queue = BoundedQueue::new(25);
        for i in 1..=30 {
            queue.push(i);
        }

        assert_eq!(queue.len(), 25);
        assert_eq!(queue.snapshot(), (6..=30).collect::<Vec<_>>());
        assert_eq!(queue.dropped(), 5);
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let queue = BoundedQueue::new(4);
        queue.push("a");
        queue.push("b");

        assert_eq!(queue.snapshot(), vec!["a", "b"]);
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn take_first_removes_oldest_match_only() {
        let queue = BoundedQueue::new(10);
        for item in [(1, 'a'), (2, 'b'), (1, 'c')] {
            queue.push(item);
        }

        assert_eq!(queue.take_first(|(k, _)| *k == 1), Some((1, 'a')));
        assert_eq!(queue.take_first(|(k, _)| *k == 1), Some((1, 'c')));
        assert_eq!(queue.take_first(|(k, _)| *k == 1), None);
        assert_eq!(queue.snapshot(), vec![(2, 'b')]);
    }

    #[test]
    fn zero_wait_does_not_block() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(1);
        let started = Instant::now();
        assert_eq!(queue.take_first_or_wait(|_| true, Duration::ZERO), None);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn wait_wakes_on_push() {
        let queue = Arc::new(BoundedQueue::new(4));

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(7u32);
            })
        };

        let mut found = None;
        let deadline = Instant::now() + Duration::from_secs(5);
        while found.is_none() && Instant::now() < deadline {
            found = queue.take_first_or_wait(|v| *v == 7, Duration::from_millis(50));
        }

        producer.join().unwrap();
        assert_eq!(found, Some(7));
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_empties_queue() {
        let queue = BoundedQueue::new(3);
        queue.push(1);
        queue.push(2);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 3);
    }
}
