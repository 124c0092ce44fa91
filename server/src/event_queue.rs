//! FIFO of deferred callbacks run on the single game-logic context.
//!
//! Socket tasks, screen timers and submission timers never touch game state
//! themselves. They push a closure here and the logic loop drains the queue
//! once per tick, handing each closure exclusive access to the context.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub type Event<C> = Box<dyn FnOnce(&mut C) + Send>;

pub struct EventQueue<C> {
    inner: Arc<Mutex<VecDeque<Event<C>>>>,
}

impl<C> Clone for EventQueue<C> {
    fn clone(&self) -> Self {
        EventQueue {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> Default for EventQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventQueue<C> {
    pub fn new() -> Self {
        EventQueue {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn enqueue<F>(&self, event: F)
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.inner.lock().push_back(Box::new(event));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs every event queued before this call, in arrival order.
    ///
    /// The batch is taken out under the lock and executed after releasing it,
    /// so an event may enqueue more work; that work runs on the next drain.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let batch = std::mem::take(&mut *self.inner.lock());
        let n = batch.len();
        for event in batch {
            event(ctx);
        }
        n
    }

    /// Drains repeatedly until nothing is left. Returns the number of events run.
    #[cfg(test)]
    pub fn drain_all(&self, ctx: &mut C) -> usize {
        let mut total = 0;
        loop {
            let n = self.drain(ctx);
            if n == 0 {
                return total;
            }
            total += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn runs_in_fifo_order() {
        let queue: EventQueue<Vec<u32>> = EventQueue::new();
        for i in 0..5 {
            queue.enqueue(move |log: &mut Vec<u32>| log.push(i));
        }
        let mut log = vec![];
        assert_eq!(queue.drain(&mut log), 5);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn events_enqueued_while_draining_wait_for_next_tick() {
        let queue: EventQueue<Vec<&'static str>> = EventQueue::new();
        let q = queue.clone();
        queue.enqueue(move |log: &mut Vec<&'static str>| {
            log.push("first");
            q.enqueue(|log: &mut Vec<&'static str>| log.push("follow-up"));
        });
        queue.enqueue(|log: &mut Vec<&'static str>| log.push("second"));

        let mut log = vec![];
        assert_eq!(queue.drain(&mut log), 2);
        assert_eq!(log, vec!["first", "second"]);
        assert_eq!(queue.len(), 1);

        queue.drain(&mut log);
        assert_eq!(log, vec!["first", "second", "follow-up"]);
    }

    #[test]
    fn drain_all_follows_chains() {
        let queue: EventQueue<u32> = EventQueue::new();
        let q = queue.clone();
        queue.enqueue(move |n: &mut u32| {
            *n += 1;
            let q2 = q.clone();
            q.enqueue(move |n: &mut u32| {
                *n += 1;
                q2.enqueue(|n: &mut u32| *n += 1);
            });
        });
        let mut n = 0;
        assert_eq!(queue.drain_all(&mut n), 3);
        assert_eq!(n, 3);
    }

    #[test]
    fn accepts_events_from_many_threads() {
        let queue: EventQueue<u32> = EventQueue::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let q = queue.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        q.enqueue(|n: &mut u32| *n += 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut n = 0;
        queue.drain(&mut n);
        assert_eq!(n, 800);
    }
}
