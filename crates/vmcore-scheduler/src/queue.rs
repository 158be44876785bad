// Path: crates/vmcore-scheduler/src/queue.rs
//! The scheduler's blocking ready-queue (spec.md §4.6, §5): a classical
//! multi-producer multi-consumer queue with an explicit *producer count* so
//! consumers can tell a transient empty queue from permanent exhaustion.
//! Grounded on `original_source/src/util/BlockingQueue.hpp`'s
//! `content`/`producerCount` pair, re-expressed with `parking_lot`'s
//! `Mutex`/`Condvar` instead of `std::condition_variable`.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueState {
    queue: VecDeque<u32>,
    /// Requests currently dequeued but not yet submitted, plus any initial
    /// ready set enqueued by `build_exec_dag`. Reaching zero with an empty
    /// queue means no further item will ever arrive.
    producers: usize,
}

pub(crate) struct ReadyQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                producers: 0,
            }),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn enqueue(&self, id: u32) {
        let mut state = self.state.lock();
        state.queue.push_back(id);
        drop(state);
        self.cv.notify_one();
    }

    /// Blocks until an item is available or the queue is permanently
    /// exhausted (`producers == 0` and empty), in which case it returns
    /// `None`. On a successful dequeue, the popped item counts as one more
    /// producer until [`ReadyQueue::remove_producer`] is called for it —
    /// this is how `next_request`/`submit_result` keep the queue alive
    /// across an in-flight request (spec.md §4.6).
    pub(crate) fn blocking_dequeue(&self) -> Option<u32> {
        let mut state = self.state.lock();
        loop {
            if let Some(id) = state.queue.pop_front() {
                state.producers += 1;
                return Some(id);
            }
            if state.producers == 0 {
                return None;
            }
            self.cv.wait(&mut state);
        }
    }

    pub(crate) fn remove_producer(&self) {
        let mut state = self.state.lock();
        state.producers -= 1;
        if state.producers == 0 {
            drop(state);
            self.cv.notify_all();
        }
    }
}
