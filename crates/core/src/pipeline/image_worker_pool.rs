use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::shared::constants::MAX_IMAGE_WORKERS;

/// Progress of one pool item, reported on the calling thread.
pub enum PoolEvent<R> {
    Started(usize),
    Finished(usize, R),
}

/// Worker count actually used for a request of `requested`: capped by
/// [`MAX_IMAGE_WORKERS`] and the machine's available parallelism, at least 1.
pub fn effective_workers(requested: usize) -> usize {
    let available = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    requested.min(MAX_IMAGE_WORKERS).min(available).max(1)
}

/// Runs `task` over `items` on `workers` threads fed from a shared queue.
///
/// Items are independent; their events arrive in completion order, keyed by
/// the index paired with each item. Workers check `cancelled` before taking
/// the next item, so un-taken items simply never start. Returns the number of
/// workers that panicked; an item whose worker panicked gets `Started` but no
/// `Finished`.
pub fn run_pool<T, R, F, E>(
    items: Vec<(usize, T)>,
    workers: usize,
    cancelled: &AtomicBool,
    task: F,
    mut on_event: E,
) -> usize
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
    E: FnMut(PoolEvent<R>),
{
    let (item_tx, item_rx) = crossbeam_channel::unbounded::<(usize, T)>();
    for item in items {
        if item_tx.send(item).is_err() {
            break;
        }
    }
    drop(item_tx);

    let (event_tx, event_rx) = crossbeam_channel::unbounded::<PoolEvent<R>>();
    let task = &task;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.max(1))
            .map(|_| {
                let item_rx = item_rx.clone();
                let event_tx = event_tx.clone();
                scope.spawn(move || {
                    while !cancelled.load(Ordering::Relaxed) {
                        let Ok((index, item)) = item_rx.recv() else {
                            break;
                        };
                        if event_tx.send(PoolEvent::Started(index)).is_err() {
                            break;
                        }
                        let result = task(item);
                        if event_tx.send(PoolEvent::Finished(index, result)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(event_tx);

        for event in event_rx {
            on_event(event);
        }

        handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(Result::is_err)
            .count()
    })
}
