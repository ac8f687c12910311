//! Blocking wait for a set of jobs

use crate::error::Result;
use crate::jobs::{JobHandle, JobQueue, QueueSnapshot};
use std::thread;
use std::time::{Duration, Instant};

/// What [`await_all`] observed while waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierReport {
    /// Number of times the queue was listed
    pub polls: usize,
    /// Wall time spent inside the barrier
    pub elapsed: Duration,
}

/// Block until none of `handles` is active in `queue`
///
/// Sleeps `interval`, lists the queue, and repeats until the listing no
/// longer contains any of `handles`. The first listing happens only after
/// the first sleep, so the call always takes at least one interval even if
/// every job already finished. Each poll re-derives the active set from
/// scratch; unrelated jobs in the queue are ignored, and an
/// [`QueueSnapshot::Unavailable`] listing just means another round.
///
/// Job failure is not reported here. Inspect exit statuses afterwards
/// where the queue exposes them.
///
/// # Errors
///
/// Propagates errors from [`JobQueue::active_jobs`], e.g. when the listing
/// program cannot be started at all.
pub fn await_all<Q: JobQueue + ?Sized>(
    queue: &mut Q,
    handles: &[JobHandle],
    interval: Duration,
) -> Result<BarrierReport> {
    let start = Instant::now();
    let mut polls = 0;

    log::info!(
        "Waiting for {} job(s), polling every {:?}",
        handles.len(),
        interval
    );

    loop {
        thread::sleep(interval);
        polls += 1;

        let active = match queue.active_jobs()? {
            QueueSnapshot::Active(active) => active,
            QueueSnapshot::Unavailable => {
                log::warn!("Job listing unavailable (poll {}), retrying", polls);
                continue;
            }
        };

        let running = handles.iter().filter(|h| active.contains(*h)).count();
        if running == 0 {
            break;
        }
        log::debug!("Poll {}: {} of {} job(s) still active", polls, running, handles.len());
    }

    let report = BarrierReport {
        polls,
        elapsed: start.elapsed(),
    };
    log::info!("All {} job(s) finished after {:?}", handles.len(), report.elapsed);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VdjError;
    use std::collections::{HashSet, VecDeque};

    /// Replays a scripted sequence of listings
    struct ScriptedQueue {
        listings: VecDeque<Result<QueueSnapshot>>,
        polled: usize,
    }

    impl ScriptedQueue {
        fn new(listings: Vec<Result<QueueSnapshot>>) -> Self {
            ScriptedQueue {
                listings: listings.into(),
                polled: 0,
            }
        }
    }

    impl JobQueue for ScriptedQueue {
        fn submit(&mut self, command: &str) -> Result<JobHandle> {
            Ok(JobHandle::new(command))
        }

        fn active_jobs(&mut self) -> Result<QueueSnapshot> {
            self.polled += 1;
            self.listings
                .pop_front()
                .unwrap_or_else(|| Ok(QueueSnapshot::Active(HashSet::new())))
        }
    }

    fn active(ids: &[&str]) -> Result<QueueSnapshot> {
        Ok(QueueSnapshot::Active(ids.iter().map(|id| JobHandle::new(*id)).collect()))
    }

    fn handles(ids: &[&str]) -> Vec<JobHandle> {
        ids.iter().map(|id| JobHandle::new(*id)).collect()
    }

    #[test]
    fn test_waits_one_interval_even_when_done() {
        let mut queue = ScriptedQueue::new(vec![active(&[])]);
        let interval = Duration::from_millis(20);

        let report = await_all(&mut queue, &handles(&["1"]), interval).unwrap();

        assert_eq!(report.polls, 1);
        assert_eq!(queue.polled, 1);
        assert!(report.elapsed >= interval);
    }

    #[test]
    fn test_zero_interval_still_polls_once() {
        let mut queue = ScriptedQueue::new(vec![active(&[])]);
        let report = await_all(&mut queue, &[], Duration::ZERO).unwrap();
        assert_eq!(report.polls, 1);
    }

    #[test]
    fn test_polls_until_own_jobs_leave() {
        let mut queue = ScriptedQueue::new(vec![
            active(&["1", "2", "99"]),
            active(&["2", "99"]),
            active(&["99", "100"]),
        ]);

        let report = await_all(&mut queue, &handles(&["1", "2"]), Duration::ZERO).unwrap();
        assert_eq!(report.polls, 3);
    }

    #[test]
    fn test_unavailable_listing_is_retried() {
        let mut queue = ScriptedQueue::new(vec![
            Ok(QueueSnapshot::Unavailable),
            Ok(QueueSnapshot::Unavailable),
            active(&[]),
        ]);

        let report = await_all(&mut queue, &handles(&["1"]), Duration::ZERO).unwrap();
        assert_eq!(report.polls, 3);
    }

    #[test]
    fn test_listing_error_propagates() {
        let mut queue = ScriptedQueue::new(vec![
            active(&["1"]),
            Err(VdjError::Queue("listing program vanished".to_string())),
        ]);

        let result = await_all(&mut queue, &handles(&["1"]), Duration::ZERO);
        assert!(matches!(result, Err(VdjError::Queue(_))));
    }

    #[test]
    fn test_works_through_trait_object() {
        let mut queue: Box<dyn JobQueue> = Box::new(ScriptedQueue::new(vec![active(&[])]));
        let report = await_all(queue.as_mut(), &handles(&["1"]), Duration::ZERO).unwrap();
        assert_eq!(report.polls, 1);
    }
}
