use std::sync::Arc;

use parking_lot::Mutex;

/// Failure streak that permanently removes a proxy from rotation.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// A forwarding network endpoint used to route one benchmark request at a
/// time. Identity is the stable `id`; `addr` is `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub id: Arc<str>,
    pub addr: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProxyState {
    Available,
    InUse,
    Failed,
}

/// Returned by [`ProxyPool::checkout`] when no proxy is `Available`.
///
/// The display text doubles as the recorded error reason, so exhaustion
/// shows up verbatim in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No proxy available")]
pub struct PoolExhausted;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub failed: usize,
}

#[derive(Debug)]
struct Slot {
    proxy: Proxy,
    state: ProxyState,
    consecutive_failures: u32,
}

#[derive(Debug, Default)]
struct PoolInner {
    slots: Vec<Slot>,
    cursor: usize,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<PoolInner>,
    max_consecutive_failures: u32,
}

/// Owns the proxy set and its availability state. Cheap to clone; clones
/// share the same pool.
///
/// Membership is fixed at construction; the pool never grows with demand,
/// so load beyond capacity surfaces immediately as checkout failures
/// instead of queueing. All state transitions happen inside one mutex, so
/// no two holders can ever observe the same proxy as theirs.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    shared: Arc<Shared>,
}

impl ProxyPool {
    pub fn new(proxies: impl IntoIterator<Item = Proxy>, max_consecutive_failures: u32) -> Self {
        let mut slots: Vec<Slot> = proxies
            .into_iter()
            .map(|proxy| Slot {
                proxy,
                state: ProxyState::Available,
                consecutive_failures: 0,
            })
            .collect();
        // Stable id order keeps rotation reproducible across runs with the
        // same input, whatever order the plan listed the proxies in.
        slots.sort_by(|a, b| a.proxy.id.cmp(&b.proxy.id));

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(PoolInner { slots, cursor: 0 }),
                max_consecutive_failures,
            }),
        }
    }

    /// Atomically claims one `Available` proxy, round-robin. Never blocks
    /// and never queues: an empty or fully busy pool reports
    /// [`PoolExhausted`] immediately.
    pub fn checkout(&self) -> Result<ProxyLease, PoolExhausted> {
        let mut inner = self.shared.inner.lock();
        let len = inner.slots.len();
        if len == 0 {
            return Err(PoolExhausted);
        }

        for step in 0..len {
            let idx = (inner.cursor + step) % len;
            if inner.slots[idx].state == ProxyState::Available {
                inner.slots[idx].state = ProxyState::InUse;
                inner.cursor = (idx + 1) % len;
                return Ok(ProxyLease {
                    pool: self.clone(),
                    proxy: inner.slots[idx].proxy.clone(),
                    verdict: LeaseVerdict::Unset,
                });
            }
        }

        Err(PoolExhausted)
    }

    /// Permanently removes a proxy from the checkout cycle.
    pub fn mark_failed(&self, id: &str) {
        let mut inner = self.shared.inner.lock();
        if let Some(slot) = inner.slots.iter_mut().find(|s| &*s.proxy.id == id) {
            slot.state = ProxyState::Failed;
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.shared.inner.lock();
        let mut stats = PoolStats {
            total: inner.slots.len(),
            ..PoolStats::default()
        };
        for slot in &inner.slots {
            match slot.state {
                ProxyState::Available => stats.available += 1,
                ProxyState::InUse => stats.in_use += 1,
                ProxyState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.inner.lock().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: &str, verdict: LeaseVerdict) {
        let mut inner = self.shared.inner.lock();
        let Some(slot) = inner.slots.iter_mut().find(|s| &*s.proxy.id == id) else {
            return;
        };
        // A lease can race with an explicit mark_failed; Failed wins.
        if slot.state != ProxyState::InUse {
            return;
        }

        match verdict {
            LeaseVerdict::Success => slot.consecutive_failures = 0,
            LeaseVerdict::Failure => {
                slot.consecutive_failures += 1;
                if slot.consecutive_failures >= self.shared.max_consecutive_failures {
                    slot.state = ProxyState::Failed;
                    return;
                }
            }
            LeaseVerdict::Unset => {}
        }

        slot.state = ProxyState::Available;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseVerdict {
    Unset,
    Success,
    Failure,
}

/// Exclusive use of one proxy for the duration of one request.
///
/// Dropping the lease returns the proxy on every exit path, including
/// cancellation of the future holding it, so a proxy can never leak into a
/// permanent `InUse` state.
#[derive(Debug)]
pub struct ProxyLease {
    pool: ProxyPool,
    proxy: Proxy,
    verdict: LeaseVerdict,
}

impl ProxyLease {
    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    /// Marks the carried attempt as successful; resets the proxy's failure
    /// streak when the lease is released.
    pub fn report_success(&mut self) {
        self.verdict = LeaseVerdict::Success;
    }

    /// Marks the carried attempt as failed; extends the failure streak and,
    /// at the configured threshold, retires the proxy.
    pub fn report_failure(&mut self) {
        self.verdict = LeaseVerdict::Failure;
    }
}

impl Drop for ProxyLease {
    fn drop(&mut self) {
        self.pool.release(&self.proxy.id, self.verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(id: &str) -> Proxy {
        Proxy {
            id: Arc::from(id),
            addr: Arc::from("127.0.0.1:1080"),
        }
    }

    fn pool(ids: &[&str]) -> ProxyPool {
        ProxyPool::new(
            ids.iter().map(|id| proxy(id)),
            DEFAULT_MAX_CONSECUTIVE_FAILURES,
        )
    }

    #[test]
    fn checkout_beyond_capacity_reports_exhausted() {
        let pool = pool(&["a", "b", "c"]);

        let leases: Vec<_> = (0..3).map(|_| pool.checkout()).collect();
        assert!(leases.iter().all(Result::is_ok));

        for _ in 0..4 {
            assert_eq!(pool.checkout().err(), Some(PoolExhausted));
        }

        drop(leases);
        assert!(pool.checkout().is_ok());
    }

    #[test]
    fn empty_pool_is_always_exhausted() {
        let pool = pool(&[]);
        assert_eq!(pool.checkout().err(), Some(PoolExhausted));
        assert_eq!(PoolExhausted.to_string(), "No proxy available");
    }

    #[test]
    fn rotation_is_round_robin_in_id_order() {
        // Insertion order must not matter; rotation follows sorted ids.
        let pool = pool(&["c", "a", "b"]);

        let mut seen = Vec::new();
        for _ in 0..6 {
            let lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            seen.push(lease.proxy().id.to_string());
        }

        assert_eq!(seen, ["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn lease_drop_returns_the_proxy() {
        let pool = pool(&["a"]);

        {
            let _lease = pool.checkout();
            assert_eq!(pool.stats().in_use, 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.available, 1);
    }

    #[test]
    fn failure_streak_retires_a_proxy() {
        let pool = ProxyPool::new([proxy("a"), proxy("b")], 2);

        for _ in 0..4 {
            let mut lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            // Rotation alternates a/b; fail only `a`.
            if &*lease.proxy().id == "a" {
                lease.report_failure();
            } else {
                lease.report_success();
            }
        }

        let stats = pool.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.available, 1);

        // Only `b` remains in rotation.
        for _ in 0..3 {
            let lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            assert_eq!(&*lease.proxy().id, "b");
        }
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let pool = ProxyPool::new([proxy("a")], 2);

        for _ in 0..3 {
            let mut lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            lease.report_failure();
            drop(lease);

            let mut lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            lease.report_success();
        }

        assert_eq!(pool.stats().failed, 0);
    }

    #[test]
    fn unreported_lease_release_is_accounting_neutral() {
        let pool = ProxyPool::new([proxy("a")], 2);

        {
            let mut lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            lease.report_failure();
        }
        // A cancelled attempt neither extends nor resets the streak.
        drop(pool.checkout());
        {
            let mut lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            lease.report_failure();
        }

        assert_eq!(pool.stats().failed, 1);
    }

    #[test]
    fn mark_failed_excludes_from_rotation() {
        let pool = pool(&["a", "b"]);
        pool.mark_failed("a");

        for _ in 0..3 {
            let lease = match pool.checkout() {
                Ok(l) => l,
                Err(err) => panic!("unexpected exhaustion: {err}"),
            };
            assert_eq!(&*lease.proxy().id, "b");
        }
        assert_eq!(pool.stats().failed, 1);
    }

    #[test]
    fn mark_failed_wins_over_inflight_release() {
        let pool = pool(&["a"]);
        let mut lease = match pool.checkout() {
            Ok(l) => l,
            Err(err) => panic!("unexpected exhaustion: {err}"),
        };
        pool.mark_failed("a");
        lease.report_success();
        drop(lease);

        assert_eq!(pool.stats().failed, 1);
        assert_eq!(pool.checkout().err(), Some(PoolExhausted));
    }
}
