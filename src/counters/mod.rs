//! In-process sliding-window counters.
//!
//! All three counters share the same shape: a map keyed by IP or fingerprint
//! holding a bounded FIFO of monotonic timestamps (or snapshots), with stale
//! head entries evicted on every access and stale keys purged opportunistically
//! every N calls to bound memory under long-lived workloads. Locks are held
//! only for the map/deque mutation, never across I/O.

pub mod behavior_similarity;
pub mod fingerprint_velocity;
pub mod rate_limiter;
