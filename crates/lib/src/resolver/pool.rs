//! The per-operation identity pool that breaks reference cycles.
//!
//! A pool maps identity strings to live instances for the duration of one
//! top-level load/save operation. The protocol that guarantees termination
//! on cyclic graphs: before populating any identity-bearing record, its
//! bare instance is registered here; a recursive resolution of the same
//! identity (the cycle closing) then finds the under-construction instance
//! instead of recursing forever.
//!
//! Registration is an atomic insert-if-absent; at most one live instance
//! per identity per pool, and entries are never removed mid-operation. The
//! same-thread owner may re-enter its own in-flight entry (that is the
//! cycle case); other threads block until the entry is marked ready,
//! bounded by the loading timeout.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::resolver::errors::ResolverError;
use crate::schema::{ClassSchema, ObjectHandle};

#[derive(Debug)]
struct Slot {
    handle: ObjectHandle,
    ready: bool,
    owner: ThreadId,
}

#[derive(Debug, Default)]
struct PoolInner {
    slots: Mutex<HashMap<String, Slot>>,
    ready_signal: Condvar,
}

enum Peek {
    Absent,
    InFlight,
    Usable(ObjectHandle),
}

/// A usable slot is one that is ready, or one the current thread itself
/// registered (the re-entrant cycle case).
fn peek(slots: &HashMap<String, Slot>, identity: &str) -> Peek {
    match slots.get(identity) {
        None => Peek::Absent,
        Some(slot) if slot.ready || slot.owner == thread::current().id() => {
            Peek::Usable(slot.handle.clone())
        }
        Some(_) => Peek::InFlight,
    }
}

/// Outcome of [`IdentityPool::resolve_or_register`].
pub enum PoolEntry {
    /// The identity was already pooled; the handle may still be under
    /// construction if the current thread owns it.
    Existing(ObjectHandle),
    /// A bare instance was allocated and registered; the caller must
    /// populate it and then call [`IdentityPool::mark_ready`].
    Registered(ObjectHandle),
}

/// Cycle-breaking registry of in-flight and resolved instances, scoped to
/// one load/save operation. Cheap to clone; clones share the same pool.
#[derive(Debug, Clone, Default)]
pub struct IdentityPool {
    inner: Arc<PoolInner>,
}

impl IdentityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pooled instance for `identity`, or atomically registers
    /// a bare instance of `schema`'s type when absent.
    ///
    /// First registration wins across racing threads. When another
    /// thread's registration is still in flight, this blocks until it is
    /// ready or `timeout` elapses (`Duration::ZERO` waits unbounded).
    pub fn resolve_or_register(
        &self,
        identity: &str,
        schema: &Arc<ClassSchema>,
        timeout: Duration,
    ) -> Result<PoolEntry, ResolverError> {
        let mut slots = self.inner.slots.lock().unwrap();
        let started = Instant::now();
        loop {
            let available = peek(&slots, identity);
            match available {
                Peek::Usable(handle) => return Ok(PoolEntry::Existing(handle)),
                Peek::InFlight => {
                    slots = self.wait_step(slots, identity, timeout, started)?;
                }
                Peek::Absent => {
                    let handle = ObjectHandle::from_schema(schema);
                    slots.insert(
                        identity.to_string(),
                        Slot {
                            handle: handle.clone(),
                            ready: false,
                            owner: thread::current().id(),
                        },
                    );
                    return Ok(PoolEntry::Registered(handle));
                }
            }
        }
    }

    /// Looks up `identity` without registering, waiting out another
    /// thread's in-flight resolution like
    /// [`resolve_or_register`](Self::resolve_or_register) does.
    pub fn lookup(
        &self,
        identity: &str,
        timeout: Duration,
    ) -> Result<Option<ObjectHandle>, ResolverError> {
        let mut slots = self.inner.slots.lock().unwrap();
        let started = Instant::now();
        loop {
            let available = peek(&slots, identity);
            match available {
                Peek::Absent => return Ok(None),
                Peek::Usable(handle) => return Ok(Some(handle)),
                Peek::InFlight => {
                    slots = self.wait_step(slots, identity, timeout, started)?;
                }
            }
        }
    }

    /// Marks an identity's instance as fully populated and wakes waiters.
    pub fn mark_ready(&self, identity: &str) {
        let mut slots = self.inner.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(identity) {
            slot.ready = true;
        }
        drop(slots);
        self.inner.ready_signal.notify_all();
    }

    /// Number of pooled identities. Diagnostic only.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().unwrap().len()
    }

    /// Returns true if nothing has been pooled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wait_step<'a>(
        &'a self,
        slots: std::sync::MutexGuard<'a, HashMap<String, Slot>>,
        identity: &str,
        timeout: Duration,
        started: Instant,
    ) -> Result<std::sync::MutexGuard<'a, HashMap<String, Slot>>, ResolverError> {
        if timeout.is_zero() {
            // Unbounded wait.
            return Ok(self.inner.ready_signal.wait(slots).unwrap());
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(ResolverError::LoadingTimeout {
                identity: identity.to_string(),
                waited_ms: elapsed.as_millis(),
            });
        }
        let (slots, _timed_out) = self
            .inner
            .ready_signal
            .wait_timeout(slots, timeout - elapsed)
            .unwrap();
        Ok(slots)
    }
}
