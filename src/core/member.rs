use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use snafu::location;

use crate::error::{Error, Result};

use super::peer::{Peer, PeerHandle};

/// Where a peer currently lives in the table.
#[derive(Clone, Debug)]
pub enum Membership {
    Alive(PeerHandle),
    Suspected(PeerHandle),
}

#[derive(Debug, Default)]
struct Sets {
    alive: HashMap<String, PeerHandle>,
    suspected: HashMap<String, PeerHandle>,
}

/// Partitions peer records into two disjoint sets, `alive` and `suspected`.
///
/// A single table-wide lock guards set membership. It is only held while a mapping is
/// read or mutated and never while a record's own lock is taken, so callers fetch a
/// handle first and touch its fields afterwards.
#[derive(Debug, Default)]
pub struct MembersTable {
    sets: Mutex<Sets>,
}

impl MembersTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self, id: impl AsRef<str>) -> bool {
        self.sets.lock().alive.contains_key(id.as_ref())
    }

    pub fn is_suspected(&self, id: impl AsRef<str>) -> bool {
        self.sets.lock().suspected.contains_key(id.as_ref())
    }

    /// Upserts `peer` into the alive set. A suspected entry for the same id is dropped
    /// so an id never appears in both sets.
    pub fn add(&self, peer: Peer) {
        let id = peer.id().to_string();
        let handle = Arc::new(peer);

        let mut sets = self.sets.lock();
        sets.suspected.remove(&id);
        sets.alive.insert(id, handle);
    }

    /// Inserts `handle` as alive unless its id is already in either set, in which case
    /// the existing entry is returned and the table is left untouched.
    pub fn add_if_absent(&self, handle: PeerHandle) -> Option<Membership> {
        let mut sets = self.sets.lock();
        if let Some(existing) = sets.alive.get(handle.id()) {
            return Some(Membership::Alive(existing.clone()));
        }
        if let Some(existing) = sets.suspected.get(handle.id()) {
            return Some(Membership::Suspected(existing.clone()));
        }

        sets.alive.insert(handle.id().to_string(), handle);
        None
    }

    pub fn to_suspected(&self, id: impl AsRef<str>) {
        let mut sets = self.sets.lock();
        if let Some((id, handle)) = sets.alive.remove_entry(id.as_ref()) {
            sets.suspected.insert(id, handle);
        }
    }

    pub fn to_alive(&self, id: impl AsRef<str>) {
        let mut sets = self.sets.lock();
        if let Some((id, handle)) = sets.suspected.remove_entry(id.as_ref()) {
            sets.alive.insert(id, handle);
        }
    }

    /// Removes a suspected peer for good. Alive peers are left untouched.
    pub fn evict(&self, id: impl AsRef<str>) -> Option<PeerHandle> {
        self.sets.lock().suspected.remove(id.as_ref())
    }

    pub fn lookup(&self, id: impl AsRef<str>) -> Option<Membership> {
        let sets = self.sets.lock();
        let id = id.as_ref();

        if let Some(handle) = sets.alive.get(id) {
            return Some(Membership::Alive(handle.clone()));
        }
        sets.suspected
            .get(id)
            .map(|handle| Membership::Suspected(handle.clone()))
    }

    pub fn get(&self, id: impl AsRef<str>) -> Result<PeerHandle> {
        let id = id.as_ref();
        self.sets.lock()
            .alive
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                id: id.to_string(),
                location: location!(),
            })
    }

    pub fn get_suspect(&self, id: impl AsRef<str>) -> Result<PeerHandle> {
        let id = id.as_ref();
        self.sets.lock()
            .suspected
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                id: id.to_string(),
                location: location!(),
            })
    }

    pub fn snapshot_alive(&self) -> Vec<Peer> {
        let handles: Vec<PeerHandle> = self.sets.lock().alive.values().cloned().collect();
        handles.iter().map(|handle| (**handle).clone()).collect()
    }

    pub fn snapshot_suspected(&self) -> Vec<Peer> {
        let handles: Vec<PeerHandle> = self.sets.lock().suspected.values().cloned().collect();
        handles.iter().map(|handle| (**handle).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sets.lock().alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.lock().alive.is_empty()
    }

    pub fn suspected_len(&self) -> usize {
        self.sets.lock().suspected.len()
    }

    #[cfg(test)]
    fn is_disjoint(&self) -> bool {
        let sets = self.sets.lock();
        sets.alive.keys().all(|id| !sets.suspected.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use rand::{thread_rng, Rng};

    use crate::core::peer::Peer;
    use crate::error::Error;

    use super::{Membership, MembersTable};

    #[test]
    fn test_members_table_unknown_peer() {
        let table = MembersTable::new();

        assert!(!table.is_alive("12345"));
        assert!(!table.is_suspected("12345"));
        assert!(table.lookup("12345").is_none());
        assert!(matches!(table.get("12345"), Err(Error::NotFound { .. })));
        assert!(matches!(
            table.get_suspect("12345"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_members_table_add_is_upsert() {
        let table = MembersTable::new();
        table.add(Peer::with_heartbeat("123", "127.0.0.1:8080", 1));
        table.add(Peer::with_heartbeat("123", "127.0.0.1:9090", 4));

        let alive = table.snapshot_alive();
        assert_eq!(alive.len(), 1);
        assert_eq!(alive[0].address(), "127.0.0.1:9090");
        assert_eq!(alive[0].get_heartbeat(), 4);
    }

    #[test]
    fn test_members_table_transitions() {
        let table = MembersTable::new();
        table.add(Peer::new("123", "127.0.0.1:8080"));

        table.to_suspected("123");
        assert!(!table.is_alive("123"));
        assert!(table.is_suspected("123"));
        assert!(table.get_suspect("123").is_ok());

        table.to_alive("123");
        assert!(table.is_alive("123"));
        assert!(!table.is_suspected("123"));

        assert!(table.evict("123").is_none());
        assert!(table.is_alive("123"));

        table.to_suspected("123");
        assert!(table.evict("123").is_some());
        assert!(!table.is_alive("123"));
        assert!(!table.is_suspected("123"));
    }

    #[test]
    fn test_members_table_transitions_keep_record_identity() {
        let table = MembersTable::new();
        table.add(Peer::new("123", "127.0.0.1:8080"));
        let handle = table.get("123").unwrap();

        table.to_suspected("123");
        let suspect = table.get_suspect("123").unwrap();
        assert!(Arc::ptr_eq(&handle, &suspect));

        handle.set_heartbeat(9);
        assert_eq!(table.snapshot_suspected()[0].get_heartbeat(), 9);

        table.to_alive("123");
        assert!(matches!(
            table.lookup("123"),
            Some(Membership::Alive(h)) if Arc::ptr_eq(&h, &handle)
        ));
    }

    #[test]
    fn test_members_table_add_drops_suspected_entry() {
        let table = MembersTable::new();
        table.add(Peer::new("123", "127.0.0.1:8080"));
        table.to_suspected("123");

        table.add(Peer::with_heartbeat("123", "127.0.0.1:8080", 2));
        assert!(table.is_alive("123"));
        assert!(!table.is_suspected("123"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.suspected_len(), 0);
    }

    #[test]
    fn test_members_table_add_if_absent() {
        let table = MembersTable::new();
        let first = Arc::new(Peer::with_heartbeat("123", "127.0.0.1:8080", 5));

        assert!(table.add_if_absent(first.clone()).is_none());
        assert!(matches!(
            table.add_if_absent(Arc::new(Peer::with_heartbeat("123", "127.0.0.1:8080", 1))),
            Some(Membership::Alive(h)) if Arc::ptr_eq(&h, &first)
        ));
        assert_eq!(table.get("123").unwrap().get_heartbeat(), 5);

        table.to_suspected("123");
        assert!(matches!(
            table.add_if_absent(Arc::new(Peer::new("123", "127.0.0.1:8080"))),
            Some(Membership::Suspected(_))
        ));
        assert!(!table.is_alive("123"));
    }

    #[test]
    fn test_members_table_snapshots_are_copies() {
        let table = MembersTable::new();
        table.add(Peer::new("123", "127.0.0.1:8080"));
        table.add(Peer::new("456", "127.0.0.1:8081"));
        table.add(Peer::new("789", "127.0.0.1:8082"));
        table.to_suspected("789");

        let alive = table.snapshot_alive();
        assert_eq!(alive.len(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.snapshot_suspected(), vec![Peer::new("789", "")]);

        alive[0].set_heartbeat(100);
        let id = alive[0].id();
        assert_eq!(table.get(id).unwrap().get_heartbeat(), 1);
    }

    #[test]
    fn test_members_table_random_operations_stay_disjoint() {
        let ids = ["a", "b", "c", "d"];
        let table = Arc::new(MembersTable::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || {
                    let mut rng = thread_rng();
                    for _ in 0..2000 {
                        let id = ids[rng.gen_range(0..ids.len())];
                        match rng.gen_range(0..4) {
                            0 => table.add(Peer::new(id, "127.0.0.1:8080")),
                            1 => table.to_suspected(id),
                            2 => table.to_alive(id),
                            _ => {
                                table.evict(id);
                            }
                        }
                        assert!(table.is_disjoint());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(table.is_disjoint());
        assert!(table.len() + table.suspected_len() <= ids.len());
    }
}
