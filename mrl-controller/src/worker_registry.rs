use std::collections::BTreeMap;

use common::Role;
use tracing::debug;

use crate::worker_info::{WorkerRecord, WorkerState};

/// Outcome of a HELLO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First HELLO from a dispatched worker.
    Admitted,

    /// The worker had already begun; it gets BEGIN again but is not recounted.
    Duplicate,

    /// No worker with this role and id was dispatched.
    Unknown,
}

/// Registry of every worker dispatched in this job, keyed by role and id.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<(Role, u32), WorkerRecord>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker a stub accepted.
    pub fn record_dispatch(&mut self, record: WorkerRecord) {
        debug!(role = %record.role, id = record.id, stub = %record.stub, pid = ?record.pid, "worker dispatched");
        self.workers.insert((record.role, record.id), record);
    }

    /// Account for a HELLO from `role`/`id`.
    pub fn admit(&mut self, role: Role, id: u32) -> Admission {
        match self.workers.get_mut(&(role, id)) {
            None => Admission::Unknown,
            Some(worker) if worker.state == WorkerState::Dispatched => {
                worker.set_state(WorkerState::Begun);
                Admission::Admitted
            }
            Some(_) => Admission::Duplicate,
        }
    }

    /// Workers of `role` that have not said HELLO yet.
    pub fn pending(&self, role: Role) -> usize {
        self.workers(role)
            .filter(|worker| worker.state == WorkerState::Dispatched)
            .count()
    }

    /// Mark every worker of `role` completed once its barrier has passed.
    pub fn mark_completed(&mut self, role: Role) {
        for worker in self.workers.values_mut().filter(|w| w.role == role) {
            worker.set_state(WorkerState::Completed);
        }
    }

    pub fn workers(&self, role: Role) -> impl Iterator<Item = &WorkerRecord> {
        self.workers.values().filter(move |worker| worker.role == role)
    }

    pub fn get_worker(&self, role: Role, id: u32) -> Option<&WorkerRecord> {
        self.workers.get(&(role, id))
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use common::job::Endpoint;

    use super::*;

    fn registry_with(role: Role, ids: &[u32]) -> WorkerRegistry {
        let mut registry = WorkerRegistry::new();
        for &id in ids {
            registry.record_dispatch(WorkerRecord::dispatched(
                role,
                id,
                Endpoint::new("stub", 5001),
                Some(100 + id),
            ));
        }
        registry
    }

    #[test]
    fn hello_moves_worker_to_begun_once() {
        let mut registry = registry_with(Role::Map, &[0, 1]);
        assert_eq!(registry.pending(Role::Map), 2);

        assert_eq!(registry.admit(Role::Map, 1), Admission::Admitted);
        assert_eq!(registry.admit(Role::Map, 1), Admission::Duplicate);
        assert_eq!(registry.pending(Role::Map), 1);
        assert_eq!(
            registry.get_worker(Role::Map, 1).map(|w| w.state),
            Some(WorkerState::Begun)
        );
    }

    #[test]
    fn unknown_ids_and_roles_are_not_admitted() {
        let mut registry = registry_with(Role::Map, &[0]);

        assert_eq!(registry.admit(Role::Map, 7), Admission::Unknown);
        assert_eq!(registry.admit(Role::Reduce, 0), Admission::Unknown);
        assert_eq!(registry.pending(Role::Map), 1);
    }

    #[test]
    fn completion_is_per_role() {
        let mut registry = registry_with(Role::Map, &[0, 1]);
        registry.record_dispatch(WorkerRecord::dispatched(
            Role::Reduce,
            0,
            Endpoint::new("stub", 5001),
            None,
        ));
        registry.admit(Role::Map, 0);
        registry.admit(Role::Map, 1);

        registry.mark_completed(Role::Map);

        assert!(registry.workers(Role::Map).all(|w| w.state == WorkerState::Completed));
        assert_eq!(registry.pending(Role::Reduce), 1);
        assert_eq!(registry.len(), 3);
    }
}
