use common::job::Endpoint;
use common::Role;

/// Where a dispatched worker is in its lifecycle, as far as the controller
/// can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// A stub accepted the SPAWN.
    Dispatched,

    /// The worker said HELLO and was sent BEGIN.
    Begun,

    /// The worker's completion marker was observed.
    Completed,
}

#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub role: Role,
    pub id: u32,

    /// The stub that launched the worker.
    pub stub: Endpoint,

    /// Process id reported by the stub, if it sent one.
    pub pid: Option<u32>,

    pub state: WorkerState,
}

impl WorkerRecord {
    pub fn dispatched(role: Role, id: u32, stub: Endpoint, pid: Option<u32>) -> Self {
        Self {
            role,
            id,
            stub,
            pid,
            state: WorkerState::Dispatched,
        }
    }

    /// Set worker state.
    pub fn set_state(&mut self, new_state: WorkerState) {
        self.state = new_state;
    }
}
