/// Reason sent back in `REJECT_CONNECTION` when the node is full.
pub const CAPACITY_REJECT_REASON: &str = "Max peers connected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject { reason: String },
}

/// Caps how many direct connections a node holds at once.
///
/// In-flight negotiations count against the cap, so a burst of
/// announcements cannot overshoot it before any channel opens.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    capacity: usize,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn try_admit(&self, connected: usize, in_flight: usize) -> Admission {
        if connected + in_flight < self.capacity {
            Admission::Admit
        } else {
            Admission::Reject {
                reason: CAPACITY_REJECT_REASON.to_owned(),
            }
        }
    }
}
