use tokio::time::Instant;
use tracing::info;

use crate::data::PendingItem;
use crate::error::TrackerError;
use crate::queue::QueueSender;
use crate::rate_gate::RateGate;

/// Accepts user operations for tracking.
#[derive(Debug, Clone)]
pub struct Intake {
    queue: QueueSender,
    gate: RateGate,
}

impl Intake {
    pub fn new(queue: QueueSender, gate: RateGate) -> Self {
        Intake { queue, gate }
    }

    /// Validates a submission and appends it to the work queue.
    ///
    /// The key is stamped in the rate gate at submission time, so the first
    /// lookup happens one minimum interval later. Nothing is touched when a
    /// field is missing.
    pub fn submit(
        &self,
        operation_id: Option<&str>,
        chain: Option<&str>,
    ) -> Result<PendingItem, TrackerError> {
        let operation_id = present(operation_id);
        let chain = present(chain);
        let (operation_id, chain) = match (operation_id, chain) {
            (Some(operation_id), Some(chain)) => (operation_id, chain),
            (operation_id, chain) => {
                let mut missing = vec![];
                if operation_id.is_none() {
                    missing.push("user_operation_hash");
                }
                if chain.is_none() {
                    missing.push("chain");
                }
                return Err(TrackerError::InvalidInput { missing });
            }
        };

        let now = Instant::now();
        let item = PendingItem::at(operation_id, chain, now);
        let key = item.key();
        let previous = self.gate.stamp(key.clone(), now);
        if let Err(err) = self.queue.push(item.clone()) {
            match previous {
                Some(at) => {
                    self.gate.stamp(key, at);
                }
                None => self.gate.remove(&key),
            }
            return Err(err);
        }

        info!(operation_id = %item.operation_id, chain = %item.chain, "Queued user operation");
        Ok(item)
    }
}

fn present(field: Option<&str>) -> Option<&str> {
    field.filter(|value| !value.is_empty())
}
