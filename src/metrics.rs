use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

const METRICS_NAMESPACE: &str = "userop_tracker";

fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

#[derive(Clone)]
pub struct TrackerMetrics {
    registry: Registry,

    // labelled by outcome: "resolved", "expired", "throttled", "retry"
    pub outcomes: IntCounterVec,
    pub queue_depth: IntGauge,
    pub rate_gate_entries: IntGauge,
    pub notify_failures: IntCounter,
    // labelled by kind: "remote_error", "transient", "permanent"
    pub lookup_failures: IntCounterVec,
}

impl TrackerMetrics {
    pub fn new(registry: Registry) -> prometheus::Result<Self> {
        let outcomes = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("poll_outcomes"),
                "Number of poll worker decisions, by outcome",
            ),
            &["outcome"],
            registry
        )?;
        let queue_depth = register_int_gauge_with_registry!(
            opts!(
                namespaced("queue_depth"),
                "Items held by the poll worker, ready or parked",
            ),
            registry
        )?;
        let rate_gate_entries = register_int_gauge_with_registry!(
            opts!(
                namespaced("rate_gate_entries"),
                "Keys currently tracked by the rate gate",
            ),
            registry
        )?;
        let notify_failures = register_int_counter_with_registry!(
            opts!(
                namespaced("notify_failures"),
                "Guardian notifications that failed",
            ),
            registry
        )?;
        let lookup_failures = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("lookup_failures"),
                "Bundler lookups that did not return a mined transaction, by kind",
            ),
            &["kind"],
            registry
        )?;
        Ok(Self {
            registry,
            outcomes,
            queue_depth,
            rate_gate_entries,
            notify_failures,
            lookup_failures,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.outcomes.with_label_values(&[outcome]).get()
    }

    /// Renders every registered metric in the prometheus text format.
    pub fn gather(&self) -> prometheus::Result<String> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
