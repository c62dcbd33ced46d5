use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus counters for the order lifecycle
// ============================================================================
//
// Covers:
// - Orders placed and status transitions
// - Cancellations
// - Rejected commands, by operation and error kind
// - Notification outcomes, by template
// - Command latency
//
// Everything lives in one Registry owned by the process; exposing it is up
// to the embedding service.
// ============================================================================

pub struct OrderMetrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub status_transitions: IntCounterVec,
    pub cancellations: IntCounter,
    pub commands_rejected: IntCounterVec,
    pub notifications: IntCounterVec,
    pub command_duration: HistogramVec,
}

impl OrderMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Committed status transitions"),
            &["to"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let cancellations = IntCounter::new("order_cancellations_total", "Total orders cancelled")?;
        registry.register(Box::new(cancellations.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new("order_commands_rejected_total", "Order commands that returned an error"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        let notifications = IntCounterVec::new(
            Opts::new("order_notifications_total", "Customer notifications attempted"),
            &["template", "outcome"],
        )?;
        registry.register(Box::new(notifications.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("order_command_duration_seconds", "Order command duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            status_transitions,
            cancellations,
            commands_rejected,
            notifications,
            command_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, to: &str) {
        self.status_transitions.with_label_values(&[to]).inc();
    }

    pub fn record_rejection(&self, operation: &str, kind: &str) {
        self.commands_rejected.with_label_values(&[operation, kind]).inc();
    }

    pub fn record_notification(&self, template: &str, outcome: &str) {
        self.notifications.with_label_values(&[template, outcome]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.command_duration.with_label_values(&[operation]).observe(duration_secs);
    }
}
