use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub workflow_transitions_total: IntCounterVec,
    pub notifications_total: IntCounterVec,
    pub notification_queue_depth: IntGauge,
    pub dashboard_refresh_total: IntCounterVec,
    pub dashboard_refresh_seconds: HistogramVec,
    pub dashboard_active_deliveries: IntGauge,
    pub dashboard_available_agents: IntGauge,
    pub dashboard_pending_applications: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let workflow_transitions_total = IntCounterVec::new(
            Opts::new(
                "workflow_transitions_total",
                "Workflow transition attempts by workflow, transition and outcome",
            ),
            &["workflow", "transition", "outcome"],
        )
        .expect("valid workflow_transitions_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notification intents by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid notifications_total metric");

        let notification_queue_depth = IntGauge::new(
            "notification_queue_depth",
            "Notifications waiting for the notifier worker",
        )
        .expect("valid notification_queue_depth metric");

        let dashboard_refresh_total = IntCounterVec::new(
            Opts::new("dashboard_refresh_total", "Dashboard recomputations by outcome"),
            &["outcome"],
        )
        .expect("valid dashboard_refresh_total metric");

        let dashboard_refresh_seconds = HistogramVec::new(
            HistogramOpts::new(
                "dashboard_refresh_seconds",
                "Latency of dashboard recomputation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dashboard_refresh_seconds metric");

        let dashboard_active_deliveries = IntGauge::new(
            "dashboard_active_deliveries",
            "Deliveries assigned, picked up or in transit at the last refresh",
        )
        .expect("valid dashboard_active_deliveries metric");

        let dashboard_available_agents = IntGauge::new(
            "dashboard_available_agents",
            "Agents marked available at the last refresh",
        )
        .expect("valid dashboard_available_agents metric");

        let dashboard_pending_applications = IntGauge::new(
            "dashboard_pending_applications",
            "Agent applications awaiting review at the last refresh",
        )
        .expect("valid dashboard_pending_applications metric");

        registry
            .register(Box::new(workflow_transitions_total.clone()))
            .expect("register workflow_transitions_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(notification_queue_depth.clone()))
            .expect("register notification_queue_depth");
        registry
            .register(Box::new(dashboard_refresh_total.clone()))
            .expect("register dashboard_refresh_total");
        registry
            .register(Box::new(dashboard_refresh_seconds.clone()))
            .expect("register dashboard_refresh_seconds");
        registry
            .register(Box::new(dashboard_active_deliveries.clone()))
            .expect("register dashboard_active_deliveries");
        registry
            .register(Box::new(dashboard_available_agents.clone()))
            .expect("register dashboard_available_agents");
        registry
            .register(Box::new(dashboard_pending_applications.clone()))
            .expect("register dashboard_pending_applications");

        Self {
            registry,
            workflow_transitions_total,
            notifications_total,
            notification_queue_depth,
            dashboard_refresh_total,
            dashboard_refresh_seconds,
            dashboard_active_deliveries,
            dashboard_available_agents,
            dashboard_pending_applications,
        }
    }

    pub fn record_transition(&self, workflow: &str, transition: &str, outcome: &str) {
        self.workflow_transitions_total
            .with_label_values(&[workflow, transition, outcome])
            .inc();
    }

    pub fn observe_refresh(&self, outcome: &str, elapsed_secs: f64) {
        self.dashboard_refresh_total
            .with_label_values(&[outcome])
            .inc();
        self.dashboard_refresh_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
