use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounterVec,
    pub order_status_transitions_total: IntCounterVec,
    pub payments_total: IntCounter,
    pub checkins_total: IntCounter,
    pub shipping_fee: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total = IntCounterVec::new(
            Opts::new("orders_created_total", "Orders created by payment method"),
            &["payment"],
        )
        .expect("valid orders_created_total metric");

        let order_status_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_status_transitions_total",
                "Accepted order status transitions by target status",
            ),
            &["to"],
        )
        .expect("valid order_status_transitions_total metric");

        let payments_total = IntCounter::new("payments_total", "Orders paid after creation")
            .expect("valid payments_total metric");

        let checkins_total = IntCounter::new("checkins_total", "Location checkpoints recorded")
            .expect("valid checkins_total metric");

        let shipping_fee = Histogram::with_opts(
            HistogramOpts::new("shipping_fee", "Computed shipping fee in currency units")
                .buckets(vec![
                    30_000.0, 45_000.0, 60_000.0, 90_000.0, 150_000.0, 300_000.0, 600_000.0,
                ]),
        )
        .expect("valid shipping_fee metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(order_status_transitions_total.clone()))
            .expect("register order_status_transitions_total");
        registry
            .register(Box::new(payments_total.clone()))
            .expect("register payments_total");
        registry
            .register(Box::new(checkins_total.clone()))
            .expect("register checkins_total");
        registry
            .register(Box::new(shipping_fee.clone()))
            .expect("register shipping_fee");

        Self {
            registry,
            orders_created_total,
            order_status_transitions_total,
            payments_total,
            checkins_total,
            shipping_fee,
        }
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
