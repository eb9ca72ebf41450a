use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Metrics {
    registry: Registry,
    pub s3_requests: IntCounterVec,
    pub s3_bytes_in: IntCounterVec,
    pub s3_bytes_out: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();
        let s3_requests = IntCounterVec::new(
            Opts::new("tenos_s3_requests_total", "S3 requests"),
            &["op", "status"],
        )
        .expect("s3_requests vector");
        let s3_bytes_in = IntCounterVec::new(
            Opts::new("tenos_s3_bytes_in_total", "Object bytes received"),
            &["op"],
        )
        .expect("s3_bytes_in vector");
        let s3_bytes_out = IntCounterVec::new(
            Opts::new("tenos_s3_bytes_out_total", "Object bytes served"),
            &["op"],
        )
        .expect("s3_bytes_out vector");
        registry
            .register(Box::new(s3_requests.clone()))
            .expect("register s3_requests");
        registry
            .register(Box::new(s3_bytes_in.clone()))
            .expect("register s3_bytes_in");
        registry
            .register(Box::new(s3_bytes_out.clone()))
            .expect("register s3_bytes_out");
        Arc::new(Self {
            registry,
            s3_requests,
            s3_bytes_in,
            s3_bytes_out,
        })
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}
