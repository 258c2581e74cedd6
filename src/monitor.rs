use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::{errors::Error, model::PayloadKind};

/// 处理过程中的计数器，每个中间件实例独立持有自己的注册表
#[derive(Clone)]
pub struct MiddlewareMetrics {
    registry: Registry,
    // 按负载类型统计成功拆分的记录
    pub records_total: IntCounterVec,
    pub requests_kept: IntCounter,
    pub requests_skipped: IntCounter,
    // 实际写出的份数，包含放大
    pub records_emitted: IntCounter,
    pub records_dropped: IntCounter,
    pub unknown_ids: IntCounter,
    pub comparisons_reported: IntCounter,
    pub status_mismatches: IntCounter,
    pub cache_evictions: IntCounter,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub original_responses: u64,
    pub replayed_responses: u64,
    pub requests_kept: u64,
    pub requests_skipped: u64,
    pub records_emitted: u64,
    pub records_dropped: u64,
    pub unknown_ids: u64,
    pub comparisons_reported: u64,
    pub status_mismatches: u64,
    pub cache_evictions: u64,
}

impl MiddlewareMetrics {
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new_custom(Some("replay_middleware".to_string()), None)?;

        let records_total = IntCounterVec::new(
            Opts::new("records_total", "Records decoded from the input stream"),
            &["kind"],
        )?;
        let requests_kept = IntCounter::new("requests_kept_total", "Requests kept by the filter chain")?;
        let requests_skipped =
            IntCounter::new("requests_skipped_total", "Requests skipped by the filter chain")?;
        let records_emitted =
            IntCounter::new("records_emitted_total", "Encoded records written to the output stream")?;
        let records_dropped =
            IntCounter::new("records_dropped_total", "Malformed or unparsable records dropped")?;
        let unknown_ids = IntCounter::new(
            "unknown_correlation_ids_total",
            "Responses without a pending exchange",
        )?;
        let comparisons_reported =
            IntCounter::new("comparisons_reported_total", "Original/replayed comparisons reported")?;
        let status_mismatches = IntCounter::new(
            "status_mismatches_total",
            "Comparisons where replayed status differs from original",
        )?;
        let cache_evictions =
            IntCounter::new("cache_evictions_total", "Pending exchanges evicted from the cache")?;

        registry.register(Box::new(records_total.clone()))?;
        registry.register(Box::new(requests_kept.clone()))?;
        registry.register(Box::new(requests_skipped.clone()))?;
        registry.register(Box::new(records_emitted.clone()))?;
        registry.register(Box::new(records_dropped.clone()))?;
        registry.register(Box::new(unknown_ids.clone()))?;
        registry.register(Box::new(comparisons_reported.clone()))?;
        registry.register(Box::new(status_mismatches.clone()))?;
        registry.register(Box::new(cache_evictions.clone()))?;

        Ok(Self {
            registry,
            records_total,
            requests_kept,
            requests_skipped,
            records_emitted,
            records_dropped,
            unknown_ids,
            comparisons_reported,
            status_mismatches,
            cache_evictions,
        })
    }

    pub fn record_seen(&self, kind: PayloadKind) {
        self.records_total.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_kind = |kind: PayloadKind| self.records_total.with_label_values(&[kind.as_str()]).get();
        MetricsSnapshot {
            requests: by_kind(PayloadKind::Request),
            original_responses: by_kind(PayloadKind::OriginalResponse),
            replayed_responses: by_kind(PayloadKind::ReplayedResponse),
            requests_kept: self.requests_kept.get(),
            requests_skipped: self.requests_skipped.get(),
            records_emitted: self.records_emitted.get(),
            records_dropped: self.records_dropped.get(),
            unknown_ids: self.unknown_ids.get(),
            comparisons_reported: self.comparisons_reported.get(),
            status_mismatches: self.status_mismatches.get(),
            cache_evictions: self.cache_evictions.get(),
        }
    }

    /// Prometheus 文本格式
    pub fn render(&self) -> Result<String, Error> {
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&self.registry.gather()).map_err(Error::Metric)
    }
}
