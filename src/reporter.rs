use serde::Serialize;
use tracing::{info, warn};

use crate::model::PendingExchange;

/// 原始响应与回放响应的对比结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comparison {
    pub id: String,
    pub method: String,
    pub url: String,
    // 原始响应缺失时为 None
    pub original_status: Option<u16>,
    pub replayed_status: u16,
    pub original_latency: Option<u64>,
    pub replayed_latency: Option<u64>,
    pub status_matches: Option<bool>,
}

impl Comparison {
    pub fn is_degraded(&self) -> bool {
        self.original_status.is_none()
    }
}

/// 只做观察输出，不影响过滤和转发
#[derive(Debug, Default, Clone, Copy)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// 回放响应到达后才有对比；原始响应缺失时给出降级结果
    pub fn compare(&self, exchange: &PendingExchange) -> Option<Comparison> {
        let replayed = exchange.replayed_response.as_ref()?;
        let original = exchange.original_response.as_ref();

        Some(Comparison {
            id: exchange.id.clone(),
            method: exchange.request.method.clone(),
            url: exchange.request.url(),
            original_status: original.map(|r| r.status),
            replayed_status: replayed.status,
            original_latency: original.and_then(|r| r.latency),
            replayed_latency: replayed.latency,
            status_matches: original.map(|r| r.status == replayed.status),
        })
    }

    pub fn report(&self, exchange: &PendingExchange) -> Option<Comparison> {
        let comparison = self.compare(exchange)?;
        match (comparison.original_status, comparison.status_matches) {
            (Some(original), Some(true)) => info!(
                id = %comparison.id,
                method = %comparison.method,
                url = %comparison.url,
                original_latency = ?comparison.original_latency,
                replayed_latency = ?comparison.replayed_latency,
                "status {} matches replayed {}",
                original,
                comparison.replayed_status
            ),
            (Some(original), _) => warn!(
                id = %comparison.id,
                method = %comparison.method,
                url = %comparison.url,
                original_latency = ?comparison.original_latency,
                replayed_latency = ?comparison.replayed_latency,
                "status {} differs from replayed {}",
                original,
                comparison.replayed_status
            ),
            (None, _) => info!(
                id = %comparison.id,
                method = %comparison.method,
                url = %comparison.url,
                replayed_latency = ?comparison.replayed_latency,
                "replayed status {}, original response unavailable",
                comparison.replayed_status
            ),
        }
        Some(comparison)
    }
}
