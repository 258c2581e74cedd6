use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{
    cache::CorrelationCache,
    codec::{HexCodec, RecordCodec},
    emitter::Emitter,
    errors::Error,
    filter::FilterChain,
    model::{PayloadKind, PendingExchange, Record},
    monitor::{MetricsSnapshot, MiddlewareMetrics},
    options::Options,
    parser::{parse_record, parse_request, parse_response},
    reporter::{Comparison, Reporter},
};

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    // 空行
    Ignored,
    // 格式错误或报文无法解析，已丢弃
    Dropped(String),
    Skipped { id: String, filter: &'static str },
    Emitted { id: String, copies: u32 },
    // 响应已挂到交换上，暂时没有可输出的对比
    Attached { id: String, kind: PayloadKind },
    Reported(Comparison),
    // 没有对应的进行中交换：从未保留或已被淘汰
    UnknownId { id: String, kind: PayloadKind },
}

/// 流量回放中间件
///
/// 按到达顺序逐条处理记录：解码、拆分、过滤、关联、输出。
/// 关联缓存只归这个处理循环所有，不需要加锁。
pub struct Middleware<W> {
    codec: Arc<dyn RecordCodec>,
    filters: FilterChain,
    cache: CorrelationCache<PendingExchange>,
    emitter: Emitter<W>,
    reporter: Reporter,
    metrics: MiddlewareMetrics,
    evict_on_complete: bool,
}

impl<W: AsyncWrite + Unpin> Middleware<W> {
    pub fn new(options: &Options, writer: W) -> Result<Self, Error> {
        Self::with_codec(options, Arc::new(HexCodec::new()), writer)
    }

    pub fn with_codec(options: &Options, codec: Arc<dyn RecordCodec>, writer: W) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self {
            filters: FilterChain::from_options(&options.filter)?,
            cache: CorrelationCache::new(options.cache.capacity)?,
            emitter: Emitter::new(writer, codec.clone(), options.amplification),
            codec,
            reporter: Reporter::new(),
            metrics: MiddlewareMetrics::new()?,
            evict_on_complete: options.cache.evict_on_complete,
        })
    }

    /// 读到输入结束为止；只有输出写失败会提前返回错误
    pub async fn run<R>(&mut self, mut reader: R) -> Result<MetricsSnapshot, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.process_line(&line).await?;
        }
        self.emitter.shutdown().await?;

        let snapshot = self.metrics.snapshot();
        info!(
            requests = snapshot.requests,
            kept = snapshot.requests_kept,
            skipped = snapshot.requests_skipped,
            emitted = snapshot.records_emitted,
            dropped = snapshot.records_dropped,
            unknown_ids = snapshot.unknown_ids,
            comparisons = snapshot.comparisons_reported,
            mismatches = snapshot.status_mismatches,
            evictions = snapshot.cache_evictions,
            "input stream closed"
        );
        if let Ok(text) = self.metrics.render() {
            debug!("metrics:\n{}", text);
        }
        Ok(snapshot)
    }

    pub async fn process_line(&mut self, line: &str) -> Result<RecordOutcome, Error> {
        if line.trim().is_empty() {
            return Ok(RecordOutcome::Ignored);
        }
        match self.handle_line(line).await {
            Err(e) if e.is_record_local() => {
                warn!("dropping record: {}", e);
                self.metrics.records_dropped.inc();
                Ok(RecordOutcome::Dropped(e.to_string()))
            }
            other => other,
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<RecordOutcome, Error> {
        let raw = self.codec.decode(line)?;
        let record = parse_record(raw)?;
        self.metrics.record_seen(record.kind);
        match record.kind {
            PayloadKind::Request => self.handle_request(record).await,
            PayloadKind::OriginalResponse | PayloadKind::ReplayedResponse => self.handle_response(record),
        }
    }

    async fn handle_request(&mut self, record: Record) -> Result<RecordOutcome, Error> {
        let request = parse_request(&record.payload)?;

        if let Some(filter) = self.filters.rejected_by(&request) {
            debug!(
                id = %record.id,
                method = %request.method,
                host = ?request.host,
                path = %request.path,
                "request skipped by {} filter",
                filter
            );
            self.metrics.requests_skipped.inc();
            return Ok(RecordOutcome::Skipped { id: record.id, filter });
        }

        debug!(id = %record.id, method = %request.method, host = ?request.host, "forwarding request");
        let exchange = PendingExchange::new(record.id.clone(), request);
        if let Some((evicted, _)) = self.cache.put(record.id.clone(), exchange) {
            debug!(id = %evicted, "pending exchange evicted");
            self.metrics.cache_evictions.inc();
        }

        let copies = self.emitter.emit(&record.raw).await?;
        self.metrics.requests_kept.inc();
        self.metrics.records_emitted.inc_by(copies as u64);
        Ok(RecordOutcome::Emitted { id: record.id, copies })
    }

    fn handle_response(&mut self, record: Record) -> Result<RecordOutcome, Error> {
        let response = parse_response(&record.payload, record.meta)?;
        let kind = record.kind;
        let reporter = self.reporter;

        let updated = self.cache.update(&record.id, |exchange| {
            exchange.attach(kind, response);
            (reporter.report(exchange), exchange.is_complete())
        });

        match updated {
            None => {
                debug!(id = %record.id, kind = kind.as_str(), "exchange already cleared");
                self.metrics.unknown_ids.inc();
                Ok(RecordOutcome::UnknownId { id: record.id, kind })
            }
            Some((None, _)) => Ok(RecordOutcome::Attached { id: record.id, kind }),
            Some((Some(comparison), complete)) => {
                self.metrics.comparisons_reported.inc();
                if comparison.status_matches == Some(false) {
                    self.metrics.status_mismatches.inc();
                }
                if complete && self.evict_on_complete {
                    self.cache.remove(&record.id);
                }
                Ok(RecordOutcome::Reported(comparison))
            }
        }
    }

    pub fn cache(&self) -> &CorrelationCache<PendingExchange> {
        &self.cache
    }

    pub fn metrics(&self) -> &MiddlewareMetrics {
        &self.metrics
    }

    pub fn writer(&self) -> &W {
        self.emitter.get_ref()
    }

    pub fn into_writer(self) -> W {
        self.emitter.into_inner()
    }
}
