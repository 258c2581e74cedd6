//! 流量回放中间件
//!
//! 位于抓包/回放引擎与下游观察者之间，从标准输入逐行读取编码后的记录：
//! - 按允许列表过滤请求，保留的请求（可放大多份）写回标准输出供回放
//! - 以关联ID在有界 LRU 缓存中跟踪进行中的交换
//! - 原始响应与回放响应都到达后输出对比结果

pub mod cache;
pub mod codec;
pub mod emitter;
pub mod errors;
pub mod filter;
pub mod logger;
pub mod middleware;
pub mod model;
pub mod monitor;
pub mod options;
pub mod parser;
pub mod reporter;

use middleware::Middleware;
use monitor::MetricsSnapshot;
use options::Options;
use tokio::io::BufReader;

/// 以标准输入为输入流、标准输出为输出流运行中间件，直到输入结束
pub async fn start_middleware(options: &Options) -> Result<MetricsSnapshot, errors::Error> {
    let mut middleware = Middleware::new(options, tokio::io::stdout())?;
    let stdin = BufReader::new(tokio::io::stdin());
    middleware.run(stdin).await
}
