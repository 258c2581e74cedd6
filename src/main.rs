//! replay-middleware
//!
//! 从标准输入读取回放引擎发来的记录，过滤后把请求写回标准输出，
//! 诊断日志写到标准错误。

use replay_middleware::{errors::Error, logger, options::Options, start_middleware};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    // 加载配置，此时日志尚未初始化
    let options = match Options::new() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // 初始化日志
    logger::init_logger(&options.logging)?;
    info!("Loaded configuration: {:?}", options);

    if let Err(e) = start_middleware(&options).await {
        error!("middleware stopped: {}", e);
        return Err(e);
    }

    info!("Shutdown completed");
    Ok(())
}
