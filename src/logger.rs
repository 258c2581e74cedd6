use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{errors::Error, options::LoggingOptions};

/// 初始化日志系统
///
/// 标准输出是数据通道，诊断日志一律写到标准错误；
/// 配置了 `directory` 时再叠加一个按天滚动的文件输出。
pub fn init_logger(opts: &LoggingOptions) -> Result<(), Error> {
    // 配置日志级别
    let level = match opts.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let format_opts = opts.format.clone();

    let stderr_layer = fmt::layer()
        .with_file(format_opts.file)
        .with_line_number(format_opts.line_number)
        .with_thread_ids(format_opts.thread_id)
        .with_target(format_opts.target)
        .with_level(format_opts.level)
        .with_writer(std::io::stderr);

    let file_layer = match &opts.directory {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(opts.max_files as usize)
                .filename_prefix(&opts.file_name_prefix)
                .build(log_dir)
                .map_err(|e| Error::Logger(e.to_string()))?;
            Some(
                fmt::layer()
                    .with_target(format_opts.target)
                    .with_level(format_opts.level)
                    .with_ansi(false)
                    .with_writer(file_appender),
            )
        }
        None => None,
    };

    // RUST_LOG 优先，其次是配置的级别
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logger(e.to_string()))?;

    Ok(())
}
