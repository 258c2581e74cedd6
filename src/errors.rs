#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logger error: {0}")]
    Logger(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Unparsable message: {0}")]
    UnparsableMessage(String),

    #[error("Output write error: {0}")]
    OutputWrite(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metric error: {0}")]
    Metric(#[from] prometheus::Error),
}

impl Error {
    /// 单条记录级别的错误，丢弃该记录后继续处理
    pub fn is_record_local(&self) -> bool {
        matches!(self, Error::MalformedRecord(_) | Error::UnparsableMessage(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Config(e.to_string())
    }
}
