use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::Error;

const DEFAULT_CONFIG_PATH: &str = "middleware.json";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Options {
    // 请求过滤规则
    pub filter: FilterOptions,
    // 每条保留的请求重复输出的次数
    pub amplification: u32,
    // 关联缓存
    pub cache: CacheOptions,
    // 日志
    pub logging: LoggingOptions,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FilterOptions {
    // 允许的请求方法，为空表示不限制
    pub methods: Vec<String>,
    // 允许的 Host，为空表示不限制
    pub hosts: Vec<String>,
    // 路径规则，前缀匹配或正则完整匹配二选一
    pub path: Option<PathRule>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PathRule {
    Prefix(String),
    Pattern(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheOptions {
    pub capacity: usize,
    // 两个响应都到达并输出对比后立即移除该交换
    pub evict_on_complete: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingOptions {
    pub level: String,
    // 设置后额外按天滚动写入该目录
    pub directory: Option<String>,
    pub file_name_prefix: String,
    pub max_files: u32,
    pub format: LogFormatOptions,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogFormatOptions {
    pub level: bool,
    pub target: bool,
    pub thread_id: bool,
    pub file: bool,
    pub line_number: bool,
}

impl Options {
    // 加载配置
    pub fn new() -> Result<Self, Error> {
        match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_file(&path),
            Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => Ok(Self::default()),
            Err(_) => Self::from_file(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn from_file(path: &str) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path, e)))?;
        Self::from_json(&config_str)
    }

    pub fn from_json(config_str: &str) -> Result<Self, Error> {
        let options: Options = serde_json::from_str(config_str)?;
        options.validate()?;
        Ok(options)
    }

    /// 启动前校验，正则规则在构建过滤器链时编译
    pub fn validate(&self) -> Result<(), Error> {
        if self.amplification == 0 {
            return Err(Error::Config("amplification must be at least 1".to_string()));
        }
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            filter: FilterOptions::default(),
            amplification: 1,
            cache: CacheOptions::default(),
            logging: LoggingOptions::default(),
        }
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 1024,
            evict_on_complete: false,
        }
    }
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_name_prefix: "middleware.log".to_string(),
            max_files: 7,
            format: LogFormatOptions::default(),
        }
    }
}

impl Default for LogFormatOptions {
    fn default() -> Self {
        Self {
            level: true,
            target: false,
            thread_id: false,
            file: false,
            line_number: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options = Options::from_json("{}").unwrap();
        assert_eq!(options.amplification, 1);
        assert_eq!(options.cache.capacity, 1024);
        assert!(!options.cache.evict_on_complete);
        assert!(options.filter.methods.is_empty());
        assert!(options.filter.path.is_none());
    }

    #[test]
    fn test_path_rule_variants() {
        let options = Options::from_json(r#"{"filter": {"path": {"prefix": "/api"}}}"#).unwrap();
        assert_eq!(options.filter.path, Some(PathRule::Prefix("/api".to_string())));

        let options = Options::from_json(r#"{"filter": {"path": {"pattern": "/v[0-9]+/.*"}}}"#).unwrap();
        assert_eq!(options.filter.path, Some(PathRule::Pattern("/v[0-9]+/.*".to_string())));
    }

    #[test]
    fn test_rejects_zero_amplification_and_capacity() {
        assert!(matches!(
            Options::from_json(r#"{"amplification": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Options::from_json(r#"{"cache": {"capacity": 0}}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(Options::from_json("{not json"), Err(Error::Config(_))));
    }
}
