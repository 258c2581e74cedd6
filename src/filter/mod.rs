use crate::{errors::Error, model::ParsedRequest, options::FilterOptions};

pub mod request_filter;

use request_filter::{HostFilter, MethodFilter, PathFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Skip,
}

/// 过滤器接口
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&self, request: &ParsedRequest) -> Decision;
}

/// 过滤器链，所有过滤器都保留时请求才会被转发
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// 按配置构建，未配置的规则不加入链中
    pub fn from_options(opts: &FilterOptions) -> Result<Self, Error> {
        let mut chain = Self::new();
        if !opts.methods.is_empty() {
            chain.add_filter(Box::new(MethodFilter::new(&opts.methods)));
        }
        if !opts.hosts.is_empty() {
            chain.add_filter(Box::new(HostFilter::new(&opts.hosts)));
        }
        if let Some(rule) = &opts.path {
            chain.add_filter(Box::new(PathFilter::new(rule)?));
        }
        Ok(chain)
    }

    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 返回第一个拒绝该请求的过滤器名称
    pub fn rejected_by(&self, request: &ParsedRequest) -> Option<&'static str> {
        self.filters
            .iter()
            .find(|f| f.decide(request) == Decision::Skip)
            .map(|f| f.name())
    }

    pub fn decide(&self, request: &ParsedRequest) -> Decision {
        match self.rejected_by(request) {
            Some(_) => Decision::Skip,
            None => Decision::Keep,
        }
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PathRule;

    fn request(method: &str, host: &str, path: &str) -> ParsedRequest {
        ParsedRequest {
            method: method.to_string(),
            host: Some(host.to_string()),
            path: path.to_string(),
            query: None,
            headers: vec![("Host".to_string(), host.to_string())],
        }
    }

    #[test]
    fn test_empty_chain_keeps_everything() {
        let chain = FilterChain::from_options(&FilterOptions::default()).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.decide(&request("DELETE", "any.host", "/x")), Decision::Keep);
    }

    #[test]
    fn test_all_filters_must_keep() {
        let chain = FilterChain::from_options(&FilterOptions {
            methods: vec!["GET".to_string()],
            hosts: vec!["example.com".to_string()],
            path: Some(PathRule::Prefix("/".to_string())),
        })
        .unwrap();
        assert_eq!(chain.len(), 3);

        assert_eq!(chain.decide(&request("GET", "example.com", "/a")), Decision::Keep);
        assert_eq!(chain.rejected_by(&request("POST", "example.com", "/a")), Some("method"));
        assert_eq!(chain.rejected_by(&request("GET", "other.com", "/a")), Some("host"));
        assert_eq!(chain.rejected_by(&request("GET", "example.com", "a")), Some("path"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = FilterChain::from_options(&FilterOptions {
            path: Some(PathRule::Pattern("/(unclosed".to_string())),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
