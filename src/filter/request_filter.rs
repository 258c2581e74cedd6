use std::collections::HashSet;

use regex::Regex;

use crate::{errors::Error, model::ParsedRequest, options::PathRule, parser::host_without_port};

use super::{Decision, Filter};

fn keep_if(pass: bool) -> Decision {
    if pass {
        Decision::Keep
    } else {
        Decision::Skip
    }
}

/// 请求方法允许列表，大小写不敏感
pub struct MethodFilter {
    methods: HashSet<String>,
}

impl MethodFilter {
    pub fn new(methods: &[String]) -> Self {
        Self {
            methods: methods.iter().map(|m| m.trim().to_ascii_uppercase()).collect(),
        }
    }
}

impl Filter for MethodFilter {
    fn name(&self) -> &'static str {
        "method"
    }

    fn decide(&self, request: &ParsedRequest) -> Decision {
        keep_if(self.methods.is_empty() || self.methods.contains(&request.method.to_ascii_uppercase()))
    }
}

/// Host 允许列表，大小写不敏感，可以带端口也可以不带
pub struct HostFilter {
    hosts: HashSet<String>,
}

impl HostFilter {
    pub fn new(hosts: &[String]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect(),
        }
    }
}

impl Filter for HostFilter {
    fn name(&self) -> &'static str {
        "host"
    }

    fn decide(&self, request: &ParsedRequest) -> Decision {
        if self.hosts.is_empty() {
            return Decision::Keep;
        }
        let host = match &request.host {
            Some(host) => host.to_ascii_lowercase(),
            None => return Decision::Skip,
        };
        keep_if(self.hosts.contains(&host) || self.hosts.contains(host_without_port(&host)))
    }
}

enum PathMatcher {
    Prefix(String),
    Pattern(Regex),
}

/// 路径规则：前缀匹配，或正则完整匹配
pub struct PathFilter {
    matcher: PathMatcher,
}

impl PathFilter {
    pub fn new(rule: &PathRule) -> Result<Self, Error> {
        let matcher = match rule {
            PathRule::Prefix(prefix) => PathMatcher::Prefix(prefix.clone()),
            // 空规则不做限制
            PathRule::Pattern(pattern) if pattern.is_empty() => PathMatcher::Prefix(String::new()),
            PathRule::Pattern(pattern) => PathMatcher::Pattern(Regex::new(&format!("^(?:{})$", pattern))?),
        };
        Ok(Self { matcher })
    }
}

impl Filter for PathFilter {
    fn name(&self) -> &'static str {
        "path"
    }

    fn decide(&self, request: &ParsedRequest) -> Decision {
        match &self.matcher {
            PathMatcher::Prefix(prefix) => keep_if(request.path.starts_with(prefix.as_str())),
            PathMatcher::Pattern(pattern) => keep_if(pattern.is_match(&request.path)),
        }
    }
}
