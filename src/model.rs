use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 记录头部第一个字段，标识负载类型
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Hash)]
pub enum PayloadKind {
    // 原始请求
    Request,
    // 线上原始响应
    OriginalResponse,
    // 回放得到的响应
    ReplayedResponse,
}

impl PayloadKind {
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"1" => Some(PayloadKind::Request),
            b"2" => Some(PayloadKind::OriginalResponse),
            b"3" => Some(PayloadKind::ReplayedResponse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Request => "request",
            PayloadKind::OriginalResponse => "original_response",
            PayloadKind::ReplayedResponse => "replayed_response",
        }
    }
}

/// 从输入流解码出的一条记录
#[derive(Debug, Clone)]
pub struct Record {
    pub kind: PayloadKind,
    pub id: String,
    // 请求为抓包开始时间，响应为往返耗时，单位纳秒
    pub meta: Option<u64>,
    // 整条记录（含头部行），原样用于重新编码输出
    pub raw: Bytes,
    // 头部行之后的 HTTP 报文
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    pub host: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ParsedRequest {
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.host.as_deref().unwrap_or(""), self.path);
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    // 往返耗时，来自记录头部
    pub latency: Option<u64>,
}

/// 关联缓存中的值：一次请求及其两个响应
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub id: String,
    pub request: ParsedRequest,
    pub original_response: Option<ParsedResponse>,
    pub replayed_response: Option<ParsedResponse>,
}

impl PendingExchange {
    pub fn new(id: String, request: ParsedRequest) -> Self {
        Self {
            id,
            request,
            original_response: None,
            replayed_response: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.original_response.is_some() && self.replayed_response.is_some()
    }

    /// 将响应挂到对应的位置，同类型的后到响应覆盖先到的
    pub fn attach(&mut self, kind: PayloadKind, response: ParsedResponse) {
        match kind {
            PayloadKind::OriginalResponse => self.original_response = Some(response),
            PayloadKind::ReplayedResponse => self.replayed_response = Some(response),
            PayloadKind::Request => {}
        }
    }
}
