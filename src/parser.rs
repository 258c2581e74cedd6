use bytes::Bytes;
use http::Uri;

use crate::{
    errors::Error,
    model::{ParsedRequest, ParsedResponse, PayloadKind, Record},
};

// 头部数量超出时按倍数扩容重试
const INITIAL_HEADERS: usize = 64;

/// 拆分一条记录
///
/// 第一行是以空格分隔的头部：`<类型> <关联ID> [时间戳/耗时]`，其后是 HTTP 报文。
pub fn parse_record(raw: Vec<u8>) -> Result<Record, Error> {
    let raw = Bytes::from(raw);
    let newline = raw
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| Error::MalformedRecord("missing header line terminator".to_string()))?;

    let header = raw[..newline].strip_suffix(b"\r").unwrap_or(&raw[..newline]);
    // 单个空格分隔，空字段不跳过
    let mut tokens = header.split(|b| *b == b' ');

    let (tag, id) = match (tokens.next(), tokens.next()) {
        (Some(tag), Some(id)) if !tag.is_empty() && !id.is_empty() => (tag, id),
        _ => {
            return Err(Error::MalformedRecord(format!(
                "header needs a kind and an id: {:?}",
                String::from_utf8_lossy(header)
            )))
        }
    };

    let kind = PayloadKind::from_tag(tag).ok_or_else(|| {
        Error::MalformedRecord(format!("unknown payload kind {:?}", String::from_utf8_lossy(tag)))
    })?;
    let id = std::str::from_utf8(id)
        .map_err(|_| Error::MalformedRecord("correlation id is not valid utf-8".to_string()))?
        .to_string();
    // 第三个字段不是数字时忽略
    let meta = tokens
        .next()
        .and_then(|t| std::str::from_utf8(t).ok())
        .and_then(|t| t.parse::<u64>().ok());

    let payload = raw.slice(newline + 1..);
    Ok(Record {
        kind,
        id,
        meta,
        raw,
        payload,
    })
}

pub fn parse_request(payload: &[u8]) -> Result<ParsedRequest, Error> {
    let mut capacity = INITIAL_HEADERS;
    loop {
        let mut headers = vec![httparse::EMPTY_HEADER; capacity];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(payload) {
            Ok(httparse::Status::Complete(_)) => return build_request(&req),
            Ok(httparse::Status::Partial) => {
                return Err(Error::UnparsableMessage("incomplete request head".to_string()))
            }
            Err(httparse::Error::TooManyHeaders) => capacity *= 2,
            Err(e) => return Err(Error::UnparsableMessage(format!("invalid request: {}", e))),
        }
    }
}

fn build_request(req: &httparse::Request<'_, '_>) -> Result<ParsedRequest, Error> {
    let method = req
        .method
        .ok_or_else(|| Error::UnparsableMessage("request without method".to_string()))?
        .to_string();
    let target = req
        .path
        .ok_or_else(|| Error::UnparsableMessage("request without target".to_string()))?;
    let headers = collect_headers(req.headers);

    let (authority, path, query) = split_target(target);
    let host = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("host"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or(authority);

    Ok(ParsedRequest {
        method,
        host,
        path,
        query,
        headers,
    })
}

pub fn parse_response(payload: &[u8], latency: Option<u64>) -> Result<ParsedResponse, Error> {
    let mut capacity = INITIAL_HEADERS;
    loop {
        let mut headers = vec![httparse::EMPTY_HEADER; capacity];
        let mut resp = httparse::Response::new(&mut headers);
        match resp.parse(payload) {
            Ok(httparse::Status::Complete(_)) => {
                let status = resp
                    .code
                    .ok_or_else(|| Error::UnparsableMessage("response without status".to_string()))?;
                return Ok(ParsedResponse {
                    status,
                    reason: resp.reason.filter(|r| !r.is_empty()).map(str::to_string),
                    headers: collect_headers(resp.headers),
                    latency,
                });
            }
            Ok(httparse::Status::Partial) => {
                return Err(Error::UnparsableMessage("incomplete response head".to_string()))
            }
            Err(httparse::Error::TooManyHeaders) => capacity *= 2,
            Err(e) => return Err(Error::UnparsableMessage(format!("invalid response: {}", e))),
        }
    }
}

/// 去掉 Host 中的端口，用于和允许列表比较
pub fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 字面量
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn collect_headers(headers: &[httparse::Header<'_>]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect()
}

fn split_target(target: &str) -> (Option<String>, String, Option<String>) {
    match target.parse::<Uri>() {
        Ok(uri) => (
            uri.authority().map(|a| a.as_str().to_string()),
            uri.path().to_string(),
            uri.query().map(str::to_string),
        ),
        Err(_) => match target.split_once('?') {
            Some((path, query)) => (None, path.to_string(), Some(query.to_string())),
            None => (None, target.to_string(), None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_header() {
        let record = parse_record(b"1 r1 1700000000\nGET / HTTP/1.1\r\n\r\n".to_vec()).unwrap();
        assert_eq!(record.kind, PayloadKind::Request);
        assert_eq!(record.id, "r1");
        assert_eq!(record.meta, Some(1700000000));
        assert_eq!(&record.payload[..], b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(record.raw.len(), 34);
    }

    #[test]
    fn test_parse_record_without_meta() {
        let record = parse_record(b"3 abc\nHTTP/1.1 200 OK\r\n\r\n".to_vec()).unwrap();
        assert_eq!(record.kind, PayloadKind::ReplayedResponse);
        assert_eq!(record.id, "abc");
        assert_eq!(record.meta, None);
    }

    #[test]
    fn test_parse_record_ignores_non_numeric_meta() {
        let record = parse_record(b"2 abc later\n".to_vec()).unwrap();
        assert_eq!(record.kind, PayloadKind::OriginalResponse);
        assert_eq!(record.meta, None);
        assert!(record.payload.is_empty());
    }

    #[test]
    fn test_parse_record_rejects_malformed() {
        assert!(matches!(
            parse_record(b"1 r1 no newline".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_record(b"1\nGET / HTTP/1.1\r\n\r\n".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_record(b"4 r1\nGET / HTTP/1.1\r\n\r\n".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(parse_record(Vec::new()), Err(Error::MalformedRecord(_))));
        // 空字段不会被跳过
        assert!(matches!(
            parse_record(b" 1 r1\nGET / HTTP/1.1\r\n\r\n".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_record(b"1  r1\nGET / HTTP/1.1\r\n\r\n".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_record(b" 1  r1\nGET / HTTP/1.1\r\n\r\n".to_vec()),
            Err(Error::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_parse_record_ignores_extra_fields() {
        let record = parse_record(b"1 r1 123 extra fields\nGET / HTTP/1.1\r\n\r\n".to_vec()).unwrap();
        assert_eq!(record.kind, PayloadKind::Request);
        assert_eq!(record.id, "r1");
        assert_eq!(record.meta, Some(123));
    }

    #[test]
    fn test_parse_request() {
        let req = parse_request(
            b"GET /a/b?x=1 HTTP/1.1\r\nHost: example.com:8080\r\nUser-Agent: test\r\n\r\nbody",
        )
        .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.host.as_deref(), Some("example.com:8080"));
        assert_eq!(req.path, "/a/b");
        assert_eq!(req.query.as_deref(), Some("x=1"));
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.url(), "example.com:8080/a/b?x=1");
    }

    #[test]
    fn test_parse_request_absolute_target_without_host_header() {
        let req = parse_request(b"POST http://api.example.com/v1/items HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.host.as_deref(), Some("api.example.com"));
        assert_eq!(req.path, "/v1/items");
        assert_eq!(req.query, None);
    }

    #[test]
    fn test_parse_request_failures() {
        assert!(matches!(
            parse_request(b"GET / HTTP/1.1\r\nHost: a"),
            Err(Error::UnparsableMessage(_))
        ));
        assert!(matches!(
            parse_request(b"\x00\x01 garbage\r\n\r\n"),
            Err(Error::UnparsableMessage(_))
        ));
    }

    #[test]
    fn test_parse_response() {
        let resp = parse_response(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n",
            Some(1200),
        )
        .unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.reason.as_deref(), Some("Not Found"));
        assert_eq!(resp.latency, Some(1200));
        assert!(matches!(
            parse_response(b"not a response\r\n\r\n", None),
            Err(Error::UnparsableMessage(_))
        ));
    }

    #[test]
    fn test_parse_many_headers() {
        let mut head = String::from("GET /big HTTP/1.1\r\nHost: example.com\r\n");
        for i in 0..300 {
            head.push_str(&format!("X-H{}: v\r\n", i));
        }
        head.push_str("\r\n");
        let req = parse_request(head.as_bytes()).unwrap();
        assert_eq!(req.headers.len(), 301);
        assert_eq!(req.host.as_deref(), Some("example.com"));

        let mut head = String::from("HTTP/1.1 200 OK\r\n");
        for i in 0..150 {
            head.push_str(&format!("X-H{}: v\r\n", i));
        }
        head.push_str("\r\n");
        let resp = parse_response(head.as_bytes(), None).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.headers.len(), 150);
    }

    #[test]
    fn test_host_without_port() {
        assert_eq!(host_without_port("example.com"), "example.com");
        assert_eq!(host_without_port("example.com:8080"), "example.com");
        assert_eq!(host_without_port("[::1]:80"), "[::1]");
        assert_eq!(host_without_port("example.com:"), "example.com:");
    }
}
