use crate::errors::Error;

/// 输入输出流的行编码
///
/// 每行对应一条记录的原始字节，编码方式由宿主回放引擎决定。
pub trait RecordCodec: Send + Sync {
    fn decode(&self, line: &str) -> Result<Vec<u8>, Error>;

    /// 编码结果以换行结尾
    fn encode(&self, raw: &[u8]) -> Vec<u8>;
}

/// 十六进制行编码
#[derive(Debug, Clone, Copy, Default)]
pub struct HexCodec;

impl HexCodec {
    pub fn new() -> Self {
        Self
    }
}

impl RecordCodec for HexCodec {
    fn decode(&self, line: &str) -> Result<Vec<u8>, Error> {
        hex::decode(line.trim()).map_err(|e| Error::MalformedRecord(format!("invalid hex line: {}", e)))
    }

    fn encode(&self, raw: &[u8]) -> Vec<u8> {
        let mut dst = hex::encode(raw).into_bytes();
        dst.push(b'\n');
        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_newline() {
        let codec = HexCodec::new();
        assert_eq!(codec.encode(b"1 a\n"), b"3120610a\n".to_vec());
    }

    #[test]
    fn test_decode_trims_line_endings() {
        let codec = HexCodec::new();
        assert_eq!(codec.decode("3120610a\r\n").unwrap(), b"1 a\n".to_vec());
    }

    #[test]
    fn test_decode_rejects_bad_hex() {
        let codec = HexCodec::new();
        assert!(matches!(codec.decode("abc"), Err(Error::MalformedRecord(_))));
        assert!(matches!(codec.decode("zz"), Err(Error::MalformedRecord(_))));
    }
}
