use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{codec::RecordCodec, errors::Error};

/// 将保留下来的请求重新编码后写到输出流
pub struct Emitter<W> {
    writer: W,
    codec: Arc<dyn RecordCodec>,
    amplification: u32,
}

impl<W: AsyncWrite + Unpin> Emitter<W> {
    pub fn new(writer: W, codec: Arc<dyn RecordCodec>, amplification: u32) -> Self {
        Self {
            writer,
            codec,
            amplification: amplification.max(1),
        }
    }

    pub fn amplification(&self) -> u32 {
        self.amplification
    }

    /// 写出 `amplification` 份相同的编码记录，返回写出的份数
    ///
    /// 写失败说明下游已经不可用，错误直接上抛。
    pub async fn emit(&mut self, raw: &[u8]) -> Result<u32, Error> {
        let encoded = self.codec.encode(raw);
        for _ in 0..self.amplification {
            self.writer
                .write_all(&encoded)
                .await
                .map_err(Error::OutputWrite)?;
        }
        self.writer.flush().await.map_err(Error::OutputWrite)?;
        Ok(self.amplification)
    }

    pub async fn shutdown(&mut self) -> Result<(), Error> {
        self.writer.flush().await.map_err(Error::OutputWrite)
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::HexCodec;

    #[tokio::test]
    async fn test_emit_once_by_default() {
        let mut emitter = Emitter::new(Vec::new(), Arc::new(HexCodec::new()), 1);
        assert_eq!(emitter.emit(b"1 a\n").await.unwrap(), 1);
        assert_eq!(emitter.into_inner(), b"3120610a\n".to_vec());
    }

    #[tokio::test]
    async fn test_emit_amplified() {
        let mut emitter = Emitter::new(Vec::new(), Arc::new(HexCodec::new()), 3);
        assert_eq!(emitter.emit(b"1 a\n").await.unwrap(), 3);
        assert_eq!(emitter.into_inner(), b"3120610a\n".repeat(3));
    }

    #[tokio::test]
    async fn test_zero_amplification_clamped() {
        let emitter = Emitter::new(Vec::new(), Arc::new(HexCodec::new()), 0);
        assert_eq!(emitter.amplification(), 1);
    }
}
