//! Server-side line framing.
//!
//! Bad lines come out as frames rather than codec errors, because a
//! `Framed` stream ends after its decoder reports an error.

use bytes::BytesMut;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

/// One newline-terminated request line as read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RequestFrame {
    Line(String),
    /// Line longer than the frame limit; its bytes were discarded.
    Oversized,
    NotUtf8,
}

/// Newline codec that reports oversized and non-UTF-8 lines in-band.
#[derive(Debug)]
pub(crate) struct RequestCodec {
    inner: AnyDelimiterCodec,
}

impl RequestCodec {
    pub(crate) fn new(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                max_length,
            ),
        }
    }

    fn frame(
        chunk: Result<Option<bytes::Bytes>, AnyDelimiterCodecError>,
    ) -> Result<Option<RequestFrame>, AnyDelimiterCodecError> {
        match chunk {
            Ok(Some(bytes)) => Ok(Some(match std::str::from_utf8(&bytes) {
                Ok(line) => RequestFrame::Line(line.to_owned()),
                Err(_) => RequestFrame::NotUtf8,
            })),
            Ok(None) => Ok(None),
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                Ok(Some(RequestFrame::Oversized))
            }
            Err(err) => Err(err),
        }
    }
}

impl Decoder for RequestCodec {
    type Item = RequestFrame;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RequestFrame>, Self::Error> {
        Self::frame(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RequestFrame>, Self::Error> {
        Self::frame(self.inner.decode_eof(buf))
    }
}

impl Encoder<String> for RequestCodec {
    type Error = AnyDelimiterCodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(line, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestCodec, RequestFrame};
    use bytes::BytesMut;
    use tokio_util::codec::Decoder;

    #[test]
    fn decoding_continues_after_bad_lines() {
        let mut codec = RequestCodec::new(8);
        let mut buf = BytesMut::from(&b"\xff\xfe\naaaaaaaaaaaa\n{}\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(RequestFrame::NotUtf8));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(RequestFrame::Oversized));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(RequestFrame::Line("{}".to_string()))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn trailing_line_without_newline_is_kept_at_eof() {
        let mut codec = RequestCodec::new(64);
        let mut buf = BytesMut::from(&b"{\"id\":1}"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(RequestFrame::Line("{\"id\":1}".to_string()))
        );
    }
}
