use bytes::{BufMut, BytesMut};
use subpub_error::ZspError;

use super::{
    decoder::{MAX_ARRAY_DEPTH, MAX_ARRAY_LENGTH, MAX_BULK_LENGTH},
    types::ZSPFrame,
};

pub struct ZSPEncoder;

impl ZSPEncoder {
    pub fn encode(frame: &ZSPFrame) -> Result<Vec<u8>, ZspError> {
        let mut out = BytesMut::new();
        Self::encode_into(frame, &mut out)?;
        Ok(out.to_vec())
    }

    /// Дописывает фрейм в конец `out`. При ошибке `out` может содержать
    /// частично записанный фрейм.
    pub fn encode_into(
        frame: &ZSPFrame,
        out: &mut BytesMut,
    ) -> Result<(), ZspError> {
        Self::encode_frame(frame, out, 0)
    }

    fn encode_frame(
        frame: &ZSPFrame,
        out: &mut BytesMut,
        current_depth: usize,
    ) -> Result<(), ZspError> {
        if current_depth > MAX_ARRAY_DEPTH {
            return Err(ZspError::DepthExceeded {
                max: MAX_ARRAY_DEPTH,
            });
        }

        match frame {
            ZSPFrame::SimpleString(s) => {
                Self::validate_line(s, "Simple string")?;
                Self::put_line(out, b'+', s.as_bytes());
            }
            ZSPFrame::Error(s) => {
                Self::validate_line(s, "Error message")?;
                Self::put_line(out, b'-', s.as_bytes());
            }
            ZSPFrame::Integer(i) => Self::put_line(out, b':', i.to_string().as_bytes()),
            ZSPFrame::BulkString(Some(b)) => {
                if b.len() > MAX_BULK_LENGTH {
                    return Err(ZspError::BulkTooLong {
                        len: b.len(),
                        max: MAX_BULK_LENGTH,
                    });
                }
                Self::put_line(out, b'$', b.len().to_string().as_bytes());
                out.put_slice(b);
                out.put_slice(b"\r\n");
            }
            ZSPFrame::BulkString(None) => out.put_slice(b"$-1\r\n"),
            ZSPFrame::Array(Some(elements)) => {
                if elements.len() > MAX_ARRAY_LENGTH {
                    return Err(ZspError::ArrayTooLong {
                        len: elements.len(),
                        max: MAX_ARRAY_LENGTH,
                    });
                }
                Self::put_line(out, b'*', elements.len().to_string().as_bytes());
                for e in elements {
                    Self::encode_frame(e, out, current_depth + 1)?;
                }
            }
            ZSPFrame::Array(None) => out.put_slice(b"*-1\r\n"),
        }
        Ok(())
    }

    fn put_line(
        out: &mut BytesMut,
        tag: u8,
        body: &[u8],
    ) {
        out.reserve(body.len() + 3);
        out.put_u8(tag);
        out.put_slice(body);
        out.put_slice(b"\r\n");
    }

    fn validate_line(
        s: &str,
        what: &str,
    ) -> Result<(), ZspError> {
        if s.contains(['\r', '\n']) {
            Err(ZspError::InvalidData(format!(
                "{what} contains CR or LF characters"
            )))
        } else {
            Ok(())
        }
    }
}
