use bytes::{Buf, BytesMut};
use subpub_error::ZspError;

use super::types::ZSPFrame;

// --- Константы для безопасности ---
pub const MAX_LINE_LENGTH: usize = 64 * 1024; // 64 KB
pub const MAX_BULK_LENGTH: usize = 64 * 1024 * 1024; // 64 MB
pub const MAX_ARRAY_DEPTH: usize = 32; // Максимальная вложенность массивов
/// Максимум элементов в одном массиве. Незавершённый фрейм разбирается заново
/// при каждом чтении, поэтому длина массива ограничена жёстко.
pub const MAX_ARRAY_LENGTH: usize = 1024;

/// Потоковый декодер фреймов ZSP.
///
/// `decode` либо извлекает из буфера один целый фрейм, либо возвращает
/// `Ok(None)` и оставляет буфер нетронутым до прихода остальных байт.
#[derive(Debug, Default)]
pub struct ZSPDecoder;

type DecodeResult<T> = Result<Option<T>, ZspError>;

impl ZSPDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(
        &mut self,
        buf: &mut BytesMut,
    ) -> DecodeResult<ZSPFrame> {
        let mut pos = 0;
        match parse_frame(buf, &mut pos, 0)? {
            Some(frame) => {
                buf.advance(pos);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

fn parse_frame(
    buf: &[u8],
    pos: &mut usize,
    depth: usize,
) -> DecodeResult<ZSPFrame> {
    let Some(&tag) = buf.get(*pos) else {
        return Ok(None);
    };
    let start = *pos;
    *pos += 1;

    match tag {
        b'+' => match read_line(buf, pos)? {
            Some(line) => Ok(Some(ZSPFrame::SimpleString(utf8(line, start)?))),
            None => Ok(None),
        },
        b'-' => match read_line(buf, pos)? {
            Some(line) => Ok(Some(ZSPFrame::Error(utf8(line, start)?))),
            None => Ok(None),
        },
        b':' => match read_line(buf, pos)? {
            Some(line) => Ok(Some(ZSPFrame::Integer(integer(line, start)?))),
            None => Ok(None),
        },
        b'$' => parse_bulk(buf, pos, start),
        b'*' => parse_array(buf, pos, start, depth),
        byte => Err(ZspError::UnknownType {
            byte,
            position: start as u64,
        }),
    }
}

fn parse_bulk(
    buf: &[u8],
    pos: &mut usize,
    start: usize,
) -> DecodeResult<ZSPFrame> {
    let Some(line) = read_line(buf, pos)? else {
        return Ok(None);
    };
    let len = match integer(line, start)? {
        -1 => return Ok(Some(ZSPFrame::BulkString(None))),
        n if n < 0 => {
            return Err(ZspError::InvalidData(format!(
                "Negative bulk length at byte {start}"
            )))
        }
        n => n as usize,
    };
    if len > MAX_BULK_LENGTH {
        return Err(ZspError::BulkTooLong {
            len,
            max: MAX_BULK_LENGTH,
        });
    }

    let end = *pos + len;
    if buf.len() < end + 2 {
        return Ok(None);
    }
    if &buf[end..end + 2] != b"\r\n" {
        return Err(ZspError::InvalidData(format!(
            "Expected CRLF after bulk string at byte {end}"
        )));
    }
    let data = buf[*pos..end].to_vec();
    *pos = end + 2;
    Ok(Some(ZSPFrame::BulkString(Some(data))))
}

fn parse_array(
    buf: &[u8],
    pos: &mut usize,
    start: usize,
    depth: usize,
) -> DecodeResult<ZSPFrame> {
    if depth >= MAX_ARRAY_DEPTH {
        return Err(ZspError::DepthExceeded {
            max: MAX_ARRAY_DEPTH,
        });
    }
    let Some(line) = read_line(buf, pos)? else {
        return Ok(None);
    };
    let len = match integer(line, start)? {
        -1 => return Ok(Some(ZSPFrame::Array(None))),
        n if n < 0 => {
            return Err(ZspError::InvalidData(format!(
                "Negative array length at byte {start}"
            )))
        }
        n => n as usize,
    };
    if len > MAX_ARRAY_LENGTH {
        return Err(ZspError::ArrayTooLong {
            len,
            max: MAX_ARRAY_LENGTH,
        });
    }

    let mut items = Vec::with_capacity(len.min(64));
    for _ in 0..len {
        match parse_frame(buf, pos, depth + 1)? {
            Some(frame) => items.push(frame),
            None => return Ok(None),
        }
    }
    Ok(Some(ZSPFrame::Array(Some(items))))
}

/// Читает строку до CRLF, начиная с `pos`. Не сдвигает `pos`, если CRLF
/// ещё не пришёл.
fn read_line<'a>(
    buf: &'a [u8],
    pos: &mut usize,
) -> DecodeResult<&'a [u8]> {
    let rest = &buf[*pos..];
    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(n) if n > MAX_LINE_LENGTH => Err(ZspError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }),
        Some(n) => {
            *pos += n + 2;
            Ok(Some(&rest[..n]))
        }
        None if rest.len() > MAX_LINE_LENGTH => Err(ZspError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }),
        None => Ok(None),
    }
}

fn utf8(
    line: &[u8],
    start: usize,
) -> Result<String, ZspError> {
    std::str::from_utf8(line)
        .map(str::to_owned)
        .map_err(|_| ZspError::InvalidUtf8 {
            position: start as u64,
        })
}

fn integer(
    line: &[u8],
    start: usize,
) -> Result<i64, ZspError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ZspError::InvalidInteger {
            position: start as u64,
        })
}
