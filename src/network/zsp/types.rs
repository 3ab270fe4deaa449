/// Представляет базовые типы протокола ZSP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZSPFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<ZSPFrame>>),
}

impl ZSPFrame {
    pub fn simple(s: impl Into<String>) -> Self {
        Self::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    pub fn bulk(b: impl Into<Vec<u8>>) -> Self {
        Self::BulkString(Some(b.into()))
    }

    /// Содержимое строкового фрейма (simple или bulk).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::SimpleString(s) => Some(s.as_bytes()),
            Self::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }
}
