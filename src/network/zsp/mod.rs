//! Протокол ZSP: строковый фрейминг поверх TCP.
//!
//! - `types`: фреймы `+`, `-`, `:`, `$`, `*`.
//! - `decoder`: потоковый декодер поверх `BytesMut`.
//! - `encoder`: сериализация фреймов.

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::{ZSPDecoder, MAX_ARRAY_DEPTH, MAX_ARRAY_LENGTH, MAX_BULK_LENGTH, MAX_LINE_LENGTH};
pub use encoder::ZSPEncoder;
pub use types::ZSPFrame;
