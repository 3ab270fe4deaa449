pub mod connection;
pub mod core;

// Публичный экспорт всех типов из вложенных модулей, чтобы упростить доступ к
// ним из внешнего кода.
pub use self::core::*;

pub use connection::*;
