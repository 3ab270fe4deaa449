pub mod bus;
pub mod client;
pub mod protocol;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use bus::*;
pub use client::*;
pub use protocol::*;
