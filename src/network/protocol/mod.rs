//! Команды клиента и ответы сервера поверх фреймов ZSP.

pub mod command;
pub mod parser;

pub use command::{Command, Response};
pub use parser::parse_command;
