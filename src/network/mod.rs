//! Сетевой фронтенд шины.
//!
//! ## Подмодули
//!
//! - `banner`: баннер при старте сервера.
//! - `server`: приём TCP-соединений.
//! - `connection`: обработка соединения и лимиты.
//! - `protocol`: команды клиента и ответы сервера.
//! - `zsp`: фрейминг протокола ZSP.

pub mod banner;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod zsp;

pub use connection::{ConnectionConfig, ConnectionManager};
pub use protocol::{Command, Response};
pub use server::Server;
pub use zsp::*;
