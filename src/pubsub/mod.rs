//! Внутрипроцессная шина publish/subscribe.
//!
//! - `bus`: регистрация подписок, публикация, закрытие с дренажом.
//! - `registry` (приватный): субъект → упорядоченный список подписчиков.
//! - `subscription`: handle подписки и её одноразовое состояние.
//! - `dispatcher` (приватный): задача, доставляющая сообщения из очереди.
//! - `handler`: трейт доставки и готовые варианты.
//! - `shutdown`: процессный сигнал остановки.
//! - `stats`: счётчики публикаций, доставок и потерь.

pub mod bus;
mod dispatcher;
pub mod handler;
mod registry;
pub mod shutdown;
pub mod stats;
pub mod subscription;

pub use bus::*;
pub use handler::*;
pub use shutdown::*;
pub use stats::*;
pub use subscription::{Subscription, SubscriptionId};
