use bytes::Bytes;

use crate::{network::zsp::ZSPFrame, pubsub::StatsSnapshot};

/// Команда клиента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Publish { subject: String, payload: Bytes },
    Subscribe { subject: String },
    Unsubscribe,
    Stats,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Publish { .. } => "PUBLISH",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Stats => "STATS",
            Self::Quit => "QUIT",
        }
    }

    /// Представление команды на проводе: массив bulk-строк.
    pub fn to_frame(&self) -> ZSPFrame {
        let mut parts = vec![ZSPFrame::bulk(self.name())];
        match self {
            Self::Publish { subject, payload } => {
                parts.push(ZSPFrame::bulk(subject.as_bytes()));
                parts.push(ZSPFrame::bulk(payload.to_vec()));
            }
            Self::Subscribe { subject } => parts.push(ZSPFrame::bulk(subject.as_bytes())),
            _ => {}
        }
        ZSPFrame::Array(Some(parts))
    }
}

/// Ответ сервера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Pong,
    Ok,
    /// Готовая строка ошибки без `-` (`"UNAVAILABLE bus is closed"`).
    Error(String),
    Stats(StatsSnapshot),
    /// Push-сообщение подписчику.
    Message { subject: String, payload: Bytes },
}

impl Response {
    pub fn into_frame(self) -> ZSPFrame {
        match self {
            Self::Pong => ZSPFrame::simple("PONG"),
            Self::Ok => ZSPFrame::simple("OK"),
            Self::Error(msg) => ZSPFrame::Error(msg),
            Self::Stats(snapshot) => {
                let items = snapshot
                    .fields()
                    .into_iter()
                    .flat_map(|(name, value)| {
                        [
                            ZSPFrame::bulk(name),
                            ZSPFrame::Integer(value.min(i64::MAX as u64) as i64),
                        ]
                    })
                    .collect();
                ZSPFrame::Array(Some(items))
            }
            Self::Message { subject, payload } => ZSPFrame::Array(Some(vec![
                ZSPFrame::bulk("message"),
                ZSPFrame::bulk(subject.into_bytes()),
                ZSPFrame::bulk(payload.to_vec()),
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_to_frame() {
        let cmd = Command::Publish {
            subject: "x".into(),
            payload: Bytes::from_static(b"hi"),
        };
        assert_eq!(
            cmd.to_frame(),
            ZSPFrame::Array(Some(vec![
                ZSPFrame::bulk("PUBLISH"),
                ZSPFrame::bulk("x"),
                ZSPFrame::bulk("hi"),
            ]))
        );
        assert_eq!(
            Command::Quit.to_frame(),
            ZSPFrame::Array(Some(vec![ZSPFrame::bulk("QUIT")]))
        );
    }

    #[test]
    fn test_stats_response_layout() {
        let snapshot = StatsSnapshot {
            published: 3,
            enqueued: 2,
            dropped: 1,
            delivered: 2,
        };
        let ZSPFrame::Array(Some(items)) = Response::Stats(snapshot).into_frame() else {
            panic!("stats must be an array");
        };
        assert_eq!(items.len(), 8);
        assert_eq!(items[0], ZSPFrame::bulk("published"));
        assert_eq!(items[1], ZSPFrame::Integer(3));
        assert_eq!(items[5], ZSPFrame::Integer(1));
    }

    #[test]
    fn test_simple_responses() {
        assert_eq!(Response::Pong.into_frame(), ZSPFrame::simple("PONG"));
        assert_eq!(
            Response::Error("ERR nope".into()).into_frame(),
            ZSPFrame::error("ERR nope")
        );
    }
}
