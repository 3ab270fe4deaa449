use bytes::Bytes;
use subpub_error::ParseError;

use super::Command;
use crate::network::zsp::ZSPFrame;

/// Разбирает фрейм клиента в [`Command`].
///
/// Ожидается массив строк: имя команды (без учёта регистра) и аргументы.
pub fn parse_command(frame: ZSPFrame) -> Result<Command, ParseError> {
    let ZSPFrame::Array(Some(items)) = frame else {
        return Err(ParseError::ExpectedArray);
    };
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(first) => into_bytes(first).ok_or(ParseError::CommandMustBeString)?,
        None => return Err(ParseError::EmptyCommand),
    };
    let name = String::from_utf8(name)
        .map_err(|_| ParseError::CommandMustBeString)?
        .to_ascii_uppercase();

    let args = items
        .map(|frame| into_bytes(frame).ok_or(ParseError::InvalidUtf8))
        .collect::<Result<Vec<_>, _>>()?;

    match name.as_str() {
        "PING" => {
            expect_args("PING", &args, 0)?;
            Ok(Command::Ping)
        }
        "PUBLISH" => {
            expect_args("PUBLISH", &args, 2)?;
            let mut args = args.into_iter();
            let subject = subject(args.next())?;
            let payload = Bytes::from(args.next().unwrap_or_default());
            Ok(Command::Publish { subject, payload })
        }
        "SUBSCRIBE" => {
            expect_args("SUBSCRIBE", &args, 1)?;
            let subject = subject(args.into_iter().next())?;
            Ok(Command::Subscribe { subject })
        }
        // Соединение держит одну подписку; имя субъекта, если передано,
        // игнорируется.
        "UNSUBSCRIBE" if args.len() <= 1 => Ok(Command::Unsubscribe),
        "UNSUBSCRIBE" => Err(ParseError::WrongArgCount("UNSUBSCRIBE", 0)),
        "STATS" => {
            expect_args("STATS", &args, 0)?;
            Ok(Command::Stats)
        }
        "QUIT" => {
            expect_args("QUIT", &args, 0)?;
            Ok(Command::Quit)
        }
        _ => Err(ParseError::UnknownCommand(name)),
    }
}

fn into_bytes(frame: ZSPFrame) -> Option<Vec<u8>> {
    match frame {
        ZSPFrame::BulkString(Some(b)) => Some(b),
        ZSPFrame::SimpleString(s) => Some(s.into_bytes()),
        _ => None,
    }
}

fn expect_args(
    name: &'static str,
    args: &[Vec<u8>],
    expected: usize,
) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongArgCount(name, expected))
    }
}

fn subject(arg: Option<Vec<u8>>) -> Result<String, ParseError> {
    let subject = String::from_utf8(arg.unwrap_or_default()).map_err(|_| ParseError::InvalidUtf8)?;
    if subject.is_empty() {
        return Err(ParseError::EmptySubject);
    }
    Ok(subject)
}
