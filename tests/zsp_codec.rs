use bytes::{Bytes, BytesMut};
use subpub::network::{
    protocol::{parse_command, Command, Response},
    zsp::{ZSPDecoder, ZSPEncoder, ZSPFrame},
};
use subpub::StatsSnapshot;

fn decode_all(wire: &[u8]) -> Vec<ZSPFrame> {
    let mut decoder = ZSPDecoder::new();
    let mut buf = BytesMut::from(wire);
    let mut frames = Vec::new();
    while let Some(frame) = decoder.decode(&mut buf).unwrap() {
        frames.push(frame);
    }
    assert!(buf.is_empty(), "leftover bytes: {buf:?}");
    frames
}

/// Несколько команд в одном TCP-сегменте разбираются по очереди.
#[test]
fn test_pipelined_commands() {
    let commands = vec![
        Command::Ping,
        Command::Subscribe {
            subject: "x".into(),
        },
        Command::Publish {
            subject: "x".into(),
            payload: Bytes::from_static(b"a\r\nb"),
        },
        Command::Quit,
    ];

    let mut wire = BytesMut::new();
    for cmd in &commands {
        ZSPEncoder::encode_into(&cmd.to_frame(), &mut wire).unwrap();
    }

    let parsed: Vec<Command> = decode_all(&wire)
        .into_iter()
        .map(|f| parse_command(f).unwrap())
        .collect();
    assert_eq!(parsed, commands);
}

/// Фрейм, разрезанный в произвольном месте, собирается после дочитывания.
#[test]
fn test_publish_split_at_every_offset() {
    let cmd = Command::Publish {
        subject: "orders".into(),
        payload: Bytes::from_static(b"payload-with-bytes"),
    };
    let wire = ZSPEncoder::encode(&cmd.to_frame()).unwrap();

    for split in 1..wire.len() {
        let mut decoder = ZSPDecoder::new();
        let mut buf = BytesMut::from(&wire[..split]);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None, "split at {split}");
        assert_eq!(buf.len(), split, "partial input must not be consumed");

        buf.extend_from_slice(&wire[split..]);
        let frame = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(parse_command(frame).unwrap(), cmd);
    }
}

#[test]
fn test_push_message_wire_format() {
    let frame = Response::Message {
        subject: "x".into(),
        payload: Bytes::from_static(b"hello"),
    }
    .into_frame();
    let wire = ZSPEncoder::encode(&frame).unwrap();
    assert_eq!(wire, b"*3\r\n$7\r\nmessage\r\n$1\r\nx\r\n$5\r\nhello\r\n");
}

#[test]
fn test_stats_and_error_wire_format() {
    let snapshot = StatsSnapshot {
        published: 2,
        enqueued: 3,
        dropped: 1,
        delivered: 3,
    };
    let frames = decode_all(&ZSPEncoder::encode(&Response::Stats(snapshot).into_frame()).unwrap());
    let ZSPFrame::Array(Some(items)) = &frames[0] else {
        panic!("expected array, got {frames:?}");
    };
    assert_eq!(items.len(), 8);
    assert_eq!(items[0], ZSPFrame::bulk("published"));
    assert_eq!(items[5], ZSPFrame::Integer(1));

    let err = Response::Error("UNAVAILABLE bus is closed".into()).into_frame();
    assert_eq!(
        ZSPEncoder::encode(&err).unwrap(),
        b"-UNAVAILABLE bus is closed\r\n"
    );
}

#[test]
fn test_malformed_input_is_rejected() {
    let mut decoder = ZSPDecoder::new();
    let mut buf = BytesMut::from(&b"?oops\r\n"[..]);
    assert!(decoder.decode(&mut buf).is_err());

    let mut buf = BytesMut::from(&b":12x\r\n"[..]);
    assert!(decoder.decode(&mut buf).is_err());
}
