use std::hint::black_box;

use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion};
use subpub::{
    network::protocol::{parse_command, Command},
    zsp::{ZSPDecoder, ZSPEncoder},
};

fn publish_frame(payload_len: usize) -> Vec<u8> {
    let command = Command::Publish {
        subject: "orders.created".into(),
        payload: vec![b'x'; payload_len].into(),
    };
    ZSPEncoder::encode(&command.to_frame()).unwrap()
}

fn bench_decode_publish(c: &mut Criterion) {
    let wire = publish_frame(256);
    c.bench_function("decode_publish_256b", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            let frame = ZSPDecoder::new().decode(&mut buf).unwrap().unwrap();
            black_box(parse_command(frame).unwrap())
        })
    });
}

/// Фрейм приходит по одному байту: худший случай для перезапускаемого
/// декодера.
fn bench_decode_byte_by_byte(c: &mut Criterion) {
    let wire = publish_frame(64);
    c.bench_function("decode_publish_byte_by_byte", |b| {
        b.iter(|| {
            let mut decoder = ZSPDecoder::new();
            let mut buf = BytesMut::new();
            for byte in &wire {
                buf.extend_from_slice(std::slice::from_ref(byte));
                if let Some(frame) = decoder.decode(&mut buf).unwrap() {
                    return black_box(frame);
                }
            }
            unreachable!()
        })
    });
}

fn bench_encode_publish(c: &mut Criterion) {
    let command = Command::Publish {
        subject: "orders.created".into(),
        payload: vec![b'x'; 256].into(),
    };
    let frame = command.to_frame();
    c.bench_function("encode_publish_256b", |b| {
        b.iter(|| black_box(ZSPEncoder::encode(black_box(&frame)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_decode_publish,
    bench_decode_byte_by_byte,
    bench_encode_publish,
);
criterion_main!(benches);
