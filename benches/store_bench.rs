//! Benchmarks for dispatchkv store and codec operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dispatchkv::protocol::{decode, encode_command, Command, FrameBuffer};
use dispatchkv::KvStore;

fn store_benchmarks(c: &mut Criterion) {
    let store = KvStore::new();
    for i in 0..10_000 {
        store.set(format!("key_{}", i), format!("value_{}", i)).unwrap();
    }

    c.bench_function("store_set_overwrite", |b| {
        b.iter(|| store.set(black_box("key_42"), black_box("new_value")).unwrap())
    });

    c.bench_function("store_get_hit", |b| {
        b.iter(|| store.get(black_box("key_4242")))
    });

    c.bench_function("store_get_miss", |b| {
        b.iter(|| store.get(black_box("absent")))
    });
}

fn codec_benchmarks(c: &mut Criterion) {
    let set = encode_command(&Command::set("some_key", vec![b'x'; 256]));
    let get = encode_command(&Command::get("some_key"));

    c.bench_function("decode_set", |b| b.iter(|| decode(black_box(&set)).unwrap()));
    c.bench_function("decode_get", |b| b.iter(|| decode(black_box(&get)).unwrap()));

    let mut stream = Vec::new();
    for _ in 0..64 {
        stream.extend_from_slice(&set);
        stream.extend_from_slice(&get);
    }

    c.bench_function("frame_buffer_split_128_frames", |b| {
        b.iter(|| {
            let mut buffer = FrameBuffer::new(1024 * 1024);
            buffer.extend(black_box(&stream));
            let mut count = 0;
            while buffer.next_frame().is_some() {
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, store_benchmarks, codec_benchmarks);
criterion_main!(benches);
