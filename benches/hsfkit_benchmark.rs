// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::Endian;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hsfkit::compression::{compress, decompress, CompressionType};
use hsfkit::hsf::{Component, ComponentSection, ObjectRecord, RecordSection, Section};
use hsfkit::{decode_container, encode_container, SectionGraph};

const SIZE: usize = 256 * 1024;

fn sample_data() -> Vec<u8> {
    (0..SIZE).map(|i| ((i / 64) ^ (i % 7)) as u8).collect()
}

fn rle_stream() -> (Vec<u8>, usize) {
    let runs = SIZE / 127;
    let stream = (0..runs).flat_map(|i| [0x7F, i as u8]).collect();
    (stream, runs * 127)
}

fn lz77_stream() -> (Vec<u8>, usize) {
    let blocks = SIZE / 144;
    let mut stream = vec![0xFF, 1, 2, 3, 4, 5, 6, 7, 8];
    for _ in 0..blocks {
        stream.push(0x00);
        for _ in 0..8 {
            // 18 bytes, 8 back
            stream.extend_from_slice(&[0xF0, 0x07]);
        }
    }
    (stream, 8 + blocks * 144)
}

fn sample_graph() -> SectionGraph {
    let mut graph = SectionGraph::new(Endian::Big);
    let objects = (0..256)
        .map(|i| ObjectRecord {
            name: format!("object_{}", i % 32).into(),
            parent: i - 1,
            position: i,
            ..Default::default()
        })
        .collect();
    graph.push(Section::Object(RecordSection::new(objects)));

    let components = (0..256)
        .map(|i| Component::new(format!("object_{}", i % 32), vec![[i as f32, 0.0, 1.0]; 64]))
        .collect();
    graph.push(Section::Position(ComponentSection::new(components)));
    graph
}

fn criterion_benchmark(c: &mut Criterion) {
    let data = sample_data();
    let deflated = compress(CompressionType::Inflate, &data).unwrap();
    c.bench_function("zlib deflate", |b| {
        b.iter(|| compress(CompressionType::Inflate, black_box(&data)))
    });
    c.bench_function("zlib inflate", |b| {
        b.iter(|| decompress(CompressionType::Inflate, black_box(&deflated), SIZE))
    });

    let (rle, rle_size) = rle_stream();
    c.bench_function("rle decode", |b| {
        b.iter(|| decompress(CompressionType::Rle, black_box(&rle), rle_size))
    });

    let (lz77, lz77_size) = lz77_stream();
    c.bench_function("lz77 decode", |b| {
        b.iter(|| decompress(CompressionType::Lz77, black_box(&lz77), lz77_size))
    });

    let graph = sample_graph();
    let encoded = encode_container(&graph).unwrap();
    c.bench_function("hsf encode", |b| b.iter(|| encode_container(black_box(&graph))));
    c.bench_function("hsf decode", |b| b.iter(|| decode_container(black_box(&encoded))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
