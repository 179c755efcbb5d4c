// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::Endian;
use hsfkit::common::Platform;
use hsfkit::compression::CompressionType;
use hsfkit::hsf::{
    decode_batch, Component, ComponentSection, Fog, FogSection, MaterialRecord, ObjectRecord,
    RecordSection, Section, SectionKind,
};
use hsfkit::options::DecodeOptions;
use hsfkit::pac::{Pac, PacEntry};
use hsfkit::{decode_container, encode_container, Error, ReadableFile, SectionGraph, WritableFile};

fn model(endian: Endian) -> SectionGraph {
    let mut graph = SectionGraph::new(endian);
    graph.version = 1;
    graph.push(Section::Object(RecordSection::new(vec![ObjectRecord {
        name: "body".into(),
        parent: -1,
        position: 0,
        material: 0,
        ..Default::default()
    }])));
    graph.push(Section::Material(RecordSection::new(vec![MaterialRecord {
        name: "skin".into(),
        color: [1.0, 0.8, 0.6],
        ..Default::default()
    }])));
    graph.push(Section::Position(ComponentSection::new(vec![Component::new(
        "body",
        vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]],
    )])));
    graph.push(Section::Fog(FogSection { fog: None }));
    graph
}

#[test]
fn model_inside_archive() {
    let graph = model(Endian::Little);
    let archive = Pac {
        entries: vec![PacEntry {
            name: "body.hsf".into(),
            compression: CompressionType::Inflate,
            data: graph.write_to_buffer(Platform::Switch).unwrap(),
        }],
    };

    let bytes = archive.write_to_buffer(Platform::Switch).unwrap();
    let archive = Pac::from_existing(Platform::Switch, &bytes).unwrap();
    let entry = archive.find("body.hsf").unwrap();

    let decoded = SectionGraph::from_existing(Platform::Switch, &entry.data).unwrap();
    assert_eq!(decoded, graph);
    assert_eq!(decoded.object_name(0), Some("body"));
    assert_eq!(decoded.positions(0).unwrap()[1], [3.0, 4.0, 5.0]);
    assert_eq!(decoded.find(SectionKind::Fog).unwrap().count(), 0);
}

#[test]
fn reencoding_is_stable() {
    let first = encode_container(&model(Endian::Big)).unwrap();
    let second = encode_container(&decode_container(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn edited_model() {
    let bytes = encode_container(&model(Endian::Big)).unwrap();
    let mut graph = decode_container(&bytes).unwrap();

    for section in graph.sections_mut() {
        if let Section::Fog(fog) = section {
            fog.fog = Some(Fog {
                start: 1.0,
                end: 2.0,
                color: [0, 0, 0, 255],
                enabled: 1,
            });
        }
    }

    let decoded = decode_container(&encode_container(&graph).unwrap()).unwrap();
    let fog = decoded
        .find(SectionKind::Fog)
        .and_then(Section::as_fog)
        .and_then(|section| section.fog.clone());
    assert_eq!(fog.map(|fog| fog.end), Some(2.0));
}

#[test]
fn batch_decode() {
    let good = encode_container(&model(Endian::Big)).unwrap();
    let results = decode_batch(
        [("a.hsf", good.as_slice()), ("b.hsf", b"HSFV".as_slice())],
        &DecodeOptions::default(),
    );

    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(Error::TruncatedInput { .. })));
}
