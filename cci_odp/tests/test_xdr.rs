/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![allow(unused)]

use cci_odp::opendap::dds::parse_dds;
use cci_odp::opendap::xdr::{unpack_dataset, DapArray};
use cci_odp::opendap::DataType;

// run with "cargo test test_unpack -- --nocapture"

fn push_u32 (buf: &mut Vec<u8>, v: u32) { buf.extend_from_slice(&v.to_be_bytes()); }
fn push_i32 (buf: &mut Vec<u8>, v: i32) { buf.extend_from_slice(&v.to_be_bytes()); }
fn push_f32 (buf: &mut Vec<u8>, v: f32) { buf.extend_from_slice(&v.to_be_bytes()); }
fn push_f64 (buf: &mut Vec<u8>, v: f64) { buf.extend_from_slice(&v.to_be_bytes()); }

#[test]
fn test_unpack_int16_array () {
    // a projected grid component comes back wrapped in a structure named like the grid
    let dds = r#"Dataset {
    Structure {
        Int16 analysed_sst[time = 1][lat = 2][lon = 3];
    } analysed_sst;
} esacci-sst.nc;"#;
    let dataset = parse_dds(dds).unwrap();

    let values: [i16; 6] = [27315, -5, 0, 100, -32768, 42];
    let mut wire = Vec::new();
    push_u32(&mut wire, 6);
    push_u32(&mut wire, 6);
    for v in values {
        push_i32(&mut wire, v as i32); // 16-bit integers travel as 32-bit
    }

    let arrays = unpack_dataset(&dataset, &wire).unwrap();
    let data = arrays.get("analysed_sst.analysed_sst").unwrap();
    assert_eq!(*data, DapArray::Int16(values.to_vec()));

    // widened to the canonical type of a fill-less int16 variable
    let le = data.coerce_to_le_bytes(DataType::Int32).unwrap();
    assert_eq!(le.len(), 6 * 4);
    assert_eq!(&le[0..4], &27315i32.to_le_bytes());
    assert_eq!(&le[16..20], &(-32768i32).to_le_bytes());

    // identity coercion keeps the element size
    let le16 = data.coerce_to_le_bytes(DataType::Int16).unwrap();
    assert_eq!(le16.len(), 6 * 2);
    assert_eq!(&le16[0..2], &27315i16.to_le_bytes());
}

#[test]
fn test_unpack_byte_padding () {
    let dds = r#"Dataset {
    Byte mask[mask = 5];
    Float32 lat[lat = 2];
} test.nc;"#;
    let dataset = parse_dds(dds).unwrap();

    let mut wire = Vec::new();
    push_u32(&mut wire, 5);
    push_u32(&mut wire, 5);
    wire.extend_from_slice(&[1, 2, 3, 4, 5]);
    wire.extend_from_slice(&[0, 0, 0]); // pad to 4-byte alignment
    push_u32(&mut wire, 2);
    push_u32(&mut wire, 2);
    push_f32(&mut wire, -89.975);
    push_f32(&mut wire, -89.925);

    let arrays = unpack_dataset(&dataset, &wire).unwrap();
    assert_eq!(arrays.get("mask"), Some(&DapArray::Bytes(vec![1, 2, 3, 4, 5])));

    match arrays.get("lat") {
        Some(DapArray::Float32(v)) => {
            assert_eq!(v.len(), 2);
            assert!((v[0] + 89.975).abs() < 1e-6);
        }
        other => panic!("expected float32 array, got {other:?}")
    }
}

#[test]
fn test_unpack_scalars_and_strings () {
    let dds = r#"Dataset {
    Int16 level;
    String station_name[station = 2];
} test.nc;"#;
    let dataset = parse_dds(dds).unwrap();

    let mut wire = Vec::new();
    push_i32(&mut wire, -7); // scalar Int16 still travels as 32-bit
    push_u32(&mut wire, 2); // string arrays carry a single count
    push_u32(&mut wire, 5);
    wire.extend_from_slice(b"alpha");
    wire.extend_from_slice(&[0, 0, 0]);
    push_u32(&mut wire, 4);
    wire.extend_from_slice(b"beta");

    let arrays = unpack_dataset(&dataset, &wire).unwrap();
    assert_eq!(arrays.get("level"), Some(&DapArray::Int16(vec![-7])));
    assert_eq!(arrays.get("station_name"),
               Some(&DapArray::Text(vec!["alpha".to_string(), "beta".to_string()])));
}

#[test]
fn test_unpack_sequence () {
    let dds = r#"Dataset {
    Sequence {
        Float64 obs_time;
        Int32 value;
    } track;
} test.nc;"#;
    let dataset = parse_dds(dds).unwrap();

    let mut wire = Vec::new();
    push_u32(&mut wire, 0x5A000000);
    push_f64(&mut wire, 1234.5);
    push_i32(&mut wire, 17);
    push_u32(&mut wire, 0x5A000000);
    push_f64(&mut wire, 1235.5);
    push_i32(&mut wire, -1);
    push_u32(&mut wire, 0xA5000000);

    let arrays = unpack_dataset(&dataset, &wire).unwrap();
    assert_eq!(arrays.get("track.obs_time"), Some(&DapArray::Float64(vec![1234.5, 1235.5])));
    assert_eq!(arrays.get("track.value"), Some(&DapArray::Int32(vec![17, -1])));
}

#[test]
fn test_unpack_errors () {
    let dds = r#"Dataset {
    Float64 samples[n = 4];
} test.nc;"#;
    let dataset = parse_dds(dds).unwrap();

    // truncated payload
    let mut wire = Vec::new();
    push_u32(&mut wire, 4);
    push_u32(&mut wire, 4);
    push_f64(&mut wire, 1.0);
    assert!(unpack_dataset(&dataset, &wire).is_err());

    // count mismatch
    let mut wire = Vec::new();
    push_u32(&mut wire, 4);
    push_u32(&mut wire, 3);
    assert!(unpack_dataset(&dataset, &wire).is_err());

    // more elements than declared
    let mut wire = Vec::new();
    push_u32(&mut wire, 9);
    push_u32(&mut wire, 9);
    for i in 0..9 { push_f64(&mut wire, i as f64); }
    assert!(unpack_dataset(&dataset, &wire).is_err());
}

#[test]
fn test_f64_view () {
    let data = DapArray::UInt16(vec![0, 1, 65535]);
    assert_eq!(data.to_f64_vec(), Some(vec![0.0, 1.0, 65535.0]));
    assert_eq!(data.len(), 3);

    let text = DapArray::Text(vec!["x".to_string()]);
    assert!(text.to_f64_vec().is_none());
}
