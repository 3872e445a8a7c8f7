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
use cci_odp::opendap::{DapNode, DataType};

// run with "cargo test test_sst_dds -- --nocapture"

const SST_DDS: &str = r#"Dataset {
    Float32 lat[lat = 3600];
    Float32 lon[lon = 7200];
    Grid {
     ARRAY:
        Int16 analysed_sst[time = 1][lat = 3600][lon = 7200];
     MAPS:
        Int32 time[time = 1];
        Float32 lat[lat = 3600];
        Float32 lon[lon = 7200];
    } analysed_sst;
    Grid {
     ARRAY:
        Byte mask[time = 1][lat = 3600][lon = 7200];
     MAPS:
        Int32 time[time = 1];
        Float32 lat[lat = 3600];
        Float32 lon[lon = 7200];
    } mask;
} esacci-sst.nc;"#;

#[test]
fn test_sst_dds () {
    let dataset = parse_dds(SST_DDS).unwrap();
    assert_eq!(dataset.name, "esacci-sst.nc");
    assert_eq!(dataset.keys().collect::<Vec<_>>(), vec!["lat", "lon", "analysed_sst", "mask"]);

    let lat = dataset.leaf("lat").unwrap();
    assert_eq!(lat.dtype, DataType::Float32);
    assert_eq!(lat.shape, vec![3600]);
    assert_eq!(lat.dims, vec!["lat"]);
    assert_eq!(lat.id, "lat");

    // a bare grid name resolves to the grid's data array
    let sst = dataset.leaf("analysed_sst").unwrap();
    assert_eq!(sst.dtype, DataType::Int16);
    assert_eq!(sst.shape, vec![1, 3600, 7200]);
    assert_eq!(sst.dims, vec!["time", "lat", "lon"]);
    assert_eq!(sst.id, "analysed_sst.analysed_sst");
    assert_eq!(sst.size(), 3600 * 7200);

    // dotted paths address grid components directly
    let time_map = dataset.leaf("analysed_sst.time").unwrap();
    assert_eq!(time_map.dtype, DataType::Int32);
    assert_eq!(time_map.id, "analysed_sst.time");

    let mask = dataset.leaf("mask").unwrap();
    assert_eq!(mask.dtype, DataType::UInt8); // DDS Byte

    match dataset.get("analysed_sst").unwrap() {
        DapNode::Grid(g) => {
            assert_eq!(g.maps.len(), 3);
            assert_eq!(g.id, "analysed_sst");
        }
        other => panic!("expected grid, got {other:?}")
    }
}

#[test]
fn test_scalar_and_anonymous_dims () {
    let dds = r#"Dataset {
    Int32 catalog_number;
    String station_name;
    Float64 samples[12];
} test.nc;"#;

    let dataset = parse_dds(dds).unwrap();

    let scalar = dataset.leaf("catalog_number").unwrap();
    assert!(scalar.shape.is_empty());
    assert_eq!(scalar.size(), 1);

    let name = dataset.leaf("station_name").unwrap();
    assert_eq!(name.dtype, DataType::ByteString);

    let samples = dataset.leaf("samples").unwrap();
    assert_eq!(samples.shape, vec![12]);
    assert_eq!(samples.dims, vec![""]); // anonymous dimension
}

#[test]
fn test_structure_and_sequence () {
    let dds = r#"Dataset {
    Structure {
        Float32 chlor_a[lat = 180][lon = 360];
        Float32 lat[lat = 180];
    } product;
    Sequence {
        Float64 obs_time;
        Float32 value;
    } track;
} nested.nc;"#;

    let dataset = parse_dds(dds).unwrap();

    let chlor = dataset.leaf("product.chlor_a").unwrap();
    assert_eq!(chlor.id, "product.chlor_a");
    assert_eq!(chlor.shape, vec![180, 360]);

    match dataset.get("track").unwrap() {
        DapNode::Sequence(s) => {
            assert_eq!(s.members.len(), 2);
            assert_eq!(s.members[0].name(), "obs_time");
        }
        other => panic!("expected sequence, got {other:?}")
    }
}

#[test]
fn test_malformed_dds () {
    assert!(parse_dds("").is_err());
    assert!(parse_dds("Dataset {").is_err());
    assert!(parse_dds("Dataset { Complex64 x[3]; } broken.nc;").is_err());
}
