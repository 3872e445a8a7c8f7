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

use cci_odp::opendap::das::parse_das;
use cci_odp::opendap::dds::parse_dds;
use cci_odp::opendap::{AttrValue, DataType};
use cci_odp::schema::{time_axis_name, variable_infos_from_dataset};

// run with "cargo test test_variable_infos -- --nocapture"

const PROBE_DDS: &str = r#"Dataset {
    Float32 lat[lat = 180];
    Grid {
     ARRAY:
        Int16 analysed_sst[time = 1][lat = 180][lon = 360];
     MAPS:
        Int32 time[time = 1];
        Float32 lat[lat = 180];
        Float32 lon[lon = 360];
    } analysed_sst;
    Grid {
     ARRAY:
        Float32 kd_490[time = 1][lat = 180][lon = 360];
     MAPS:
        Int32 time[time = 1];
        Float32 lat[lat = 180];
        Float32 lon[lon = 360];
    } kd_490;
} probe.nc;"#;

const PROBE_DAS: &str = r#"Attributes {
    analysed_sst {
        String units "kelvin";
        Int16 _FillValue -32768;
        Int32 _ChunkSizes 1, 1000, 1000;
    }
    kd_490 {
        String units "m-1";
        Int32 _ChunkSizes 4, 90, 90;
    }
    lat {
        String units "degrees_north";
    }
    NC_GLOBAL {
        String title "probe file";
    }
}"#;

fn probed_dataset ()->cci_odp::opendap::DapDataset {
    let mut dataset = parse_dds(PROBE_DDS).unwrap();
    for (name, attrs) in parse_das(PROBE_DAS).unwrap() {
        if let Some(node) = dataset.get_mut(&name) {
            *node.attributes_mut() = attrs;
        } else {
            dataset.attributes.insert(name, attrs);
        }
    }
    dataset
}

#[test]
fn test_variable_infos () {
    let dataset = probed_dataset();
    let (infos, attributes) = variable_infos_from_dataset(&dataset);

    assert_eq!(infos.len(), 3);
    assert!(attributes.contains_key("NC_GLOBAL"));

    // an explicit fill value keeps the wire dtype and is renamed
    let sst = infos.get("analysed_sst").unwrap();
    assert_eq!(sst.orig_data_type, DataType::Int16);
    assert_eq!(sst.data_type, DataType::Int16);
    assert_eq!(sst.fill_value, Some(AttrValue::Int(-32768)));
    assert!(sst.attributes.get("_FillValue").is_none());
    assert_eq!(sst.shape, vec![1, 180, 360]);
    assert_eq!(sst.dimensions, vec!["time", "lat", "lon"]);

    // declared chunk sizes are clamped elementwise to the shape
    assert_eq!(sst.chunk_sizes, vec![1, 180, 360]);
    assert_eq!(sst.file_chunk_sizes, sst.chunk_sizes);
    assert!(sst.attributes.get("_ChunkSizes").is_none());

    let kd = infos.get("kd_490").unwrap();
    assert_eq!(kd.chunk_sizes, vec![1, 90, 90]); // 4 clamped to the time size

    // floats promote to themselves and synthesize a NaN fill
    assert_eq!(kd.orig_data_type, DataType::Float32);
    assert_eq!(kd.data_type, DataType::Float32);
    match &kd.fill_value {
        Some(AttrValue::Float(v)) => assert!(v.is_nan()),
        other => panic!("expected NaN fill, got {other:?}")
    }

    // plain coordinate variable, chunked as a whole
    let lat = infos.get("lat").unwrap();
    assert_eq!(lat.shape, vec![180]);
    assert_eq!(lat.chunk_sizes, vec![180]);
}

#[test]
fn test_promotion_table () {
    assert_eq!(DataType::Int8.promoted(), Some(DataType::Int16));
    assert_eq!(DataType::Int16.promoted(), Some(DataType::Int32));
    assert_eq!(DataType::Int32.promoted(), Some(DataType::Int64));
    assert_eq!(DataType::UInt8.promoted(), Some(DataType::UInt16));
    assert_eq!(DataType::UInt16.promoted(), Some(DataType::UInt32));
    assert_eq!(DataType::UInt32.promoted(), Some(DataType::UInt64));
    assert_eq!(DataType::Float32.promoted(), Some(DataType::Float32));
    assert_eq!(DataType::Float64.promoted(), Some(DataType::Float64));
    assert_eq!(DataType::ByteString.promoted(), None);

    // synthesized fills: integer max, NaN for floats
    assert_eq!(DataType::Int16.default_fill(), Some(AttrValue::Int(i16::MAX as i64)));
    assert_eq!(DataType::UInt64.default_fill(), Some(AttrValue::UInt(u64::MAX)));
    match DataType::Float32.default_fill() {
        Some(AttrValue::Float(v)) => assert!(v.is_nan()),
        other => panic!("expected NaN, got {other:?}")
    }

    assert_eq!(DataType::Int16.name(), "int16");
    assert_eq!(DataType::ByteString.name(), "bytes1024");
    assert_eq!(DataType::from_dds_keyword("Byte"), Some(DataType::UInt8));
    assert_eq!(DataType::from_dds_keyword("Float64"), Some(DataType::Float64));
    assert_eq!(DataType::from_dds_keyword("Complex64"), None);
}

#[test]
fn test_time_axis_rules () {
    assert_eq!(time_axis_name("esacci.SST.day.L4.SSTdepth.multi-sensor.multi-platform.OSTIA.1-1.r1"), "time");
    assert_eq!(time_axis_name("esacci.AEROSOL.climatology.L3.AAI.multi-sensor.multi-platform.MSAAI.1-7.r1"), "month");
}
