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
use cci_odp::opendap::AttrValue;

// run with "cargo test test_sst_das -- --nocapture"

const SST_DAS: &str = r#"Attributes {
    analysed_sst {
        String units "kelvin";
        String long_name "analysed sea surface temperature";
        Int16 _FillValue -32768;
        Float32 scale_factor 0.01;
        Float32 valid_range -300, 4500;
        Int32 _ChunkSizes 1, 1196, 2393;
        String comment "value with \"escaped\" quotes";
    }
    NC_GLOBAL {
        String title "ESA SST CCI analysis";
        Float32 geospatial_lat_resolution 0.05;
        Int32 number_of_processed_orbits 14;
    }
    DODS_EXTRA {
        String Unlimited_Dimension "time";
    }
}"#;

#[test]
fn test_sst_das () {
    let containers = parse_das(SST_DAS).unwrap();
    assert_eq!(containers.len(), 3);
    assert_eq!(containers[0].0, "analysed_sst");
    assert_eq!(containers[1].0, "NC_GLOBAL");

    let sst = &containers[0].1;
    assert_eq!(sst.get("units"), Some(&AttrValue::Str("kelvin".to_string())));
    assert_eq!(sst.get("_FillValue"), Some(&AttrValue::Int(-32768)));
    assert_eq!(sst.get("scale_factor"), Some(&AttrValue::Float(0.01)));
    assert_eq!(sst.get("comment"), Some(&AttrValue::Str("value with \"escaped\" quotes".to_string())));

    match sst.get("valid_range") {
        Some(AttrValue::List(values)) => {
            assert_eq!(values.len(), 2);
            assert_eq!(values[0], AttrValue::Float(-300.0));
        }
        other => panic!("expected list, got {other:?}")
    }

    let chunk_sizes = sst.get("_ChunkSizes").unwrap();
    assert_eq!(chunk_sizes.as_usize_list(), Some(vec![1, 1196, 2393]));

    let nc_global = &containers[1].1;
    assert_eq!(nc_global.get("geospatial_lat_resolution").and_then( |v| v.as_f64()), Some(0.05));
    assert_eq!(nc_global.get("number_of_processed_orbits"), Some(&AttrValue::Int(14)));
}

#[test]
fn test_nested_container () {
    let das = r#"Attributes {
    layers {
        String units "1";
        DODS {
            Int32 strlen 0;
        }
        Int32 _ChunkSizes 16;
    }
}"#;

    let containers = parse_das(das).unwrap();
    let layers = &containers[0].1;

    match layers.get("DODS") {
        Some(AttrValue::Map(nested)) => {
            assert_eq!(nested.get("strlen"), Some(&AttrValue::Int(0)));
        }
        other => panic!("expected nested container, got {other:?}")
    }
    assert_eq!(layers.get("_ChunkSizes").and_then( |v| v.as_usize_list()), Some(vec![16]));
}

#[test]
fn test_non_finite_values () {
    // DAS texts may carry NaN and infinities, the parser keeps them as floats
    let das = r#"Attributes {
    kd_490 {
        Float32 _FillValue NaN;
        Float32 display_min -Infinity;
    }
}"#;

    let containers = parse_das(das).unwrap();
    let attrs = &containers[0].1;

    match attrs.get("_FillValue") {
        Some(AttrValue::Float(v)) => assert!(v.is_nan()),
        other => panic!("expected NaN fill value, got {other:?}")
    }
    match attrs.get("display_min") {
        Some(AttrValue::Float(v)) => assert!(v.is_infinite() && *v < 0.0),
        other => panic!("expected -Infinity, got {other:?}")
    }
}

#[test]
fn test_malformed_das () {
    assert!(parse_das("nonsense").is_err());
    assert!(parse_das("Attributes { var { String name \"unterminated ").is_err());
}
