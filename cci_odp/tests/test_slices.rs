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

use cci_odp::opendap::client::parse_ce;
use cci_odp::opendap::{combine_slices, fix_slice, full_slice, hyperslab, slice_count, DimSlice, SliceSpec};

// run with "cargo test test_hyperslab -- --nocapture"

#[test]
fn test_fix_slice () {
    let shape = [1, 180, 360];

    // missing trailing specs become full slices
    let slices = fix_slice(&[SliceSpec::All], &shape);
    assert_eq!(slices, full_slice(&shape));
    assert_eq!(slice_count(&slices), 180 * 360);

    // bounds are clamped to the dimension size
    let slices = fix_slice(&[SliceSpec::All, SliceSpec::Range(0, 179), SliceSpec::Range(350, 999)], &shape);
    assert_eq!(slices[1], DimSlice{ start: 0, stride: 1, stop: 179 });
    assert_eq!(slices[2], DimSlice{ start: 350, stride: 1, stop: 360 });
    assert_eq!(slice_count(&slices), 1 * 179 * 10);

    let slices = fix_slice(&[SliceSpec::Index(0)], &[4]);
    assert_eq!(slices[0], DimSlice{ start: 0, stride: 1, stop: 1 });
}

#[test]
fn test_hyperslab () {
    // OPeNDAP stop indices are inclusive
    let slices = [
        DimSlice{ start: 0, stride: 1, stop: 1 },
        DimSlice{ start: 0, stride: 1, stop: 179 },
        DimSlice{ start: 10, stride: 2, stop: 20 },
    ];
    assert_eq!(hyperslab(&slices), "[0:1:0][0:1:178][10:2:19]");
    assert_eq!(hyperslab(&[]), "");
}

#[test]
fn test_combine_slices () {
    // a request relative to an already applied projection addresses the selected elements
    let applied = [ DimSlice{ start: 100, stride: 1, stop: 200 } ];
    let requested = [ DimSlice{ start: 10, stride: 1, stop: 20 } ];
    let combined = combine_slices(&applied, &requested);
    assert_eq!(combined[0], DimSlice{ start: 110, stride: 1, stop: 120 });

    // the outer selection bounds the result
    let requested = [ DimSlice{ start: 90, stride: 1, stop: 150 } ];
    let combined = combine_slices(&applied, &requested);
    assert_eq!(combined[0], DimSlice{ start: 190, stride: 1, stop: 200 });

    // strides multiply
    let applied = [ DimSlice{ start: 0, stride: 2, stop: 100 } ];
    let requested = [ DimSlice{ start: 5, stride: 3, stop: 20 } ];
    let combined = combine_slices(&applied, &requested);
    assert_eq!(combined[0], DimSlice{ start: 10, stride: 6, stop: 40 });

    // missing inner dims default to the full outer selection
    let applied = [ DimSlice{ start: 0, stride: 1, stop: 10 }, DimSlice{ start: 2, stride: 1, stop: 8 } ];
    let combined = combine_slices(&applied, &[ DimSlice{ start: 1, stride: 1, stop: 3 } ]);
    assert_eq!(combined[1], DimSlice{ start: 2, stride: 1, stop: 8 });
}

#[test]
fn test_parse_ce () {
    // projection with hyperslabs plus a selection clause
    let (projection, selection) = parse_ce("analysed_sst[0:1:0][0:179],lat[0:179]&time>5");
    assert_eq!(projection.len(), 2);
    assert_eq!(projection[0].segments[0].0, "analysed_sst");
    assert_eq!(projection[0].segments[0].1[0], DimSlice{ start: 0, stride: 1, stop: 1 });
    assert_eq!(projection[0].segments[0].1[1], DimSlice{ start: 0, stride: 1, stop: 180 });
    assert_eq!(projection[1].segments[0].0, "lat");
    assert_eq!(selection, vec!["time>5".to_string()]);

    // dotted component path
    let (projection, _) = parse_ce("analysed_sst.time[3]");
    assert_eq!(projection[0].segments.len(), 2);
    assert_eq!(projection[0].segments[1].0, "time");
    assert_eq!(projection[0].segments[1].1[0], DimSlice{ start: 3, stride: 1, stop: 4 });

    // selection only
    let (projection, selection) = parse_ce("track.value>=10");
    assert!(projection.is_empty());
    assert_eq!(selection.len(), 1);
}
