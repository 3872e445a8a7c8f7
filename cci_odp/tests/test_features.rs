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

use chrono::{DateTime, Utc};

use cci_common::datetime::parse_timestamp;
use cci_odp::features::{extract_times_and_opendap_url, Feature, FeatureList};
use cci_odp::opensearch::{OsFeature, OsLink, OsLinks, OsProperties};

// run with "cargo test test_feature_list -- --nocapture"

fn t (s: &str)->DateTime<Utc> {
    parse_timestamp(s).unwrap()
}

fn feature (start: &str, end: &str, url: &str)->Feature {
    Feature { start: t(start), end: t(end), opendap_url: url.to_string() }
}

#[test]
fn test_feature_list () {
    let mut list = FeatureList::new();
    assert!(list.is_empty());

    // scan results commit sorted and de-duplicated
    list.commit_scan(vec![
        feature("1997-09-08T00:00:00", "1997-09-12T23:59:00", "http://dap/b.nc"),
        feature("1997-09-03T00:00:00", "1997-09-07T23:59:00", "http://dap/a.nc"),
        feature("1997-09-13T00:00:00", "1997-09-17T23:59:00", "http://dap/c.nc"),
        feature("1997-09-08T00:00:00", "1997-09-12T23:59:00", "http://dap/b.nc"),
    ]);
    assert_eq!(list.len(), 3);
    assert_eq!(list.first().unwrap().opendap_url, "http://dap/a.nc");
    assert_eq!(list.last().unwrap().opendap_url, "http://dap/c.nc");

    // monotone start times
    let features = list.as_slice();
    for i in 1..features.len() {
        assert!(features[i - 1].start <= features[i].start);
    }
}

#[test]
fn test_range_query () {
    let mut list = FeatureList::new();
    list.commit_scan(vec![
        feature("1997-09-03T00:00:00", "1997-09-07T23:59:00", "http://dap/a.nc"),
        feature("1997-09-08T00:00:00", "1997-09-12T23:59:00", "http://dap/b.nc"),
        feature("1997-09-13T00:00:00", "1997-09-17T23:59:00", "http://dap/c.nc"),
    ]);

    // a window overlapping the first two files
    let hits = list.range(t("1997-09-03T00:00:00"), t("1997-09-10T00:00:00"));
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].opendap_url, "http://dap/a.nc");
    assert_eq!(hits[1].opendap_url, "http://dap/b.nc");

    // a window inside one file
    let hits = list.range(t("1997-09-09T00:00:00"), t("1997-09-09T12:00:00"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].opendap_url, "http://dap/b.nc");

    // a window before all files
    let hits = list.range(t("1990-01-01T00:00:00"), t("1990-12-31T00:00:00"));
    assert!(hits.is_empty());

    // an unbounded window
    let hits = list.range(t("1000-01-01T00:00:00"), t("3000-12-31T23:59:59"));
    assert_eq!(hits.len(), 3);
}

#[test]
fn test_extensions () {
    let mut list = FeatureList::new();
    list.commit_scan(vec![
        feature("1997-09-08T00:00:00", "1997-09-12T23:59:00", "http://dap/b.nc"),
        feature("1997-09-13T00:00:00", "1997-09-17T23:59:00", "http://dap/c.nc"),
    ]);

    // leftward extension skips tuples already present at the boundary
    list.extend_left(vec![
        feature("1997-09-03T00:00:00", "1997-09-07T23:59:00", "http://dap/a.nc"),
        feature("1997-09-08T00:00:00", "1997-09-12T23:59:00", "http://dap/b.nc"),
    ]);
    assert_eq!(list.len(), 3);
    assert_eq!(list.first().unwrap().opendap_url, "http://dap/a.nc");

    // rightward extension skips duplicates as well
    list.extend_right(vec![
        feature("1997-09-13T00:00:00", "1997-09-17T23:59:00", "http://dap/c.nc"),
        feature("1997-09-18T00:00:00", "1997-09-22T23:59:00", "http://dap/d.nc"),
    ]);
    assert_eq!(list.len(), 4);
    assert_eq!(list.last().unwrap().opendap_url, "http://dap/d.nc");

    // still sorted, still duplicate free
    let features = list.as_slice();
    for i in 1..features.len() {
        assert!(features[i - 1].start <= features[i].start);
        assert!(features[i - 1] != features[i]);
    }
}

fn os_feature (date: Option<&str>, title: Option<&str>, opendap: Option<&str>)->OsFeature {
    let related = opendap.map( |href| vec![
        OsLink { title: Some("Download".to_string()), href: Some("http://data/file.nc".to_string()) },
        OsLink { title: Some("Opendap".to_string()), href: Some(href.to_string()) },
    ]).unwrap_or_default();

    OsFeature {
        id: "http://api/features=abc123".to_string(),
        properties: OsProperties {
            title: title.map( |s| s.to_string()),
            date: date.map( |s| s.to_string()),
            links: Some( OsLinks { related, ..Default::default() }),
            ..Default::default()
        },
    }
}

#[test]
fn test_extract_times_and_opendap_url () {
    let page = vec![
        // time range from the date property, trailing fraction and offset stripped
        os_feature( Some("1997-09-03T00:00:00.000+00:00/1997-09-07T23:59:00.000+00:00"), None,
                    Some("http://dap/a.nc")),
        // no date property - time range from the filename
        os_feature( None, Some("19970908-19970912-ESACCI-L3S_OC-fv3.1.nc"), Some("http://dap/b.nc")),
        // no opendap link - skipped
        os_feature( Some("1997-09-13T00:00:00/1997-09-17T23:59:00"), None, None),
        // no time at all - skipped
        os_feature( None, Some("no-times-in-here.nc"), Some("http://dap/x.nc")),
    ];

    let mut features = Vec::new();
    extract_times_and_opendap_url(&mut features, &page);

    assert_eq!(features.len(), 2);
    assert_eq!(features[0].start, t("1997-09-03T00:00:00"));
    assert_eq!(features[0].end, t("1997-09-07T23:59:00"));
    assert_eq!(features[0].opendap_url, "http://dap/a.nc");

    assert_eq!(features[1].start, t("1997-09-08T00:00:00"));
    assert_eq!(features[1].end, t("1997-09-12T23:59:59"));
}
