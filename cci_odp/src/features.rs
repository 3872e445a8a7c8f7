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

//! per-data-set cache of time ordered (start,end,opendap-url) file tuples. Lists are
//! created by a full or windowed scan and only ever extended outside their covered range.
//! Extensions are serialized per DRS id - scans stage into a local list and commit under
//! the lock, so an aborted scan cannot leave a partial state behind

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use cci_common::datetime::{find_time_range, format_timestamp, parse_timestamp_lenient};

use crate::opensearch::{self, OsFeature, OsQuery, MAX_WANTED_RESULTS};
use crate::CciOdp;

/* #region feature list *****************************************************************************/

/// one archive file as reported by OpenSearch: its time range plus the OPeNDAP URL
#[derive(Debug,Clone,PartialEq)]
pub struct Feature {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub opendap_url: String,
}

/// a list of features sorted ascending by start time, without duplicate tuples
#[derive(Debug,Clone,Default)]
pub struct FeatureList {
    features: Vec<Feature>,
}

impl FeatureList {
    pub fn new ()->Self {
        FeatureList { features: Vec::new() }
    }

    pub fn len (&self)->usize {
        self.features.len()
    }

    pub fn is_empty (&self)->bool {
        self.features.is_empty()
    }

    pub fn first (&self)->Option<&Feature> {
        self.features.first()
    }

    pub fn last (&self)->Option<&Feature> {
        self.features.last()
    }

    pub fn as_slice (&self)->&[Feature] {
        &self.features
    }

    /// install scan results as the initial content (sorted, de-duplicated)
    pub fn commit_scan (&mut self, mut scanned: Vec<Feature>) {
        scanned.sort_by_key( |f| f.start);
        scanned.dedup();
        self.features = scanned;
    }

    /// prepend features from a leftward extension scan, skipping tuples already present
    /// at the left boundary
    pub fn extend_left (&mut self, mut scanned: Vec<Feature>) {
        scanned.sort_by_key( |f| f.start);
        scanned.retain( |f| !self.features.contains(f));
        if !scanned.is_empty() {
            scanned.extend( self.features.drain(..));
            self.features = scanned;
        }
    }

    /// append features from a rightward extension scan, skipping tuples already present
    /// at the right boundary
    pub fn extend_right (&mut self, mut scanned: Vec<Feature>) {
        scanned.sort_by_key( |f| f.start);
        scanned.retain( |f| !self.features.contains(f));
        self.features.extend(scanned);
    }

    /// all features whose time range intersects [start,end]: binary search the first
    /// feature ending at or after `start` and the first starting after `end`
    pub fn range (&self, start: DateTime<Utc>, end: DateTime<Utc>)->&[Feature] {
        let lo = self.features.partition_point( |f| f.end < start);
        let hi = self.features.partition_point( |f| f.start <= end);
        if lo < hi {
            &self.features[lo..hi]
        } else {
            &self.features[0..0]
        }
    }
}

/// the order independent page accumulator used by feature scans: extract the time range
/// (from the date property, else from the filename) and the Opendap link of each feature
pub fn extract_times_and_opendap_url (features: &mut Vec<Feature>, page: &[OsFeature]) {
    for feature in page {
        let Some(opendap_url) = feature.related_link("Opendap") else { continue };

        let mut start: Option<DateTime<Utc>> = None;
        let mut end: Option<DateTime<Utc>> = None;

        if let Some(date) = &feature.properties.date {
            if let Some((start_str, end_str)) = date.split_once('/') {
                start = parse_timestamp_lenient( start_str);
                end = parse_timestamp_lenient( end_str);
            }
        }
        if start.is_none() {
            if let Some(title) = &feature.properties.title {
                if let Some((t0, t1)) = find_time_range( title) {
                    start = Some(t0);
                    end = Some(t1);
                }
            }
        }

        if let Some(start) = start {
            features.push( Feature {
                start,
                end: end.unwrap_or(start),
                opendap_url: opendap_url.to_string(),
            });
        }
    }
}

/* #endregion feature list */

/* #region feature cache ****************************************************************************/

/// per-DRS-id feature lists. The outer map lock is only held to look up or create an
/// entry; scans and extensions run under the per-data-set entry lock
pub(crate) struct FeatureCache {
    lists: std::sync::Mutex<HashMap<String,Arc<Mutex<FeatureList>>>>,
}

impl FeatureCache {
    pub fn new ()->Self {
        FeatureCache { lists: std::sync::Mutex::new( HashMap::new()) }
    }

    pub fn entry (&self, drs_id: &str)->Arc<Mutex<FeatureList>> {
        let mut lists = self.lists.lock().unwrap();
        lists.entry( drs_id.to_string())
            .or_insert_with( || Arc::new( Mutex::new( FeatureList::new())))
            .clone()
    }
}

/// parameters of a feature list request
#[derive(Debug,Clone)]
pub struct FeatureQuery {
    pub parent_identifier: String,
    pub drs_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CciOdp {
    /// the time ordered features of a data set intersecting the requested window. The first
    /// request scans the archive, later requests only extend the cached list beyond its
    /// currently covered range
    pub(crate) async fn get_feature_list (&self, query: &FeatureQuery)->Vec<Feature> {
        let entry = self.features.entry( &query.drs_id);
        let mut list = entry.lock().await;

        if list.is_empty() {
            let scan_query = self.feature_scan_query( query, Some(query.start), Some(query.end));
            let mut scanned = self.scan_features( &scan_query).await;
            if scanned.is_empty() {
                // some collections reject date filtering - retry unconstrained
                let scan_query = self.feature_scan_query( query, None, None);
                scanned = self.scan_features( &scan_query).await;
            }
            list.commit_scan( scanned);

        } else {
            if let Some(first) = list.first() {
                if query.start < first.start {
                    let scan_query = self.feature_scan_query( query, Some(query.start), Some(first.start));
                    let scanned = self.scan_features( &scan_query).await;
                    if !scanned.is_empty() {
                        list.extend_left( scanned);
                    }
                }
            }
            if let Some(last) = list.last() {
                if query.end > last.end {
                    let scan_query = self.feature_scan_query( query, Some(last.end), Some(query.end));
                    let scanned = self.scan_features( &scan_query).await;
                    if !scanned.is_empty() {
                        list.extend_right( scanned);
                    }
                }
            }
        }

        list.range( query.start, query.end).to_vec()
    }

    fn feature_scan_query (&self, query: &FeatureQuery,
                           start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>)->OsQuery {
        OsQuery {
            parent_identifier: Some( query.parent_identifier.clone()),
            drs_id: Some( query.drs_id.clone()),
            start_date: start.map( |t| format_timestamp(&t)),
            end_date: end.map( |t| format_timestamp(&t)),
            file_format: Some( ".nc".to_string()),
        }
    }

    async fn scan_features (&self, query: &OsQuery)->Vec<Feature> {
        let mut features = Vec::new();
        opensearch::fetch_feature_list(
            self.fetcher(), &self.config().endpoint_url, query, MAX_WANTED_RESULTS,
            &mut features, extract_times_and_opendap_url
        ).await;
        features
    }
}

/* #endregion feature cache */
