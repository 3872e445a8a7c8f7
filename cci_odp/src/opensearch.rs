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

//! paginated GeoJSON feature retrieval from the portal OpenSearch service. Large result
//! sets are either partitioned by date sub-windows (all sub-scans in parallel) or paged
//! sequentially with bounded parallelism. Page accumulators must be order independent -
//! pages of one scan can arrive in any order

use chrono::Duration as TimeDelta;
use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use cci_common::datetime::{format_timestamp, parse_timestamp_lenient, secs};
use cci_common::net::HttpFetcher;

use crate::catalog::VarSummary;

const PROBE_RECORDS: usize = 1000;
const PAGE_RECORDS: usize = 10000;
const MAX_INFLIGHT_PAGES: usize = 4;
const PAGE_RETRY_SLEEP_SECS: u64 = 4;

/// default cap of wanted results for unbounded scans
pub const MAX_WANTED_RESULTS: usize = 100000;

/* #region wire structs *****************************************************************************/

/// one page of the geo+json feature stream
#[derive(Deserialize,Debug,Clone,Default)]
pub struct OsPage {
    #[serde(rename="totalResults", default)]
    pub total_results: usize,

    #[serde(default)]
    pub features: Vec<OsFeature>,
}

#[derive(Deserialize,Debug,Clone,Default)]
pub struct OsFeature {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub properties: OsProperties,
}

#[derive(Deserialize,Debug,Clone,Default)]
pub struct OsProperties {
    pub identifier: Option<String>,
    pub title: Option<String>,

    /// "start/end" time range of the file, when the archive provides one
    pub date: Option<String>,

    #[serde(default)]
    pub filesize: Option<u64>,

    #[serde(default)]
    pub variables: Vec<VarSummary>,

    pub links: Option<OsLinks>,
}

#[derive(Deserialize,Debug,Clone,Default)]
pub struct OsLinks {
    #[serde(default)]
    pub related: Vec<OsLink>,

    #[serde(default)]
    pub describedby: Vec<OsLink>,

    #[serde(default)]
    pub search: Vec<OsLink>,

    #[serde(default)]
    pub via: Vec<OsLink>,
}

#[derive(Deserialize,Debug,Clone,Default)]
pub struct OsLink {
    pub title: Option<String>,
    pub href: Option<String>,
}

impl OsFeature {
    /// the href of the related link with the given title (e.g. "Opendap", "Download")
    pub fn related_link (&self, title: &str)->Option<&str> {
        let links = self.properties.links.as_ref()?;
        links.related.iter()
            .find( |l| l.title.as_deref() == Some(title))
            .and_then( |l| l.href.as_deref())
    }

    pub fn describedby_link (&self, title: &str)->Option<&str> {
        let links = self.properties.links.as_ref()?;
        links.describedby.iter()
            .find( |l| l.title.as_deref() == Some(title))
            .and_then( |l| l.href.as_deref())
    }
}

/* #endregion wire structs */

/* #region queries **********************************************************************************/

/// facet filters of one OpenSearch scan. Page parameters are appended per request
#[derive(Debug,Clone,Default)]
pub struct OsQuery {
    pub parent_identifier: Option<String>,
    pub drs_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub file_format: Option<String>,
}

impl OsQuery {
    pub fn for_parent (parent_identifier: &str)->Self {
        OsQuery { parent_identifier: Some(parent_identifier.to_string()), ..Default::default() }
    }

    fn page_url (&self, base_url: &str, start_page: usize, maximum_records: usize)->Option<String> {
        let mut url = Url::parse( base_url).ok()?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(v) = &self.parent_identifier { pairs.append_pair("parentIdentifier", v); }
            if let Some(v) = &self.drs_id { pairs.append_pair("drsId", v); }
            if let Some(v) = &self.start_date { pairs.append_pair("startDate", v); }
            if let Some(v) = &self.end_date { pairs.append_pair("endDate", v); }
            if let Some(v) = &self.file_format { pairs.append_pair("fileFormat", v); }
            pairs.append_pair("startPage", &start_page.to_string());
            pairs.append_pair("maximumRecords", &maximum_records.to_string());
            pairs.append_pair("httpAccept", "application/geo+json");
        }
        Some( url.into())
    }
}

/* #endregion queries */

/* #region pager ************************************************************************************/

/// fetch one feature page, re-attempting failed requests with a flat sleep. Page attempts
/// scale with the page number (later pages have had more opportunity for transient failures
/// upstream). An exhausted page contributes nothing (0 results)
pub async fn fetch_feature_page (fetcher: &HttpFetcher, base_url: &str, query: OsQuery,
                                 start_page: usize, maximum_records: usize)->(usize, Vec<OsFeature>) {
    let Some(url) = query.page_url( base_url, start_page, maximum_records) else {
        return (0, Vec::new())
    };

    let num_reattempts = start_page * 2;
    for attempt in 0..num_reattempts {
        if let Some(page) = fetcher.get_json::<OsPage>( &url).await {
            return (page.total_results, page.features)
        }
        debug!("did not read page {start_page} at attempt {attempt}");
        if attempt + 1 < num_reattempts {
            tokio::time::sleep( secs(PAGE_RETRY_SLEEP_SECS)).await;
        }
    }
    (0, Vec::new())
}

/// run a full scan: probe the result size first, then either partition the date window into
/// parallel sub-scans or page sequentially with at most 4 requests in flight
pub async fn fetch_feature_pages (fetcher: &HttpFetcher, base_url: &str, query: &OsQuery,
                                  max_wanted: usize)->Vec<Vec<OsFeature>> {
    let initial_max = PROBE_RECORDS.min( max_wanted);
    let (total_results, first_page) = fetch_feature_page( fetcher, base_url, query.clone(), 1, initial_max).await;

    if total_results < initial_max || max_wanted < PROBE_RECORDS {
        return vec![first_page]
    }

    // the probe page is discarded - it was paged differently than the full scan
    if let Some(windows) = date_partitions( query, total_results) {
        let mut tasks = Vec::with_capacity( windows.len());
        for (task_start, task_end) in windows {
            let mut sub_query = query.clone();
            sub_query.start_date = Some(task_start);
            sub_query.end_date = Some(task_end);
            tasks.push( fetch_feature_page( fetcher, base_url, sub_query, 1, PAGE_RECORDS));
        }
        join_all(tasks).await.into_iter().map( |(_total, features)| features).collect()

    } else {
        let mut pages = Vec::new();
        let mut num_results = 0;
        let mut start_page = 1;
        while num_results < total_results {
            let mut batch = Vec::new();
            while batch.len() < MAX_INFLIGHT_PAGES && num_results < total_results {
                batch.push( fetch_feature_page( fetcher, base_url, query.clone(), start_page, PAGE_RECORDS));
                start_page += 1;
                num_results += PAGE_RECORDS;
            }
            for (_total, features) in join_all(batch).await {
                pages.push(features);
            }
        }
        pages
    }
}

/// compute date sub-windows so that each one is expected to hold about a thousand results
fn date_partitions (query: &OsQuery, total_results: usize)->Option<Vec<(String,String)>> {
    let start = parse_timestamp_lenient( query.start_date.as_deref()?)?;
    let end = parse_timestamp_lenient( query.end_date.as_deref()?)?;
    if end <= start {
        return None
    }

    let span_days = (end - start).num_days().max(0) as f64;
    let expected_windows = (total_results as f64) / 1000.0;
    let days_per_delta = ((span_days / expected_windows).ceil() as i64).max(1);

    let mut windows = Vec::new();
    let mut current = start;
    while current < end {
        let task_start = format_timestamp( &current);
        current = current + TimeDelta::days(days_per_delta) - TimeDelta::seconds(1);
        if current > end {
            current = end;
        }
        windows.push( (task_start, format_timestamp( &current)));
    }
    Some(windows)
}

/// run a scan and feed every retrieved page to the (order independent) extender
pub async fn fetch_feature_list<A,E> (fetcher: &HttpFetcher, base_url: &str, query: &OsQuery,
                                      max_wanted: usize, acc: &mut A, extender: E)
    where E: Fn(&mut A, &[OsFeature])
{
    for page in fetch_feature_pages( fetcher, base_url, query, max_wanted).await {
        extender( acc, &page);
    }
}

/// fetch one representative `.nc` feature for schema probing plus the archive file count.
/// The middle feature of the page is picked - first and last files can have atypical
/// boundary time chunkings
pub async fn fetch_representative_feature (fetcher: &HttpFetcher, base_url: &str,
                                           query: &OsQuery)->(Option<OsFeature>, usize) {
    let mut probe_query = query.clone();
    probe_query.file_format = Some(".nc".to_string());

    let Some(url) = probe_query.page_url( base_url, 1, 5) else {
        return (None, 0)
    };
    let Some(page) = fetcher.get_json::<OsPage>( &url).await else {
        return (None, 0)
    };

    let mut features = page.features;
    if features.is_empty() {
        return (None, page.total_results)
    }
    let index = features.len() / 2;
    (Some( features.swap_remove(index)), page.total_results)
}

/* #endregion pager */
