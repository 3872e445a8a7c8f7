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

use memchr::memmem;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use cci_common::net::HttpFetcher;

use super::das::parse_das;
use super::dds::parse_dds;
use super::xdr::{unpack_dataset, DapArray};
use super::{combine_slices, fix_slice, full_slice, hyperslab, DapDataset, DapNode, DimSlice, SliceSpec};

const DATA_SEPARATOR: &[u8] = b"\nData:\n";

// the portal emits these two non-standard DAS lines which would poison attribute parsing
const SCRUB_DAS_LINES: [&str; 2] = [
    "        Float32 valid_min -Infinity;\n",
    "        Float32 valid_max Infinity;\n",
];

/// client for OPeNDAP endpoints. Remote data sets are parsed once from their `.dds`/`.das`
/// parts and memoized per URL for the process lifetime; array data is read through
/// `.dods` hyperslab requests against the memoized descriptors
pub struct OpendapClient {
    fetcher: Arc<HttpFetcher>,
    datasets: Mutex<HashMap<String,Arc<DapDataset>>>,
}

impl OpendapClient {
    pub fn new (fetcher: Arc<HttpFetcher>)->Self {
        OpendapClient { fetcher, datasets: Mutex::new( HashMap::new()) }
    }

    /// fetch `.dds` and `.das` concurrently and assemble the data set descriptor.
    /// Missing or empty parts fail softly (logged, None)
    pub async fn get_opendap_dataset (&self, url: &str)->Option<Arc<DapDataset>> {
        if let Some(dataset) = self.datasets.lock().await.get(url) {
            return Some( dataset.clone())
        }

        let (path, query) = split_url(url);
        let dds_url = part_url( path, "dds", query);
        let das_url = part_url( path, "das", query);

        let (dds_text, das_text) = tokio::join!(
            self.fetcher.get_text( &dds_url),
            self.fetcher.get_text( &das_url)
        );
        let (Some(dds_text), Some(das_text)) = (dds_text, das_text) else {
            warn!("could not open opendap url {url}, no dds or das file provided");
            return None
        };
        if dds_text.is_empty() {
            warn!("could not open opendap url {url}, dds file is empty");
            return None
        }

        let mut das_text = das_text;
        for line in SCRUB_DAS_LINES {
            das_text = das_text.replace( line, "");
        }

        let mut dataset = match parse_dds( &dds_text) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("could not parse dds of {url}: {e}");
                return None
            }
        };

        match parse_das( &das_text) {
            Ok(containers) => attach_attributes( &mut dataset, containers),
            Err(e) => {
                warn!("could not parse das of {url}: {e}"); // structure is still usable
            }
        }

        // strip any projection from the URL, keeping only selection clauses
        let (projection, selection) = match query {
            Some(q) => parse_ce(q),
            None => (Vec::new(), Vec::new())
        };
        dataset.base_url = path.to_string();
        dataset.selection = selection;
        apply_projection( &mut dataset, &projection);

        let dataset = Arc::new(dataset);
        self.datasets.lock().await.insert( url.to_string(), dataset.clone());
        Some(dataset)
    }

    /// read one variable sub-array: compose the effective hyperslab from the descriptor
    /// slice and the requested one, issue the `.dods` request and decode the payload.
    /// Network failures and malformed payloads yield None
    pub async fn get_data (&self, dataset: &DapDataset, var_name: &str, slices: &[SliceSpec])->Option<DapArray> {
        let proxy = dataset.proxy( var_name)?;

        let requested = fix_slice( slices, proxy.shape);
        let index = match proxy.slice {
            Some(applied) => combine_slices( applied, &requested),
            None => requested
        };

        let mut url = format!("{}.dods?{}{}", proxy.base_url, quote_id(proxy.id), hyperslab(&index));
        if !proxy.selection.is_empty() {
            url.push('&');
            url.push_str( &proxy.selection.join("&"));
        }

        let Some(content) = self.fetcher.get_bytes( &url).await else {
            warn!("could not read response from \"{url}\"");
            return None
        };

        let Some(sep) = memmem::find( &content, DATA_SEPARATOR) else {
            warn!("malformed dods response from \"{url}\"");
            return None
        };
        let dds_text = std::str::from_utf8( &content[..sep]).ok()?;
        let response = match parse_dds( dds_text) {
            Ok(response) => response,
            Err(e) => {
                warn!("could not parse dods header from \"{url}\": {e}");
                return None
            }
        };

        let mut arrays = match unpack_dataset( &response, &content[sep + DATA_SEPARATOR.len()..]) {
            Ok(arrays) => arrays,
            Err(e) => {
                warn!("could not read data from \"{url}\": {e}");
                return None
            }
        };

        if let Some(data) = arrays.remove( proxy.id) {
            return Some(data)
        }
        // tolerate servers that answer with unqualified ids
        let tail = proxy.id.rsplit('.').next().unwrap_or(proxy.id);
        arrays.remove(tail)
    }

    /// drop all memoized data sets (mostly for tests and long running processes)
    pub async fn clear (&self) {
        self.datasets.lock().await.clear();
    }
}

/* #region URL dissection ***************************************************************************/

fn split_url (url: &str)->(&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None)
    }
}

fn part_url (path: &str, part: &str, query: Option<&str>)->String {
    match query {
        Some(q) => format!("{path}.{part}?{q}"),
        None => format!("{path}.{part}")
    }
}

/// percent-encode a variable id for use inside a constraint expression
fn quote_id (id: &str)->String {
    let mut quoted = String::with_capacity( id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || matches!( b, b'-' | b'.' | b'_' | b'~' | b'/') {
            quoted.push( b as char);
        } else {
            quoted.push_str( &format!("%{b:02X}"));
        }
    }
    quoted
}

/* #endregion URL dissection */

/* #region constraint expressions *******************************************************************/

/// one projected variable: dotted path segments, each with optional hyperslab indices
#[derive(Debug,Clone,PartialEq)]
pub struct ProjectionVar {
    pub segments: Vec<(String,Vec<DimSlice>)>,
}

/// split a constraint expression query into projection variables and selection clauses.
/// Clauses containing a relational operator are selections, the rest is a comma separated
/// projection list
pub fn parse_ce (query: &str)->(Vec<ProjectionVar>, Vec<String>) {
    let mut projection = Vec::new();
    let mut selection = Vec::new();

    for clause in query.split('&') {
        if clause.is_empty() {
            continue;
        }
        if clause.contains('<') || clause.contains('>') || clause.contains('=') || clause.contains('!') {
            selection.push( clause.to_string());
        } else {
            for var_spec in clause.split(',') {
                if let Some(var) = parse_projection_var(var_spec) {
                    projection.push(var);
                }
            }
        }
    }
    (projection, selection)
}

fn parse_projection_var (spec: &str)->Option<ProjectionVar> {
    let mut segments = Vec::new();

    for seg in spec.split('.') {
        let bracket = seg.find('[').unwrap_or( seg.len());
        let name = seg[..bracket].to_string();
        if name.is_empty() {
            return None
        }
        let mut slices = Vec::new();
        let mut rest = &seg[bracket..];
        while rest.starts_with('[') {
            let close = rest.find(']')?;
            slices.push( parse_hyperslab_group( &rest[1..close])?);
            rest = &rest[close + 1..];
        }
        segments.push( (name, slices));
    }
    if segments.is_empty() { None } else { Some( ProjectionVar { segments }) }
}

/// parse "start", "start:stop" or "start:stride:stop" with OPeNDAP's inclusive stop
fn parse_hyperslab_group (group: &str)->Option<DimSlice> {
    let parts: Vec<&str> = group.split(':').collect();
    match parts.len() {
        1 => {
            let idx: usize = parts[0].parse().ok()?;
            Some( DimSlice { start: idx, stride: 1, stop: idx + 1 })
        }
        2 => {
            let start: usize = parts[0].parse().ok()?;
            let stop: usize = parts[1].parse().ok()?;
            Some( DimSlice { start, stride: 1, stop: stop + 1 })
        }
        3 => {
            let start: usize = parts[0].parse().ok()?;
            let stride: usize = parts[1].parse().ok()?;
            let stop: usize = parts[2].parse().ok()?;
            Some( DimSlice { start, stride: stride.max(1), stop: stop + 1 })
        }
        _ => None
    }
}

/// constrain the data set descriptors according to the projection of the original URL.
/// For grids the data array and the corresponding map axes are constrained alike.
/// This happens once at build time - descriptors are immutable afterwards
fn apply_projection (dataset: &mut DapDataset, projection: &[ProjectionVar]) {
    for var in projection {
        let Some((first_name, first_slices)) = var.segments.first() else { continue };
        let Some(node) = dataset.get_mut(first_name) else { continue };

        match node {
            DapNode::Base(v) => {
                if !first_slices.is_empty() {
                    let clamped = clamp_slices( first_slices, &v.shape);
                    v.slice = Some(clamped);
                }
            }
            DapNode::Grid(g) => {
                // a second path segment addresses one grid component, otherwise the
                // constraint applies to the data array and all of its maps
                if let Some((seg_name, seg_slices)) = var.segments.get(1) {
                    let target = if *seg_name == g.array.name { Some(&mut g.array) }
                                 else { g.maps.iter_mut().find( |m| m.name == *seg_name) };
                    if let Some(v) = target {
                        if !seg_slices.is_empty() {
                            let clamped = clamp_slices( seg_slices, &v.shape);
                            v.slice = Some(clamped);
                        }
                    }
                } else if !first_slices.is_empty() {
                    let clamped = clamp_slices( first_slices, &g.array.shape);
                    for (axis, map) in g.maps.iter_mut().enumerate() {
                        if let Some(s) = clamped.get(axis) {
                            map.slice = Some( vec![*s]);
                        }
                    }
                    g.array.slice = Some(clamped);
                }
            }
            _ => {} // selection-only constraints on sequences are kept in dataset.selection
        }
    }
}

fn clamp_slices (slices: &[DimSlice], shape: &[usize])->Vec<DimSlice> {
    let mut clamped = Vec::with_capacity( shape.len());
    for (i, len) in shape.iter().enumerate() {
        match slices.get(i) {
            Some(s) => {
                let start = s.start.min(*len);
                let stop = s.stop.min(*len).max(start);
                clamped.push( DimSlice { start, stride: s.stride.max(1), stop });
            }
            None => clamped.push( DimSlice::full(*len))
        }
    }
    clamped
}

/* #endregion constraint expressions */

/* #region attribute attachment *********************************************************************/

fn attach_attributes (dataset: &mut DapDataset, containers: Vec<(String,super::AttrMap)>) {
    for (name, attrs) in containers {
        if let Some(node) = dataset.get_mut( &name) {
            *node.attributes_mut() = attrs;
        } else {
            dataset.attributes.insert( name, attrs);
        }
    }
}

/* #endregion attribute attachment */
