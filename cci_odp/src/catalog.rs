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

//! the DRS catalog: one [`DatasetRecord`] per dotted ECV-DRS id, assembled lazily from the
//! OpenSearch collection features, the facet metadata of the per-collection description
//! document and the ISO-19115 sidecar. Records are progressively enriched and never shrunk

use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use cci_common::datetime::{parse_datetime_lenient, parse_timestamp};
use cci_common::geo::GeoRect;

use crate::errors::{no_such_dataset, Result};
use crate::metadata::{self, IsoMetadata, OddMetadata};
use crate::opendap::{AttrMap, AttrValue, DataType};
use crate::opensearch::{OsFeature, OsQuery};
use crate::{CciOdp, COMMON_COORD_VAR_NAMES};

/* #region record types *****************************************************************************/

/// a variable as declared at catalog level (before any schema probe)
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct VarSummary {
    #[serde(alias="var_id")]
    pub name: String,

    #[serde(default)]
    pub units: String,

    #[serde(default)]
    pub long_name: Option<String>,
}

/// per-variable schema of a probed data set. The time axis of `shape` is the virtual cube
/// size (number of archive files times per-file time size), the `file_*` fields keep the
/// per-file view needed to address individual files
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct VariableInfo {
    pub data_type: DataType,
    pub orig_data_type: DataType,
    pub size: usize,
    pub shape: Vec<usize>,
    pub dimensions: Vec<String>,
    pub file_dimensions: Vec<String>,
    pub chunk_sizes: Vec<usize>,
    pub file_chunk_sizes: Vec<usize>,
    pub fill_value: Option<AttrValue>,
    pub attributes: AttrMap,
}

/// schema information obtained by probing one representative archive file
#[derive(Serialize,Deserialize,Debug,Clone,Default)]
pub struct SchemaBlock {
    pub dimensions: HashMap<String,usize>,
    pub variable_infos: HashMap<String,VariableInfo>,
    /// global attribute containers of the probed file (NC_GLOBAL etc.)
    pub attributes: HashMap<String,AttrMap>,
    /// number of `.nc` files the archive reported during the probe
    pub num_files: usize,
}

/// one catalog entry, keyed by DRS id
#[derive(Serialize,Deserialize,Debug,Clone,Default)]
pub struct DatasetRecord {
    pub drs_id: String,
    /// the collection identifier the data set belongs to
    pub fid: String,
    pub uuid: Option<String>,
    pub title: String,

    /// the ECV project theme, doubling as the cci_project attribute
    pub ecv: String,
    pub time_frequency: String,
    pub processing_level: String,
    pub data_type: String,
    pub sensor_id: String,
    pub platform_id: String,
    pub product_string: String,
    pub product_version: String,
    pub institute: Option<String>,

    #[serde(rename="abstract")]
    pub abstract_text: Option<String>,
    pub licences: Vec<String>,
    pub bbox: Option<GeoRect>,
    pub temporal_coverage_start: Option<String>,
    pub temporal_coverage_end: Option<String>,
    pub publication_date: Option<String>,
    pub creation_date: Option<String>,
    pub file_formats: Vec<String>,

    /// number of files in the archive, from the drsId facet option label
    pub num_files: usize,

    pub variables: Vec<VarSummary>,

    pub odd_url: Option<String>,
    pub metadata_url: Option<String>,
    pub catalog_url: Option<String>,
    pub variable_manifest: Option<String>,

    pub schema: Option<SchemaBlock>,
}

impl DatasetRecord {
    /// whether the per-file schema probe has run for this record
    pub fn probed (&self)->bool {
        self.schema.is_some()
    }

    pub fn nc_global_attrs (&self)->Option<&AttrMap> {
        self.schema.as_ref().and_then( |s| s.attributes.get("NC_GLOBAL"))
    }
}

/// the condensed per-data-set info handed to the chunk store facade
#[derive(Serialize,Debug,Clone)]
pub struct DatasetInfo {
    pub crs: String,
    pub x_res: f64,
    pub y_res: f64,
    pub bbox: Option<(f64,f64,f64,f64)>,
    pub temporal_coverage_start: Option<String>,
    pub temporal_coverage_end: Option<String>,
    pub var_names: Vec<String>,
    pub coord_names: Vec<String>,
}

/// the non-DRS and DRS-encoded facet filters of a catalog search
#[derive(Debug,Clone,Default)]
pub struct CciSearchAttrs {
    pub ecv: Option<String>,
    pub frequency: Option<String>,
    pub institute: Option<String>,
    pub processing_level: Option<String>,
    pub product_string: Option<String>,
    pub product_version: Option<String>,
    pub data_type: Option<String>,
    pub sensor: Option<String>,
    pub platform: Option<String>,
}

impl CciSearchAttrs {
    /// whether any facet that is encoded in the DRS id itself is set
    fn has_drs_facet (&self)->bool {
        self.ecv.is_some() || self.frequency.is_some() || self.processing_level.is_some()
            || self.data_type.is_some() || self.product_string.is_some() || self.product_version.is_some()
    }

    fn has_record_facet (&self)->bool {
        self.institute.is_some() || self.sensor.is_some() || self.platform.is_some()
    }
}

/* #endregion record types */

/* #region DRS id dissection ************************************************************************/

/// the facet segments of a nine-dot DRS id
/// `esacci.<ecv>.<frequency>.<level>.<data_type>.<sensor>.<platform>.<product_string>.<product_version>.<grid>`
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct DrsParts<'a> {
    pub ecv: &'a str,
    pub frequency: &'a str,
    pub processing_level: &'a str,
    pub data_type: &'a str,
    pub sensor: &'a str,
    pub platform: &'a str,
    pub product_string: &'a str,
    pub product_version: &'a str,
    pub grid: &'a str,
}

lazy_static! {
    static ref DRS_ID_RE: Regex = Regex::new( r"^esacci(\.[^.]+){9}$").unwrap();
}

pub fn is_valid_drs_id (drs_id: &str)->bool {
    DRS_ID_RE.is_match( drs_id)
}

pub fn parse_drs_id (drs_id: &str)->Option<DrsParts<'_>> {
    let segments: Vec<&str> = drs_id.split('.').collect();
    if segments.len() != 10 {
        return None
    }
    Some( DrsParts {
        ecv: segments[1],
        frequency: segments[2],
        processing_level: segments[3],
        data_type: segments[4],
        sensor: segments[5],
        platform: segments[6],
        product_string: segments[7],
        product_version: segments[8],
        grid: segments[9],
    })
}

/// the period-string style temporal resolution implied by the frequency segment of a DRS
/// id (e.g. "5-days" -> "5D", "mon" -> "1M", "yr" -> "1Y"); None for non-periodic products
pub fn temporal_resolution_from_drs_id (drs_id: &str)->Option<String> {
    let frequency = parse_drs_id(drs_id)?.frequency;
    let unit_items: [(&str, &[&str]); 3] = [
        ("D", &["days", "day"]),
        ("M", &["months", "mon", "climatology"]),
        ("Y", &["yrs", "yr", "year"]),
    ];
    for (unit, items) in unit_items {
        for (index, item) in items.iter().enumerate() {
            if frequency.contains(item) {
                if index == 0 {
                    let count = frequency.split('-').next().unwrap_or("1");
                    return Some( format!("{count}{unit}"))
                }
                return Some( format!("1{unit}"))
            }
        }
    }
    None
}

/// the canonical mapping from DRS frequency segments to display frequencies
pub fn frequency_from_drs_segment (segment: &str)->String {
    match segment {
        "mon" => "month".to_string(),
        "yr" => "year".to_string(),
        "5-days" => "5 days".to_string(),
        "8-days" => "8 days".to_string(),
        "15-days" => "15 days".to_string(),
        "13-yrs" => "13 years".to_string(),
        other => other.to_string()
    }
}

/* #endregion DRS id dissection */

/* #region resolution and CRS ***********************************************************************/

/// extract the grid resolution for one axis ("lat" or "lon") from NC_GLOBAL attributes.
/// Attribute priority is [axis specific, resolution, spatial_resolution]. String values may
/// carry both axes separated by 'x' (lat first, lon last) plus trailing units to strip.
/// Returns -1 when nothing parses
pub fn get_resolution (nc_attrs: &AttrMap, axis: &str)->f64 {
    let (attr_name, lat_axis) = if axis == "lat" {
        ("geospatial_lat_resolution", true)
    } else {
        ("geospatial_lon_resolution", false)
    };

    for name in [attr_name, "resolution", "spatial_resolution"] {
        let Some(value) = nc_attrs.get(name) else { continue };
        if let Some(v) = value.as_f64() {
            return v
        }
        if let Some(s) = value.as_str() {
            if let Some(v) = parse_resolution_string( s, lat_axis) {
                return v
            }
        }
    }
    -1.0
}

fn parse_resolution_string (s: &str, lat_axis: bool)->Option<f64> {
    fn cut<'a> (s: &'a str, pat: &str)->&'a str {
        s.split(pat).next().unwrap_or(s)
    }

    let s = cut( s, "(");
    let parts: Vec<&str> = s.split('x').collect();
    let part = if lat_axis { parts.first()? } else { parts.last()? };
    let part = cut( cut( cut( cut( part, "deg"), "degree"), "km"), "m");
    part.trim().parse().ok()
}

/// a minimal CF grid-mapping-name resolver standing in for a full CRS database. Unknown
/// names are passed through, data sets without grid mapping default to WGS84
pub fn crs_from_variable_infos (variable_infos: &HashMap<String,VariableInfo>)->String {
    let mut names: Vec<&String> = variable_infos.keys().collect();
    names.sort();

    for name in names {
        let attrs = &variable_infos[name].attributes;
        if let Some(mapping) = attrs.get("grid_mapping_name").and_then( |v| v.as_str()) {
            let crs = match mapping {
                "latitude_longitude" => "WGS 84",
                "rotated_latitude_longitude" => "undefined", // no datum information available
                "lambert_azimuthal_equal_area" => "Lambert Azimuthal Equal Area",
                "lambert_conformal_conic" => "Lambert Conic Conformal",
                "polar_stereographic" => "Polar Stereographic",
                "stereographic" => "Stereographic",
                "mercator" => "Mercator",
                "transverse_mercator" => "Transverse Mercator",
                "albers_conical_equal_area" => "Albers Equal Area",
                "sinusoidal" => "Sinusoidal",
                "geostationary" => "Geostationary Satellite View",
                other => other,
            };
            if crs != "undefined" {
                return crs.to_string()
            }
            return mapping.to_string()
        }
    }
    "WGS84".to_string()
}

/* #endregion resolution and CRS */

/* #region collection records ***********************************************************************/

/// the per-collection metadata assembled from one OpenSearch collection feature
#[derive(Debug,Clone,Default)]
pub struct CollectionRecord {
    pub uuid: String,
    pub title: String,
    pub variables: Vec<VarSummary>,
    pub odd_url: Option<String>,
    pub metadata_url: Option<String>,
    pub catalog_url: Option<String>,
    pub variable_manifest: Option<String>,
}

pub fn collection_from_feature (feature: &OsFeature)->CollectionRecord {
    let uuid = feature.id.rsplit('=').next().unwrap_or("").to_string();
    let props = &feature.properties;

    let mut record = CollectionRecord {
        uuid,
        title: props.title.clone().unwrap_or_default(),
        variables: props.variables.clone(),
        ..Default::default()
    };

    if let Some(links) = &props.links {
        record.odd_url = links.search.first().and_then( |l| l.href.clone());
        record.metadata_url = feature.describedby_link("ISO19115").map( |s| s.to_string());
        record.catalog_url = feature.describedby_link("Dataset Information").map( |s| s.to_string());
        if let Some(via) = links.via.first() {
            if via.title.as_deref() == Some("Dataset Manifest") {
                record.variable_manifest = via.href.clone();
            }
        }
    }
    record
}

/// the order independent page accumulator building per-collection records keyed by identifier
pub fn extend_catalogue (catalogue: &mut HashMap<String,CollectionRecord>, page: &[OsFeature]) {
    for feature in page {
        let Some(fc_id) = feature.properties.identifier.clone() else { continue };
        catalogue.insert( fc_id, collection_from_feature(feature));
    }
}

/// merged facet / sidecar / per-DRS metadata of one collection
#[derive(Debug,Clone,Default)]
pub(crate) struct MetaInfo {
    pub odd: OddMetadata,
    pub iso: IsoMetadata,
    pub drs_variables: HashMap<String,Vec<VarSummary>>,
    pub drs_uuids: HashMap<String,String>,
}

/* #endregion collection records */

/* #region catalog operations ***********************************************************************/

impl CciOdp {
    /// all non-excluded DRS ids the portal declares (cached after the first fetch)
    pub async fn dataset_names (&self)->Vec<String> {
        {
            let cached = self.drs_ids.lock().await;
            if let Some(names) = cached.as_ref() {
                return names.clone()
            }
        }
        let names = self.fetch_dataset_names().await;
        let mut cached = self.drs_ids.lock().await;
        if cached.is_none() {
            *cached = Some( names.clone());
        }
        names
    }

    async fn fetch_dataset_names (&self)->Vec<String> {
        if let Some(xml_text) = self.fetcher().get_text( &self.config().endpoint_description_url).await {
            match metadata::extract_metadata_from_odd( &xml_text) {
                Ok(odd) => {
                    let mut drs_ids = odd.drs_id_list();
                    if !drs_ids.is_empty() {
                        drs_ids.retain( |id| id != "_all" && !self.is_excluded(id));
                        return drs_ids
                    }
                }
                Err(e) => {
                    warn!("cannot read dataset names from description document: {e}");
                }
            }
        }

        // fall back to a full catalogue read
        if self.data_sources.read().await.is_empty() {
            self.read_all_data_sources().await;
        }
        let mut names: Vec<String> = self.data_sources.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// search the catalog by facet, temporal and spatial filters. DRS-encoded facets are
    /// filtered on the id segments alone, the remaining filters require (and fetch) records
    pub async fn search (&self, start_date: Option<&str>, end_date: Option<&str>,
                         bbox: Option<GeoRect>, attrs: &CciSearchAttrs)->Vec<String> {
        let mut candidate_names: Vec<String> = Vec::new();

        if self.data_sources.read().await.is_empty() && !attrs.has_drs_facet() {
            self.read_all_data_sources().await;
            candidate_names = self.dataset_names().await;
        } else {
            for name in self.dataset_names().await {
                let Some(parts) = parse_drs_id( &name) else { continue };

                if let Some(ecv) = &attrs.ecv {
                    if ecv != parts.ecv { continue }
                }
                if let Some(level) = &attrs.processing_level {
                    if level != parts.processing_level { continue }
                }
                if let Some(data_type) = &attrs.data_type {
                    if data_type != parts.data_type { continue }
                }
                if let Some(product_string) = &attrs.product_string {
                    if product_string != parts.product_string { continue }
                }
                if let Some(product_version) = &attrs.product_version {
                    if *product_version != parts.product_version.replace('-', ".") { continue }
                }
                if let Some(frequency) = &attrs.frequency {
                    if *frequency != frequency_from_drs_segment( parts.frequency) { continue }
                }
                candidate_names.push(name);
            }
            if candidate_names.is_empty() {
                return candidate_names
            }
        }

        if start_date.is_none() && end_date.is_none() && bbox.is_none() && !attrs.has_record_facet() {
            return candidate_names
        }

        let converted_start = start_date.and_then( parse_datetime_lenient);
        let converted_end = end_date.and_then( parse_datetime_lenient);

        self.ensure_in_data_sources( &candidate_names).await;

        let data_sources = self.data_sources.read().await;
        let mut results = Vec::new();
        for name in candidate_names {
            let Some(record) = data_sources.get( &name) else { continue };

            if let Some(institute) = &attrs.institute {
                if record.institute.as_ref() != Some(institute) { continue }
            }
            if let Some(sensor) = &attrs.sensor {
                if *sensor != record.sensor_id { continue }
            }
            if let Some(platform) = &attrs.platform {
                if *platform != record.platform_id { continue }
            }
            if let Some(query_bbox) = &bbox {
                if let Some(record_bbox) = &record.bbox {
                    if record_bbox.is_disjoint( query_bbox) { continue }
                }
            }
            if let Some(start) = converted_start {
                if let Some(coverage_end) = record.temporal_coverage_end.as_deref().and_then( parse_timestamp) {
                    if start > coverage_end { continue }
                }
            }
            if let Some(end) = converted_end {
                if let Some(coverage_start) = record.temporal_coverage_start.as_deref().and_then( parse_timestamp) {
                    if end < coverage_start { continue }
                }
            }
            results.push(name);
        }
        results
    }

    /// condensed data set info: CRS, grid resolutions, bbox, temporal coverage and the
    /// variable/coordinate name split
    pub async fn get_dataset_info (&self, drs_id: &str)->Result<DatasetInfo> {
        self.ensure_all_info( &[drs_id.to_string()]).await?;

        let (crs, x_res, y_res, bbox, mut start, mut end, var_names, coord_names) = {
            let data_sources = self.data_sources.read().await;
            let record = data_sources.get(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
            let empty = AttrMap::new();
            let nc_attrs = record.nc_global_attrs().unwrap_or( &empty);

            let crs = record.schema.as_ref()
                .map( |s| crs_from_variable_infos( &s.variable_infos))
                .unwrap_or_else( || "WGS84".to_string());
            let (var_names, coord_names) = var_and_coord_names_of(record);

            ( crs,
              get_resolution( nc_attrs, "lon"),
              get_resolution( nc_attrs, "lat"),
              record.bbox.map( |r| r.as_wsen()),
              record.temporal_coverage_start.clone(),
              record.temporal_coverage_end.clone(),
              var_names, coord_names )
        };

        if start.is_none() && end.is_none() {
            // no sidecar coverage - derive it from the archive files themselves
            let time_ranges = self.get_time_ranges_from_data( drs_id, None, None).await;
            if let (Some(first), Some(last)) = (time_ranges.first(), time_ranges.last()) {
                start = Some( cci_common::datetime::format_timestamp( &first.0));
                end = Some( cci_common::datetime::format_timestamp( &last.1));
            }
        }

        Ok( DatasetInfo {
            crs, x_res, y_res, bbox,
            temporal_coverage_start: start,
            temporal_coverage_end: end,
            var_names, coord_names,
        })
    }

    /// the fully probed record of one data set
    pub async fn get_dataset_metadata (&self, drs_id: &str)->Result<DatasetRecord> {
        let mut records = self.get_datasets_metadata( &[drs_id.to_string()]).await?;
        records.pop().ok_or_else( || no_such_dataset(drs_id))
    }

    pub async fn get_datasets_metadata (&self, drs_ids: &[String])->Result<Vec<DatasetRecord>> {
        self.ensure_all_info( drs_ids).await?;
        let data_sources = self.data_sources.read().await;
        let mut records = Vec::with_capacity( drs_ids.len());
        for drs_id in drs_ids {
            let record = data_sources.get(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
            records.push( record.clone());
        }
        Ok(records)
    }

    /// split the probed variables into data variables and coordinates
    pub async fn var_and_coord_names (&self, drs_id: &str)->Result<(Vec<String>,Vec<String>)> {
        self.ensure_all_info( &[drs_id.to_string()]).await?;
        let data_sources = self.data_sources.read().await;
        let record = data_sources.get(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
        Ok( var_and_coord_names_of(record))
    }

    /// the identifier data requests use as parentIdentifier: the stable uuid if the
    /// collection has one, else the collection fid
    pub async fn get_dataset_id (&self, drs_id: &str)->Result<String> {
        self.ensure_in_data_sources( &[drs_id.to_string()]).await;
        let data_sources = self.data_sources.read().await;
        let record = data_sources.get(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
        Ok( record.uuid.clone().unwrap_or_else( || record.fid.clone()))
    }

    /* #region record assembly **********************************************************************/

    pub(crate) async fn read_all_data_sources (&self) {
        let catalogue = self.fetch_data_source_catalogue( &OsQuery::for_parent("cci"), crate::opensearch::MAX_WANTED_RESULTS).await;
        let tasks = catalogue.iter().map( |(fid, collection)| self.create_data_source( collection, fid));
        join_all(tasks).await;
    }

    /// make sure all given DRS ids have a catalog record, fetching collections on demand
    pub(crate) async fn ensure_in_data_sources (&self, drs_ids: &[String]) {
        let mut names_to_check = Vec::new();
        {
            let data_sources = self.data_sources.read().await;
            for name in drs_ids {
                if !data_sources.contains_key(name) {
                    names_to_check.push( name.clone());
                }
            }
        }
        if names_to_check.is_empty() {
            return
        }

        let mut catalogue = HashMap::new();
        let scans = names_to_check.iter().map( |name| {
            let mut query = OsQuery::for_parent("cci");
            query.drs_id = Some( name.clone());
            async move { self.fetch_data_source_catalogue( &query, crate::opensearch::MAX_WANTED_RESULTS).await }
        });
        for partial in join_all(scans).await {
            catalogue.extend(partial);
        }

        let tasks = catalogue.iter().map( |(fid, collection)| self.create_data_source( collection, fid));
        join_all(tasks).await;
    }

    pub(crate) async fn fetch_data_source_catalogue (&self, query: &OsQuery, max_wanted: usize)->HashMap<String,CollectionRecord> {
        let mut catalogue = HashMap::new();
        crate::opensearch::fetch_feature_list(
            self.fetcher(), &self.config().endpoint_url, query, max_wanted,
            &mut catalogue, extend_catalogue
        ).await;
        catalogue
    }

    /// build the DatasetRecords of one collection and commit them to the catalog. Facet
    /// metadata comes from the collection ODD, sidecar metadata from the ISO descxml,
    /// per-DRS variables and uuids from the collection scan
    async fn create_data_source (&self, collection: &CollectionRecord, fid: &str) {
        let meta = self.fetch_meta_info( fid, collection.odd_url.as_deref(), collection.metadata_url.as_deref()).await;

        let mut drs_ids = meta.odd.drs_id_list();
        drs_ids.retain( |id| !self.is_excluded(id));

        for drs_id in drs_ids {
            let Some(record) = build_record( &drs_id, fid, collection, &meta) else {
                warn!("malformed DRS id '{drs_id}' in collection {fid}");
                continue;
            };
            // commit-then-expose: the record only becomes visible fully built
            self.data_sources.write().await.insert( drs_id, record);
        }
    }

    async fn fetch_meta_info (&self, fid: &str, odd_url: Option<&str>, metadata_url: Option<&str>)->MetaInfo {
        let mut meta = MetaInfo::default();

        if let Some(url) = odd_url {
            if let Some(xml_text) = self.fetcher().get_text(url).await {
                match metadata::extract_metadata_from_odd( &xml_text) {
                    Ok(odd) => meta.odd = odd,
                    Err(e) => info!("cannot read facet metadata from {url}: {e}")
                }
            }
        }

        let read_ceda_catalogue = std::env::var("READ_CEDA_CATALOGUE").unwrap_or_default() != "0";
        if read_ceda_catalogue {
            if let Some(url) = metadata_url {
                if let Some(xml_text) = self.fetcher().get_text(url).await {
                    match metadata::extract_metadata_from_descxml( &xml_text) {
                        Ok(iso) => meta.iso = iso,
                        Err(e) => info!("cannot read metadata from {url} due to parsing error: {e}")
                    }
                }
            }
        }

        self.set_drs_metadata( fid, &mut meta).await;

        // ODD facet metadata wins over the sidecar where both declare file formats
        if meta.odd.file_format.is_none() && meta.odd.file_formats.is_empty() {
            meta.odd.file_formats = meta.iso.file_formats.clone();
        }
        metadata::harmonize_pair( &mut meta.odd.file_format, &mut meta.odd.file_formats);
        metadata::harmonize_pair( &mut meta.odd.platform_id, &mut meta.odd.platform_ids);
        metadata::harmonize_pair( &mut meta.odd.sensor_id, &mut meta.odd.sensor_ids);
        metadata::harmonize_pair( &mut meta.odd.processing_level, &mut meta.odd.processing_levels);
        metadata::harmonize_pair( &mut meta.odd.time_frequency, &mut meta.odd.time_frequencies);

        meta
    }

    /// scan the collection itself: its sub-collections are titled by DRS id and carry the
    /// per-DRS declared variables and stable uuids
    async fn set_drs_metadata (&self, fid: &str, meta: &mut MetaInfo) {
        let query = OsQuery::for_parent(fid);
        let catalogue = self.fetch_data_source_catalogue( &query, 20).await;

        for (_key, collection) in catalogue {
            if collection.title == "All Files" || collection.title.is_empty() {
                continue;
            }
            if !collection.variables.is_empty() {
                meta.drs_variables.insert( collection.title.clone(), collection.variables.clone());
                if !collection.uuid.is_empty() {
                    meta.drs_uuids.insert( collection.title.clone(), collection.uuid.clone());
                }
            }
        }
    }

    /* #endregion record assembly */
}

/// assemble one DatasetRecord from collection + facet + sidecar metadata. The DRS id
/// segments override the facet singles - they are authoritative for their positions
fn build_record (drs_id: &str, fid: &str, collection: &CollectionRecord, meta: &MetaInfo)->Option<DatasetRecord> {
    let parts = parse_drs_id(drs_id)?;

    let mut variables = meta.drs_variables.get(drs_id)
        .cloned()
        .unwrap_or_else( || collection.variables.clone());
    for variable in variables.iter_mut() {
        variable.name = variable.name.replace('.', "_");
    }

    let uuid = meta.drs_uuids.get(drs_id)
        .cloned()
        .or_else( || if collection.uuid.is_empty() { None } else { Some( collection.uuid.clone()) });

    let bbox = match (meta.iso.bbox_minx, meta.iso.bbox_miny, meta.iso.bbox_maxx, meta.iso.bbox_maxy) {
        (Some(minx), Some(miny), Some(maxx), Some(maxy)) => Some( GeoRect::from_wsen( minx, miny, maxx, maxy)),
        _ => None
    };

    let mut file_formats = meta.odd.file_formats.clone();
    if let Some(single) = &meta.odd.file_format {
        if file_formats.is_empty() {
            file_formats.push( single.clone());
        }
    }

    Some( DatasetRecord {
        drs_id: drs_id.to_string(),
        fid: fid.to_string(),
        uuid,
        title: collection.title.clone(),

        ecv: meta.odd.ecv.clone().unwrap_or_else( || parts.ecv.to_string()),
        time_frequency: frequency_from_drs_segment( parts.frequency),
        processing_level: parts.processing_level.to_string(),
        data_type: parts.data_type.to_string(),
        sensor_id: parts.sensor.to_string(),
        platform_id: parts.platform.to_string(),
        product_string: parts.product_string.to_string(),
        product_version: parts.product_version.to_string(),
        institute: meta.odd.institute.clone(),

        abstract_text: meta.iso.abstract_text.clone(),
        licences: meta.iso.licences.clone(),
        bbox,
        temporal_coverage_start: meta.iso.temporal_coverage_start.clone(),
        temporal_coverage_end: meta.iso.temporal_coverage_end.clone(),
        publication_date: meta.iso.publication_date.clone(),
        creation_date: meta.iso.creation_date.clone(),
        file_formats,

        num_files: meta.odd.num_files.get(drs_id).copied().unwrap_or(0),
        variables,

        odd_url: collection.odd_url.clone(),
        metadata_url: collection.metadata_url.clone(),
        catalog_url: collection.catalog_url.clone(),
        variable_manifest: collection.variable_manifest.clone(),

        schema: None,
    })
}

/// split probed variable names into coordinates (dimension names, bounds variables, the
/// common coordinate set) and data variables. Dimensioned byte-strings are neither
pub fn var_and_coord_names_of (record: &DatasetRecord)->(Vec<String>,Vec<String>) {
    let Some(schema) = &record.schema else {
        return (Vec::new(), Vec::new())
    };

    let mut names: Vec<&String> = schema.variable_infos.keys().collect();
    names.sort();

    let mut variables = Vec::new();
    let mut coords = Vec::new();
    for name in names {
        let info = &schema.variable_infos[name];
        if schema.dimensions.contains_key( name.as_str()) {
            coords.push( name.clone());
        } else if name.ends_with("bounds") || name.ends_with("bnds") {
            coords.push( name.clone());
        } else if COMMON_COORD_VAR_NAMES.contains( &name.as_str()) {
            coords.push( name.clone());
        } else if info.data_type == DataType::ByteString && !info.dimensions.is_empty() {
            // neither coordinate nor variable
        } else {
            variables.push( name.clone());
        }
    }
    (variables, coords)
}

/* #endregion catalog operations */
