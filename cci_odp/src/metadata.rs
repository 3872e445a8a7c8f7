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

//! extractors for the two XML metadata sources of the portal: the OpenSearch Description
//! Document (facet parameters with per-facet file counts) and the ISO-19115 "descxml"
//! sidecar of a collection (abstract, licences, bbox, temporal coverage, dates)

use roxmltree::{Document, Node};
use std::collections::HashMap;

use crate::errors::Result;

/* #region XML helpers ******************************************************************************/

/// walk a fixed element path (by local names, namespaces don't disambiguate anything here)
/// and return all end nodes
fn find_elements<'a,'d> (root: Node<'a,'d>, path: &[&str])->Vec<Node<'a,'d>> {
    let mut current = vec![root];
    for seg in path {
        let mut next = Vec::new();
        for node in current {
            for child in node.children() {
                if child.is_element() && child.tag_name().name() == *seg {
                    next.push(child);
                }
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

fn text_at (root: Node, path: &[&str])->Option<String> {
    find_elements( root, path).first()
        .and_then( |n| n.text())
        .map( |s| s.trim().to_string())
        .filter( |s| !s.is_empty())
}

fn texts_at (root: Node, path: &[&str])->Vec<String> {
    find_elements( root, path).iter()
        .filter_map( |n| n.text())
        .map( |s| s.trim().to_string())
        .filter( |s| !s.is_empty())
        .collect()
}

fn decimal_at (root: Node, path: &[&str])->Option<f64> {
    text_at( root, path).and_then( |s| s.parse().ok())
}

/* #endregion XML helpers */

/* #region ODD extraction ***************************************************************************/

/// facet metadata of the OpenSearch Description Document. A facet with a single option
/// lands in the singular field, facets with many options in the list field - never both
#[derive(Debug,Clone,Default,PartialEq)]
pub struct OddMetadata {
    pub ecv: Option<String>,
    pub ecvs: Vec<String>,
    pub time_frequency: Option<String>,
    pub time_frequencies: Vec<String>,
    pub institute: Option<String>,
    pub institutes: Vec<String>,
    pub processing_level: Option<String>,
    pub processing_levels: Vec<String>,
    pub product_string: Option<String>,
    pub product_strings: Vec<String>,
    pub product_version: Option<String>,
    pub product_versions: Vec<String>,
    pub data_type: Option<String>,
    pub data_types: Vec<String>,
    pub sensor_id: Option<String>,
    pub sensor_ids: Vec<String>,
    pub platform_id: Option<String>,
    pub platform_ids: Vec<String>,
    pub file_format: Option<String>,
    pub file_formats: Vec<String>,
    pub drs_id: Option<String>,
    pub drs_ids: Vec<String>,

    /// per-DRS-id archive file counts, from the numeric suffix of drsId option labels
    pub num_files: HashMap<String,usize>,
}

impl OddMetadata {
    pub fn drs_id_list (&self)->Vec<String> {
        if let Some(single) = &self.drs_id {
            vec![ single.clone() ]
        } else {
            self.drs_ids.clone()
        }
    }
}

/// parse a description XML: walk os:Url/param:Parameter elements and collect the
/// param:Option children of every known facet
pub fn extract_metadata_from_odd (xml_text: &str)->Result<OddMetadata> {
    let doc = Document::parse( xml_text)?;
    let root = doc.root_element();
    let mut meta = OddMetadata::default();

    for url_elem in root.children().filter( |n| n.is_element() && n.tag_name().name() == "Url") {
        for param in url_elem.children().filter( |n| n.is_element() && n.tag_name().name() == "Parameter") {
            let Some(name) = param.attribute("name") else { continue };
            let options = parse_options( param);
            if options.is_empty() {
                continue;
            }
            set_facet( &mut meta, name, options);
        }
    }
    Ok(meta)
}

/// each option carries a value and a label of the form "<display> (<count>)" where the
/// numeric suffix is the per-facet file count
fn parse_options (param: Node)->Vec<(String,usize)> {
    let mut options = Vec::new();
    for option in param.children().filter( |n| n.is_element() && n.tag_name().name() == "Option") {
        let Some(value) = option.attribute("value") else { continue };
        let num_files = option.attribute("label")
            .and_then( |label| label.rsplit_once('('))
            .and_then( |(_, suffix)| suffix.trim_end_matches(')').trim().parse().ok())
            .unwrap_or(0);
        options.push( (value.to_string(), num_files));
    }
    options
}

fn set_facet (meta: &mut OddMetadata, name: &str, mut options: Vec<(String,usize)>) {
    let (single, list, collect_num_files) = match name {
        "ecv" => (&mut meta.ecv, &mut meta.ecvs, false),
        "frequency" => (&mut meta.time_frequency, &mut meta.time_frequencies, false),
        "institute" => (&mut meta.institute, &mut meta.institutes, false),
        "processingLevel" => (&mut meta.processing_level, &mut meta.processing_levels, false),
        "productString" => (&mut meta.product_string, &mut meta.product_strings, false),
        "productVersion" => (&mut meta.product_version, &mut meta.product_versions, false),
        "dataType" => (&mut meta.data_type, &mut meta.data_types, false),
        "sensor" => (&mut meta.sensor_id, &mut meta.sensor_ids, false),
        "platform" => (&mut meta.platform_id, &mut meta.platform_ids, false),
        "fileFormat" => (&mut meta.file_format, &mut meta.file_formats, false),
        "drsId" => (&mut meta.drs_id, &mut meta.drs_ids, true),
        _ => return
    };

    if collect_num_files {
        for (value, num_files) in &options {
            meta.num_files.insert( value.clone(), *num_files);
        }
    }
    if options.len() == 1 {
        *single = Some( options.pop().unwrap().0);
    } else {
        *list = options.into_iter().map( |(value,_)| value).collect();
    }
}

/* #endregion ODD extraction */

/* #region ISO-19115 extraction *********************************************************************/

const NETCDF_FORMAT_TEXT: &str = "Data are in NetCDF format";

/// metadata extracted from an ISO-19115 descxml sidecar
#[derive(Debug,Clone,Default,PartialEq)]
pub struct IsoMetadata {
    pub abstract_text: Option<String>,
    pub title: Option<String>,
    pub licences: Vec<String>,
    pub bbox_minx: Option<f64>,
    pub bbox_miny: Option<f64>,
    pub bbox_maxx: Option<f64>,
    pub bbox_maxy: Option<f64>,
    pub temporal_coverage_start: Option<String>,
    pub temporal_coverage_end: Option<String>,
    pub file_formats: Vec<String>,
    pub publication_date: Option<String>,
    pub creation_date: Option<String>,
}

pub fn extract_metadata_from_descxml (xml_text: &str)->Result<IsoMetadata> {
    let doc = Document::parse( xml_text)?;
    let root = doc.root_element();
    let mut meta = IsoMetadata::default();

    const IDENT: [&str; 2] = ["identificationInfo", "MD_DataIdentification"];
    let Some(ident) = find_elements( root, &IDENT).into_iter().next() else {
        return Ok(meta)
    };

    meta.abstract_text = text_at( ident, &["abstract", "CharacterString"]);
    meta.title = text_at( ident, &["citation", "CI_Citation", "title", "CharacterString"]);
    meta.licences = texts_at( ident, &["resourceConstraints", "MD_Constraints", "useLimitation", "CharacterString"]);

    const EXTENT: [&str; 2] = ["extent", "EX_Extent"];
    if let Some(extent) = find_elements( ident, &EXTENT).into_iter().next() {
        const BBOX: [&str; 2] = ["geographicElement", "EX_GeographicBoundingBox"];
        if let Some(bbox) = find_elements( extent, &BBOX).into_iter().next() {
            meta.bbox_minx = decimal_at( bbox, &["westBoundLongitude", "Decimal"]);
            meta.bbox_miny = decimal_at( bbox, &["southBoundLatitude", "Decimal"]);
            meta.bbox_maxx = decimal_at( bbox, &["eastBoundLongitude", "Decimal"]);
            meta.bbox_maxy = decimal_at( bbox, &["northBoundLatitude", "Decimal"]);
        }
        const PERIOD: [&str; 4] = ["temporalElement", "EX_TemporalExtent", "extent", "TimePeriod"];
        if let Some(period) = find_elements( extent, &PERIOD).into_iter().next() {
            meta.temporal_coverage_start = text_at( period, &["beginPosition"]);
            meta.temporal_coverage_end = text_at( period, &["endPosition"]);
        }
    }

    // the file format is declared in prose, canonicalize the only value we care about
    if let Some(format_name) = text_at( ident, &["resourceFormat", "MD_Format", "name", "CharacterString"]) {
        if format_name == NETCDF_FORMAT_TEXT {
            meta.file_formats = vec![ ".nc".to_string() ];
        }
    }

    meta.publication_date = linked_date( ident, "publication");
    meta.creation_date = linked_date( ident, "creation");

    Ok(meta)
}

/// find the CI_Date whose CI_DateTypeCode text matches, then take its sibling DateTime
fn linked_date (ident: Node, date_type: &str)->Option<String> {
    const DATES: [&str; 3] = ["citation", "CI_Citation", "date"];
    for date_elem in find_elements( ident, &DATES) {
        for ci_date in find_elements( date_elem, &["CI_Date"]) {
            let matches = text_at( ci_date, &["dateType", "CI_DateTypeCode"])
                .map( |code| code == date_type)
                .unwrap_or(false);
            if matches {
                if let Some(datetime) = text_at( ci_date, &["date", "DateTime"]) {
                    return Some(datetime)
                }
            }
        }
    }
    None
}

/* #endregion ISO-19115 extraction */

/* #region harmonization ****************************************************************************/

/// fold a (single,list) facet field pair into one representation: with both present the
/// single value joins the list (unless it already is the list), an empty list is dropped
pub fn harmonize_pair (single: &mut Option<String>, list: &mut Vec<String>) {
    if let Some(value) = single.as_ref() {
        if !list.is_empty() {
            if list.len() == 1 && list[0] == *value {
                list.clear(); // single representation wins
            } else {
                if !list.iter().any( |item| item == value) {
                    list.push( value.clone());
                }
                *single = None;
            }
        }
    }
}

/* #endregion harmonization */
