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

//! chunk resolution: map a logical chunk of the virtual data cube to a concrete per-file
//! OPeNDAP sub-array request and return the raw little-endian byte block. Missing data
//! yields None - callers substitute the fill value

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use cci_common::datetime::{format_timestamp, parse_timestamp_lenient, EARLY_START_TIME, LATE_END_TIME};

use crate::catalog::VariableInfo;
use crate::features::FeatureQuery;
use crate::opendap::{AttrValue, SliceSpec};
use crate::schema::time_axis_name;
use crate::CciOdp;

/// data arrays below this element count are returned inline by `get_variable_data`
const INLINE_DATA_LIMIT: usize = 512 * 512;

/* #region requests *********************************************************************************/

/// one data read request, naming the data set and the time window of the wanted file
#[derive(Debug,Clone,Default)]
pub struct DataRequest {
    /// collection identifier (uuid or fid); resolved from the DRS id when absent
    pub parent_identifier: Option<String>,
    pub drs_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// exactly one variable for chunk requests
    pub var_names: Vec<String>,
}

/// per-variable reply of `get_variable_data`
#[derive(Serialize,Debug,Clone)]
pub struct VarData {
    pub size: usize,

    #[serde(skip_serializing_if="Option::is_none")]
    pub shape: Option<Vec<usize>>,

    #[serde(rename="chunkSize", skip_serializing_if="Option::is_none")]
    pub chunk_size: Option<AttrValue>,

    /// the actual values for small arrays, empty for anything above the inline limit
    pub data: Vec<f64>,
}

/* #endregion requests */

/* #region data operations **************************************************************************/

impl CciOdp {
    /// the time ranges of all archive files of a data set intersecting the given window
    pub async fn get_time_ranges_from_data (&self, drs_id: &str,
                                            start_time: Option<&str>, end_time: Option<&str>)->Vec<(DateTime<Utc>,DateTime<Utc>)> {
        let Some(start) = parse_timestamp_lenient( start_time.unwrap_or(EARLY_START_TIME)) else { return Vec::new() };
        let Some(end) = parse_timestamp_lenient( end_time.unwrap_or(LATE_END_TIME)) else { return Vec::new() };

        let Ok(parent_identifier) = self.get_dataset_id(drs_id).await else { return Vec::new() };
        let query = FeatureQuery { parent_identifier, drs_id: drs_id.to_string(), start, end };

        self.get_feature_list( &query).await.into_iter()
            .map( |f| (f.start, f.end))
            .collect()
    }

    /// the OPeNDAP URL of the first archive file in the requested window
    pub(crate) async fn get_opendap_url (&self, request: &DataRequest)->Option<String> {
        let parent_identifier = match &request.parent_identifier {
            Some(id) => id.clone(),
            None => self.get_dataset_id( &request.drs_id).await.ok()?
        };
        let start = parse_timestamp_lenient( request.start_date.as_deref().unwrap_or(EARLY_START_TIME))?;
        let end = parse_timestamp_lenient( request.end_date.as_deref().unwrap_or(LATE_END_TIME))?;

        let query = FeatureQuery { parent_identifier, drs_id: request.drs_id.clone(), start, end };
        let features = self.get_feature_list( &query).await;
        features.first().map( |f| f.opendap_url.clone())
    }

    /// read one chunk of a variable: pick the file for the request window, issue the
    /// sub-array request and coerce the payload to the canonical (possibly widened)
    /// data type, returned as a contiguous little-endian byte block
    pub async fn get_data_chunk (&self, request: &DataRequest, dim_indexes: &[SliceSpec])->Option<Vec<u8>> {
        let var_name = request.var_names.first()?;

        let opendap_url = self.get_opendap_url( request).await?;
        let dataset = self.opendap().get_opendap_dataset( &opendap_url).await?;

        if self.ensure_all_info( &[request.drs_id.clone()]).await.is_err() {
            return None
        }
        let data_type = {
            let data_sources = self.data_sources.read().await;
            let info = data_sources.get( &request.drs_id)
                .and_then( |r| r.schema.as_ref())
                .and_then( |s| s.variable_infos.get( var_name.as_str()));
            match info {
                Some(info) => info.data_type,
                None => {
                    warn!("no schema information for variable {var_name} of {}", request.drs_id);
                    return None
                }
            }
        };

        let data = self.opendap().get_data( &dataset, var_name, dim_indexes).await?;
        data.coerce_to_le_bytes( data_type)
    }

    /// resolve a logical chunk index of the virtual cube: the time axis index picks the
    /// archive file (via the sorted feature list), the remaining axes map to an in-file
    /// hyperslab via the per-file chunk sizes
    pub async fn resolve_chunk (&self, drs_id: &str, var_name: &str, chunk_indices: &[usize])->Option<Vec<u8>> {
        if self.ensure_all_info( &[drs_id.to_string()]).await.is_err() {
            return None
        }

        let (info, num_files) = {
            let data_sources = self.data_sources.read().await;
            let schema = data_sources.get(drs_id)?.schema.as_ref()?;
            let info = schema.variable_infos.get(var_name)?.clone();
            (info, schema.num_files.max(1))
        };
        if chunk_indices.len() != info.dimensions.len() {
            warn!("chunk index rank mismatch for {var_name}: {} vs {}", chunk_indices.len(), info.dimensions.len());
            return None
        }

        let time_name = time_axis_name(drs_id);
        let time_index = info.dimensions.iter().position( |d| d == time_name);

        let (start_date, end_date) = match time_index {
            Some(t) => {
                let (start, end) = self.chunk_time_window( drs_id, &info, num_files, chunk_indices[t], t).await?;
                (Some( format_timestamp(&start)), Some( format_timestamp(&end)))
            }
            None => (None, None) // time invariant variable, any file carries it
        };

        let mut slices = Vec::with_capacity( chunk_indices.len());
        for (i, chunk_index) in chunk_indices.iter().enumerate() {
            let chunk_len = info.file_chunk_sizes[i];
            if Some(i) == time_index {
                let per_file_time = (info.shape[i] / num_files).max(1);
                let offset = (chunk_index * chunk_len) % per_file_time;
                let stop = (offset + chunk_len).min( per_file_time);
                slices.push( SliceSpec::Range( offset, stop));
            } else {
                let start = chunk_index * chunk_len;
                let stop = (start + chunk_len).min( info.shape[i]);
                if start >= stop {
                    warn!("chunk index {chunk_index} out of range for axis {i} of {var_name}");
                    return None
                }
                slices.push( SliceSpec::Range( start, stop));
            }
        }

        let request = DataRequest {
            parent_identifier: None,
            drs_id: drs_id.to_string(),
            start_date,
            end_date,
            var_names: vec![ var_name.to_string() ],
        };
        self.get_data_chunk( &request, &slices).await
    }

    /// the calendar window of one time chunk: the chunk index addresses an archive file
    /// through the time ordered feature list
    async fn chunk_time_window (&self, drs_id: &str, info: &VariableInfo, num_files: usize,
                                time_chunk_index: usize, time_axis: usize)->Option<(DateTime<Utc>,DateTime<Utc>)> {
        let chunk_len = info.file_chunk_sizes[time_axis].max(1);
        let per_file_time = (info.shape[time_axis] / num_files).max(1);
        let global_start = time_chunk_index * chunk_len;
        let file_index = global_start / per_file_time;

        let ranges = self.get_time_ranges_from_data( drs_id, None, None).await;
        ranges.get(file_index).copied()
    }

    /// per-variable size/shape/chunking plus inline data for small arrays within a time
    /// window. Names unknown to the probed file fall back to synthesized index vectors
    /// (virtual dimensions)
    pub async fn get_variable_data (&self, drs_id: &str, variables: &std::collections::HashMap<String,usize>,
                                    start_time: Option<&str>, end_time: Option<&str>)->std::collections::HashMap<String,VarData> {
        let mut var_data = std::collections::HashMap::new();
        if variables.is_empty() {
            return var_data
        }

        let Ok(parent_identifier) = self.get_dataset_id(drs_id).await else { return var_data };
        let request = DataRequest {
            parent_identifier: Some(parent_identifier),
            drs_id: drs_id.to_string(),
            start_date: Some( start_time.unwrap_or("1900-01-01T00:00:00").to_string()),
            end_date: Some( end_time.unwrap_or("3001-12-31T00:00:00").to_string()),
            var_names: Vec::new(),
        };
        let opendap_url = self.get_opendap_url( &request).await;
        let dataset = match &opendap_url {
            Some(url) => self.opendap().get_opendap_dataset(url).await,
            None => None
        };

        for (var_name, requested_size) in variables {
            let node = dataset.as_ref().and_then( |ds| ds.get(var_name));
            match node.and_then( |n| n.as_array()) {
                Some(array) => {
                    let size = array.size();
                    let chunk_size = node.unwrap().attributes().get("_ChunkSizes").cloned();
                    let mut data = Vec::new();
                    if size < INLINE_DATA_LIMIT {
                        if let Some(dataset) = dataset.as_ref() {
                            if let Some(payload) = self.opendap().get_data( dataset, var_name, &[SliceSpec::All]).await {
                                data = payload.to_f64_vec().unwrap_or_default();
                            }
                        }
                    }
                    var_data.insert( var_name.clone(), VarData {
                        size,
                        shape: Some( array.shape.clone()),
                        chunk_size,
                        data,
                    });
                }
                None => { // synthesize a dimension index vector
                    var_data.insert( var_name.clone(), VarData {
                        size: *requested_size,
                        shape: None,
                        chunk_size: Some( AttrValue::Int(*requested_size as i64)),
                        data: (0..*requested_size).map( |i| i as f64).collect(),
                    });
                }
            }
        }
        var_data
    }
}

/* #endregion data operations */
