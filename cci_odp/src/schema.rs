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

//! the schema assembler: probes one representative archive file per data set and merges its
//! per-variable shape/dtype/chunking with the catalog level time cardinality into the
//! virtual cube schema (time axis size = number of files x per-file time size)

use futures::future::join_all;
use std::collections::HashMap;
use tracing::warn;

use crate::catalog::{SchemaBlock, VariableInfo, VarSummary};
use crate::errors::{no_such_dataset, Result};
use crate::opendap::{AttrMap, DapDataset};
use crate::opensearch::{self, OsQuery};
use crate::CciOdp;

/* #region time axis rules **************************************************************************/

/// per-product time axis names. Most products use "time", climatologies step over months
struct TimeAxisRule {
    drs_contains: &'static str,
    axis: &'static str,
}

const TIME_AXIS_RULES: &[TimeAxisRule] = &[
    TimeAxisRule { drs_contains: "AEROSOL.climatology", axis: "month" },
];

pub fn time_axis_name (drs_id: &str)->&'static str {
    for rule in TIME_AXIS_RULES {
        if drs_id.contains( rule.drs_contains) {
            return rule.axis
        }
    }
    "time"
}

/* #endregion time axis rules */

/* #region schema probing ***************************************************************************/

impl CciOdp {
    /// make sure the given data sets have records with a complete schema (dimensions,
    /// variable infos, attributes), probing one representative file where necessary
    pub(crate) async fn ensure_all_info (&self, drs_ids: &[String])->Result<()> {
        self.ensure_in_data_sources( drs_ids).await;

        let tasks = drs_ids.iter().map( |drs_id| self.ensure_full_record( drs_id));
        for result in join_all(tasks).await {
            result?;
        }
        Ok(())
    }

    async fn ensure_full_record (&self, drs_id: &str)->Result<()> {
        {
            let data_sources = self.data_sources.read().await;
            let record = data_sources.get(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
            if record.probed() {
                return Ok(())
            }
        }

        let data_fid = self.get_dataset_id( drs_id).await?;
        self.refresh_declared_variables( drs_id).await;

        let mut probe_query = OsQuery::for_parent( &data_fid);
        probe_query.drs_id = Some( drs_id.to_string());
        let (feature, num_nc_files) = opensearch::fetch_representative_feature(
            self.fetcher(), &self.config().endpoint_url, &probe_query
        ).await;

        let mut dimensions: HashMap<String,usize> = HashMap::new();
        let mut variable_infos: HashMap<String,VariableInfo> = HashMap::new();
        let mut attributes: HashMap<String,AttrMap> = HashMap::new();

        if let Some(feature) = feature {
            match feature.related_link("Opendap") {
                Some(opendap_url) => {
                    if let Some(dataset) = self.opendap().get_opendap_dataset( opendap_url).await {
                        (variable_infos, attributes) = variable_infos_from_dataset( &dataset);

                        for info in variable_infos.values() {
                            for (index, dimension) in info.dimensions.iter().enumerate() {
                                if !dimension.is_empty() {
                                    dimensions.entry( dimension.clone()).or_insert( info.shape[index]);
                                }
                            }
                        }

                        let time_name = time_axis_name( drs_id);
                        let per_file_time = dimensions.get(time_name).copied().unwrap_or(1);
                        let cube_time = num_nc_files * per_file_time;
                        dimensions.insert( time_name.to_string(), cube_time);

                        for info in variable_infos.values_mut() {
                            if let Some(time_index) = info.dimensions.iter().position( |d| d == time_name) {
                                info.shape[time_index] = cube_time;
                                info.size = info.shape.iter().product();
                            }
                        }
                    } else {
                        warn!("could not extract information about variables and attributes from {opendap_url}");
                    }
                }
                None => {
                    warn!("dataset {drs_id} is not accessible via Opendap");
                }
            }
        }

        let mut data_sources = self.data_sources.write().await;
        let record = data_sources.get_mut(drs_id).ok_or_else( || no_such_dataset(drs_id))?;
        record.schema = Some( SchemaBlock { dimensions, variable_infos, attributes, num_files: num_nc_files });
        Ok(())
    }

    /// collections can publish a variable manifest that supersedes the feature level
    /// variable declarations
    async fn refresh_declared_variables (&self, drs_id: &str) {
        let manifest_url = {
            let data_sources = self.data_sources.read().await;
            data_sources.get(drs_id).and_then( |r| r.variable_manifest.clone())
        };
        let Some(url) = manifest_url else { return };

        if let Some(manifest) = self.fetcher().get_json::<HashMap<String,Vec<VarSummary>>>( &url).await {
            if let Some(variables) = manifest.get(drs_id) {
                let mut data_sources = self.data_sources.write().await;
                if let Some(record) = data_sources.get_mut(drs_id) {
                    record.variables = variables.clone();
                }
            }
        }
    }
}

/// assemble the per-variable schema from a probed OPeNDAP data set:
/// - `_FillValue` is renamed to `fill_value`; without one the dtype is widened per the
///   fixed promotion table and a fill value synthesized (integer max, NaN for floats)
/// - `_ChunkSizes` (unless a DODS internal leftover) is renamed to `chunk_sizes`, clamped
///   elementwise to the shape; variables without one chunk as a whole
/// - the per-file view is snapshotted in `file_chunk_sizes`/`file_dimensions` before the
///   time axis gets multiplied at data set level
pub fn variable_infos_from_dataset (dataset: &DapDataset)->(HashMap<String,VariableInfo>, HashMap<String,AttrMap>) {
    let mut variable_infos = HashMap::new();

    for node in &dataset.nodes {
        let Some(array) = node.as_array() else { continue };
        let fixed_key = node.name().replace("%2E", "_").replace('.', "_");

        let mut attrs = node.attributes().clone();
        let orig_data_type = array.dtype;
        let mut data_type = orig_data_type;

        let fill_value = if let Some(fill) = attrs.remove("_FillValue") {
            Some(fill)
        } else if let Some(promoted) = orig_data_type.promoted() {
            data_type = promoted;
            promoted.default_fill()
        } else {
            warn!("variable \"{fixed_key}\" has no fill value, cannot set one. For parts where \
                   no data is available you will see random values. This is usually the case \
                   when data is missing for a time step.");
            None
        };

        let size = array.size();
        let mut shape = array.shape.clone();
        if shape.is_empty() {
            shape = vec![size];
        }

        let chunk_attr = if attrs.contains_key("_ChunkSizes") && !attrs.contains_key("DODS") {
            attrs.remove("_ChunkSizes").and_then( |v| v.as_usize_list())
        } else {
            None
        };
        let mut chunk_sizes = match chunk_attr {
            Some(sizes) if sizes.len() == shape.len() => sizes,
            _ => shape.clone()
        };
        for (i, chunk) in chunk_sizes.iter_mut().enumerate() {
            *chunk = (*chunk).min( shape[i]);
        }

        let dimensions = array.dims.clone();

        variable_infos.insert( fixed_key, VariableInfo {
            data_type,
            orig_data_type,
            size,
            file_chunk_sizes: chunk_sizes.clone(),
            chunk_sizes,
            file_dimensions: dimensions.clone(),
            dimensions,
            shape,
            fill_value,
            attributes: attrs,
        });
    }

    (variable_infos, dataset.attributes.clone())
}

/* #endregion schema probing */
