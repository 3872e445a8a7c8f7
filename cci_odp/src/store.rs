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

//! blocking facade over the async portal API, for chunk store adapters that live outside
//! an async context. The wrapper owns its own runtime - it must NOT be used from within
//! one (block_on panics there, by design)

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::runtime::Runtime;

use cci_common::geo::GeoRect;

use crate::catalog::{CciSearchAttrs, DatasetInfo, DatasetRecord};
use crate::chunks::{DataRequest, VarData};
use crate::errors::Result;
use crate::opendap::SliceSpec;
use crate::{CciOdp, CciOdpConfig};

pub struct CciOdpSync {
    runtime: Runtime,
    odp: CciOdp,
}

impl CciOdpSync {
    pub fn new ()->Result<Self> {
        Self::with_config( CciOdpConfig::default())
    }

    pub fn with_config (config: CciOdpConfig)->Result<Self> {
        let runtime = Runtime::new()?;
        let odp = CciOdp::with_config(config)?;
        Ok( CciOdpSync { runtime, odp } )
    }

    /// the wrapped async portal, for mixed use
    pub fn portal (&self)->&CciOdp {
        &self.odp
    }

    pub fn dataset_names (&self)->Vec<String> {
        self.runtime.block_on( self.odp.dataset_names())
    }

    pub fn search (&self, start_date: Option<&str>, end_date: Option<&str>,
                   bbox: Option<GeoRect>, attrs: &CciSearchAttrs)->Vec<String> {
        self.runtime.block_on( self.odp.search( start_date, end_date, bbox, attrs))
    }

    pub fn get_dataset_info (&self, drs_id: &str)->Result<DatasetInfo> {
        self.runtime.block_on( self.odp.get_dataset_info( drs_id))
    }

    pub fn get_dataset_metadata (&self, drs_id: &str)->Result<DatasetRecord> {
        self.runtime.block_on( self.odp.get_dataset_metadata( drs_id))
    }

    pub fn get_datasets_metadata (&self, drs_ids: &[String])->Result<Vec<DatasetRecord>> {
        self.runtime.block_on( self.odp.get_datasets_metadata( drs_ids))
    }

    pub fn var_and_coord_names (&self, drs_id: &str)->Result<(Vec<String>,Vec<String>)> {
        self.runtime.block_on( self.odp.var_and_coord_names( drs_id))
    }

    pub fn get_dataset_id (&self, drs_id: &str)->Result<String> {
        self.runtime.block_on( self.odp.get_dataset_id( drs_id))
    }

    pub fn get_time_ranges_from_data (&self, drs_id: &str, start_time: Option<&str>,
                                      end_time: Option<&str>)->Vec<(DateTime<Utc>,DateTime<Utc>)> {
        self.runtime.block_on( self.odp.get_time_ranges_from_data( drs_id, start_time, end_time))
    }

    pub fn get_variable_data (&self, drs_id: &str, variables: &HashMap<String,usize>,
                              start_time: Option<&str>, end_time: Option<&str>)->HashMap<String,VarData> {
        self.runtime.block_on( self.odp.get_variable_data( drs_id, variables, start_time, end_time))
    }

    pub fn get_data_chunk (&self, request: &DataRequest, dim_indexes: &[SliceSpec])->Option<Vec<u8>> {
        self.runtime.block_on( self.odp.get_data_chunk( request, dim_indexes))
    }

    pub fn resolve_chunk (&self, drs_id: &str, var_name: &str, chunk_indices: &[usize])->Option<Vec<u8>> {
        self.runtime.block_on( self.odp.resolve_chunk( drs_id, var_name, chunk_indices))
    }
}
