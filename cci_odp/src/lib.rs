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

//! access layer for the ESA CCI Open Data Portal - a catalog of Earth observation climate
//! data products served via OpenSearch and OPeNDAP. Data sets are named by their dotted
//! ECV-DRS identifiers and read lazily as chunked multidimensional arrays that are
//! assembled on demand from per-time-step files of the remote archive

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use cci_common::net::{FetcherConfig, HttpFetcher};

mod errors;
pub use errors::*;

pub mod opensearch;
pub mod metadata;
pub mod catalog;
pub mod features;
pub mod opendap;
pub mod schema;
pub mod chunks;
pub mod store;

use catalog::DatasetRecord;
use features::FeatureCache;
use opendap::client::OpendapClient;

/// the CEDA OpenSearch request endpoint serving the CCI catalog
pub const OPENSEARCH_CEDA_URL: &str = "https://archive.opensearch.ceda.ac.uk/opensearch/request";

/// the OpenSearch Description Document declaring the portal query parameters and their options
pub const CCI_ODD_URL: &str = "https://archive.opensearch.ceda.ac.uk/opensearch/description.xml?parentIdentifier=cci";

pub const DEFAULT_NUM_RETRIES: usize = 200;
pub const DEFAULT_RETRY_BACKOFF_MAX: u64 = 40; // [ms]
pub const DEFAULT_RETRY_BACKOFF_BASE: f64 = 1.001;
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// variable names that are treated as coordinates even if they don't name a dimension
pub const COMMON_COORD_VAR_NAMES: &[&str] = &[
    "time", "lat", "lon", "latitude", "longitude", "x", "y", "xc", "yc"
];

/// DRS ids the portal lists but which are hidden from data set enumeration and search
const EXCLUDED_DATA_SOURCES: &str = include_str!("../resources/excluded_data_sources");

/// auxiliary per-data-set display attributes, used by higher layers only
const DATASET_STATES_JSON: &str = include_str!("../resources/dataset_states.json");

/* #region config ***********************************************************************************/

/// general CCI ODP endpoint / retry configuration
#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(default)]
pub struct CciOdpConfig {
    /// base URL of the OpenSearch service
    pub endpoint_url: String,

    /// URL of the OpenSearch Description Document
    pub endpoint_description_url: String,

    /// whether transient failures are reported as warnings
    pub enable_warnings: bool,

    /// maximum GET attempts per request
    pub num_retries: usize,

    /// initial upper bound of the random 429 backoff [ms]
    pub retry_backoff_max: u64,

    /// factor by which the backoff bound grows per 429 response
    pub retry_backoff_base: f64,

    pub user_agent: Option<String>,

    /// global cap of concurrently issued requests
    pub max_connections: usize,
}

impl Default for CciOdpConfig {
    fn default()->Self {
        CciOdpConfig {
            endpoint_url: OPENSEARCH_CEDA_URL.to_string(),
            endpoint_description_url: CCI_ODD_URL.to_string(),
            enable_warnings: false,
            num_retries: DEFAULT_NUM_RETRIES,
            retry_backoff_max: DEFAULT_RETRY_BACKOFF_MAX,
            retry_backoff_base: DEFAULT_RETRY_BACKOFF_BASE,
            user_agent: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl CciOdpConfig {
    fn fetcher_config (&self)->FetcherConfig {
        FetcherConfig {
            max_connections: self.max_connections,
            num_retries: self.num_retries,
            retry_backoff_max: self.retry_backoff_max,
            retry_backoff_base: self.retry_backoff_base,
            user_agent: self.user_agent.clone(),
            enable_warnings: self.enable_warnings,
        }
    }
}

/* #endregion config */

/* #region portal handle ****************************************************************************/

/// the ESA CCI Open Data Portal handle. This owns the HTTP session, the data source catalog,
/// the per-data-set feature lists and the OPeNDAP data set memo - there is no hidden
/// module level state. All caches are populated lazily and only grow
pub struct CciOdp {
    config: CciOdpConfig,
    fetcher: Arc<HttpFetcher>,
    opendap: OpendapClient,

    drs_ids: Mutex<Option<Vec<String>>>,
    data_sources: RwLock<HashMap<String,DatasetRecord>>,
    features: FeatureCache,

    excluded_data_sources: Vec<String>,
    dataset_states: serde_json::Value,
}

impl CciOdp {
    pub fn new ()->Result<Self> {
        Self::with_config( CciOdpConfig::default())
    }

    pub fn with_config (config: CciOdpConfig)->Result<Self> {
        let fetcher = Arc::new( HttpFetcher::new( config.fetcher_config())?);
        let opendap = OpendapClient::new( fetcher.clone());
        let excluded_data_sources: Vec<String> = EXCLUDED_DATA_SOURCES.lines()
            .map( |line| line.trim())
            .filter( |line| !line.is_empty())
            .map( |line| line.to_string())
            .collect();
        let dataset_states = serde_json::from_str( DATASET_STATES_JSON)?;

        Ok( CciOdp {
            config,
            fetcher,
            opendap,
            drs_ids: Mutex::new(None),
            data_sources: RwLock::new( HashMap::new()),
            features: FeatureCache::new(),
            excluded_data_sources,
            dataset_states,
        })
    }

    pub fn config (&self)->&CciOdpConfig {
        &self.config
    }

    pub(crate) fn fetcher (&self)->&HttpFetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn opendap (&self)->&OpendapClient {
        &self.opendap
    }

    pub fn is_excluded (&self, drs_id: &str)->bool {
        self.excluded_data_sources.iter().any( |e| e == drs_id)
    }

    /// auxiliary display attributes for a data set (for enumerations that include attributes)
    pub fn dataset_state (&self, drs_id: &str)->Option<&serde_json::Value> {
        self.dataset_states.get( drs_id)
    }

    /// the full packaged data set state map
    pub fn dataset_states (&self)->&serde_json::Value {
        &self.dataset_states
    }
}

/* #endregion portal handle */
