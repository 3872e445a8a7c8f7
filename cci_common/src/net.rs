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

///! retrying HTTP GET support with bounded concurrency

use bytes::Bytes;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::datetime::millis;

pub type Result<T> = std::result::Result<T, CciNetError>;

#[derive(Error,Debug)]
pub enum CciNetError {
    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("operation failed: {0}")]
    OpFailed( String ),
}

pub fn op_failed (msg: impl ToString)->CciNetError {
    CciNetError::OpFailed(msg.to_string())
}

/// retry and connection-cap parameters for a [`HttpFetcher`]
#[derive(Debug,Clone)]
pub struct FetcherConfig {
    /// maximum number of concurrently issued requests
    pub max_connections: usize,
    /// maximum GET attempts before giving up
    pub num_retries: usize,
    /// initial upper bound of the random 429 backoff [ms]
    pub retry_backoff_max: u64,
    /// factor by which the backoff bound grows per 429 response
    pub retry_backoff_base: f64,
    pub user_agent: Option<String>,
    /// whether transient failures are reported as warnings
    pub enable_warnings: bool,
}

impl Default for FetcherConfig {
    fn default()->Self {
        FetcherConfig {
            max_connections: 50,
            num_retries: 200,
            retry_backoff_max: 40,
            retry_backoff_base: 1.001,
            user_agent: None,
            enable_warnings: false,
        }
    }
}

/// a shared GET client that recovers from throttling (429) with jittered exponential backoff
/// and treats server errors as transient unavailability (None result, caller decides)
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    limiter: Semaphore,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new (config: FetcherConfig)->Result<Self> {
        let mut builder = Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent( user_agent.clone());
        }
        let client = builder.build()?;
        let limiter = Semaphore::new( config.max_connections);

        Ok( HttpFetcher { client, limiter, config } )
    }

    /// issue a GET, following the portal retry protocol:
    /// 200 -> response, 5xx -> None, 429 -> sleep retry-after plus jitter and retry,
    /// anything else -> None. Transport level errors count as failed attempts
    pub async fn get_response (&self, url: &str)->Option<Response> {
        let _permit = self.limiter.acquire().await.ok()?;
        self.retrying_get( url).await
    }

    /// GET the full response body
    pub async fn get_bytes (&self, url: &str)->Option<Bytes> {
        let _permit = self.limiter.acquire().await.ok()?;
        let response = self.retrying_get( url).await?;
        response.bytes().await.ok()
    }

    /// GET the response body as UTF-8 text
    pub async fn get_text (&self, url: &str)->Option<String> {
        let bytes = self.get_bytes( url).await?;
        String::from_utf8( bytes.to_vec()).ok()
    }

    /// GET and JSON-decode the response body
    pub async fn get_json<T> (&self, url: &str)->Option<T> where T: DeserializeOwned {
        let _permit = self.limiter.acquire().await.ok()?;
        let response = self.retrying_get( url).await?;
        let bytes = response.bytes().await.ok()?;
        match serde_json::from_slice( &bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("malformed JSON response from {url}: {e}");
                None
            }
        }
    }

    async fn retrying_get (&self, url: &str)->Option<Response> {
        let mut backoff_max = self.config.retry_backoff_max as f64;

        for attempt in 0..self.config.num_retries {
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("request to {url} failed at attempt {attempt}: {e}");
                    continue;
                }
            };

            match response.status() {
                StatusCode::OK => {
                    return Some(response)
                }
                status if status.is_server_error() => {
                    if self.config.enable_warnings {
                        warn!("error {}: cannot access url {url}", status.as_u16());
                    }
                    return None
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after: u64 = response.headers().get(RETRY_AFTER)
                        .and_then( |v| v.to_str().ok())
                        .and_then( |s| s.parse().ok())
                        .unwrap_or(100);
                    let backoff = rand::random::<f64>() * backoff_max;
                    let retry_total = retry_after as f64 + backoff;
                    if self.config.enable_warnings {
                        warn!("error 429: too many requests, attempt {} of {} retries after {:.2} ms",
                              attempt + 1, self.config.num_retries, retry_total);
                    }
                    tokio::time::sleep( millis( retry_total as u64)).await;
                    backoff_max *= self.config.retry_backoff_base;
                }
                _other => {
                    break
                }
            }
        }
        None
    }
}
