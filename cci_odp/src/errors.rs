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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CciOdpError>;

#[derive(Error,Debug)]
pub enum CciOdpError {

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("net error {0}")]
    NetError( #[from] cci_common::net::CciNetError),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("serde error {0}")]
    SerdeError( #[from] serde_json::Error),

    #[error("XML error {0}")]
    XmlError( #[from] roxmltree::Error),

    #[error("no such data source {0}")]
    NoSuchDatasetError( String ),

    #[error("malformed DDS: {0}")]
    DdsError( String ),

    #[error("malformed DAS: {0}")]
    DasError( String ),

    #[error("malformed XDR data: {0}")]
    XdrError( String ),

    #[error("schema error: {0}")]
    SchemaError( String ),

    #[error("Misc error {0}")]
    MiscError( String ),
}

pub fn misc_error (msg: impl ToString)->CciOdpError {
    CciOdpError::MiscError(msg.to_string())
}

pub fn dds_error (msg: impl ToString)->CciOdpError {
    CciOdpError::DdsError(msg.to_string())
}

pub fn das_error (msg: impl ToString)->CciOdpError {
    CciOdpError::DasError(msg.to_string())
}

pub fn xdr_error (msg: impl ToString)->CciOdpError {
    CciOdpError::XdrError(msg.to_string())
}

pub fn schema_error (msg: impl ToString)->CciOdpError {
    CciOdpError::SchemaError(msg.to_string())
}

pub fn no_such_dataset (name: impl ToString)->CciOdpError {
    CciOdpError::NoSuchDatasetError(name.to_string())
}
