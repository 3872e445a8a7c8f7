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

use serde::{Deserialize, Serialize};
use std::fmt;

/* #region GeoRect **********************************************************************************/

/// a geographic rectangle in plain decimal degrees (west,south,east,north).
/// This is all we need for catalog bounding boxes - no geodetic math is performed on it
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq)]
pub struct GeoRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoRect {
    pub fn from_wsen (west: f64, south: f64, east: f64, north: f64)->Self {
        GeoRect { west, south, east, north }
    }

    #[inline] pub fn west (&self)->f64 { self.west }
    #[inline] pub fn south (&self)->f64 { self.south }
    #[inline] pub fn east (&self)->f64 { self.east }
    #[inline] pub fn north (&self)->f64 { self.north }

    /// (minx,miny,maxx,maxy) tuple in the order catalog queries use
    pub fn as_wsen (&self)->(f64,f64,f64,f64) {
        (self.west, self.south, self.east, self.north)
    }

    pub fn intersects (&self, other: &GeoRect)->bool {
        !self.is_disjoint(other)
    }

    pub fn is_disjoint (&self, other: &GeoRect)->bool {
        self.west > other.east || self.east < other.west ||
        self.south > other.north || self.north < other.south
    }

    pub fn contains (&self, lon: f64, lat: f64)->bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

impl fmt::Display for GeoRect {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!(f, "[{},{},{},{}]", self.west, self.south, self.east, self.north)
    }
}

/* #endregion GeoRect */
