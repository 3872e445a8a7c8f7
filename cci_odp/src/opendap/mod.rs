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

//! OPeNDAP protocol support. A remote file is described by a `.dds` (structure), a `.das`
//! (attributes) and read through `.dods` hyperslab requests that return an ASCII DDS copy
//! followed by an XDR encoded binary payload.
//!
//! Variable descriptors are immutable once a data set is built - applying a projection
//! produces constrained proxies and the effective slice is recomputed per request, the
//! remote nodes are never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::IntoStaticStr;

pub mod dds;
pub mod das;
pub mod xdr;
pub mod client;

/* #region attributes *******************************************************************************/

pub type AttrMap = HashMap<String,AttrValue>;

/// an attribute value as declared by a DAS - a typed scalar, a list of those, or a
/// nested attribute container
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    List(Vec<AttrValue>),
    Map(AttrMap),
}

impl AttrValue {
    pub fn as_str (&self)->Option<&str> {
        if let AttrValue::Str(s) = self { Some(s.as_str()) } else { None }
    }

    pub fn as_f64 (&self)->Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::UInt(v) => Some(*v as f64),
            _ => None
        }
    }

    pub fn as_i64 (&self)->Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None
        }
    }

    pub fn is_numeric (&self)->bool {
        matches!( self, AttrValue::Int(_) | AttrValue::UInt(_) | AttrValue::Float(_))
    }

    /// interpret as a list of array sizes (single ints are broadcast to one element)
    pub fn as_usize_list (&self)->Option<Vec<usize>> {
        match self {
            AttrValue::Int(v) if *v >= 0 => Some( vec![*v as usize]),
            AttrValue::UInt(v) => Some( vec![*v as usize]),
            AttrValue::List(items) => {
                let mut sizes = Vec::with_capacity( items.len());
                for item in items {
                    sizes.push( item.as_i64().filter( |v| *v >= 0)? as usize);
                }
                Some(sizes)
            }
            _ => None
        }
    }
}

/* #endregion attributes */

/* #region data types *******************************************************************************/

/// portable element type of a remote variable. The wire level DDS keywords map onto these,
/// with `String`/`Url` represented as byte strings
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,Hash,IntoStaticStr)]
#[serde(rename_all="lowercase")]
#[strum(serialize_all="lowercase")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    #[serde(rename="bytes1024")]
    #[strum(serialize="bytes1024")]
    ByteString,
}

impl DataType {
    pub fn from_dds_keyword (kw: &str)->Option<DataType> {
        match kw {
            "Byte" => Some(DataType::UInt8),
            "Int16" => Some(DataType::Int16),
            "UInt16" => Some(DataType::UInt16),
            "Int32" => Some(DataType::Int32),
            "UInt32" => Some(DataType::UInt32),
            "Float32" => Some(DataType::Float32),
            "Float64" => Some(DataType::Float64),
            "String" | "Url" => Some(DataType::ByteString),
            _ => None
        }
    }

    pub fn name (&self)->&'static str {
        self.into()
    }

    pub fn is_integer (&self)->bool {
        use DataType::*;
        matches!( self, Int8|Int16|Int32|Int64|UInt8|UInt16|UInt32|UInt64)
    }

    pub fn is_float (&self)->bool {
        matches!( self, DataType::Float32 | DataType::Float64)
    }

    /// the fixed widening table applied when a variable carries no fill value, so that
    /// a synthesized one cannot collide with valid data
    pub fn promoted (&self)->Option<DataType> {
        use DataType::*;
        match self {
            Int8 => Some(Int16),
            Int16 => Some(Int32),
            Int32 => Some(Int64),
            UInt8 => Some(UInt16),
            UInt16 => Some(UInt32),
            UInt32 => Some(UInt64),
            Float32 => Some(Float32),
            Float64 => Some(Float64),
            _ => None
        }
    }

    /// the synthesized fill value for a promoted type: integer max, or NaN for floats
    pub fn default_fill (&self)->Option<AttrValue> {
        use DataType::*;
        match self {
            Int8 => Some( AttrValue::Int(i8::MAX as i64)),
            Int16 => Some( AttrValue::Int(i16::MAX as i64)),
            Int32 => Some( AttrValue::Int(i32::MAX as i64)),
            Int64 => Some( AttrValue::Int(i64::MAX)),
            UInt8 => Some( AttrValue::UInt(u8::MAX as u64)),
            UInt16 => Some( AttrValue::UInt(u16::MAX as u64)),
            UInt32 => Some( AttrValue::UInt(u32::MAX as u64)),
            UInt64 => Some( AttrValue::UInt(u64::MAX)),
            Float32 | Float64 => Some( AttrValue::Float(f64::NAN)),
            ByteString => None
        }
    }

    /// element size of the canonical little-endian in-memory representation
    pub fn byte_size (&self)->usize {
        use DataType::*;
        match self {
            Int8 | UInt8 => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 => 4,
            Int64 | UInt64 | Float64 => 8,
            ByteString => 1,
        }
    }
}

/* #endregion data types */

/* #region slices ***********************************************************************************/

/// per-dimension sub-selection request, mirroring the inbound chunk contract
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum SliceSpec {
    All,
    Range(usize,usize), // [start,stop)
    Index(usize),
}

/// a resolved per-dimension selection with exclusive stop index
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct DimSlice {
    pub start: usize,
    pub stride: usize,
    pub stop: usize,
}

impl DimSlice {
    pub fn full (len: usize)->Self {
        DimSlice { start: 0, stride: 1, stop: len }
    }

    pub fn len (&self)->usize {
        if self.stop > self.start {
            (self.stop - self.start + self.stride - 1) / self.stride
        } else {
            0
        }
    }
}

pub fn full_slice (shape: &[usize])->Vec<DimSlice> {
    shape.iter().map( |n| DimSlice::full(*n)).collect()
}

/// resolve requested sub-selections against a shape: missing trailing dimensions become
/// full slices and bounds are clamped to the dimension size
pub fn fix_slice (specs: &[SliceSpec], shape: &[usize])->Vec<DimSlice> {
    let mut slices = Vec::with_capacity( shape.len());
    for (i, len) in shape.iter().enumerate() {
        let slice = match specs.get(i) {
            Some(SliceSpec::All) | None => DimSlice::full(*len),
            Some(SliceSpec::Range(start,stop)) => {
                let start = (*start).min(*len);
                let stop = (*stop).min(*len).max(start);
                DimSlice { start, stride: 1, stop }
            }
            Some(SliceSpec::Index(idx)) => {
                let start = (*idx).min( len.saturating_sub(1));
                DimSlice { start, stride: 1, stop: start + 1 }
            }
        };
        slices.push(slice);
    }
    slices
}

/// compose a secondary selection with an already applied one, per dimension:
/// the result addresses `b` relative to the elements selected by `a`
pub fn combine_slices (a: &[DimSlice], b: &[DimSlice])->Vec<DimSlice> {
    let mut combined = Vec::with_capacity( a.len());
    for i in 0..a.len() {
        let outer = a[i];
        let inner = b.get(i).copied().unwrap_or( DimSlice::full( outer.len()));
        let start = outer.start + inner.start * outer.stride;
        let stride = outer.stride * inner.stride;
        let stop = (outer.start + inner.stop * outer.stride).min( outer.stop);
        combined.push( DimSlice { start, stride, stop: stop.max(start) });
    }
    combined
}

/// encode slices as an OPeNDAP hyperslab projection suffix. Note OPeNDAP stop indices
/// are inclusive
pub fn hyperslab (slices: &[DimSlice])->String {
    let mut s = String::new();
    for slice in slices {
        if slice.stop > slice.start {
            s.push_str( &format!("[{}:{}:{}]", slice.start, slice.stride, slice.stop - 1));
        } else {
            s.push_str( &format!("[{}:{}:{}]", slice.start, slice.stride, slice.start));
        }
    }
    s
}

/// number of elements selected by the given slices
pub fn slice_count (slices: &[DimSlice])->usize {
    slices.iter().map( |s| s.len()).product()
}

/* #endregion slices */

/* #region data set model ***************************************************************************/

/// an atomic (leaf) variable of a remote data set
#[derive(Debug,Clone)]
pub struct BaseVar {
    pub name: String,
    /// fully qualified id ("grid.array" for grid components)
    pub id: String,
    pub dtype: DataType,
    /// dimension names as declared (may be empty for anonymous dimensions)
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: AttrMap,
    /// projection constraint carried over from the data set URL, if any
    pub slice: Option<Vec<DimSlice>>,
}

impl BaseVar {
    pub fn size (&self)->usize {
        if self.shape.is_empty() { 1 } else { self.shape.iter().product() }
    }
}

/// a grid variable: a data array plus one map vector per dimension
#[derive(Debug,Clone)]
pub struct GridVar {
    pub name: String,
    pub id: String,
    pub array: BaseVar,
    pub maps: Vec<BaseVar>,
    pub attributes: AttrMap,
}

#[derive(Debug,Clone)]
pub struct StructVar {
    pub name: String,
    pub id: String,
    pub members: Vec<DapNode>,
    pub attributes: AttrMap,
}

/// a sequence node. The proxy state is the id plus the selection of the owning data set,
/// record decoding happens in `xdr`
#[derive(Debug,Clone)]
pub struct SeqVar {
    pub name: String,
    pub id: String,
    pub members: Vec<DapNode>,
    pub attributes: AttrMap,
}

#[derive(Debug,Clone)]
pub enum DapNode {
    Base(BaseVar),
    Grid(GridVar),
    Structure(StructVar),
    Sequence(SeqVar),
}

impl DapNode {
    pub fn name (&self)->&str {
        match self {
            DapNode::Base(v) => &v.name,
            DapNode::Grid(v) => &v.name,
            DapNode::Structure(v) => &v.name,
            DapNode::Sequence(v) => &v.name,
        }
    }

    pub fn attributes (&self)->&AttrMap {
        match self {
            DapNode::Base(v) => &v.attributes,
            DapNode::Grid(v) => &v.attributes,
            DapNode::Structure(v) => &v.attributes,
            DapNode::Sequence(v) => &v.attributes,
        }
    }

    pub fn attributes_mut (&mut self)->&mut AttrMap {
        match self {
            DapNode::Base(v) => &mut v.attributes,
            DapNode::Grid(v) => &mut v.attributes,
            DapNode::Structure(v) => &mut v.attributes,
            DapNode::Sequence(v) => &mut v.attributes,
        }
    }

    /// the array view of this node - the node itself for atomic variables, the data
    /// array for grids. Structures and sequences have none
    pub fn as_array (&self)->Option<&BaseVar> {
        match self {
            DapNode::Base(v) => Some(v),
            DapNode::Grid(v) => Some(&v.array),
            _ => None
        }
    }
}

/// the effective read descriptor for one leaf variable - everything a `.dods` request needs
#[derive(Debug,Clone,Copy)]
pub struct BaseProxy<'a> {
    pub base_url: &'a str,
    pub id: &'a str,
    pub dtype: DataType,
    pub shape: &'a [usize],
    pub slice: Option<&'a [DimSlice]>,
    pub selection: &'a [String],
}

/// the parsed representation of one remote file, built from its DDS and DAS
#[derive(Debug,Clone,Default)]
pub struct DapDataset {
    pub name: String,
    /// data URL without any constraint expression
    pub base_url: String,
    /// selection clauses of the original URL (projections are absorbed into var slices)
    pub selection: Vec<String>,
    /// declaration ordered - XDR payloads decode in this order
    pub nodes: Vec<DapNode>,
    /// global attribute containers (NC_GLOBAL etc.)
    pub attributes: HashMap<String,AttrMap>,
}

impl DapDataset {
    pub fn get (&self, name: &str)->Option<&DapNode> {
        self.nodes.iter().find( |n| n.name() == name)
    }

    pub fn get_mut (&mut self, name: &str)->Option<&mut DapNode> {
        self.nodes.iter_mut().find( |n| n.name() == name)
    }

    pub fn contains (&self, name: &str)->bool {
        self.get(name).is_some()
    }

    pub fn keys (&self)->impl Iterator<Item=&str> {
        self.nodes.iter().map( |n| n.name())
    }

    /// resolve a (possibly dotted) variable path to its data-carrying leaf.
    /// A bare grid name resolves to the grid's data array
    pub fn leaf (&self, path: &str)->Option<&BaseVar> {
        let mut segs = path.split('.');
        let first = segs.next()?;
        let node = self.get(first)?;

        match node {
            DapNode::Base(v) => Some(v),
            DapNode::Grid(g) => {
                match segs.next() {
                    None => Some(&g.array),
                    Some(seg) if seg == g.array.name => Some(&g.array),
                    Some(seg) => g.maps.iter().find( |m| m.name == seg),
                }
            }
            DapNode::Structure(s) => {
                let seg = segs.next()?;
                for member in &s.members {
                    if member.name() == seg {
                        return member.as_array()
                    }
                }
                None
            }
            DapNode::Sequence(_) => None,
        }
    }

    /// the read descriptor for a variable - the spec level "BaseProxy"
    pub fn proxy (&self, var_name: &str)->Option<BaseProxy<'_>> {
        let leaf = self.leaf(var_name)?;
        Some( BaseProxy {
            base_url: &self.base_url,
            id: &leaf.id,
            dtype: leaf.dtype,
            shape: &leaf.shape,
            slice: leaf.slice.as_deref(),
            selection: &self.selection,
        })
    }
}

/* #endregion data set model */
