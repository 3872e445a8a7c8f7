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

//! decoder for the XDR encoded binary tail of a `.dods` response. Everything on the wire is
//! big-endian and 4-byte aligned: atomic arrays are preceded by two u32 counts, byte arrays
//! are padded to 4, 16-bit integers travel as 32-bit, strings are length-prefixed and padded.
//! Decode order is the declaration order of the response DDS.

use crate::errors::{xdr_error, Result};
use super::{BaseVar, DapDataset, DapNode, DataType};
use std::collections::HashMap;

/* #region typed arrays *****************************************************************************/

const START_OF_INSTANCE: u32 = 0x5A000000;
const END_OF_SEQUENCE: u32 = 0xA5000000;

/// a decoded payload of one variable
#[derive(Debug,Clone,PartialEq)]
pub enum DapArray {
    Bytes(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(Vec<String>),
}

impl DapArray {
    pub fn len (&self)->usize {
        match self {
            DapArray::Bytes(v) => v.len(),
            DapArray::Int16(v) => v.len(),
            DapArray::UInt16(v) => v.len(),
            DapArray::Int32(v) => v.len(),
            DapArray::UInt32(v) => v.len(),
            DapArray::Float32(v) => v.len(),
            DapArray::Float64(v) => v.len(),
            DapArray::Text(v) => v.len(),
        }
    }

    pub fn is_empty (&self)->bool {
        self.len() == 0
    }

    fn empty_for (dtype: DataType)->DapArray {
        use DataType::*;
        match dtype {
            Int8 | UInt8 => DapArray::Bytes( Vec::new()),
            Int16 => DapArray::Int16( Vec::new()),
            UInt16 => DapArray::UInt16( Vec::new()),
            Int32 | Int64 => DapArray::Int32( Vec::new()),
            UInt32 | UInt64 => DapArray::UInt32( Vec::new()),
            Float32 => DapArray::Float32( Vec::new()),
            Float64 => DapArray::Float64( Vec::new()),
            ByteString => DapArray::Text( Vec::new()),
        }
    }

    /// numeric view, for small inline coordinate data
    pub fn to_f64_vec (&self)->Option<Vec<f64>> {
        match self {
            DapArray::Bytes(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::Int16(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::UInt16(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::Int32(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::UInt32(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::Float32(v) => Some( v.iter().map( |x| *x as f64).collect()),
            DapArray::Float64(v) => Some( v.clone()),
            DapArray::Text(_) => None,
        }
    }

    /// coerce to the canonical (possibly widened) element type and serialize as a
    /// contiguous little-endian byte block
    pub fn coerce_to_le_bytes (&self, dtype: DataType)->Option<Vec<u8>> {
        match self {
            DapArray::Bytes(v) => write_ints( v.iter().map( |x| *x as i128), dtype),
            DapArray::Int16(v) => write_ints( v.iter().map( |x| *x as i128), dtype),
            DapArray::UInt16(v) => write_ints( v.iter().map( |x| *x as i128), dtype),
            DapArray::Int32(v) => write_ints( v.iter().map( |x| *x as i128), dtype),
            DapArray::UInt32(v) => write_ints( v.iter().map( |x| *x as i128), dtype),
            DapArray::Float32(v) => write_floats( v.iter().map( |x| *x as f64), dtype),
            DapArray::Float64(v) => write_floats( v.iter().copied(), dtype),
            DapArray::Text(_) => None,
        }
    }
}

fn write_ints (it: impl Iterator<Item=i128>, dtype: DataType)->Option<Vec<u8>> {
    let mut out = Vec::new();
    use DataType::*;
    for x in it {
        match dtype {
            Int8 => out.extend_from_slice( &(x as i8).to_le_bytes()),
            Int16 => out.extend_from_slice( &(x as i16).to_le_bytes()),
            Int32 => out.extend_from_slice( &(x as i32).to_le_bytes()),
            Int64 => out.extend_from_slice( &(x as i64).to_le_bytes()),
            UInt8 => out.extend_from_slice( &(x as u8).to_le_bytes()),
            UInt16 => out.extend_from_slice( &(x as u16).to_le_bytes()),
            UInt32 => out.extend_from_slice( &(x as u32).to_le_bytes()),
            UInt64 => out.extend_from_slice( &(x as u64).to_le_bytes()),
            Float32 => out.extend_from_slice( &(x as f32).to_le_bytes()),
            Float64 => out.extend_from_slice( &(x as f64).to_le_bytes()),
            ByteString => return None,
        }
    }
    Some(out)
}

fn write_floats (it: impl Iterator<Item=f64>, dtype: DataType)->Option<Vec<u8>> {
    let mut out = Vec::new();
    use DataType::*;
    for x in it {
        match dtype {
            Float32 => out.extend_from_slice( &(x as f32).to_le_bytes()),
            Float64 => out.extend_from_slice( &x.to_le_bytes()),
            Int8 => out.extend_from_slice( &(x as i8).to_le_bytes()),
            Int16 => out.extend_from_slice( &(x as i16).to_le_bytes()),
            Int32 => out.extend_from_slice( &(x as i32).to_le_bytes()),
            Int64 => out.extend_from_slice( &(x as i64).to_le_bytes()),
            UInt8 => out.extend_from_slice( &(x as u8).to_le_bytes()),
            UInt16 => out.extend_from_slice( &(x as u16).to_le_bytes()),
            UInt32 => out.extend_from_slice( &(x as u32).to_le_bytes()),
            UInt64 => out.extend_from_slice( &(x as u64).to_le_bytes()),
            ByteString => return None,
        }
    }
    Some(out)
}

/* #endregion typed arrays */

/* #region byte reader ******************************************************************************/

pub struct XdrReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub fn new (data: &'a [u8])->Self {
        XdrReader { data, pos: 0 }
    }

    pub fn remaining (&self)->usize {
        self.data.len() - self.pos
    }

    fn take (&mut self, n: usize)->Result<&'a [u8]> {
        if self.remaining() < n {
            return Err( xdr_error( format!("truncated payload, needed {n} bytes at offset {}", self.pos)))
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// read n raw bytes, consuming the 4-byte alignment padding
    fn take_padded (&mut self, n: usize)->Result<&'a [u8]> {
        let bytes = self.take(n)?;
        let pad = (4 - n % 4) % 4;
        if pad > 0 { self.take(pad)?; }
        Ok(bytes)
    }

    pub fn read_u32 (&mut self)->Result<u32> {
        let b = self.take(4)?;
        Ok( u32::from_be_bytes( [b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32 (&mut self)->Result<i32> {
        let b = self.take(4)?;
        Ok( i32::from_be_bytes( [b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32 (&mut self)->Result<f32> {
        let b = self.take(4)?;
        Ok( f32::from_be_bytes( [b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64 (&mut self)->Result<f64> {
        let b = self.take(8)?;
        Ok( f64::from_be_bytes( [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    pub fn read_string (&mut self)->Result<String> {
        let n = self.read_u32()? as usize;
        let bytes = self.take_padded(n)?;
        Ok( String::from_utf8_lossy(bytes).into_owned())
    }
}

/* #endregion byte reader */

/* #region unpacking ********************************************************************************/

/// decode the binary tail of a `.dods` response against the structure declared by its
/// DDS header. Returns the decoded payloads keyed by fully qualified variable id
pub fn unpack_dataset (dataset: &DapDataset, data: &[u8])->Result<HashMap<String,DapArray>> {
    let mut reader = XdrReader::new(data);
    let mut out = HashMap::new();

    for node in &dataset.nodes {
        unpack_node( &mut reader, node, &mut out)?;
    }
    Ok(out)
}

fn unpack_node (r: &mut XdrReader, node: &DapNode, out: &mut HashMap<String,DapArray>)->Result<()> {
    match node {
        DapNode::Base(v) => {
            let data = unpack_base( r, v)?;
            out.insert( v.id.clone(), data);
        }
        DapNode::Grid(g) => {
            let data = unpack_base( r, &g.array)?;
            out.insert( g.array.id.clone(), data);
            for m in &g.maps {
                let data = unpack_base( r, m)?;
                out.insert( m.id.clone(), data);
            }
        }
        DapNode::Structure(s) => {
            for member in &s.members {
                unpack_node( r, member, out)?;
            }
        }
        DapNode::Sequence(s) => {
            unpack_sequence( r, s, out)?;
        }
    }
    Ok(())
}

fn unpack_base (r: &mut XdrReader, v: &BaseVar)->Result<DapArray> {
    if v.shape.is_empty() {
        return unpack_scalar( r, v.dtype)
    }

    let n = r.read_u32()? as usize;
    if v.dtype != DataType::ByteString {
        let n2 = r.read_u32()? as usize;
        if n2 != n {
            return Err( xdr_error( format!("array count mismatch for '{}': {n} vs {n2}", v.id)))
        }
    }
    let declared = v.size();
    if n > declared {
        return Err( xdr_error( format!("array '{}' longer than declared: {n} > {declared}", v.id)))
    }

    use DataType::*;
    let data = match v.dtype {
        Int8 | UInt8 => DapArray::Bytes( r.take_padded(n)?.to_vec()),
        Int16 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_i32()? as i16); }
            DapArray::Int16(values)
        }
        UInt16 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_u32()? as u16); }
            DapArray::UInt16(values)
        }
        Int32 | Int64 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_i32()?); }
            DapArray::Int32(values)
        }
        UInt32 | UInt64 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_u32()?); }
            DapArray::UInt32(values)
        }
        Float32 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_f32()?); }
            DapArray::Float32(values)
        }
        Float64 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_f64()?); }
            DapArray::Float64(values)
        }
        ByteString => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n { values.push( r.read_string()?); }
            DapArray::Text(values)
        }
    };
    Ok(data)
}

fn unpack_scalar (r: &mut XdrReader, dtype: DataType)->Result<DapArray> {
    use DataType::*;
    let data = match dtype {
        Int8 | UInt8 => DapArray::Bytes( r.take_padded(1)?.to_vec()),
        Int16 => DapArray::Int16( vec![ r.read_i32()? as i16 ]),
        UInt16 => DapArray::UInt16( vec![ r.read_u32()? as u16 ]),
        Int32 | Int64 => DapArray::Int32( vec![ r.read_i32()? ]),
        UInt32 | UInt64 => DapArray::UInt32( vec![ r.read_u32()? ]),
        Float32 => DapArray::Float32( vec![ r.read_f32()? ]),
        Float64 => DapArray::Float64( vec![ r.read_f64()? ]),
        ByteString => DapArray::Text( vec![ r.read_string()? ]),
    };
    Ok(data)
}

/// decode sequence records delimited by start-of-instance markers. Only atomic scalar
/// members are supported, which covers what the portal serves
fn unpack_sequence (r: &mut XdrReader, s: &super::SeqVar, out: &mut HashMap<String,DapArray>)->Result<()> {
    let mut columns: Vec<(String,DataType,DapArray)> = Vec::new();
    for member in &s.members {
        match member {
            DapNode::Base(v) if v.shape.is_empty() => {
                columns.push( (v.id.clone(), v.dtype, DapArray::empty_for(v.dtype)));
            }
            other => {
                return Err( xdr_error( format!("unsupported sequence member '{}'", other.name())))
            }
        }
    }

    loop {
        match r.read_u32()? {
            START_OF_INSTANCE => {
                for (_, dtype, acc) in columns.iter_mut() {
                    let value = unpack_scalar( r, *dtype)?;
                    append_scalar( acc, value)?;
                }
            }
            END_OF_SEQUENCE => break,
            other => {
                return Err( xdr_error( format!("invalid sequence marker {other:#010x}")))
            }
        }
    }

    for (id, _, acc) in columns {
        out.insert( id, acc);
    }
    Ok(())
}

fn append_scalar (acc: &mut DapArray, value: DapArray)->Result<()> {
    match (acc, value) {
        (DapArray::Bytes(a), DapArray::Bytes(v)) => a.extend(v),
        (DapArray::Int16(a), DapArray::Int16(v)) => a.extend(v),
        (DapArray::UInt16(a), DapArray::UInt16(v)) => a.extend(v),
        (DapArray::Int32(a), DapArray::Int32(v)) => a.extend(v),
        (DapArray::UInt32(a), DapArray::UInt32(v)) => a.extend(v),
        (DapArray::Float32(a), DapArray::Float32(v)) => a.extend(v),
        (DapArray::Float64(a), DapArray::Float64(v)) => a.extend(v),
        (DapArray::Text(a), DapArray::Text(v)) => a.extend(v),
        _ => return Err( xdr_error("sequence member type mismatch"))
    }
    Ok(())
}

/* #endregion unpacking */
