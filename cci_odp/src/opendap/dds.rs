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

//! parser for the textual OPeNDAP Dataset Descriptor Structure (DDS), e.g.
//! ```text
//! Dataset {
//!     Float32 lat[lat = 3600];
//!     Grid {
//!      ARRAY:
//!         Int16 analysed_sst[time = 1][lat = 3600][lon = 7200];
//!      MAPS:
//!         Int32 time[time = 1];
//!         Float32 lat[lat = 3600];
//!         Float32 lon[lon = 7200];
//!     } analysed_sst;
//! } esacci-sst.nc;
//! ```

use crate::errors::{dds_error, Result};
use super::{BaseVar, DapDataset, DapNode, DataType, GridVar, SeqVar, StructVar};
use std::collections::HashMap;

/* #region lexer ************************************************************************************/

#[derive(Debug,Clone,PartialEq)]
enum Tok {
    Sym(char),
    Word(String),
}

const SYM_CHARS: &str = "{}[];=:";

fn tokenize (text: &str)->Vec<Tok> {
    let mut toks = Vec::new();
    let mut word = String::new();

    for c in text.chars() {
        if c.is_whitespace() || SYM_CHARS.contains(c) {
            if !word.is_empty() {
                toks.push( Tok::Word( std::mem::take(&mut word)));
            }
            if SYM_CHARS.contains(c) {
                toks.push( Tok::Sym(c));
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        toks.push( Tok::Word(word));
    }
    toks
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek (&self)->Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next (&mut self)->Result<Tok> {
        let tok = self.toks.get(self.pos).cloned().ok_or_else( || dds_error("unexpected end of DDS"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn next_word (&mut self)->Result<String> {
        match self.next()? {
            Tok::Word(w) => Ok(w),
            other => Err( dds_error( format!("expected name, got {other:?}")))
        }
    }

    fn expect_sym (&mut self, c: char)->Result<()> {
        match self.next()? {
            Tok::Sym(s) if s == c => Ok(()),
            other => Err( dds_error( format!("expected '{c}', got {other:?}")))
        }
    }

    fn expect_word_ci (&mut self, w: &str)->Result<()> {
        match self.next()? {
            Tok::Word(s) if s.eq_ignore_ascii_case(w) => Ok(()),
            other => Err( dds_error( format!("expected '{w}', got {other:?}")))
        }
    }

    fn peek_sym (&self, c: char)->bool {
        matches!( self.peek(), Some(Tok::Sym(s)) if *s == c)
    }
}

/* #endregion lexer */

/* #region parser ***********************************************************************************/

/// parse a DDS text into a [`DapDataset`] skeleton (no attributes, no URL state yet)
pub fn parse_dds (text: &str)->Result<DapDataset> {
    let mut p = Parser { toks: tokenize(text), pos: 0 };

    p.expect_word_ci("Dataset")?;
    p.expect_sym('{')?;

    let mut nodes = Vec::new();
    while !p.peek_sym('}') {
        nodes.push( parse_declaration( &mut p)?);
    }
    p.expect_sym('}')?;
    let name = p.next_word()?;
    if p.peek_sym(';') { p.expect_sym(';')?; }

    let mut dataset = DapDataset { name, nodes, ..Default::default() };
    for node in dataset.nodes.iter_mut() {
        rebase_ids( node, "");
    }
    Ok(dataset)
}

fn parse_declaration (p: &mut Parser)->Result<DapNode> {
    let keyword = p.next_word()?;

    if let Some(dtype) = DataType::from_dds_keyword( &keyword) {
        return Ok( DapNode::Base( parse_base( p, dtype)?) )
    }
    match keyword.as_str() {
        "Grid" => parse_grid(p),
        "Structure" => parse_container( p, false),
        "Sequence" => parse_container( p, true),
        other => Err( dds_error( format!("unknown type keyword '{other}'")))
    }
}

fn parse_base (p: &mut Parser, dtype: DataType)->Result<BaseVar> {
    let name = p.next_word()?;
    let mut dims = Vec::new();
    let mut shape = Vec::new();

    while p.peek_sym('[') {
        p.expect_sym('[')?;
        let word = p.next_word()?;
        if p.peek_sym('=') { // named dimension: [name = size]
            p.expect_sym('=')?;
            let size = parse_size( p.next_word()?)?;
            dims.push(word);
            shape.push(size);
        } else { // anonymous dimension: [size]
            dims.push( String::new());
            shape.push( parse_size(word)?);
        }
        p.expect_sym(']')?;
    }
    p.expect_sym(';')?;

    Ok( BaseVar { id: name.clone(), name, dtype, dims, shape, attributes: HashMap::new(), slice: None } )
}

fn parse_grid (p: &mut Parser)->Result<DapNode> {
    p.expect_sym('{')?;
    p.expect_word_ci("Array")?;
    p.expect_sym(':')?;

    let array = match parse_declaration(p)? {
        DapNode::Base(v) => v,
        _ => return Err( dds_error("grid array must be an atomic variable"))
    };

    p.expect_word_ci("Maps")?;
    p.expect_sym(':')?;

    let mut maps = Vec::new();
    while !p.peek_sym('}') {
        match parse_declaration(p)? {
            DapNode::Base(v) => maps.push(v),
            _ => return Err( dds_error("grid map must be an atomic variable"))
        }
    }
    p.expect_sym('}')?;
    let name = p.next_word()?;
    p.expect_sym(';')?;

    Ok( DapNode::Grid( GridVar { id: name.clone(), name, array, maps, attributes: HashMap::new() }) )
}

fn parse_container (p: &mut Parser, is_sequence: bool)->Result<DapNode> {
    p.expect_sym('{')?;
    let mut members = Vec::new();
    while !p.peek_sym('}') {
        members.push( parse_declaration(p)?);
    }
    p.expect_sym('}')?;
    let name = p.next_word()?;
    p.expect_sym(';')?;

    if is_sequence {
        Ok( DapNode::Sequence( SeqVar { id: name.clone(), name, members, attributes: HashMap::new() }) )
    } else {
        Ok( DapNode::Structure( StructVar { id: name.clone(), name, members, attributes: HashMap::new() }) )
    }
}

fn parse_size (word: String)->Result<usize> {
    word.parse().map_err( |_| dds_error( format!("invalid dimension size '{word}'")))
}

/// set fully qualified ids once the (trailing) container names are known
fn rebase_ids (node: &mut DapNode, parent: &str) {
    let qualify = |name: &str| if parent.is_empty() { name.to_string() } else { format!("{parent}.{name}") };

    match node {
        DapNode::Base(v) => {
            v.id = qualify(&v.name);
        }
        DapNode::Grid(g) => {
            g.id = qualify(&g.name);
            g.array.id = format!("{}.{}", g.id, g.array.name);
            for m in g.maps.iter_mut() {
                m.id = format!("{}.{}", g.id, m.name);
            }
        }
        DapNode::Structure(s) => {
            s.id = qualify(&s.name);
            let id = s.id.clone();
            for member in s.members.iter_mut() {
                rebase_ids( member, &id);
            }
        }
        DapNode::Sequence(s) => {
            s.id = qualify(&s.name);
            let id = s.id.clone();
            for member in s.members.iter_mut() {
                rebase_ids( member, &id);
            }
        }
    }
}

/* #endregion parser */
