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

//! parser for the textual OPeNDAP Dataset Attribute Structure (DAS), e.g.
//! ```text
//! Attributes {
//!     analysed_sst {
//!         String units "kelvin";
//!         Int16 _FillValue -32768;
//!         Float32 valid_range -300, 4500;
//!     }
//!     NC_GLOBAL {
//!         String title "ESA SST CCI analysis";
//!     }
//! }
//! ```

use crate::errors::{das_error, Result};
use super::{AttrMap, AttrValue};
use std::collections::HashMap;

/* #region lexer ************************************************************************************/

#[derive(Debug,Clone,PartialEq)]
enum Tok {
    Sym(char),
    Word(String),
    Quoted(String),
}

const SYM_CHARS: &str = "{};,";

fn tokenize (text: &str)->Result<Vec<Tok>> {
    let mut toks = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if SYM_CHARS.contains(c) {
            toks.push( Tok::Sym(c));
            continue;
        }
        if c == '"' {
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some('\\') => {
                        if let Some(escaped) = chars.next() { s.push(escaped) }
                    }
                    Some('"') => break,
                    Some(other) => s.push(other),
                    None => return Err( das_error("unterminated string"))
                }
            }
            toks.push( Tok::Quoted(s));
            continue;
        }

        let mut word = String::new();
        word.push(c);
        while let Some(nc) = chars.peek() {
            if nc.is_whitespace() || SYM_CHARS.contains(*nc) || *nc == '"' {
                break;
            }
            word.push( chars.next().unwrap());
        }
        toks.push( Tok::Word(word));
    }
    Ok(toks)
}

/* #endregion lexer */

/* #region parser ***********************************************************************************/

const TYPE_KEYWORDS: &[&str] = &[
    "Byte", "Int16", "UInt16", "Int32", "UInt32", "Float32", "Float64", "String", "Url"
];

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek (&self)->Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next (&mut self)->Result<Tok> {
        let tok = self.toks.get(self.pos).cloned().ok_or_else( || das_error("unexpected end of DAS"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn next_word (&mut self)->Result<String> {
        match self.next()? {
            Tok::Word(w) => Ok(w),
            other => Err( das_error( format!("expected name, got {other:?}")))
        }
    }

    fn expect_sym (&mut self, c: char)->Result<()> {
        match self.next()? {
            Tok::Sym(s) if s == c => Ok(()),
            other => Err( das_error( format!("expected '{c}', got {other:?}")))
        }
    }

    fn peek_sym (&self, c: char)->bool {
        matches!( self.peek(), Some(Tok::Sym(s)) if *s == c)
    }
}

/// parse a DAS text into its top level attribute containers, in declaration order
pub fn parse_das (text: &str)->Result<Vec<(String,AttrMap)>> {
    let mut p = Parser { toks: tokenize(text)?, pos: 0 };

    match p.next()? {
        Tok::Word(w) if w.eq_ignore_ascii_case("Attributes") => {}
        other => return Err( das_error( format!("expected 'Attributes', got {other:?}")))
    }
    p.expect_sym('{')?;

    let mut containers = Vec::new();
    while !p.peek_sym('}') {
        let name = p.next_word()?;
        let attrs = parse_container( &mut p)?;
        containers.push( (name, attrs));
    }
    p.expect_sym('}')?;

    Ok(containers)
}

fn parse_container (p: &mut Parser)->Result<AttrMap> {
    p.expect_sym('{')?;
    let mut attrs: AttrMap = HashMap::new();

    while !p.peek_sym('}') {
        let word = p.next_word()?;

        if p.peek_sym('{') { // nested attribute container
            let nested = parse_container(p)?;
            attrs.insert( word, AttrValue::Map(nested));
        } else if TYPE_KEYWORDS.contains(&word.as_str()) {
            let name = p.next_word()?;
            let value = parse_values( p, &word)?;
            attrs.insert( name, value);
        } else {
            return Err( das_error( format!("unknown attribute type '{word}'")))
        }
    }
    p.expect_sym('}')?;

    Ok(attrs)
}

fn parse_values (p: &mut Parser, attr_type: &str)->Result<AttrValue> {
    let mut values = Vec::new();
    loop {
        let value = match p.next()? {
            Tok::Quoted(s) => AttrValue::Str(s),
            Tok::Word(w) => parse_scalar( &w, attr_type),
            other => return Err( das_error( format!("expected attribute value, got {other:?}")))
        };
        values.push(value);

        match p.next()? {
            Tok::Sym(',') => continue,
            Tok::Sym(';') => break,
            other => return Err( das_error( format!("expected ',' or ';', got {other:?}")))
        }
    }

    if values.len() == 1 {
        Ok( values.pop().unwrap())
    } else {
        Ok( AttrValue::List(values))
    }
}

/// convert a bare token according to the declared attribute type, with string fallback
/// for anything that does not parse
fn parse_scalar (word: &str, attr_type: &str)->AttrValue {
    match attr_type {
        "Float32" | "Float64" => {
            match word {
                "NaN" => AttrValue::Float(f64::NAN),
                "Infinity" => AttrValue::Float(f64::INFINITY),
                "-Infinity" => AttrValue::Float(f64::NEG_INFINITY),
                _ => word.parse::<f64>().map( AttrValue::Float).unwrap_or_else( |_| AttrValue::Str(word.to_string()))
            }
        }
        "Byte" | "Int16" | "Int32" => {
            word.parse::<i64>().map( AttrValue::Int).unwrap_or_else( |_| AttrValue::Str(word.to_string()))
        }
        "UInt16" | "UInt32" => {
            word.parse::<u64>().map( AttrValue::UInt).unwrap_or_else( |_| AttrValue::Str(word.to_string()))
        }
        _ => AttrValue::Str( word.to_string())
    }
}

/* #endregion parser */
