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

use chrono::{DateTime, Datelike, Duration as TimeDelta, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// the timestamp wire format used by the CCI OpenSearch service throughout
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// sentinel bounds for unconstrained time windows
pub const EARLY_START_TIME: &str = "1000-01-01T00:00:00";
pub const LATE_END_TIME: &str = "3000-12-31T23:59:59";

// as of Rust 1.87 the min,hour,day Duration ctors are experimental, hence our own wrappers
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }
#[inline] pub fn hours (n: u64)->Duration { Duration::from_secs(n * 3600) }

/* #region unit deltas ******************************************************************************/

/// calendar-aware delta implied by a detected filename time format. A date-only instant
/// extends to the end of its unit minus one second, a fully specified instant carries
/// a zero delta
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,Default)]
pub struct UnitDelta {
    pub years: i32,
    pub months: i32,
    pub days: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl UnitDelta {
    pub const ZERO: UnitDelta = UnitDelta { years: 0, months: 0, days: 0, minutes: 0, seconds: 0 };

    pub fn is_zero (&self)->bool {
        *self == Self::ZERO
    }

    /// apply calendar components first (year, month), then the fixed-length ones
    pub fn apply_to (&self, dt: DateTime<Utc>)->DateTime<Utc> {
        let mut t = dt;
        let months = self.years * 12 + self.months;
        if months > 0 {
            t = t + Months::new( months as u32);
        } else if months < 0 {
            t = t - Months::new( (-months) as u32);
        }
        t + TimeDelta::days(self.days) + TimeDelta::minutes(self.minutes) + TimeDelta::seconds(self.seconds)
    }
}

/* #endregion unit deltas */

/* #region filename time formats ********************************************************************/

lazy_static! {
    // ordered longest-first so that a fully specified instant is never shadowed by one of its prefixes
    static ref RE_TO_DATETIME_FORMATS: Vec<(Regex,&'static str,UnitDelta)> = vec![
        (Regex::new(r"\d{14}").unwrap(), "%Y%m%d%H%M%S", UnitDelta::ZERO),
        (Regex::new(r"\d{12}").unwrap(), "%Y%m%d%H%M", UnitDelta{ minutes: 1, seconds: -1, ..UnitDelta::ZERO }),
        (Regex::new(r"\d{8}").unwrap(), "%Y%m%d", UnitDelta{ days: 1, seconds: -1, ..UnitDelta::ZERO }),
        (Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(), "%Y-%m-%d", UnitDelta{ days: 1, seconds: -1, ..UnitDelta::ZERO }),
        (Regex::new(r"\d{6}").unwrap(), "%Y%m", UnitDelta{ months: 1, seconds: -1, ..UnitDelta::ZERO }),
        (Regex::new(r"\d{4}").unwrap(), "%Y", UnitDelta{ years: 1, seconds: -1, ..UnitDelta::ZERO }),
    ];
}

/// detect the first datetime embedded in a filename. Returns the strftime-style format,
/// the byte span of the match and the implied duration of the detected unit
pub fn find_datetime_format (name: &str)->Option<(&'static str,usize,usize,UnitDelta)> {
    for (re, time_format, delta) in RE_TO_DATETIME_FORMATS.iter() {
        if let Some(m) = re.find(name) {
            return Some( (time_format, m.start(), m.end(), *delta) )
        }
    }
    None
}

/// parse a time string for one of the supported filename formats. Unspecified fields
/// default to the begin of the respective unit
pub fn parse_timestring (s: &str, time_format: &str)->Option<DateTime<Utc>> {
    let ndt = match time_format {
        "%Y" => {
            let year: i32 = s.parse().ok()?;
            NaiveDate::from_ymd_opt( year, 1, 1)?.and_hms_opt(0, 0, 0)?
        }
        "%Y%m" => {
            let year: i32 = s.get(0..4)?.parse().ok()?;
            let month: u32 = s.get(4..6)?.parse().ok()?;
            NaiveDate::from_ymd_opt( year, month, 1)?.and_hms_opt(0, 0, 0)?
        }
        "%Y%m%d" | "%Y-%m-%d" => {
            NaiveDate::parse_from_str( s, time_format).ok()?.and_hms_opt(0, 0, 0)?
        }
        "%Y%m%d%H%M" | "%Y%m%d%H%M%S" => {
            NaiveDateTime::parse_from_str( s, time_format).ok()?
        }
        other => {
            NaiveDateTime::parse_from_str( s, other).ok()?
        }
    };
    Some( DateTime::from_naive_utc_and_offset( ndt, Utc) )
}

/// extract a (start,end) time range from a filename. If the name carries two instants the
/// second one bounds the range, otherwise the implied unit duration of the first one does
pub fn find_time_range (name: &str)->Option<(DateTime<Utc>,DateTime<Utc>)> {
    let (time_format, p1, p2, delta) = find_datetime_format(name)?;
    let start = parse_timestring( &name[p1..p2], time_format)?;

    let rest = &name[p2..];
    if let Some((fmt2, q1, q2, delta2)) = find_datetime_format(rest) {
        if let Some(second) = parse_timestring( &rest[q1..q2], fmt2) {
            if second >= start {
                return Some( (start, delta2.apply_to(second)) )
            }
        }
    }
    Some( (start, delta.apply_to(start)) )
}

/// parse a datetime that is embedded somewhere in the given string
pub fn parse_datetime_lenient (s: &str)->Option<DateTime<Utc>> {
    let (time_format, p1, p2, _) = find_datetime_format(s)?;
    parse_timestring( &s[p1..p2], time_format)
}

/* #endregion filename time formats */

/* #region wire timestamps **************************************************************************/

pub fn format_timestamp (dt: &DateTime<Utc>)->String {
    format!("{}", dt.format(TIMESTAMP_FORMAT))
}

pub fn parse_timestamp (s: &str)->Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str( s, TIMESTAMP_FORMAT).ok()
        .map( |ndt| DateTime::from_naive_utc_and_offset( ndt, Utc))
}

/// parse a wire timestamp that might carry fractional seconds or a timezone suffix
pub fn parse_timestamp_lenient (s: &str)->Option<DateTime<Utc>> {
    let s = s.split('.').next().unwrap_or(s);
    let s = s.split('+').next().unwrap_or(s);
    parse_timestamp( s.trim_end_matches('Z'))
}

/* #endregion wire timestamps */
