//! ISO-8601 durations as reported in `contentDetails.duration`
//!
//! YouTube uses the `P[nW][nD]T[nH][nM][nS]` subset (`PT4M13S`, `P1DT2H`,
//! `P0D` for live streams). Calendar units (years, months) have no fixed
//! length and are rejected.

use std::time::Duration;

use crate::error::{Error, Result};

pub fn parse_iso8601(input: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(input.to_string());

    let rest = input.strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    let mut time_components = 0;
    // Units must appear at most once, largest first
    let mut last_rank = 0;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                let value: f64 = number.parse().map_err(|_| invalid())?;
                number.clear();
                let (rank, seconds) = match (in_time, unit) {
                    (false, 'W') => (1, 604_800.0),
                    (false, 'D') => (2, 86_400.0),
                    (true, 'H') => (3, 3_600.0),
                    (true, 'M') => (4, 60.0),
                    (true, 'S') => (5, 1.0),
                    _ => return Err(invalid()),
                };
                if rank <= last_rank {
                    return Err(invalid());
                }
                last_rank = rank;
                if in_time {
                    time_components += 1;
                }
                total += value * seconds;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component || (in_time && time_components == 0) {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}
