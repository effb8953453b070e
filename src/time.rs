/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};

/// Render an epoch-millisecond timestamp as ISO-8601 with millisecond precision.
///
/// UTC output ends in `Z`, local output carries the process's numeric offset. A missing or
/// unrepresentable timestamp is replaced by the current time.
pub fn timestring(millis: Option<i64>, use_utc: bool) -> String {
    let at = match millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        Some(at) => at,
        None => {
            if let Some(ms) = millis {
                log::debug!("timestamp {} is out of range, using the current time", ms);
            }
            Utc::now()
        }
    };

    if use_utc {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    } else {
        DateTime::<Local>::from(at).to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}
