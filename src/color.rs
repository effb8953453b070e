/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

const RESET: &str = "\x1b[0m";

const RED: u8 = 31;
const GREEN: u8 = 32;
const YELLOW: u8 = 33;
const BLUE: u8 = 34;
const CYAN: u8 = 36;

// Lower-cased verbs with their own color. Everything else is BLUE.
const METHOD_COLORS: &[(&str, u8)] = &[
    ("get", GREEN),
    ("delete", RED),
    ("put", CYAN),
    ("post", YELLOW),
];

/// Lower-case an HTTP method and wrap it in a bold ANSI color.
pub fn method(method: &str) -> String {
    let verb = method.to_lowercase();
    let color = METHOD_COLORS
        .iter()
        .find(|(name, _)| *name == verb)
        .map_or(BLUE, |(_, c)| *c);

    format!("\x1b[1;{}m{}{}", color, verb, RESET)
}

/// Color a status code by class: 5xx red, 4xx yellow, 3xx cyan, anything lower green.
/// Returns `None` when there is no status code; `0` counts as none.
pub fn status_code(code: Option<u16>) -> Option<String> {
    let code = code.filter(|c| *c != 0)?;
    let color = match code {
        500..=u16::MAX => RED,
        400..=499 => YELLOW,
        300..=399 => CYAN,
        _ => GREEN,
    };

    Some(format!("\x1b[{}m{}{}", color, code, RESET))
}
