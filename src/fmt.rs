/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use crate::Event;

/// `EventFormatter` implementations marshal an event to a single newline-terminated line. This
/// trait can be implemented to customize what a `Formatter` writes to its sink. By default, this
/// crate provides a logfmt `EventFormatter` implementation, which is used by default.
pub trait EventFormatter: Send + Sync {
    fn write_event(&self, dst: &mut String, event: &Event) -> std::fmt::Result;
}
