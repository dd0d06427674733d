// SPDX-License-Identifier: Apache-2.0

use serde::Serializer;

pub(crate) fn is_option_string_empty(data: &Option<String>) -> bool {
    data.as_deref().map_or(true, str::is_empty)
}

pub(crate) fn option_u16_as_hex<S>(
    data: &Option<u16>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        // Zero padded to 4 hex digits, like `0x8100`.
        Some(v) => serializer.serialize_str(&format!("{v:#06x}")),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn option_u32_as_hex<S>(
    data: &Option<u32>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        Some(v) => serializer.serialize_str(&format!("{v:#x}")),
        None => serializer.serialize_none(),
    }
}
