// SPDX-License-Identifier: Apache-2.0

use std::convert::TryFrom;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{de, de::Visitor, Deserialize, Deserializer};

// Integer provided either as number or as string. Strings may carry a
// `0x` prefix for hex. This is inspired by
// https://serde.rs/string-or-struct.html
struct IntegerOrString<T>(PhantomData<fn() -> T>);

impl<'de, T> Visitor<'de> for IntegerOrString<T>
where
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: std::fmt::Display,
    <T as TryFrom<u64>>::Error: std::fmt::Display,
    <T as TryFrom<i64>>::Error: std::fmt::Display,
{
    type Value = T;

    fn expecting(
        &self,
        formatter: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        formatter.write_str("integer or string")
    }

    fn visit_str<E>(self, value: &str) -> Result<T, E>
    where
        E: de::Error,
    {
        if let Some(hex) = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        {
            let num = u64::from_str_radix(hex, 16).map_err(de::Error::custom)?;
            T::try_from(num).map_err(de::Error::custom)
        } else {
            FromStr::from_str(value.trim()).map_err(de::Error::custom)
        }
    }

    fn visit_u64<E>(self, value: u64) -> Result<T, E>
    where
        E: de::Error,
    {
        T::try_from(value).map_err(de::Error::custom)
    }

    fn visit_i64<E>(self, value: i64) -> Result<T, E>
    where
        E: de::Error,
    {
        T::try_from(value).map_err(de::Error::custom)
    }
}

fn integer_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: std::fmt::Display,
    <T as TryFrom<u64>>::Error: std::fmt::Display,
    <T as TryFrom<i64>>::Error: std::fmt::Display,
{
    deserializer.deserialize_any(IntegerOrString(PhantomData))
}

fn option_integer_or_string<'de, D, T>(
    deserializer: D,
) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: std::fmt::Display,
    <T as TryFrom<u64>>::Error: std::fmt::Display,
    <T as TryFrom<i64>>::Error: std::fmt::Display,
{
    integer_or_string(deserializer).map(Some)
}

pub(crate) fn u8_or_string<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    integer_or_string(deserializer)
}

pub(crate) fn u16_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    integer_or_string(deserializer)
}

pub(crate) fn u32_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    integer_or_string(deserializer)
}

pub(crate) fn option_u8_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

pub(crate) fn option_u16_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

pub(crate) fn option_u32_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

pub(crate) fn option_u64_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

pub(crate) fn option_i32_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

pub(crate) fn option_i64_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    option_integer_or_string(deserializer)
}

struct BoolOrString;

impl<'de> Visitor<'de> for BoolOrString {
    type Value = bool;

    fn expecting(
        &self,
        formatter: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        formatter.write_str("boolean or string")
    }

    fn visit_bool<E>(self, value: bool) -> Result<bool, E>
    where
        E: de::Error,
    {
        Ok(value)
    }

    fn visit_u64<E>(self, value: u64) -> Result<bool, E>
    where
        E: de::Error,
    {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(de::Error::custom(format!(
                "Invalid boolean value: {value}"
            ))),
        }
    }

    fn visit_str<E>(self, value: &str) -> Result<bool, E>
    where
        E: de::Error,
    {
        match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "no" | "n" | "off" => Ok(false),
            _ => Err(de::Error::custom(format!(
                "Invalid boolean value: {value}"
            ))),
        }
    }
}

pub(crate) fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(BoolOrString)
}

pub(crate) fn option_bool_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    bool_or_string(deserializer).map(Some)
}

/// Accepts number or string and hands back the string form. Used by
/// options carrying both a numeric and a named representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NumberAsString(pub(crate) String);

impl<'de> Deserialize<'de> for NumberAsString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Inner;
        impl<'de> Visitor<'de> for Inner {
            type Value = NumberAsString;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str("integer or string")
            }

            fn visit_str<E>(self, value: &str) -> Result<NumberAsString, E>
            where
                E: de::Error,
            {
                Ok(NumberAsString(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<NumberAsString, E>
            where
                E: de::Error,
            {
                Ok(NumberAsString(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<NumberAsString, E>
            where
                E: de::Error,
            {
                Ok(NumberAsString(value.to_string()))
            }

            fn visit_bool<E>(self, value: bool) -> Result<NumberAsString, E>
            where
                E: de::Error,
            {
                Ok(NumberAsString(if value { "1" } else { "0" }.to_string()))
            }
        }
        deserializer.deserialize_any(Inner)
    }
}
