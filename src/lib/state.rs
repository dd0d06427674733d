// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

use crate::{NetstateError, VerificationDiff};

pub(crate) const PASSWORD_HID: &str = "<_password_hid_>";

/// Find the first property of `desire` which is not contained in
/// `current`. Maps are matched by key, lists by position and length. Null
/// and hidden passwords in `desire` match anything.
pub(crate) fn get_json_value_difference<'a, 'b>(
    reference: String,
    desire: &'a Value,
    current: &'b Value,
) -> Option<(String, &'a Value, &'b Value)> {
    match (desire, current) {
        (Value::Null, _) => None,
        (Value::String(des), Value::String(_)) if des == PASSWORD_HID => None,
        (Value::Array(des), Value::Array(cur)) if des.len() == cur.len() => {
            des.iter().zip(cur.iter()).enumerate().find_map(
                |(index, (des_item, cur_item))| {
                    get_json_value_difference(
                        format!("{reference}[{index}]"),
                        des_item,
                        cur_item,
                    )
                },
            )
        }
        (Value::Object(des), Value::Object(cur)) => {
            des.iter().find_map(|(key, des_value)| {
                let reference = format!("{reference}.{key}");
                match cur.get(key) {
                    Some(cur_value) => get_json_value_difference(
                        reference, des_value, cur_value,
                    ),
                    None if des_value.is_null() => None,
                    None => Some((reference, des_value, &Value::Null)),
                }
            })
        }
        _ if desire == current => None,
        _ => Some((reference, desire, current)),
    }
}

/// Subset match of two serializable objects, raising VerificationError
/// carrying the difference.
pub(crate) fn verify_json<T: serde::Serialize>(
    reference: &str,
    desired: &T,
    current: &T,
) -> Result<(), NetstateError> {
    let desired_value = serde_json::to_value(desired)?;
    let current_value = serde_json::to_value(current)?;
    verify_json_value(reference, &desired_value, &current_value)
}

pub(crate) fn verify_json_value(
    reference: &str,
    desired: &Value,
    current: &Value,
) -> Result<(), NetstateError> {
    if let Some((reference, desire, current)) =
        get_json_value_difference(reference.to_string(), desired, current)
    {
        let e = NetstateError::new_verification_error(VerificationDiff::new(
            reference,
            desire.clone(),
            current.clone(),
        ));
        log::error!("{}", e);
        Err(e)
    } else {
        Ok(())
    }
}

// Whatever not defined in desired but defined in current will be copied.
// Maps merge recursively, lists and scalars of desired win as a whole.
pub(crate) fn merge_json_value(desired: &mut Value, current: &Value) {
    if let (Some(desired), Some(current)) =
        (desired.as_object_mut(), current.as_object())
    {
        for (cur_key, cur_value) in current.iter() {
            if let Some(des_value) = desired.get_mut(cur_key) {
                merge_json_value(des_value, cur_value);
            } else {
                desired.insert(cur_key.clone(), cur_value.clone());
            }
        }
    }
}
