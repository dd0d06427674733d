// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, InterfaceType};

/// Interface the engine does not model itself. The `dispatch` section is
/// handed over untouched to the provider handler named by `type`.
/// ```yml
/// interfaces:
/// - name: vxcan0
///   type: dispatch
///   state: up
///   dispatch:
///     type: vxcan
///     variables:
///       peer: vxcan0-ep
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
pub struct DispatchInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,
}

impl Default for DispatchInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::Dispatch,
                ..BaseInterface::new()
            },
            dispatch: None,
        }
    }
}

impl DispatchInterface {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Free form arguments of the handler.
    pub variables: Option<serde_json::Map<String, serde_json::Value>>,
}
