// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, InterfaceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Software interface without any type specific setting, commonly used
/// to hold addresses not bound to a physical link.
/// ```yml
/// interfaces:
/// - name: dummy1
///   type: dummy
///   state: up
/// ```
pub struct DummyInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
}

impl Default for DummyInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::Dummy,
                ..BaseInterface::new()
            },
        }
    }
}

impl DummyInterface {
    pub fn new() -> Self {
        Self::default()
    }
}
