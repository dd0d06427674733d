// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use crate::{ErrorKind, MergedRoutes, NetstateError, RouteEntry, Routes};

impl MergedRoutes {
    // Only routes not already present in current state, absent ones always.
    pub(crate) fn gen_diff(&self) -> Routes {
        let existing: HashSet<&RouteEntry> = self
            .current
            .config
            .iter()
            .flatten()
            .collect();
        let mut changed: Vec<RouteEntry> = self
            .changed_routes
            .iter()
            .filter(|rt| rt.is_absent() || !existing.contains(rt))
            .cloned()
            .collect();
        changed.sort_unstable();
        Routes {
            config: (!changed.is_empty()).then_some(changed),
            ..Default::default()
        }
    }

    // Kernel may add routes on its own (an IPv6 gateway brings a /128
    // direct route), so only desired routes are checked: present ones
    // must exist and absent ones must be gone unless also desired.
    pub(crate) fn verify(
        &self,
        current: &Routes,
        ignored_ifaces: &[&str],
    ) -> Result<(), NetstateError> {
        let cur_routes: Vec<&RouteEntry> = current
            .config
            .iter()
            .flatten()
            .filter(|rt| {
                rt.route_type.is_some()
                    || !rt
                        .next_hop_iface
                        .as_deref()
                        .map_or(false, |i| ignored_ifaces.contains(&i))
            })
            .collect();

        let mut desired: Vec<RouteEntry> = self
            .desired
            .config
            .iter()
            .flatten()
            .cloned()
            .map(|mut rt| {
                rt.sanitize().ok();
                rt
            })
            .collect();
        desired.sort_unstable();
        desired.dedup();

        for rt in desired.iter() {
            let found = cur_routes.iter().find(|cur| rt.is_match(cur));
            let msg = match (rt.is_absent(), found) {
                (true, Some(cur))
                    if !desired
                        .iter()
                        .any(|r| !r.is_absent() && rt.is_match(r)) =>
                {
                    format!(
                        "Desired absent route {rt} still found after \
                        apply: {cur}"
                    )
                }
                (false, None) => {
                    format!("Desired route {rt} not found after apply")
                }
                _ => continue,
            };
            let e = NetstateError::new(ErrorKind::VerificationError, msg);
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }
}
