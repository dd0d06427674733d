// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use crate::{
    ErrorKind, MergedRouteRules, NetstateError, RouteRuleEntry, RouteRules,
};

impl MergedRouteRules {
    pub(crate) fn gen_diff(&self) -> RouteRules {
        let cur_rules: HashSet<&RouteRuleEntry> = self
            .current
            .config
            .as_deref()
            .unwrap_or_default()
            .iter()
            .collect();

        let changed_rules: Vec<RouteRuleEntry> = self
            .for_verify
            .iter()
            .filter(|r| {
                if r.is_absent() {
                    cur_rules.iter().any(|c| r.is_match(c))
                } else {
                    !cur_rules.iter().any(|c| r.is_match(c))
                }
            })
            .cloned()
            .collect();

        RouteRules {
            config: if changed_rules.is_empty() {
                None
            } else {
                Some(changed_rules)
            },
        }
    }

    // * desired absent route rule is removed unless another matching rule
    //   been added.
    // * desired static rule exists.
    pub(crate) fn verify(
        &self,
        current: &RouteRules,
        ignored_ifaces: &[&str],
    ) -> Result<(), NetstateError> {
        let mut cur_rules: Vec<&RouteRuleEntry> = Vec::new();
        for cur_rule in current.config.as_deref().unwrap_or_default() {
            if let Some(iif) = cur_rule.iif.as_ref() {
                if ignored_ifaces.contains(&iif.as_str()) {
                    continue;
                }
            }
            cur_rules.push(cur_rule);
        }
        for rule in self.for_verify.as_slice() {
            if rule.is_absent() {
                if self
                    .for_verify
                    .iter()
                    .any(|r| !r.is_absent() && rule.is_match(r))
                {
                    continue;
                }
                if let Some(cur_rule) =
                    cur_rules.iter().find(|cur_r| rule.is_match(cur_r))
                {
                    return Err(NetstateError::new(
                        ErrorKind::VerificationError,
                        format!(
                            "Desired absent route rule {rule} still found \
                            after apply: {cur_rule}"
                        ),
                    ));
                }
            } else if !cur_rules.iter().any(|cur_r| rule.is_match(cur_r)) {
                return Err(NetstateError::new(
                    ErrorKind::VerificationError,
                    format!("Desired route rule {rule} not found after apply"),
                ));
            }
        }
        Ok(())
    }
}
