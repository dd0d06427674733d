// SPDX-License-Identifier: Apache-2.0

use crate::{state::verify_json, DnsState, MergedDnsState, NetstateError};

impl MergedDnsState {
    // Only static config is verified, DNS from DHCP or autoconf only shows
    // in `running`.
    pub(crate) fn verify(
        &self,
        current: &DnsState,
    ) -> Result<(), NetstateError> {
        if !self.is_changed() {
            return Ok(());
        }
        let mut cur_conf = current.config.clone().unwrap_or_default();
        cur_conf.sanitize().ok();
        let cur_servers = cur_conf.server.clone().unwrap_or_default();
        let cur_searches = cur_conf.search.clone().unwrap_or_default();
        let cur_options = cur_conf.options.clone().unwrap_or_default();

        verify_json(
            "dns-resolver.config.server",
            &self.servers,
            &cur_servers,
        )?;
        verify_json(
            "dns-resolver.config.search",
            &self.searches,
            &cur_searches,
        )?;
        verify_json(
            "dns-resolver.config.options",
            &self.options,
            &cur_options,
        )
    }

    pub(crate) fn gen_diff(&self) -> DnsState {
        if self.is_changed() {
            DnsState {
                config: Some(self.to_config()),
                ..Default::default()
            }
        } else {
            DnsState::new()
        }
    }
}
