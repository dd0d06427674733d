// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{stdin, stdout, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;

use netstate::{NetstateProvider, NetworkState};

use crate::{
    config::Config,
    error::{CliError, EX_DATAERR},
    query::{filter_net_state_with_iface, sort_netstate},
    state::{state_from_file, state_from_str},
    store::ProviderStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApplyOptions {
    pub(crate) kernel_only: bool,
    pub(crate) no_verify: bool,
    pub(crate) no_commit: bool,
    pub(crate) memory_only: bool,
    pub(crate) show_secrets: bool,
    pub(crate) timeout: u32,
    pub(crate) verify_retry_count: u32,
    pub(crate) verify_retry_interval_ms: u64,
}

impl ApplyOptions {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            kernel_only: false,
            no_verify: false,
            no_commit: false,
            memory_only: false,
            show_secrets: false,
            timeout: config.apply.timeout,
            verify_retry_count: config.apply.verify_retry_count,
            verify_retry_interval_ms: config.apply.verify_retry_interval_ms,
        }
    }

    pub(crate) fn from_matches(
        matches: &clap::ArgMatches,
        config: &Config,
    ) -> Result<Self, CliError> {
        let mut ret = Self::new(config);
        ret.kernel_only = matches.is_present("KERNEL");
        ret.no_verify = matches.is_present("NO_VERIFY");
        ret.no_commit = matches.is_present("NO_COMMIT");
        ret.memory_only = matches.is_present("MEMORY_ONLY");
        ret.show_secrets = matches.is_present("SHOW_SECRETS");
        if let Some(t) = matches.value_of("TIMEOUT") {
            ret.timeout = u32::from_str(t).map_err(|e| {
                CliError::new(EX_DATAERR, format!("Invalid timeout {t}: {e}"))
            })?;
        }
        Ok(ret)
    }

    fn set_flags(&self, net_state: &mut NetworkState) {
        net_state
            .set_kernel_only(self.kernel_only)
            .set_verify_change(!self.no_verify)
            .set_commit(!self.no_commit)
            .set_timeout(self.timeout)
            .set_memory_only(self.memory_only)
            .set_verify_retry(
                self.verify_retry_count,
                self.verify_retry_interval_ms,
            );
    }
}

pub(crate) fn apply_from_files(
    file_paths: &[&str],
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let opts = ApplyOptions::from_matches(matches, config)?;
    set_ctrl_c_action(config);

    let mut ret = String::new();
    for file_path in file_paths {
        let mut net_state = state_from_file(file_path)?;
        ret += &apply(&mut net_state, &opts, config)?;
    }
    Ok(ret)
}

/// Apply the state and return it in YAML, followed by the checkpoint when
/// commit is skipped.
pub(crate) fn apply(
    net_state: &mut NetworkState,
    opts: &ApplyOptions,
    config: &Config,
) -> Result<String, CliError> {
    let mut store = ProviderStore::new(&config.provider.state_file);
    let mut provider = store.load()?;

    opts.set_flags(net_state);
    let result = net_state.apply(&mut provider);
    // Failed apply has been rolled back, but kernel only mode might still
    // leave changes behind.
    store.save(&provider)?;
    let checkpoint = result?;

    if !opts.show_secrets {
        net_state.hide_secrets();
    }
    let mut ret = serde_yaml::to_string(&sort_netstate(net_state.clone())?)?;
    if let Some(checkpoint) = checkpoint {
        ret += &format!("Checkpoint: {checkpoint}\n");
    }
    Ok(ret)
}

pub(crate) fn commit(
    checkpoint: Option<&str>,
    config: &Config,
) -> Result<String, CliError> {
    let mut store = ProviderStore::new(&config.provider.state_file);
    let mut provider = store.load()?;
    let checkpoint = checkpoint_or_last(&provider, checkpoint);
    NetworkState::checkpoint_commit(&mut provider, checkpoint.as_deref())?;
    store.save(&provider)?;
    Ok(checkpoint.unwrap_or_default())
}

pub(crate) fn rollback(
    checkpoint: Option<&str>,
    config: &Config,
) -> Result<String, CliError> {
    let mut store = ProviderStore::new(&config.provider.state_file);
    let mut provider = store.load()?;
    let checkpoint = checkpoint_or_last(&provider, checkpoint);
    NetworkState::checkpoint_rollback(&mut provider, checkpoint.as_deref())?;
    store.save(&provider)?;
    Ok(checkpoint.unwrap_or_default())
}

fn checkpoint_or_last<P: NetstateProvider>(
    provider: &P,
    checkpoint: Option<&str>,
) -> Option<String> {
    match checkpoint {
        Some(c) => Some(c.to_string()),
        None => provider.last_checkpoint(),
    }
}

pub(crate) fn state_edit(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let opts = ApplyOptions::from_matches(matches, config)?;
    let mut cur_state = NetworkState::new();
    cur_state
        .set_kernel_only(opts.kernel_only)
        .set_include_secrets(true);
    cur_state.retrieve_running_config(
        &mut ProviderStore::new(&config.provider.state_file).load()?,
    )?;
    let net_state = if let Some(ifname) = matches.value_of("IFNAME") {
        let net_state = filter_net_state_with_iface(&cur_state, ifname);
        if net_state.interfaces.iter().next().is_none() {
            return Err(CliError::new(
                EX_DATAERR,
                format!("Interface {ifname} not found"),
            ));
        }
        net_state
    } else {
        cur_state
    };

    let tmp_file_path = gen_tmp_file_path();
    write_state_to_file(&tmp_file_path, &net_state)?;
    let desire_state = run_editor(&tmp_file_path);
    del_file(&tmp_file_path);
    let mut desire_state = desire_state?;

    set_ctrl_c_action(config);
    apply(&mut desire_state, &opts, config)
}

fn gen_tmp_file_path() -> String {
    format!(
        "{}/netstate-{}.yml",
        std::env::temp_dir().display(),
        uuid::Uuid::new_v4()
    )
}

fn del_file(file_path: &str) {
    if let Err(e) = std::fs::remove_file(file_path) {
        log::warn!("Failed to delete file {file_path}: {e}");
    }
}

fn write_state_to_file(
    file_path: &str,
    net_state: &NetworkState,
) -> Result<(), CliError> {
    let mut fd = File::create(file_path)?;
    fd.write_all(
        serde_yaml::to_string(&sort_netstate(net_state.clone())?)?.as_bytes(),
    )?;
    Ok(())
}

fn run_editor(tmp_file_path: &str) -> Result<NetworkState, CliError> {
    let editor = match std::env::var("EDITOR") {
        Ok(e) => e,
        Err(_) => "vi".to_string(),
    };
    loop {
        let mut child = Command::new(&editor)
            .arg(tmp_file_path)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(Stdio::inherit())
            .spawn()?;
        if !child
            .wait()
            .map_err(|e| {
                CliError::new(
                    EX_DATAERR,
                    format!("Editor '{editor}' failed with {e}"),
                )
            })?
            .success()
        {
            return Err(CliError::new(
                EX_DATAERR,
                format!("Editor '{editor}' failed"),
            ));
        }
        match state_from_str(&std::fs::read_to_string(tmp_file_path)?) {
            Ok(n) => return Ok(n),
            Err(e) => {
                eprintln!("{e}");
                if !ask_for_retry()? {
                    return Err(e);
                }
            }
        }
    }
}

fn ask_for_retry() -> Result<bool, CliError> {
    loop {
        println!(
            "Try again? [y,n]:\n\
            y - yes, start editor again\n\
            n - no, throw away my changes\n\
            > "
        );
        stdout().lock().flush().ok();
        let mut retry = String::new();
        if stdin().read_line(&mut retry)? == 0 {
            return Ok(false);
        }
        retry.make_ascii_lowercase();
        match retry.trim() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Invalid reply, please try y or n"),
        }
    }
}

// Interrupted apply never reaches the state file, only a checkpoint left
// by a former `--no-commit` needs rollback.
fn set_ctrl_c_action(config: &Config) {
    let state_file = config.provider.state_file.clone();
    let result = ctrlc::set_handler(move || {
        let mut store = ProviderStore::new(&state_file);
        match store.load() {
            Ok(mut provider) => {
                if provider.last_checkpoint().is_some() {
                    if let Err(e) =
                        NetworkState::checkpoint_rollback(&mut provider, None)
                            .map_err(CliError::from)
                            .and_then(|_| store.save(&provider))
                    {
                        eprintln!("Failed to rollback: {e}");
                    }
                }
            }
            Err(e) => eprintln!("Failed to rollback: {e}"),
        }
        std::process::exit(1);
    });
    if let Err(e) = result {
        log::warn!("Failed to set Ctrl-C handler: {e}");
    }
}
