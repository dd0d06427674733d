// SPDX-License-Identifier: Apache-2.0

mod apply;
mod config;
mod error;
mod query;
mod result;
mod service;
mod state;
mod store;
mod varlink;

use env_logger::Builder;
use log::LevelFilter;

use crate::{config::Config, error::CliError, result::finish};

const APP_NAME: &str = "netstatectl";

const SUB_CMD_SHOW: &str = "show";
const SUB_CMD_APPLY: &str = "apply";
const SUB_CMD_COMMIT: &str = "commit";
const SUB_CMD_ROLLBACK: &str = "rollback";
const SUB_CMD_EDIT: &str = "edit";
const SUB_CMD_VERSION: &str = "version";
const SUB_CMD_SERVICE: &str = "service";
const SUB_CMD_VARLINK: &str = "varlink";

const LOG_MODULES: [&str; 2] = ["netstate", "netstatectl"];

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let matches = gen_cli_command().get_matches();

    init_logger(
        matches.occurrences_of("verbose"),
        matches.is_present("quiet"),
    );

    let config_path = matches
        .value_of("CONFIG")
        .unwrap_or(Config::DEFAULT_CONFIG_PATH);
    let result = Config::load(config_path).and_then(|config| {
        run_sub_command(&matches, &config, argv.get(1).map(String::as_str))
    });
    finish(result)
}

fn run_sub_command(
    matches: &clap::ArgMatches,
    config: &Config,
    first_arg: Option<&str>,
) -> Result<String, CliError> {
    match matches.subcommand() {
        Some((SUB_CMD_SHOW, sub)) => query::show(sub, config),
        Some((SUB_CMD_APPLY, sub)) => {
            if first_arg == Some("set") {
                log::warn!("Using 'set' is deprecated, use 'apply' instead.");
            }
            let file_paths: Vec<&str> = sub
                .values_of("STATE_FILE")
                .map(|f| f.collect())
                .unwrap_or_else(|| vec!["-"]);
            apply::apply_from_files(&file_paths, sub, config)
        }
        Some((SUB_CMD_COMMIT, sub)) => {
            apply::commit(sub.value_of("CHECKPOINT"), config)
        }
        Some((SUB_CMD_ROLLBACK, sub)) => {
            apply::rollback(sub.value_of("CHECKPOINT"), config)
        }
        Some((SUB_CMD_EDIT, sub)) => apply::state_edit(sub, config),
        Some((SUB_CMD_SERVICE, sub)) => service::ncl_service(sub, config),
        Some((SUB_CMD_VARLINK, sub)) => varlink::ncl_varlink(sub, config),
        Some((SUB_CMD_VERSION, _)) => {
            Ok(format!("{APP_NAME} {}", clap::crate_version!()))
        }
        _ => Err(CliError::new(
            error::EX_USAGE,
            "No sub-command specified".to_string(),
        )),
    }
}

// Default: info for our own modules, warn for the rest. Verbose wins over
// quiet.
fn init_logger(verbose: u64, quiet: bool) {
    let level = if quiet && verbose == 0 {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let mut log_builder = Builder::new();
    log_builder.filter(None, LevelFilter::Warn.min(level));
    for module in LOG_MODULES {
        log_builder.filter(Some(module), level);
    }
    log_builder.format_timestamp(None);
    log_builder.init();
}

fn gen_cli_command() -> clap::Command<'static> {
    clap::Command::new(APP_NAME)
        .version(clap::crate_version!())
        .about("Command line of netstate")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Set verbose level, -vv for trace")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .help("Only log errors")
                .global(true),
        )
        .arg(
            clap::Arg::new("CONFIG")
                .long("config")
                .takes_value(true)
                .help(
                    "Configuration file, default is \
                    /etc/netstate/netstatectl.conf",
                )
                .global(true),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_SHOW)
                .about("Show network state")
                .arg(
                    clap::Arg::new("IFNAME")
                        .index(1)
                        .help(
                            "Show interfaces matching comma separated \
                            glob patterns only",
                        ),
                )
                .arg(
                    clap::Arg::new("KERNEL")
                        .short('k')
                        .long("kernel")
                        .takes_value(false)
                        .help("Show kernel network state only"),
                )
                .arg(
                    clap::Arg::new("JSON")
                        .long("json")
                        .takes_value(false)
                        .conflicts_with("YAML")
                        .help("Show state in json format"),
                )
                .arg(
                    clap::Arg::new("YAML")
                        .long("yaml")
                        .takes_value(false)
                        .help("Show state in yaml format(default)"),
                )
                .arg(
                    clap::Arg::new("RUNNING_CONFIG_ONLY")
                        .short('r')
                        .long("running-config")
                        .takes_value(false)
                        .help("Show running configuration only"),
                )
                .arg(
                    clap::Arg::new("SHOW_SECRETS")
                        .short('s')
                        .long("show-secrets")
                        .takes_value(false)
                        .help("Show secrets(hide by default)"),
                )
                .arg(
                    clap::Arg::new("STATUS_DATA")
                        .long("status-data")
                        .takes_value(false)
                        .help("Include kernel reported status data"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_APPLY)
                .about("Apply network state")
                .alias("set")
                .arg(
                    clap::Arg::new("STATE_FILE")
                        .required(false)
                        .multiple_occurrences(true)
                        .index(1)
                        .help("Network state file, '-' or none for stdin"),
                )
                .args(apply_args())
                .arg(
                    clap::Arg::new("TIMEOUT")
                        .long("timeout")
                        .takes_value(true)
                        .help(
                            "Timeout in seconds before reverting uncommited \
                            changes",
                        ),
                )
                .arg(
                    clap::Arg::new("SHOW_SECRETS")
                        .short('s')
                        .long("show-secrets")
                        .takes_value(false)
                        .help("Show secrets(hide by default)"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_COMMIT)
                .about("Commit a change")
                .arg(
                    clap::Arg::new("CHECKPOINT")
                        .required(false)
                        .index(1)
                        .help("checkpoint to commit, default is the latest"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_ROLLBACK)
                .about("Rollback a change")
                .arg(
                    clap::Arg::new("CHECKPOINT")
                        .required(false)
                        .index(1)
                        .help("checkpoint to rollback, default is the latest"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_EDIT)
                .about("Edit network state in EDITOR")
                .arg(
                    clap::Arg::new("IFNAME")
                        .required(false)
                        .index(1)
                        .help("Interface to edit"),
                )
                .args(apply_args()),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_SERVICE)
                .about("Service mode: apply files from service folder")
                .arg(
                    clap::Arg::new("FOLDER")
                        .long("folder")
                        .short('f')
                        .required(false)
                        .takes_value(true)
                        .help(
                            "Folder holding network state files, default \
                            is /etc/nmstate",
                        ),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_VARLINK)
                .about("Serve varlink requests on unix socket")
                .arg(
                    clap::Arg::new("SOCKET")
                        .index(1)
                        .required(false)
                        .help(
                            "Socket path, default is \
                            /run/netstate/netstate.so",
                        ),
                ),
        )
        .subcommand(clap::Command::new(SUB_CMD_VERSION).about("Show version"))
}

fn apply_args() -> Vec<clap::Arg<'static>> {
    vec![
        clap::Arg::new("NO_VERIFY")
            .long("no-verify")
            .takes_value(false)
            .help(
                "Do not verify that the state was completely set \
                and disable rollback to previous state.",
            ),
        clap::Arg::new("KERNEL")
            .short('k')
            .long("kernel")
            .takes_value(false)
            .help("Apply network state to kernel only"),
        clap::Arg::new("NO_COMMIT")
            .long("no-commit")
            .takes_value(false)
            .help("Do not commit new state after verification"),
        clap::Arg::new("MEMORY_ONLY")
            .long("memory-only")
            .takes_value(false)
            .help("Do not make the state persistent"),
    ]
}
