// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{Backend, Config};
use menupick_app::{AppState, AuthGate, password_digest};
use menupick_db::Store;
use menupick_remote::Client;
use runtime::StoreRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MENUPICK_LOG";
const DEMO_OPERATOR: &str = "demo";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    if let Some(password) = &options.hash_password {
        println!("{}", password_digest(password));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `menupick --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    if !options.print_db_path
        && let Err(error) = init_logging(&config)
    {
        eprintln!("warning: logging disabled: {error:#}");
    }

    let backend = if options.demo {
        Backend::Sqlite
    } else {
        config.backend()
    };

    let mut runtime = match backend {
        Backend::Sqlite => {
            let db_path = if options.demo {
                PathBuf::from(":memory:")
            } else {
                config.db_path()?
            };
            if options.print_db_path {
                println!("{}", db_path.display());
                return Ok(());
            }

            let store = Store::open(&db_path).with_context(|| {
                format!(
                    "open database {} -- if this path is wrong, set [store].db_path or MENUPICK_DB_PATH",
                    db_path.display()
                )
            })?;
            store.bootstrap()?;
            if options.demo {
                store.seed_demo_data()?;
            }
            StoreRuntime::Sqlite(store)
        }
        Backend::Remote => {
            let base_url = config
                .remote_base_url()
                .ok_or_else(|| anyhow!("store.backend = \"remote\" needs remote.base_url"))?;
            let client = Client::new(base_url, config.remote_api_key(), config.remote_timeout()?)
                .with_context(|| {
                    format!(
                        "invalid [remote] config in {}; fix base_url/api_key/timeout values",
                        options.config_path.display()
                    )
                })?;
            if options.print_db_path {
                println!("{}", client.endpoint());
                return Ok(());
            }
            if options.check_only {
                client.ping()?;
            }
            StoreRuntime::Remote(client)
        }
    };

    let auth = if options.demo && !config.has_credentials() {
        AuthGate::new(DEMO_OPERATOR, password_digest(DEMO_OPERATOR))
    } else {
        config.auth_gate()
    };
    let ui = config.ui_config(auth)?;
    if options.check_only {
        return Ok(());
    }

    info!(
        backend = runtime.backend_name(),
        demo = options.demo,
        page_size = ui.page_size.get(),
        "starting menupick"
    );
    let mut state = AppState::default();
    menupick_tui::run_app(&mut state, &mut runtime, &ui)
}

/// Routes `tracing` output to the log file so it never draws over the TUI.
fn init_logging(config: &Config) -> Result<PathBuf> {
    let path = config.log_file()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level())
            .with_context(|| format!("invalid log.level {:?}", config.log_level()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    hash_password: Option<String>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        hash_password: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--hash-password" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--hash-password requires a password"))?;
                options.hash_password = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("menupick");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path or remote endpoint");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --hash-password <pw>     Print the auth.password_sha256 value for <pw>");
    println!("  --demo                   Launch with seeded dishes in memory (sign in as demo/demo)");
    println!("  --check                  Validate config, open the store, ping the remote");
    println!("  --help                   Show this help");
    println!();
    println!("Set {LOG_ENV} (for example {LOG_ENV}=debug) to override log.level.");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/menupick-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                hash_password: None,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--hash-password"], default_options_path())
            .expect_err("missing password should fail");
        assert!(error.to_string().contains("requires a password"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_and_db_path_print_flags() -> Result<()> {
        let options = parse_cli_args(vec!["--demo", "--print-path"], default_options_path())?;
        assert!(!options.print_config_path);
        assert!(options.print_db_path);
        assert!(options.demo);
        Ok(())
    }

    #[test]
    fn parse_cli_args_captures_password_to_hash() -> Result<()> {
        let options = parse_cli_args(vec!["--hash-password", "hunter2"], default_options_path())?;
        assert_eq!(options.hash_password.as_deref(), Some("hunter2"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
