mod utils;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Error};
use ckb_deploy_rs::{build_transaction, submit, DeployPlan, RpcClient, SigningKey};
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use log::{error, info};

use crate::utils::{load_plan, print_lock_info, print_plan_summary, print_tx_json};

fn cli() -> Command {
    Command::new("ckb-deploy-cli")
        .about("build, sign and send configured CKB transactions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("send")
                .about("Build, sign and submit the transaction described by CONFIG")
                .arg(arg!(<CONFIG> "Deployment config (TOML)").value_parser(value_parser!(PathBuf)))
                .arg(arg!(-u --url <URL> "Override the node RPC url").required(false))
                .arg(
                    arg!(--"print-tx" "Print the signed transaction before sending")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("build")
                .about("Build and sign without submitting, print the transaction as JSON")
                .arg(arg!(<CONFIG> "Deployment config (TOML)").value_parser(value_parser!(PathBuf)))
                .arg(arg!(-u --url <URL> "Override the node RPC url").required(false)),
        )
        .subcommand(
            Command::new("check")
                .about("Decode CONFIG offline and print a summary")
                .arg(arg!(<CONFIG> "Deployment config (TOML)").value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("lock-args")
                .about("Print the sighash lock args of a private key")
                .arg(arg!(<PRIVKEY> "hex encoded secp256k1 private key")),
        )
}

fn connect(plan: &DeployPlan, matches: &ArgMatches) -> Result<RpcClient, Error> {
    let url = matches
        .get_one::<String>("url")
        .cloned()
        .unwrap_or_else(|| plan.rpc_url.clone());
    info!("using node {}", url);
    RpcClient::new(&url)
        .map_err(ckb_deploy_rs::Error::Connection)
        .with_context(|| format!("rpc endpoint {}", url))
}

fn config_path(matches: &ArgMatches) -> Result<&PathBuf, Error> {
    matches
        .get_one::<PathBuf>("CONFIG")
        .ok_or_else(|| anyhow!("missing CONFIG"))
}

fn run() -> Result<(), Error> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("send", sub_matches)) => {
            let plan = load_plan(config_path(sub_matches)?)?;
            let client = connect(&plan, sub_matches)?;
            let tx = build_transaction(&plan, &client)?;
            if plan.print_tx || sub_matches.get_flag("print-tx") {
                print_tx_json(&tx)?;
            }
            let hash = submit(&client, &tx)?;
            println!("{:#x}", hash);
            Ok(())
        }
        Some(("build", sub_matches)) => {
            let plan = load_plan(config_path(sub_matches)?)?;
            let client = connect(&plan, sub_matches)?;
            let tx = build_transaction(&plan, &client)?;
            print_tx_json(&tx)
        }
        Some(("check", sub_matches)) => {
            let plan = load_plan(config_path(sub_matches)?)?;
            print_plan_summary(&plan)
        }
        Some(("lock-args", sub_matches)) => {
            let privkey = sub_matches
                .get_one::<String>("PRIVKEY")
                .ok_or_else(|| anyhow!("missing PRIVKEY"))?;
            let key = SigningKey::from_hex(privkey)?;
            print_lock_info(&key);
            Ok(())
        }
        _ => Err(anyhow!("Unknown subcommand")),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
