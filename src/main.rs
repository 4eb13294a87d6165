use clap::Parser;
use owo_colors::OwoColorize;

use rsync_deploy::config::EnvSource;
use rsync_deploy::ops::{self, DeployEnv, KeyMode};
use rsync_deploy::transfer::{DEFAULT_PROGRAM, Executor};
use rsync_deploy::{DeployError, cli, logging};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let guard = logging::init(cli.verbose, cli.log_file.as_deref())?;
    let env = DeployEnv::detect(&EnvSource, cli.workspace)?;
    let executor = Executor::new(DEFAULT_PROGRAM, Some(cli.install_command));

    if cli.dry_run {
        let plan = ops::prepare(&EnvSource, &env, KeyMode::PathOnly)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        println!("{}", plan.command_line(executor.program()));
        return Ok(());
    }

    let plan = ops::prepare(&EnvSource, &env, KeyMode::Write)?;
    match ops::deploy(&plan, &executor)?.into_result() {
        Ok(_) => {
            println!("{}", "✅ [rsync] completed".green());
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "⚠️ ".red(), err);
            if let DeployError::TransferFailed { stderr, command, .. } = &err {
                eprintln!("stderr: {}", stderr);
                eprintln!("cmd: {}", command);
            }
            // flush the file appender; abort skips destructors
            drop(guard);
            // the remote side may hold a partial transfer: abort rather than exit
            std::process::abort();
        }
    }
}
