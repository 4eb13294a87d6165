use std::path::PathBuf;

use clap::Parser;

/// Deploy a local directory to a remote host with rsync over SSH.
///
/// Inputs are read from the environment: REMOTE_HOST, REMOTE_USER,
/// SSH_PRIVATE_KEY and REMOTE_PATH are required; REMOTE_PORT, DEPLOY_KEY_NAME,
/// SOURCE, ARGS/RSYNC_ARGS, EXCLUDE_FILE and EXTRA_EXCLUDE are optional. Each
/// may also be given as INPUT_<NAME>.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(short, long, help = "Print verbose diagnostic logs for debugging")]
    pub verbose: bool,
    #[clap(long, value_name = "PATH", help = "Also append logs to this file")]
    pub log_file: Option<PathBuf>,
    #[clap(
        short,
        long,
        value_name = "DIR",
        help = "Directory SOURCE and EXCLUDE_FILE are relative to \
                (default: $GITHUB_WORKSPACE or the current directory)"
    )]
    pub workspace: Option<PathBuf>,
    #[clap(
        long,
        help = "Print the resolved transfer plan and rsync command \
                without writing the key or running rsync"
    )]
    pub dry_run: bool,
    #[clap(
        long,
        value_name = "CMD",
        default_value = crate::transfer::DEFAULT_INSTALL_COMMAND,
        help = "Shell command run through `sh -c` when rsync is not on PATH"
    )]
    pub install_command: String,
}
