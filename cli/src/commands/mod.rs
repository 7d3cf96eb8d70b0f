//! One module per subcommand.

pub mod deploy;
pub mod init;
pub mod ping;
pub mod render;
pub mod verify;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::AppResult;

pub async fn execute(command: &Command, config: &AppConfig) -> AppResult<()> {
    match command {
        Command::Deploy(args) => deploy::run(args, config).await,
        Command::Render(args) => render::run(args, config).await,
        Command::Verify => verify::run(config).await,
        Command::Ping(args) => ping::run(args, config).await,
        Command::Init(args) => init::run(args).await,
    }
}
