mod cli;
mod config;
mod render;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, output_error, run_cli};
use config::load_config;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match load_config() {
        Ok(config) => config,
        Err(err) => return output_error(&format!("{:#}", err)),
    };
    cli.apply_overrides(&mut config);

    let rt = tokio::runtime::Runtime::new()?;
    if let Err(err) = run_cli(&rt, cli.command, &config) {
        log::debug!("command failed: {:?}", err);
        output_error(&format!("{:#}", err))?;
        std::process::exit(1);
    }
    Ok(())
}
