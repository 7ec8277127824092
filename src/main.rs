//! `dotfiles`: places dotfiles and installs features.
use anyhow::Result;
use clap::{CommandFactory as _, Parser as _};

use dotfiles_features::cli::{Cli, Command};
use dotfiles_features::commands;
use dotfiles_features::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let name = args.command.name();
    init_subscriber(args.global.verbose, name);
    let log = Logger::new(name);

    ctrlc::set_handler(|| {
        println!();
        println!("Cancelled");
        std::process::exit(130);
    })?;

    match args.command {
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::List => commands::list::run(&args.global, &log),
        Command::Config(opts) => commands::config::run(&args.global, &opts, &log),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "dotfiles", &mut std::io::stdout());
            Ok(())
        }
        Command::Version => {
            commands::version();
            Ok(())
        }
    }
}
