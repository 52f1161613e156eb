use clap::Parser;

use ledgerlink::cli::{self, Cli, Commands, RulesCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest {
            file,
            bank,
            account_id,
            ledger_dir,
            rules,
        } => cli::ingest::run(
            &file,
            &bank,
            account_id.as_deref(),
            ledger_dir.as_deref(),
            rules.as_deref(),
        ),
        Commands::Link {
            clear_transfers,
            ledger_dir,
        } => cli::link::run(clear_transfers, ledger_dir.as_deref()),
        Commands::Payees { ledger_dir } => cli::payees::run(ledger_dir.as_deref()),
        Commands::Config { ledger_dir, rules } => {
            cli::config::run(ledger_dir.as_deref(), rules.as_deref())
        }
        Commands::Rules { command } => match command {
            RulesCommands::Sort { file } => cli::rules::sort(&file),
            RulesCommands::Check { path } => cli::rules::check(path.as_deref()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
