use clap::Parser;
use tracing::error;

mod fetch;
mod open;

#[derive(Parser, Debug)]
struct CliArgs {
    /// The command to perform.
    #[command(subcommand)]
    command: Subcommand,
}

fn main() {
    // set up tracing; stdout is reserved for fetched content
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let CliArgs { command } = CliArgs::parse();

    let result = match command {
        Subcommand::Open(open_args) => open::main(open_args),
        Subcommand::Fetch(fetch_args) => fetch::main(fetch_args),
    };
    if let Err(err) = result {
        if let Some(cli_err) = err.downcast_ref::<clap::Error>() {
            cli_err.exit();
        } else {
            error!("error during execution: {:#}", err);
            std::process::exit(1);
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Open a URL in the default or an available web browser.
    Open(open::Args),
    /// Print the contents of a URL, following redirects.
    Fetch(fetch::Args),
}
