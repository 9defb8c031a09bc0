use std::{io::Write, time::Duration};

use anyhow::Context as _;
use tracing::info;
use weblaunch::FetchOptions;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// The URL to read.
    url: String,

    /// The format in which to print the output.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,

    /// The file to write the output to. "-" or unspecified will write to
    /// stdout.
    #[arg(short, long, default_value = None)]
    output: Option<String>,

    /// Seconds to wait for each connection to be established.
    #[arg(long, default_value_t = 15, env = "WEBLAUNCH_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// Seconds to wait for each response.
    #[arg(long, default_value_t = 15, env = "WEBLAUNCH_READ_TIMEOUT")]
    read_timeout: u64,

    /// How many times the same URL may be visited while following redirects.
    #[arg(long, default_value_t = 3)]
    max_visits: u32,
}

#[derive(Debug, clap::ValueEnum, Clone, Copy, Eq, PartialEq)]
enum CliOutputFormat {
    /// Prints the body of the final response.
    Text,
    /// Prints the final URL, status, redirect chain, and body as JSON.
    Json,
}

pub fn main(args: Args) -> anyhow::Result<()> {
    let Args { url, format, output, connect_timeout, read_timeout, max_visits } = args;

    let options = FetchOptions {
        connect_timeout: Duration::from_secs(connect_timeout),
        read_timeout: Duration::from_secs(read_timeout),
        max_visits,
        ..FetchOptions::default()
    };

    let fetched = weblaunch::fetch(&url, &options)?;
    if !fetched.redirects.is_empty() {
        info!("Followed {} redirect(s) to {}", fetched.redirects.len(), fetched.url);
    }

    let mut writer: Box<dyn Write> = match output.as_deref() {
        None | Some("-") => Box::new(std::io::stdout()),
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("error creating {}", path))?,
        ),
    };

    match format {
        CliOutputFormat::Text => writer.write_all(fetched.body.as_bytes())?,
        CliOutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &fetched)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}
