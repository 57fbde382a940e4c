use std::io::{self, Write};

use clap::Parser;

use csv_bulkload::config::{Args, LoadSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    csv_bulkload::init_logger();

    let args = Args::parse();
    let settings = match LoadSettings::from_args(&args) {
        Ok(settings) => settings,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(2);
        }
    };

    match csv_bulkload::run(settings).await {
        Ok(stats) => {
            println!("{stats} in {:.2?}", stats.elapsed);
            Ok(())
        }
        Err(err) => {
            log::error!("load aborted: {}", err);
            std::process::exit(1);
        }
    }
}
