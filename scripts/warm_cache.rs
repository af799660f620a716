use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use bias_worker::warm::{WarmConfig, warm_cache};

#[tokio::main]
async fn main() -> Result<()> {
    let config = parse_args()?;
    let report = warm_cache(config).await?;

    println!(
        "Cached {} topics ({} failed)",
        report.cached.len(),
        report.failed.len()
    );
    for (topic, reason) in &report.failed {
        eprintln!("  {topic}: {reason}");
    }

    if report.all_failed() {
        process::exit(1);
    }
    Ok(())
}

fn parse_args() -> Result<WarmConfig> {
    let mut config = WarmConfig::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--topic" => {
                let value = args.next().context("--topic requires a topic string")?;
                config.topics.push(value);
            }
            "--cache-dir" => {
                let value = args.next().context("--cache-dir requires a path argument")?;
                config.cache_dir = Some(PathBuf::from(value));
            }
            "--help" => {
                print_usage();
                process::exit(0);
            }
            _ => {
                bail!("unknown argument: {}", arg);
            }
        }
    }

    Ok(config)
}

fn print_usage() {
    eprintln!("Usage: warm_cache [--topic <topic>]... [--cache-dir <path>]");
}
