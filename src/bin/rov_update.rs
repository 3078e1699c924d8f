use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use rotonda_rov::config::{Config, Overrides};
use rotonda_rov::errors::RunError;
use rotonda_rov::fetch::HttpFetcher;
use rotonda_rov::pipeline::Pipeline;
use rotonda_rov::registry::Ipv4RirMatching;
use rotonda_rov::store::export::write_routes;
use rotonda_rov::store::{MemoryStore, SnapshotDate};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file with settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The snapshot to build (YYYY-MM-DD), today if not given
    #[arg(short, long)]
    date: Option<SnapshotDate>,

    /// Work items that run at the same time
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Drop routes seen by fewer peers
    #[arg(long)]
    min_peers: Option<u32>,

    /// Match IPv4 routes to registries by `decimal` first octet or by `cidr`
    #[arg(long)]
    ipv4_rir_matching: Option<Ipv4RirMatching>,

    /// Write the finished routes here, as JSON lines
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<Config, RunError> {
        let config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        Ok(config.with_overrides(&Overrides {
            max_in_flight: self.max_in_flight,
            min_peers: self.min_peers,
            ipv4_rir_matching: self.ipv4_rir_matching,
        }))
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config()?;
    let date = cli.date.unwrap_or_else(SnapshotDate::today);

    let store = Arc::new(MemoryStore::new());
    let feeds = Arc::new(HttpFetcher::with_user_agent(concat!(
        "rov-update/",
        env!("CARGO_PKG_VERSION")
    )));
    let pipeline = Pipeline::new(store.clone(), feeds, config, date)?;

    let t0 = Instant::now();
    let report = pipeline.run()?;
    info!("run took {}s", t0.elapsed().as_secs());
    print!("{}", report);

    if let Some(path) = &cli.output {
        let out = BufWriter::new(File::create(path)?);
        let n = write_routes(&*store, &date.routes_collection(), out)?;
        println!("wrote {} routes to {}", n, path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    println!("Started at: {}", chrono::Local::now().format(TIME_FORMAT));
    let res = run(&cli);
    println!("Finished at: {}", chrono::Local::now().format(TIME_FORMAT));

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
