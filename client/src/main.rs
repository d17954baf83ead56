use clap::Parser;
use client::config::ClientConfig;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulated round-trip latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Maximum extra one-way delay per message in milliseconds
    #[arg(short = 'j', long, default_value = "0")]
    jitter: u64,

    /// Probability that a message is lost, in [0, 1]
    #[arg(short = 'd', long, default_value = "0")]
    drop_rate: f64,

    /// How long to run before settling and reporting
    #[arg(short = 't', long, default_value = "10")]
    seconds: u64,

    /// Seed for the scripted player and the simulated link
    #[arg(long, default_value = "0")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig {
        fake_ping_ms: args.fake_ping,
        jitter_ms: args.jitter,
        drop_rate: args.drop_rate,
        seed: args.seed,
        ..ClientConfig::from_env()
    };

    info!("Starting headless client...");
    info!(
        "Tick rate {}Hz, snapshots {}Hz, fire every {:?}",
        config.tick_rate, config.snapshot_rate, config.fire_interval
    );
    if config.fake_ping_ms > 0 || config.jitter_ms > 0 || config.drop_rate > 0.0 {
        info!(
            "Simulating {}ms ping, {}ms jitter, {:.0}% loss",
            config.fake_ping_ms,
            config.jitter_ms,
            config.drop_rate * 100.0
        );
    }

    let mut client = Client::new(config);
    let summary = client.run(Duration::from_secs(args.seconds)).await?;

    println!("ticks:            {}", summary.ticks);
    println!("inputs sent:      {}", summary.stats.inputs_sent);
    println!("fires sent:       {}", summary.stats.fires_sent);
    println!("snapshots:        {}", summary.stats.snapshots_applied);
    println!("stale acks:       {}", summary.stats.stale_acks);
    println!("missing local:    {}", summary.stats.missing_local);
    println!("frames rejected:  {}", summary.stats.frames_rejected);
    println!(
        "dropped up/down:  {}/{}",
        summary.uplink_dropped, summary.downlink_dropped
    );
    println!("unacknowledged:   {}", summary.unacknowledged);
    match summary.divergence() {
        Some(d) => println!("divergence:       {:.3}", d),
        None => println!("divergence:       n/a"),
    }

    Ok(())
}
