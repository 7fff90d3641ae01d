//! `thudp send`: controller side of one exchange

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::time::Duration;
use thudp_client::{Report, Session};
use thudp_core::{Command, Record};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{FileConfig, KeyArgs, NetArgs, Settings};

#[derive(Debug, Args)]
pub struct SendArgs {
    /// IP address to send to
    #[arg(long)]
    pub ip: String,

    /// Message type: ? ! # * (or query, set, broadcast, subscribe)
    #[arg(short = 't', long = "type", value_parser = parse_command)]
    pub command: Command,

    /// Zone name
    #[arg(short, long, default_value = "")]
    pub zone: String,

    /// Temperature value
    #[arg(long = "temp-val", default_value_t = f32::NAN, allow_negative_numbers = true)]
    pub value: f32,

    /// Desired temperature value
    #[arg(long = "temp-set", default_value_t = f32::NAN, allow_negative_numbers = true)]
    pub setpoint: f32,

    /// Local port [default: same as --port]
    #[arg(long)]
    pub local_port: Option<u16>,

    /// Allow a broadcast destination address
    #[arg(long)]
    pub broadcast: bool,

    /// Accept replies carrying a different secret
    #[arg(long)]
    pub insecure: bool,

    /// Stop waiting for a reply after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print received records as JSON lines
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub net: NetArgs,

    #[command(flatten)]
    pub keys: KeyArgs,
}

/// Accepts command names, command characters, or any other single ASCII
/// character as a raw command byte
fn parse_command(s: &str) -> std::result::Result<Command, String> {
    if let Ok(command) = s.parse() {
        return Ok(command);
    }
    match s.as_bytes() {
        [byte] if byte.is_ascii() => Ok(Command::from_byte(*byte)),
        _ => Err(format!("unknown message type '{}', use one of ? ! # *", s)),
    }
}

impl SendArgs {
    fn record(&self) -> Record {
        match self.command {
            Command::Set => Record::set(self.zone.as_str(), self.value, self.setpoint),
            command => Record::new(command, self.zone.as_str()),
        }
    }
}

/// Send one record and print whatever comes back
pub async fn run(
    args: SendArgs,
    file: FileConfig,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let settings = Settings::resolve(&args.keys, &args.net, file)?;
    let destination = format!("{}:{}", args.ip, settings.port);
    let local = format!("{}:{}", settings.bind, args.local_port.unwrap_or(settings.port));

    let mut builder = Session::builder(&destination)
        .bind(&local)
        .broadcast(args.broadcast)
        .codec(settings.codec)
        .secret(settings.secret)
        .insecure(args.insecure);
    if let Some(ms) = args.timeout_ms {
        builder = builder.recv_timeout(Duration::from_millis(ms));
    }

    let mut session = builder
        .connect()
        .await
        .with_context(|| format!("Failed to open session to {}", destination))?;

    let record = args.record();
    if !args.json {
        println!(
            "{} {} -> {}",
            "THUDP".cyan().bold(),
            record,
            destination
        );
    }

    let json = args.json;
    tokio::select! {
        result = session.execute(record, |report| print_report(&report, json)) => {
            result?;
        }
        _ = shutdown_rx.recv() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

fn print_report(report: &Report, json: bool) {
    if json {
        let line = serde_json::json!({
            "source": report.source.to_string(),
            "command": report.record.command,
            "zone": report.record.zone,
            "value": report.record.value,
            "setpoint": report.record.setpoint,
            "authenticated": report.authenticated,
        });
        println!("{}", line);
        return;
    }

    let tag = if report.authenticated {
        "OK".green().bold()
    } else {
        "INSECURE".yellow().bold()
    };
    println!(
        "{} {} {} val={} set={} from {}",
        tag,
        report.record.command,
        report.record.zone.green(),
        report.record.value,
        report.record.setpoint,
        report.source
    );
}
