use clap::{Parser, Subcommand};
use serial_bridge::config::{ConfigLoader, LogFormat};
use serial_bridge::{
    list_ports, DataBits, FlowControl, Parity, PortConfig, PortKind, SerialBridge, StopBits,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "serial-bridge",
    version,
    about = "Open, read, write and close serial ports from the command line.",
    long_about = "Cross-platform serial port access. `list` enumerates the devices the OS \
knows about; `probe` opens a port, optionally exchanges data with it, and closes it again."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Explicit configuration file path.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices visible to the OS.
    List,

    /// Open a port, exchange data with it, and close it.
    Probe {
        /// Device path (e.g. /dev/ttyUSB0 or COM3) or a configured alias.
        path: String,

        /// Baud rate; defaults to the configured default (9600 out of the box).
        #[arg(long)]
        baud: Option<u32>,

        /// Data bits: 5, 6, 7 or 8.
        #[arg(long, default_value = "8", value_parser = parse_data_bits)]
        data_bits: DataBits,

        /// Parity: none, odd or even.
        #[arg(long, default_value = "none", value_parser = parse_parity)]
        parity: Parity,

        /// Stop bits: 1, 1.5 or 2.
        #[arg(long, default_value = "1", value_parser = parse_stop_bits)]
        stop_bits: StopBits,

        /// Flow control: none, software or hardware.
        #[arg(long, default_value = "none", value_parser = parse_flow_control)]
        flow: FlowControl,

        /// Read deadline in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum bytes per read.
        #[arg(long)]
        read_max: Option<usize>,

        /// Payload to write before reading; repeat for several exchanges.
        /// With no payload the probe just reads once.
        #[arg(long)]
        send: Vec<String>,
    },
}

fn parse_data_bits(s: &str) -> Result<DataBits, String> {
    match s {
        "5" => Ok(DataBits::Five),
        "6" => Ok(DataBits::Six),
        "7" => Ok(DataBits::Seven),
        "8" => Ok(DataBits::Eight),
        _ => Err(format!("invalid data bits '{s}' (expected 5, 6, 7 or 8)")),
    }
}

fn parse_parity(s: &str) -> Result<Parity, String> {
    match s {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("invalid parity '{s}' (expected none, odd or even)")),
    }
}

fn parse_stop_bits(s: &str) -> Result<StopBits, String> {
    match s {
        "1" => Ok(StopBits::One),
        "1.5" => Ok(StopBits::OnePointFive),
        "2" => Ok(StopBits::Two),
        _ => Err(format!("invalid stop bits '{s}' (expected 1, 1.5 or 2)")),
    }
}

fn parse_flow_control(s: &str) -> Result<FlowControl, String> {
    match s {
        "none" => Ok(FlowControl::None),
        "software" | "xonxoff" => Ok(FlowControl::Software),
        "hardware" | "rtscts" => Ok(FlowControl::Hardware),
        _ => Err(format!(
            "invalid flow control '{s}' (expected none, software or hardware)"
        )),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::from_path(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.config().clone();

    init_logging(cli.verbose, &config.logging.level, config.logging.format);

    match cli.command {
        Command::List => run_list(cli.json),
        Command::Probe {
            path,
            baud,
            data_bits,
            parity,
            stop_bits,
            flow,
            timeout_ms,
            read_max,
            send,
        } => {
            let port_config = PortConfig {
                baud_rate: baud.unwrap_or(config.serial.default_baud),
                data_bits,
                parity,
                stop_bits,
                flow_control: flow,
                timeout: timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config.serial.default_timeout()),
            };
            let path = config.serial.resolve_port(&path);
            let read_max = read_max.unwrap_or(config.serial.default_read_max);
            run_probe(&path, port_config, read_max, &send, cli.json)
        }
    }
}

fn init_logging(verbose: u8, configured_level: &str, format: LogFormat) {
    let level = match verbose {
        0 => configured_level.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn run_list(as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ports = list_ports()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("no serial devices found");
        return Ok(());
    }
    for port in ports {
        match port.kind {
            PortKind::Usb {
                vid, pid, product, ..
            } => println!(
                "{}  usb {:04x}:{:04x}  {}",
                port.name,
                vid,
                pid,
                product.unwrap_or_default()
            ),
            PortKind::Pci => println!("{}  pci", port.name),
            PortKind::Bluetooth => println!("{}  bluetooth", port.name),
            PortKind::Unknown => println!("{}", port.name),
        }
    }
    Ok(())
}

fn run_probe(
    path: &str,
    config: PortConfig,
    read_max: usize,
    payloads: &[String],
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bridge = SerialBridge::new();
    let handle = bridge.open(path, config)?;

    let mut exchanges = Vec::new();
    let result = (|| -> Result<(), serial_bridge::PortError> {
        if payloads.is_empty() {
            let data = bridge.read(handle, read_max, None)?;
            exchanges.push((None, data));
            return Ok(());
        }
        for payload in payloads {
            bridge.write(handle, payload.as_bytes())?;
            let reply = bridge.read(handle, read_max, None).unwrap_or_default();
            exchanges.push((Some(payload.clone()), reply));
        }
        Ok(())
    })();

    let status = bridge.status(handle)?;
    bridge.close(handle);
    result?;

    if as_json {
        let exchanges: Vec<_> = exchanges
            .iter()
            .map(|(sent, received)| {
                json!({
                    "sent": sent,
                    "received": String::from_utf8_lossy(received),
                    "bytes_received": received.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "port": path,
                "handle": status.handle,
                "bytes_written_total": status.bytes_written_total,
                "bytes_read_total": status.bytes_read_total,
                "exchanges": exchanges,
            }))?
        );
    } else {
        println!("opened {} as handle {}", path, status.handle);
        for (sent, received) in &exchanges {
            if let Some(sent) = sent {
                println!(">> {}", sent);
            }
            println!("<< {}", String::from_utf8_lossy(received));
        }
        println!("closed");
    }
    Ok(())
}
