use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::info;

use can_device::{CanBusDevice, CanFrame, CanId, DeviceCore, DeviceEvent, FrameErrors};
use vci_can::{MockControllers, MockHandle, VciCanBackend};

mod config;
use config::AdapterConfig;

#[derive(Parser, Debug)]
#[command(
    name = "vci",
    version,
    about = "VCI CAN adapter CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available CAN controllers
    List {
        /// Controller names to expose (defaults to mock0, mock1)
        #[arg(long = "controller")]
        controllers: Vec<String>,
        /// Print descriptors as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Send a CAN frame
    Send {
        /// Adapter config file (YAML, or JSON by extension)
        #[arg(long)]
        config: Option<String>,
        /// Controller name (overrides the config file)
        #[arg(long)]
        device: Option<String>,
        /// CAN ID in hex (e.g., 0x123)
        #[arg(long)]
        id: String,
        /// Data bytes as hex, space-separated (e.g., "01 02 03")
        #[arg(long, value_delimiter = ' ')]
        data: Vec<String>,
        /// Send a remote request instead of a data frame
        #[arg(long, action = ArgAction::SetTrue)]
        remote: bool,
        /// Bit rate (overrides the config file)
        #[arg(long, value_enum)]
        bitrate: Option<Bitrate>,
    },
    /// Describe an error frame
    Decode {
        /// Error category mask in hex (e.g., 0x140)
        #[arg(long)]
        errors: String,
        /// Error detail bytes as hex
        #[arg(long, value_delimiter = ' ')]
        data: Vec<String>,
    },
    /// Open, configure and send a probe frame through a loopback driver
    Doctor {
        /// Adapter config file (YAML, or JSON by extension)
        #[arg(long)]
        config: Option<String>,
        /// Probe CAN ID in hex (e.g., 0x123)
        #[arg(long, default_value = "0x123")]
        id: String,
        /// Probe data bytes as hex
        #[arg(long, value_delimiter = ' ', default_values_t = vec!["00".to_string(), "00".to_string()])]
        data: Vec<String>,
    },
    /// Validate an adapter config file and print the resulting driver options
    ConfigCheck {
        #[arg(long)]
        config: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Bitrate {
    #[value(name = "10k")]
    B10k,
    #[value(name = "20k")]
    B20k,
    #[value(name = "50k")]
    B50k,
    #[value(name = "100k")]
    B100k,
    #[value(name = "125k")]
    B125k,
    #[value(name = "250k")]
    B250k,
    #[value(name = "500k")]
    B500k,
    #[value(name = "800k")]
    B800k,
    #[value(name = "1m")]
    B1M,
}

impl Bitrate {
    fn bits_per_second(self) -> u32 {
        match self {
            Bitrate::B10k => 10_000,
            Bitrate::B20k => 20_000,
            Bitrate::B50k => 50_000,
            Bitrate::B100k => 100_000,
            Bitrate::B125k => 125_000,
            Bitrate::B250k => 250_000,
            Bitrate::B500k => 500_000,
            Bitrate::B800k => 800_000,
            Bitrate::B1M => 1_000_000,
        }
    }
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { controllers, json } => list_interfaces(controllers, json),
        Commands::Send {
            config,
            device,
            id,
            data,
            remote,
            bitrate,
        } => send_frame(config.as_deref(), device, &id, &data, remote, bitrate),
        Commands::Decode { errors, data } => decode_error(&errors, &data),
        Commands::Doctor { config, id, data } => doctor(config.as_deref(), &id, &data),
        Commands::ConfigCheck { config } => config_check(&config),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(path: Option<&str>) -> Result<AdapterConfig> {
    match path {
        Some(p) => AdapterConfig::load(p),
        None => Ok(AdapterConfig::default()),
    }
}

fn open_backend(
    cfg: &AdapterConfig,
    handle: &MockHandle,
) -> Result<(VciCanBackend, Arc<DeviceCore>)> {
    let core = Arc::new(DeviceCore::new());
    let mut backend = VciCanBackend::new(&cfg.device, core.clone(), handle.factory());
    cfg.apply(&mut backend)?;
    backend.open()?;
    Ok((backend, core))
}

fn list_interfaces(names: Vec<String>, json: bool) -> Result<()> {
    let mut controllers = if names.is_empty() {
        MockControllers::default()
    } else {
        MockControllers::new(names)
    };
    let infos = VciCanBackend::interfaces(&mut controllers)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for info in infos {
            println!("{}\t{}\tchannel={}", info.name, info.plugin, info.channel);
        }
    }
    Ok(())
}

fn send_frame(
    config: Option<&str>,
    device: Option<String>,
    id_str: &str,
    data_hex: &[String],
    remote: bool,
    bitrate: Option<Bitrate>,
) -> Result<()> {
    let mut cfg = load_config(config)?;
    if let Some(d) = device {
        cfg.device = d;
    }
    if let Some(b) = bitrate {
        cfg.bit_rate = Some(b.bits_per_second());
    }
    let id = parse_id(id_str).ok_or_else(|| anyhow::anyhow!("invalid CAN id: {id_str}"))?;
    let frame = if remote {
        CanFrame::remote(id)
    } else {
        let bytes = parse_hex_bytes(data_hex)?;
        CanFrame::new(id, &bytes).ok_or_else(|| anyhow::anyhow!("invalid frame length"))?
    };

    let handle = MockHandle::new();
    let (mut backend, core) = open_backend(&cfg, &handle)?;
    backend.write_frame(&frame)?;
    print_events(&core.take_events());
    println!("sent: {frame}");
    backend.close();
    Ok(())
}

fn decode_error(errors_hex: &str, data_hex: &[String]) -> Result<()> {
    let t = errors_hex.trim();
    let mask = u32::from_str_radix(t.strip_prefix("0x").unwrap_or(t), 16)
        .map_err(|e| anyhow::anyhow!("invalid error mask '{t}': {e}"))?;
    let bytes = parse_hex_bytes(data_hex)?;
    let id = CanId::standard(0).ok_or_else(|| anyhow::anyhow!("invalid CAN id"))?;
    let frame = CanFrame::error(id, FrameErrors::from_bits_retain(mask), &bytes)
        .ok_or_else(|| anyhow::anyhow!("error detail exceeds 8 bytes"))?;
    let text = vci_can::interpret_error_frame(&frame);
    if text.is_empty() {
        println!("(no decodable error categories)");
    } else {
        println!("{text}");
    }
    Ok(())
}

fn doctor(config: Option<&str>, id_str: &str, data_hex: &[String]) -> Result<()> {
    let cfg = load_config(config)?;
    let id = parse_id(id_str).ok_or_else(|| anyhow::anyhow!("invalid CAN id: {id_str}"))?;
    let bytes = parse_hex_bytes(data_hex)?;
    let frame =
        CanFrame::new(id, &bytes).ok_or_else(|| anyhow::anyhow!("invalid frame length"))?;

    let handle = MockHandle::new();
    handle.set_loopback(true);
    println!("doctor: device={}", cfg.device);
    let (mut backend, core) = open_backend(&cfg, &handle)?;
    let opts = backend.options();
    println!(
        "open: ok (bit_rate={}, filters={})",
        opts.bit_rate,
        opts.filters.len()
    );
    backend.write_frame(&frame)?;
    println!("send: ok ({} bytes)", bytes.len());
    match core.read_frame() {
        Some(f) => {
            print!("recv: ");
            print_frame(&f);
        }
        None => eprintln!("recv: no frame echoed"),
    }
    backend.close();
    print_events(&core.take_events());
    info!("doctor finished");
    println!("doctor: done");
    Ok(())
}

fn config_check(path: &str) -> Result<()> {
    let cfg = AdapterConfig::load(path)?;
    let handle = MockHandle::new();
    let mut backend =
        VciCanBackend::new(&cfg.device, Arc::new(DeviceCore::new()), handle.factory());
    cfg.apply(&mut backend)?;
    println!("{}", serde_json::to_string_pretty(backend.options())?);
    Ok(())
}

fn print_events(events: &[DeviceEvent]) {
    for e in events {
        match e {
            DeviceEvent::Error(kind, msg) => eprintln!("event: {kind:?}: {msg}"),
            other => println!("event: {other:?}"),
        }
    }
}

fn parse_id(s: &str) -> Option<CanId> {
    let s_trim = s.trim();
    let no_prefix = s_trim.strip_prefix("0x").unwrap_or(s_trim);
    let parsed = u32::from_str_radix(no_prefix, 16).ok()?;
    if parsed <= 0x7FF {
        CanId::standard(parsed as u16)
    } else {
        CanId::extended(parsed)
    }
}

fn parse_hex_bytes(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len());
    for s in items {
        let t = s.trim();
        if t.is_empty() {
            continue;
        }
        let no_prefix = t.strip_prefix("0x").unwrap_or(t);
        let b = u8::from_str_radix(no_prefix, 16)
            .map_err(|e| anyhow::anyhow!("invalid hex byte '{t}': {e}"))?;
        out.push(b);
    }
    Ok(out)
}

fn print_frame(f: &CanFrame) {
    let ts = f
        .timestamp
        .map(|t| {
            t.0.format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into())
        })
        .unwrap_or_else(|| "".into());
    println!("{f}\t{ts}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_picks_format() {
        assert!(!parse_id("0x123").unwrap().is_extended());
        assert!(parse_id("7FF").is_some());
        assert!(parse_id("0x800").unwrap().is_extended());
        assert!(parse_id("0x20000000").is_none());
        assert!(parse_id("zz").is_none());
    }

    #[test]
    fn test_parse_hex_bytes() {
        let items = vec!["01".to_string(), "0xFF".to_string(), "".to_string()];
        assert_eq!(parse_hex_bytes(&items).unwrap(), vec![0x01, 0xFF]);
        assert!(parse_hex_bytes(&["G1".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_send() {
        let cli = Cli::try_parse_from([
            "vci", "send", "--id", "0x100", "--data", "01 02", "--bitrate", "500k",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Send {
                ref data,
                bitrate: Some(Bitrate::B500k),
                remote: false,
                ..
            } if data == &["01", "02"]
        ));
    }
}
