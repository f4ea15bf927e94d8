use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epd_image::{ColorMode, DitherAlgorithm, EncodedImage};
use epd_link::image_file::{read_png, write_png};
use epd_link::models::AppConfig;
use epd_link::protocol::TimeSyncMode;
use epd_link::session::TracingSink;
use epd_link::{DeviceSession, MemoryTransport, StreamTransport, Transport, WriteMode};

#[derive(Parser)]
#[command(name = "epd-link")]
#[command(about = "Encode images for e-paper controllers and send them over a bridge")]
struct Cli {
    /// Configuration file (defaults are used if it does not exist)
    #[arg(short, long, global = true, default_value = "epd-link.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DitherArgs {
    /// Color mode: two_color, three_color, four_color, six_color
    #[arg(short, long)]
    mode: Option<ColorMode>,

    /// Dither algorithm: floyd_steinberg, atkinson, stucki, jarvis, bayer, none
    #[arg(short, long)]
    algorithm: Option<DitherAlgorithm>,

    /// Error diffusion strength (0.0 - 5.0)
    #[arg(short, long)]
    strength: Option<f64>,

    /// Contrast factor (0.5 - 2.0)
    #[arg(long)]
    contrast: Option<f64>,
}

#[derive(clap::Args)]
struct LinkArgs {
    /// Bridge address (host:port)
    #[arg(long)]
    address: Option<String>,

    /// Largest write the link accepts, in bytes
    #[arg(long)]
    mtu: Option<usize>,

    /// Acknowledge every n-th image chunk
    #[arg(long)]
    interleave: Option<usize>,

    /// Record writes in memory instead of connecting
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dither and pack an image into a controller payload
    Encode {
        /// Input PNG
        input: PathBuf,

        /// Output payload file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the dithered image as PNG
        #[arg(long)]
        preview: Option<PathBuf>,

        #[command(flatten)]
        dither: DitherArgs,
    },
    /// Decode a payload back into a PNG
    Preview {
        /// Input payload file
        input: PathBuf,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        width: usize,

        #[arg(long)]
        height: usize,

        /// Color mode the payload was packed for
        #[arg(short, long)]
        mode: ColorMode,
    },
    /// Dither an image and send it to the display
    Send {
        /// Input PNG
        input: PathBuf,

        #[command(flatten)]
        dither: DitherArgs,

        #[command(flatten)]
        link: LinkArgs,
    },
    /// Send a single device command
    Command {
        #[command(subcommand)]
        action: DeviceCommand,

        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Subcommand, Clone)]
enum DeviceCommand {
    /// Reset and initialize the panel driver
    Init,
    /// Clear the panel
    Clear,
    /// Refresh the panel from its frame buffer
    Refresh,
    /// Put the panel into deep sleep
    Sleep,
    /// Set the controller clock to the local time
    SyncTime {
        /// Show the clock face instead of the calendar
        #[arg(long)]
        clock: bool,
    },
    /// Configure panel pins (hex)
    SetPins { hex: String },
    /// Forward a raw driver command (hex)
    SendCmd { hex: String },
    /// Forward raw driver data (hex)
    SendData { hex: String },
    /// Persist a controller configuration blob (hex)
    SetConfig { hex: String },
    /// Reboot the controller
    Reset,
    /// Put the controller to sleep
    SysSleep,
    /// Erase the persisted controller configuration
    EraseConfig,
    /// Write arbitrary hex bytes
    Raw { hex: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Send { .. } | Commands::Command { .. } => "epd_link=info",
        Commands::Encode { .. } | Commands::Preview { .. } => "epd_link=warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let mut config = AppConfig::load_or_default(&cli.config);

    match cli.command {
        Commands::Encode {
            input,
            output,
            preview,
            dither,
        } => {
            apply_dither_args(&mut config, &dither);
            run_encode(&config, &input, &output, preview.as_deref())
        }
        Commands::Preview {
            input,
            output,
            width,
            height,
            mode,
        } => run_preview(&input, &output, width, height, mode),
        Commands::Send {
            input,
            dither,
            link,
        } => {
            apply_dither_args(&mut config, &dither);
            apply_link_args(&mut config, &link);
            let image = read_png(&input)?;
            if link.dry_run {
                let transport = MemoryTransport::new();
                let handle = transport.handle();
                run_send(&config, transport, image).await?;
                report_dry_run(&handle.writes());
                Ok(())
            } else {
                let transport = StreamTransport::connect(config.link.address.as_str()).await?;
                run_send(&config, transport, image).await
            }
        }
        Commands::Command { action, link } => {
            apply_link_args(&mut config, &link);
            if link.dry_run {
                let transport = MemoryTransport::new();
                let handle = transport.handle();
                run_device_command(&config, transport, action).await?;
                report_dry_run(&handle.writes());
                Ok(())
            } else {
                let transport = StreamTransport::connect(config.link.address.as_str()).await?;
                run_device_command(&config, transport, action).await
            }
        }
    }
}

/// Override config file values with command-line flags
fn apply_dither_args(config: &mut AppConfig, args: &DitherArgs) {
    if let Some(mode) = args.mode {
        config.driver.color_mode = mode;
    }
    if let Some(algorithm) = args.algorithm {
        config.dither.algorithm = algorithm;
    }
    if let Some(strength) = args.strength {
        config.dither.strength = strength;
    }
    if let Some(contrast) = args.contrast {
        config.dither.contrast = contrast;
    }
}

fn apply_link_args(config: &mut AppConfig, args: &LinkArgs) {
    if let Some(address) = &args.address {
        config.link.address = address.clone();
    }
    if let Some(mtu) = args.mtu {
        config.link.transport_unit_size = mtu;
    }
    if let Some(interleave) = args.interleave {
        config.link.interleave_count = interleave;
    }
}

fn run_encode(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    preview: Option<&Path>,
) -> anyhow::Result<()> {
    let image = read_png(input)?;
    let options = config.dither_config();
    let processed = epd_image::process(&image, &options);

    std::fs::write(output, processed.encoded.bytes())?;
    if let Some(preview) = preview {
        write_png(preview, &processed.preview)?;
    }

    println!(
        "{}x{} {} ({}) -> {} bytes",
        processed.encoded.width(),
        processed.encoded.height(),
        processed.encoded.mode(),
        options.algorithm,
        processed.encoded.len()
    );
    Ok(())
}

fn run_preview(
    input: &Path,
    output: &Path,
    width: usize,
    height: usize,
    mode: ColorMode,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(input)?;
    let encoded = EncodedImage::from_bytes(bytes, width, height, mode)?;
    write_png(output, &encoded.decode()?)?;
    println!("Wrote {}", output.display());
    Ok(())
}

async fn run_send<T: Transport>(
    config: &AppConfig,
    transport: T,
    image: epd_image::RgbaImage,
) -> anyhow::Result<()> {
    let session = DeviceSession::from_config(transport, config)?;
    let options = config.dither_config();

    let progress = |percent: u8| {
        eprint!("\r{percent:3}%");
        let _ = std::io::stderr().flush();
    };
    let encoded = session
        .send_image(image, &options, &progress, &TracingSink)
        .await;
    eprintln!();

    let encoded = encoded?;
    println!(
        "Sent {} bytes to {} ({})",
        encoded.len(),
        session.driver().name,
        encoded.mode()
    );
    Ok(())
}

async fn run_device_command<T: Transport>(
    config: &AppConfig,
    transport: T,
    action: DeviceCommand,
) -> anyhow::Result<()> {
    let session = DeviceSession::from_config(transport, config)?;
    let log = TracingSink;

    match action {
        DeviceCommand::Init => session.init(&log).await?,
        DeviceCommand::Clear => session.clear(&log).await?,
        DeviceCommand::Refresh => session.refresh(&log).await?,
        DeviceCommand::Sleep => session.sleep(&log).await?,
        DeviceCommand::SyncTime { clock } => {
            let mode = if clock {
                TimeSyncMode::Clock
            } else {
                TimeSyncMode::Calendar
            };
            let now = chrono::Local::now().fixed_offset();
            session.sync_time(mode, &now, &log).await?
        }
        DeviceCommand::SetPins { hex } => session.set_pins(&decode_hex(&hex)?, &log).await?,
        DeviceCommand::SendCmd { hex } => session.send_cmd(&decode_hex(&hex)?, &log).await?,
        DeviceCommand::SendData { hex } => session.send_data(&decode_hex(&hex)?, &log).await?,
        DeviceCommand::SetConfig { hex } => session.set_config(&decode_hex(&hex)?, &log).await?,
        DeviceCommand::Reset => session.sys_reset(&log).await?,
        DeviceCommand::SysSleep => session.sys_sleep(&log).await?,
        DeviceCommand::EraseConfig => session.erase_config(&log).await?,
        DeviceCommand::Raw { hex } => {
            if let Some(reply) = session.send_raw(&hex, &log).await? {
                if !reply.is_empty() {
                    println!("{}", hex::encode(reply));
                }
            }
        }
    }
    Ok(())
}

fn decode_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(cleaned)?)
}

fn report_dry_run(writes: &[epd_link::transport::RecordedWrite]) {
    let acked = writes
        .iter()
        .filter(|w| w.mode == WriteMode::WithResponse)
        .count();
    let bytes: usize = writes.iter().map(|w| w.data.len()).sum();
    println!(
        "Dry run: {} writes ({} acknowledged), {} bytes",
        writes.len(),
        acked,
        bytes
    );
}
