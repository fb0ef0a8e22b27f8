//! Layout stream driver
//!
//! Shapes a synthetic dataset, opens a streaming session and runs the
//! stand-in layout, publishing one frame per iteration.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use layoutstream_rs::{
    channel::{StreamChannel, TcpTransport},
    codec::{decode_message, FrameKind, Message},
    config::{default_config_path, StreamConfig, TransportConfig},
    datasets::DatasetKind,
    layout::{stream_layout, JitterLayout},
    mapper::DefaultMapper,
    session::Session,
};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "layoutstream")]
#[command(author, version, about = "Stream a live graph layout to a renderer")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to lay out (small or large)
    #[arg(short, long)]
    dataset: Option<DatasetKind>,

    /// Number of layout iterations
    #[arg(short = 'n', long)]
    max_iter: Option<u32>,

    /// Publish over TCP on this address instead of the configured transport
    #[arg(long)]
    tcp: Option<String>,

    /// Seconds to wait for a TCP subscriber before starting the layout
    #[arg(long, default_value = "0")]
    wait_subscriber: u64,

    /// Send the edge frame with every node frame
    #[arg(long)]
    resend_edges: bool,

    /// Seed for the stand-in layout
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Print the session summary as JSON
    #[arg(long)]
    summary_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.log_dir.as_ref());

    let mut config = match &args.config {
        Some(path) => StreamConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StreamConfig::load_default().context("Failed to load default config")?,
    };
    if let Some(kind) = args.dataset {
        config.dataset.kind = kind;
    }
    if let Some(max_iter) = args.max_iter {
        config.max_iter = max_iter;
    }
    if let Some(addr) = &args.tcp {
        config.transport = TransportConfig::Tcp { addr: addr.clone() };
    }
    config.resend_edges |= args.resend_edges;
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.save_config {
        config.save(path)?;
        tracing::info!("Wrote config to {}", path.display());
        return Ok(());
    }
    if args.config.is_none() {
        if let Some(path) = default_config_path() {
            tracing::debug!("Default config location: {}", path.display());
        }
    }

    let graph = config.dataset.build().context("Failed to build dataset")?;
    tracing::info!(
        "Dataset {}: {} nodes, {} edges, transport {}",
        config.dataset.kind,
        graph.num_nodes(),
        graph.num_edges(),
        config.transport
    );

    let (channel, consumer) = match &config.transport {
        TransportConfig::InProcess => {
            let (channel, rx) = StreamChannel::in_process(config.queue_capacity);
            (channel, Some(spawn_consumer(rx)?))
        }
        TransportConfig::Tcp { addr } => {
            let transport = TcpTransport::bind(addr.as_str(), config.queue_capacity)
                .with_context(|| format!("Failed to bind {}", addr))?;
            if args.wait_subscriber > 0
                && !transport.wait_for_subscriber(Duration::from_secs(args.wait_subscriber))
            {
                tracing::warn!("No subscriber after {}s, streaming anyway", args.wait_subscriber);
            }
            (StreamChannel::new(transport), None)
        }
    };

    let mut session = Session::new(config.session_options());
    session.open(&graph, DefaultMapper, channel)?;

    let mut layout = JitterLayout::new(args.seed);
    let summary = stream_layout(&mut session, &mut layout, &graph, config.max_iter)?;

    if let Some(handle) = consumer {
        match handle.join() {
            Ok(frames) => tracing::info!("Consumer received {} frames", frames),
            Err(_) => tracing::error!("Consumer thread panicked"),
        }
    }

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} iterations, {} sent, {} dropped ({:.1}%)",
            summary.iterations,
            summary.channel.sent,
            summary.channel.dropped,
            summary.channel.drop_rate() * 100.0
        );
    }
    Ok(())
}

/// Console logging, plus a rolling file when `log_dir` is given
fn init_logging(
    log_dir: Option<&PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,layoutstream_rs=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "layoutstream.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Drain an in-process stream, logging each frame until the close sentinel
fn spawn_consumer(rx: Receiver<Vec<u8>>) -> Result<JoinHandle<u64>> {
    let handle = std::thread::Builder::new()
        .name("layoutstream-consumer".to_string())
        .spawn(move || {
            let mut frames = 0u64;
            for payload in rx.iter() {
                match decode_message(&payload) {
                    Ok(Message::Close) => {
                        tracing::debug!("Consumer saw close sentinel");
                        break;
                    }
                    Ok(Message::Frame(frame)) => {
                        frames += 1;
                        match frame.kind {
                            FrameKind::Edges => tracing::debug!(
                                "Edge frame: {} edges",
                                frame.table.num_rows()
                            ),
                            FrameKind::Nodes => tracing::trace!(
                                "Node frame {}: {} nodes",
                                frame.iteration,
                                frame.table.num_rows()
                            ),
                        }
                    }
                    Err(e) => tracing::warn!("Consumer got an undecodable message: {}", e),
                }
            }
            frames
        })
        .context("Failed to spawn consumer thread")?;
    Ok(handle)
}
