use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glint", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Negotiate with a device and print its capability snapshot as JSON.
    Caps(CapsArgs),
    /// Run a JSON surface scenario and print the resulting statistics as JSON.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct CapsArgs {
    /// Headless device description (JSON). Defaults to a desktop 3.0 device.
    #[arg(long)]
    device: Option<PathBuf>,

    /// Backend tunables (JSON).
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Device to query.
    #[arg(long, value_enum, default_value_t = DeviceChoice::Headless)]
    backend: DeviceChoice,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Headless device description (JSON). Defaults to a desktop 3.0 device.
    #[arg(long)]
    device: Option<PathBuf>,

    /// Scenario JSON.
    #[arg(long)]
    scenario: PathBuf,

    /// Override the scenario's initialization flags.
    #[arg(long)]
    flags: Option<u32>,

    /// Device to run against.
    #[arg(long, value_enum, default_value_t = DeviceChoice::Headless)]
    backend: DeviceChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeviceChoice {
    Headless,
    #[cfg(feature = "gpu")]
    Wgpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Caps(args) => cmd_caps(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

fn make_device(
    choice: DeviceChoice,
    spec: Option<&Path>,
) -> anyhow::Result<Box<dyn glint::GpuDevice>> {
    match choice {
        DeviceChoice::Headless => {
            let spec = match spec {
                Some(p) => read_json::<glint::HeadlessSpec>(p, "device description")?,
                None => glint::HeadlessSpec::default(),
            };
            Ok(Box::new(glint::HeadlessDevice::new(spec)))
        }
        #[cfg(feature = "gpu")]
        DeviceChoice::Wgpu => Ok(Box::new(glint::gpu::wgpu_device::WgpuDevice::new()?)),
    }
}

fn cmd_caps(args: CapsArgs) -> anyhow::Result<()> {
    let device = make_device(args.backend, args.device.as_deref())?;
    let opts = match &args.opts {
        Some(p) => read_json::<glint::GlintOpts>(p, "options")?,
        None => glint::GlintOpts::default(),
    };
    let caps = glint::gpu::caps::negotiate(device.as_ref(), &opts)
        .context("capability negotiation failed")?;
    println!("{}", serde_json::to_string_pretty(&caps)?);
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let device = make_device(args.backend, args.device.as_deref())?;
    let mut scenario: glint::sim::Scenario = read_json(&args.scenario, "scenario")?;
    if let Some(flags) = args.flags {
        scenario.flags = flags;
    }
    let report = glint::sim::run(device, &scenario).context("scenario failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
