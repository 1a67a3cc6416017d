//! CLI for sora-fetch - run Sora-compatible video jobs from the shell.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sora_fetch::node::{self, NodeInputs, NodeOutput, SoraCreateFetchVideo};
use sora_fetch::video::providers::{
    DEFAULT_API_BASE, DEFAULT_ORIGIN, DEFAULT_REFERER, DEFAULT_USER_AGENT,
};
use sora_fetch::{ImageUrls, Orientation, OutputLayout, Resolution};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sora-fetch")]
#[command(about = "Create, poll and download Sora-compatible video generation jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video from reference images and a prompt
    Run(RunArgs),

    /// Run the node from a host-style JSON input map (`-` reads stdin)
    Invoke(InvokeArgs),

    /// Print the node descriptor
    Describe,
}

#[derive(Args)]
struct OutputArgs {
    /// Output root; videos land in <dir>/sora
    #[arg(long, env = "SORA_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Resubmit the job this many times on transient errors
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[derive(Args)]
struct RunArgs {
    /// Image URL; repeat the flag or separate with commas/newlines
    #[arg(short, long = "image", required = true)]
    images: Vec<String>,

    /// The text prompt describing the video
    #[arg(short, long, default_value = "")]
    prompt: String,

    /// Output size tier
    #[arg(short, long, value_enum, default_value = "small")]
    resolution: ResolutionArg,

    /// Video duration in seconds (1-60)
    #[arg(short, long, default_value_t = 10)]
    duration: i64,

    /// Frame orientation
    #[arg(long, value_enum, default_value = "portrait")]
    orientation: OrientationArg,

    /// Model identifier
    #[arg(long, default_value = "sora-2")]
    model: String,

    /// Ask the service to watermark the clip
    #[arg(long)]
    watermark: bool,

    /// Service base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// API key (falls back to SORA_API_KEY)
    #[arg(long, default_value = "")]
    api_key: String,

    /// Origin header (empty to omit)
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Referer header (empty to omit)
    #[arg(long, default_value = DEFAULT_REFERER)]
    referer: String,

    /// User-Agent header (empty to omit)
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Seconds between status queries (1-60)
    #[arg(long, default_value_t = 5)]
    poll_interval: i64,

    /// Seconds to wait for the task before giving up (10-3600)
    #[arg(long, default_value_t = 600)]
    max_wait: i64,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct InvokeArgs {
    /// Path to a JSON object of node inputs, or `-` for stdin
    inputs: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    Small,
    Large,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Small => Resolution::Small,
            ResolutionArg::Large => Resolution::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

impl From<RunArgs> for NodeInputs {
    fn from(args: RunArgs) -> Self {
        NodeInputs {
            api_base: args.api_base,
            api_key: args.api_key,
            images: ImageUrls::Text(args.images.join("\n")),
            prompt: args.prompt,
            resolution: args.resolution.into(),
            duration: args.duration,
            orientation: args.orientation.into(),
            model: args.model,
            watermark: args.watermark,
            origin: args.origin,
            referer: args.referer,
            user_agent: args.user_agent,
            poll_interval: args.poll_interval,
            max_wait: args.max_wait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let output = node_for(&args.output);
            let inputs = NodeInputs::from(args);
            run_node(output, inputs, cli.json).await?;
        }
        Commands::Invoke(args) => {
            let output = node_for(&args.output);
            let inputs = read_inputs(&args.inputs)?;
            run_node(output, inputs, cli.json).await?;
        }
        Commands::Describe => {
            describe(cli.json)?;
        }
    }

    Ok(())
}

fn node_for(args: &OutputArgs) -> SoraCreateFetchVideo {
    SoraCreateFetchVideo::new(OutputLayout::resolve(args.output_dir.clone()))
        .with_retries(args.retries)
}

fn read_inputs(source: &str) -> anyhow::Result<NodeInputs> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read inputs from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("inputs must be a JSON object")?;
    Ok(NodeInputs::from_json(value)?)
}

async fn run_node(
    node: SoraCreateFetchVideo,
    inputs: NodeInputs,
    json_output: bool,
) -> anyhow::Result<()> {
    let output: NodeOutput = node.run(&inputs).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Downloaded video: {}", output.video_path);
        println!("Source URL: {}", output.video_url);
        println!(
            "Handle: {}/{} ({})",
            output.video.subfolder, output.video.filename, output.video.kind
        );
    }

    Ok(())
}

fn describe(json_output: bool) -> anyhow::Result<()> {
    let descriptor = node::descriptor();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        println!("{} ({})", descriptor.display_name, descriptor.class_type);
        println!("Category: {}", descriptor.category);
        for section in ["required", "optional"] {
            println!("\n{}:", section.to_uppercase());
            if let Some(inputs) = descriptor.input[section].as_object() {
                for (name, spec) in inputs {
                    println!("  {} {}", name, spec[0]);
                }
            }
        }
        println!("\nOUTPUTS:");
        for (name, kind) in descriptor.return_names.iter().zip(descriptor.return_types) {
            println!("  {} {}", name, kind);
        }
    }

    Ok(())
}
