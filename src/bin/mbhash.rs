//! Demo CLI: hashes its arguments as chunked streams.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mbhash::{
    Completion, DEFAULT_BATCH_WIDTH, DEFAULT_BLOCK_LEN, Digest, EngineConfig, LaneScheduler,
    MultiHash, OpenPolicy, SchedulerConfig, SingleStreamDriver, StreamCursor, StreamId,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hash text arguments with the multi-hash and the multi-buffer scheduler.
///
/// Stream 0 is the arguments in order, one chunk each. Stream 1 is the
/// arguments reversed followed by the arguments in order.
#[derive(Parser, Debug)]
#[command(name = "mbhash")]
#[command(version, about, long_about = None)]
struct Args {
    /// Text to hash, one chunk per argument
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,

    /// Lanes computed together in one batch
    #[arg(long, default_value_t = DEFAULT_BATCH_WIDTH)]
    batch_width: usize,

    /// Bytes a lane buffers before it goes in flight
    #[arg(long, default_value_t = DEFAULT_BLOCK_LEN)]
    block_len: usize,

    /// Open single-chunk streams with one `Entire` submit
    #[arg(long)]
    entire: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let engine = EngineConfig::new(args.batch_width, args.block_len)
        .context("bad engine settings")?;
    let policy = if args.entire {
        OpenPolicy::EntireForSingleChunk
    } else {
        OpenPolicy::AlwaysFirst
    };
    let config = SchedulerConfig::new(engine).with_open_policy(policy);

    let (first, second) = mirrored_streams(&args.text);

    println!("\n0: {}", first.concat().escape_ascii());
    println!("\n1: {}\n", second.concat().escape_ascii());

    let mut multi = MultiHash::new();
    for chunk in first.chunks() {
        multi.update(chunk)?;
    }
    print_hash("Multi-hash", StreamId::new(0), &multi.finalize());
    println!();

    let mut scheduler = LaneScheduler::new(vec![first.clone(), second], config)?;
    scheduler
        .run(print_completion)
        .context("two-stream run failed")?;
    println!();

    let mut driver = SingleStreamDriver::new(first, config)?;
    driver
        .run(print_completion)
        .context("single-stream run failed")?;
    println!();

    Ok(())
}

// Stream 1 is longer than stream 0 so the two lanes finish at different times.
fn mirrored_streams(text: &[String]) -> (StreamCursor, StreamCursor) {
    let forward = text.iter().cloned();
    let mirrored = text.iter().rev().chain(text.iter()).cloned();

    (
        StreamCursor::new(StreamId::new(0), forward.collect::<Vec<_>>()),
        StreamCursor::new(StreamId::new(1), mirrored.collect::<Vec<_>>()),
    )
}

fn print_completion(completion: Completion) {
    print_hash("Multi-buffer", completion.stream, &completion.digest);
}

fn print_hash(title: &str, id: StreamId, digest: &Digest) {
    println!("{title:>16} ({id}): {digest}");
}
