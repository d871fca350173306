use keyline::cli::{Args, Command};
use keyline::entities::effects::chroma_key::apply_chroma_key;
use keyline::entities::{AnalysisResult, ChromaKeySettings, Frame};

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
    debug!("Command-line args: {:?}", args);

    match args.command {
        Command::Key {
            input,
            output,
            color,
            tolerance,
            spill,
            softness,
        } => run_key(&input, &output, &color, tolerance, spill, softness),
        Command::Inspect { session } => run_inspect(&session),
    }
}

fn run_key(
    input: &Path,
    output: &Path,
    color: &str,
    tolerance: f32,
    spill: f32,
    softness: f32,
) -> anyhow::Result<()> {
    let mut frame =
        Frame::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    info!(
        "Keying {} ({}x{}) with {} tol={} spill={} soft={}",
        input.display(),
        frame.width(),
        frame.height(),
        color,
        tolerance,
        spill,
        softness
    );

    let settings = ChromaKeySettings::new(color, tolerance, spill, softness);
    apply_chroma_key(frame.pixels_mut(), &settings);
    frame
        .save_png(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn run_inspect(session: &Path) -> anyhow::Result<()> {
    let analysis = AnalysisResult::load(session)?;
    println!(
        "{} segments over {:.1}s",
        analysis.segments().len(),
        analysis.total_duration
    );
    for seg in analysis.segments() {
        println!(
            "  {}  {:>6}  {:5.1}s +{:4.1}s  [{}]  {}",
            seg.id,
            seg.time_label,
            seg.timestamp,
            seg.duration,
            seg.status,
            seg.topic
        );
        if seg.end() > analysis.total_duration {
            println!("    warning: segment runs {:.1}s past the video end",
                seg.end() - analysis.total_duration);
        }
        if seg.duration < 1.0 {
            println!("    warning: duration below the 1s minimum");
        }
    }
    Ok(())
}
