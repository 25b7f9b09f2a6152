use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use detect2yolo::config::{ExtractArgs, SplitArgs, VerifyArgs};
use detect2yolo::extract::Extractor;
use detect2yolo::postprocess::Thresholds;
use detect2yolo::store::run_timestamp;
use detect2yolo::{
    discover_images, Cli, Command, DatasetStore, FilePreview, PrecomputedDetector, ResumeState,
    Result, Session, SessionConfig, SessionReport, SplitRatios, Splitter, TerminalInput,
};
#[cfg(not(feature = "highgui"))]
use detect2yolo::CurateError;
#[cfg(feature = "highgui")]
use detect2yolo::window::{HighGuiInput, HighGuiPreview};
use std::path::PathBuf;

#[cfg(feature = "highgui")]
fn window_session(
    store: DatasetStore,
    detector: PrecomputedDetector,
    config: SessionConfig,
    image_paths: &[PathBuf],
    counters: ResumeState,
) -> Result<SessionReport> {
    Session::new(store, detector, HighGuiPreview::open()?, HighGuiInput, config)
        .run(image_paths, counters)
}

#[cfg(not(feature = "highgui"))]
fn window_session(
    _store: DatasetStore,
    _detector: PrecomputedDetector,
    _config: SessionConfig,
    _image_paths: &[PathBuf],
    _counters: ResumeState,
) -> Result<SessionReport> {
    Err(CurateError::Preview(
        "built without the highgui feature, rebuild with --features highgui or drop --window"
            .to_string(),
    ))
}

fn verify(args: VerifyArgs) -> Result<()> {
    let image_paths = discover_images(&args.input);
    let counters = ResumeState::new(args.auto_count, args.manual_count, args.skip_count);
    info!(
        "Resuming at image {} of {} ({})",
        counters.offset(),
        image_paths.len(),
        counters
    );

    let detector = PrecomputedDetector::new(&args.predictions, args.input.clone(), args.names);
    detector.check_unique(&image_paths)?;

    let store = DatasetStore::open(&args.output, run_timestamp())?;

    let config = SessionConfig {
        input_size: args.img_size,
        stride: args.stride,
        thresholds: Thresholds {
            confidence: args.conf,
            iou: args.iou,
        },
        preview_width: args.preview_width,
    };
    let report = if args.window {
        window_session(store, detector, config, &image_paths, counters)?
    } else {
        let preview_path = args
            .preview
            .unwrap_or_else(|| args.output.join("preview.jpg"));
        info!("Preview frames are written to {}", preview_path.display());
        Session::new(
            store,
            detector,
            FilePreview::new(preview_path),
            TerminalInput,
            config,
        )
        .run(&image_paths, counters)?
    };
    println!("{}", report.summary());
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<()> {
    let image_paths = discover_images(&args.input);
    let written = Extractor::new(&args.output).extract(&image_paths)?;
    info!("Wrote {} images to {}", written, args.output.display());
    Ok(())
}

fn split(args: SplitArgs) -> Result<()> {
    let splitter = Splitter {
        input: args.input,
        output: args.output,
        ratios: SplitRatios {
            train: args.train,
            val: args.val,
            test: args.test,
        },
        seed: args.seed,
        batch_name: args.batch_name.unwrap_or_else(run_timestamp),
        names: args.names,
    };
    let split = splitter.run()?;
    info!(
        "Split into {} train, {} val, {} test",
        split.train.len(),
        split.val.len(),
        split.test.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Verify(args) => verify(args),
        Command::Extract(args) => extract(args),
        Command::Split(args) => split(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
