//Run the tag pipeline of the first configured camera over recorded frames
//and print the values published to the table

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use frame_annotate::FrameWriter;
use slog::{error, info};
use tag_vision::{
    config::{VisionConfig, DEFAULT_CONFIG_PATH},
    coprocessor::Coprocessor,
    detection::{Detection, ScriptedDetector},
    pipeline::{CenterPolicy, TagPipeline},
    publisher::{ResultPublisher, AMP_CENTER_X_KEY, AMP_CENTER_Y_KEY, NUM_TARGETS_KEY},
    table::InMemoryTable,
    utils::set_log_config,
    worker::{ChannelFrameSource, FileFrameSink, FrameSink, NullFrameSink, VisionWorker},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    //camera/network configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    //RGB frames fed to the first camera, in order
    #[arg(short, long)]
    frames: Vec<PathBuf>,
    //JSON list holding the detections of each frame
    #[arg(short, long)]
    detections: Option<PathBuf>,
    //directory receiving the annotated frames, a fresh temporary one if unset
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    //do not save annotated frames at all
    #[arg(long, conflicts_with = "output_dir")]
    no_save: bool,
    //keep reporting the last amp position on frames without an amp tag
    #[arg(long)]
    hold_last: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log = set_log_config();

    let config = VisionConfig::load(&args.config, &log)?;
    let table = Arc::new(InMemoryTable::new());
    let coprocessor = Coprocessor::start(&config, table.as_ref(), &log);

    let camera = match coprocessor.vision_camera() {
        Some(camera) => camera.name.clone(),
        None => {
            error!(log, "no camera configured, nothing to process");
            return Ok(());
        }
    };

    let script: Vec<Vec<Detection>> = match &args.detections {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    let policy = if args.hold_last {
        CenterPolicy::HoldLast
    } else {
        CenterPolicy::ResetEachFrame
    };
    let pipeline = TagPipeline::new(ScriptedDetector::from_frames(script), policy, &log)?;

    let sink: Box<dyn FrameSink> = if args.no_save {
        Box::new(NullFrameSink)
    } else {
        let writer = match &args.output_dir {
            Some(dir) => FrameWriter::new(dir, &camera)?,
            None => FrameWriter::in_temp_dir(&camera)?,
        };
        info!(log, "annotated frames go to {}", writer.dir().display());
        Box::new(FileFrameSink::new(writer, &log))
    };

    let (frame_tx, frame_rx) = crossbeam_channel::bounded(2);
    let worker = VisionWorker::new(
        pipeline,
        ChannelFrameSource::new(frame_rx),
        sink,
        ResultPublisher::new(table.clone()),
        &log,
    )
    .spawn(&camera)?;

    for path in &args.frames {
        let frame = image::open(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?
            .into_rgb8();
        frame_tx.send(frame)?;
    }
    drop(frame_tx);

    let stats = worker.join().map_err(|_| "vision thread panicked")?;
    info!(
        log,
        "processed {} frames, skipped {}", stats.processed_frames, stats.failed_frames
    );

    for key in [NUM_TARGETS_KEY, AMP_CENTER_X_KEY, AMP_CENTER_Y_KEY].iter() {
        if let Some(value) = table.get(key) {
            println!("{}: {}", key, value);
        }
    }
    Ok(())
}
