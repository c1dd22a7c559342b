//! Dedicated thread running the tag pipeline on one camera.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use frame_annotate::FrameWriter;
use image::RgbImage;
use slog::{debug, info, o, warn, Logger};

use crate::detection::TagDetector;
use crate::pipeline::TagPipeline;
use crate::publisher::ResultPublisher;

/// Name of the annotated output stream.
pub const OUTPUT_STREAM_NAME: &str = "Goal Vision Stream (Buddy)";

/// Captured frames of one camera.
pub trait FrameSource: Send {
    /// Blocks until the next frame arrives. `None` once the source is closed.
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Destination of annotated frames. Delivery is best effort.
pub trait FrameSink: Send {
    fn put_frame(&mut self, frame: RgbImage);
}

pub struct ChannelFrameSource {
    frames: Receiver<RgbImage>,
}

impl ChannelFrameSource {
    pub fn new(frames: Receiver<RgbImage>) -> ChannelFrameSource {
        ChannelFrameSource { frames }
    }
}

impl FrameSource for ChannelFrameSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.frames.recv().ok()
    }
}

/// Forwards annotated frames to a channel, dropping them when it is full.
pub struct ChannelFrameSink {
    frames: Sender<RgbImage>,
}

impl ChannelFrameSink {
    pub fn new(frames: Sender<RgbImage>) -> ChannelFrameSink {
        ChannelFrameSink { frames }
    }
}

impl FrameSink for ChannelFrameSink {
    fn put_frame(&mut self, frame: RgbImage) {
        let _ = self.frames.try_send(frame);
    }
}

/// Saves annotated frames to disk.
pub struct FileFrameSink {
    writer: FrameWriter,
    log: Logger,
}

impl FileFrameSink {
    pub fn new(writer: FrameWriter, log: &Logger) -> FileFrameSink {
        FileFrameSink {
            writer,
            log: log.new(o!("sink" => "file")),
        }
    }
}

impl FrameSink for FileFrameSink {
    fn put_frame(&mut self, frame: RgbImage) {
        match self.writer.write_frame(&frame) {
            Ok(path) => debug!(self.log, "wrote {}", path.display()),
            Err(e) => warn!(self.log, "could not write frame: {}", e),
        }
    }
}

impl FrameSink for Box<dyn FrameSink> {
    fn put_frame(&mut self, frame: RgbImage) {
        (**self).put_frame(frame)
    }
}

/// Discards every frame.
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn put_frame(&mut self, _frame: RgbImage) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed_frames: u64,
    pub failed_frames: u64,
}

/// Loop of the vision thread: wait for a frame, process it, hand out the results.
pub struct VisionWorker<D, S, K> {
    pipeline: TagPipeline<D>,
    source: S,
    sink: K,
    publisher: ResultPublisher,
    log: Logger,
}

impl<D, S, K> VisionWorker<D, S, K>
where
    D: TagDetector + 'static,
    S: FrameSource + 'static,
    K: FrameSink + 'static,
{
    pub fn new(
        pipeline: TagPipeline<D>,
        source: S,
        sink: K,
        publisher: ResultPublisher,
        log: &Logger,
    ) -> Self {
        VisionWorker {
            pipeline,
            source,
            sink,
            publisher,
            log: log.new(o!("stream" => OUTPUT_STREAM_NAME)),
        }
    }

    /// Runs until the frame source closes.
    ///
    /// A frame the detector cannot handle is skipped; the loop carries on with the next one.
    pub fn run(mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        while let Some(frame) = self.source.next_frame() {
            match self.pipeline.process(frame) {
                Ok(result) => {
                    self.publisher.publish(&result);
                    self.sink.put_frame(result.annotated);
                    stats.processed_frames += 1;
                }
                Err(e) => {
                    warn!(self.log, "skipping frame: {}", e);
                    stats.failed_frames += 1;
                }
            }
        }
        info!(
            self.log,
            "frame source closed after {} frames ({} skipped)",
            stats.processed_frames + stats.failed_frames,
            stats.failed_frames
        );
        stats
    }

    pub fn spawn(self, camera: &str) -> io::Result<JoinHandle<WorkerStats>> {
        thread::Builder::new()
            .name(format!("vision-{}", camera))
            .spawn(move || self.run())
    }
}
