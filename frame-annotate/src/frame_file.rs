use image::RgbImage;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Writes annotated frames as numbered TIFF files into one directory.
pub struct FrameWriter {
    dir: PathBuf,
    prefix: String,
    count: u64,
}

impl FrameWriter {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: impl AsRef<Path>, prefix: &str) -> Result<FrameWriter, String> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("could not create {}: {}", dir.display(), e))?;
        Ok(FrameWriter {
            dir,
            prefix: prefix.to_string(),
            count: 0,
        })
    }

    /// Writer into a fresh, randomly named directory under the OS temporary directory.
    pub fn in_temp_dir(prefix: &str) -> Result<FrameWriter, String> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        FrameWriter::new(std::env::temp_dir().join(format!("{}-{}", prefix, suffix)), prefix)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames_written(&self) -> u64 {
        self.count
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<PathBuf, String> {
        let path = self
            .dir
            .join(format!("{}_{:06}.tiff", self.prefix, self.count));
        frame.save(&path).map_err(|e| e.to_string())?;
        self.count += 1;
        Ok(path)
    }
}
