//! Working directory layout
//!
//! A working directory holds everything for one project:
//!
//! ```text
//! <root>/
//!   source/            pipeline input, one image per page
//!   positive/          exported positive samples
//!   negative/          negative crops
//!   output/            pipeline results (created on demand)
//!   model/cascade.xml  trained cascade classifier
//!   pos.txt            positive annotation manifest
//!   neg.txt            negative crop manifest
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Pipeline input directory name
pub const SOURCE_DIRECTORY_NAME: &str = "source";
/// Positive sample directory name
pub const POSITIVE_DIRECTORY_NAME: &str = "positive";
/// Negative crop directory name
pub const NEGATIVE_DIRECTORY_NAME: &str = "negative";
/// Pipeline output directory name
pub const OUTPUT_DIRECTORY_NAME: &str = "output";
/// Directory holding the trained model
pub const MODEL_DIRECTORY_NAME: &str = "model";
/// Trained cascade filename
pub const MODEL_FILENAME: &str = "cascade.xml";

/// Positive annotation manifest
pub const POSITIVE_ANNOTATION_FILENAME: &str = "pos.txt";
/// Negative annotation manifest
pub const NEGATIVE_ANNOTATION_FILENAME: &str = "neg.txt";

/// Per-project config file looked up at the working directory root
pub const LOCAL_CONFIG_FILENAME: &str = "page-cleaner.toml";

/// Paths inside one working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    root: PathBuf,
}

impl WorkingDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIRECTORY_NAME)
    }

    pub fn positive_dir(&self) -> PathBuf {
        self.root.join(POSITIVE_DIRECTORY_NAME)
    }

    pub fn negative_dir(&self) -> PathBuf {
        self.root.join(NEGATIVE_DIRECTORY_NAME)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIRECTORY_NAME)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(MODEL_DIRECTORY_NAME).join(MODEL_FILENAME)
    }

    pub fn positive_manifest(&self) -> PathBuf {
        self.root.join(POSITIVE_ANNOTATION_FILENAME)
    }

    pub fn negative_manifest(&self) -> PathBuf {
        self.root.join(NEGATIVE_ANNOTATION_FILENAME)
    }

    pub fn local_config(&self) -> PathBuf {
        self.root.join(LOCAL_CONFIG_FILENAME)
    }

    /// Path of a source image by its filename
    pub fn source_image(&self, image_id: &str) -> PathBuf {
        self.source_dir().join(image_id)
    }

    /// Create the input-side directories if absent.
    ///
    /// `output/` is left to the pipeline.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for dir in [
            self.source_dir(),
            self.positive_dir(),
            self.negative_dir(),
            self.root.join(MODEL_DIRECTORY_NAME),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Key used for an image inside `pos.txt`: `source/<filename>`
pub fn annotation_key(image_id: &str) -> String {
    format!("{}/{}", SOURCE_DIRECTORY_NAME, image_id)
}

/// Platform housekeeping files such as `.DS_Store`
pub fn is_hidden_file(name: &str) -> bool {
    name.starts_with('.')
}
