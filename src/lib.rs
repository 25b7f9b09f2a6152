//! Detector output to YOLO training data.
//!
//! This library walks image folders, shows a detector's candidate boxes to an
//! operator and saves the accepted images, with YOLO label files where the
//! predictions were confirmed. Labeled pools can then be split into
//! train/val/test sets.

pub mod config;
pub mod conversion;
pub mod detector;
pub mod error;
pub mod extract;
pub mod input;
pub mod io;
pub mod postprocess;
pub mod preprocess;
pub mod preview;
pub mod session;
pub mod split;
pub mod store;
pub mod types;
pub mod utils;
pub mod window;

// Re-export commonly used types and functions
pub use config::{Cli, Command};
pub use detector::{Detector, PrecomputedDetector};
pub use error::{CurateError, Result};
pub use input::{InputProvider, ScriptedInput, TerminalInput};
pub use io::discover_images;
pub use preview::{FilePreview, Preview};
pub use session::{Session, SessionConfig, SessionEnd, SessionReport};
pub use split::{SplitRatios, Splitter};
pub use store::DatasetStore;
pub use types::{Bucket, Decision, DetectionBox, LabelRow, ResumeState};
