//! lib.rs: selection metadata core
//! ============================================================================
//! Classifies the current file selection, computes its display fields, and
//! keeps slow work (recursive sizes, media probing) off the caller's path
//! while never letting a superseded selection update the display.

pub mod error;

pub mod config;

pub mod logging;
pub use logging::{Logger, LoggerBuilder};

pub mod model {
    pub mod job_registry;
    pub use job_registry::{JobId, JobRegistry, JobToken};

    pub mod selection;
    pub use selection::{PathState, Paths, Selection, SelectionId, SelectionInfo, SelectionKind};

    pub mod selection_data;
    pub use selection_data::{FieldKey, FieldType, SelectionData, SelectionField};

    pub mod settings;
    pub use settings::{FieldSettings, SettingsFilter};
}

pub mod cache {
    pub mod fast_result;
    pub mod size_cache;
}

pub mod fs {
    pub mod classify;
    pub mod metadata_source;
    pub use metadata_source::{FsMetadataSource, MetadataSource};
}

pub mod tasks {
    pub mod job;
    pub mod metadata_task;
    pub mod size_task;
}

pub mod pipeline {
    pub mod display;
    pub use display::{ChannelSink, Delivery, DisplaySink};

    pub mod retrieval;
    pub use retrieval::RetrievalPipeline;
}

pub mod controller {
    pub mod selection_controller;
    pub use selection_controller::SelectionController;
}

pub mod util {
    pub mod humanize;
}

pub use config::Config;
pub use error::{AppError, AppResult};
