//! # pondwatch engine
//!
//! The temporal change-detection engine: given a pond parcel and a time
//! series of satellite captures, detect the first year a water body appears
//! and resolve the land-use class that preceded it.
//!
//! ## Components
//!
//! - **selector**: which captures are admissible evidence for a year
//! - **index**: the per-pixel normalized water index from four bands
//! - **temporal**: yearly median aggregation and the first-crossing scan
//! - **resolver**: pre-transition land-use class from historical epochs
//! - **pipeline**: per-parcel orchestration over collaborator traits

pub mod error;
pub mod index;
mod maybe_rayon;
pub mod pipeline;
pub mod resolver;
pub mod selector;
pub mod temporal;

pub use error::{EngineError, Result};
pub use index::water_index;
pub use pipeline::{
    detect_parcel, detect_transitions, BandReader, CaptureSource, DetectionOptions, ParcelReport,
};
pub use resolver::{resolve_previous_class, ClassSampler, EpochTable, LabelTable, Resolution};
pub use selector::select_captures;
pub use temporal::{find_transition, TransitionRecord};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{EngineError, Result};
    pub use crate::index::water_index;
    pub use crate::pipeline::{
        detect_parcel, detect_transitions, BandReader, CaptureSource, DetectionOptions,
        ParcelReport,
    };
    pub use crate::resolver::{
        resolve_previous_class, ClassSampler, EpochTable, LabelTable, Resolution,
    };
    pub use crate::selector::select_captures;
    pub use crate::temporal::{find_transition, TransitionRecord};
    pub use pondwatch_core::prelude::*;
}
