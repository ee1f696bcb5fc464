//! Presentation layer.
//!
//! Everything here is a pure function of scheduler output: which decorative
//! elements are visible, and which status message and title to show.

pub mod binder;
pub mod messages;

pub use binder::{FortuneThresholds, FortuneTone, PresentationBinder, Visibility};
pub use messages::{DEFAULT_STATUS_MESSAGES, StatusMessages, animation_title};
