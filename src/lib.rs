pub mod bbox;
pub mod circular_queue;
pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod frame;
pub mod math;
pub mod registry;
pub mod session;
pub mod speed;
pub mod tracker;

mod track;

pub use config::Config;
pub use detection::{Detection, DetectionFilter};
pub use error::Error;
pub use frame::Frame;
pub use session::{CountingSession, FrameSummary};
pub use speed::{SpeedBand, SpeedEstimator};
pub use track::Track;

/// Anything that absorbs frames in delivery order.
///
/// Implementors are `Send`; a host receiving frames from a capture thread
/// holds one lock around each `update` call.
pub trait Tracking {
    fn update(&mut self, frame: &Frame);
}
