//! Boundary traits between the measurement pipeline and its collaborators.
//!
//! The pipeline never talks to acquisition hardware directly; a driver hands
//! it text captures obtained through [`TraceSource`], and paces iterations
//! with a [`Clock`].
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Line printed by the rig firmware once sampling starts.
pub const DEFAULT_TRIGGER_PHRASE: &str = "== IT'S ALIVE ==";

/// Something that can produce one framed text capture per call.
///
/// A capture is the raw terminal output of the transit-time rig: a trigger
/// line, optional `temperature:` line, `us`/`ds` sample lines and `DONE`.
pub trait TraceSource {
    fn acquire(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: TraceSource + ?Sized> TraceSource for Box<T> {
    fn acquire(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).acquire(timeout)
    }
}
