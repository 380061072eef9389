//! Maps `Box<dyn Error>` from the `TraceSource` boundary to typed `FlowError`.
//!
//! With the `capture-errors` feature, `flowmeter_capture::error::CaptureError`
//! is downcast for precise mapping; otherwise the message is inspected.

use crate::error::FlowError;

pub fn map_capture_error(e: &(dyn std::error::Error + 'static)) -> FlowError {
    #[cfg(feature = "capture-errors")]
    {
        use flowmeter_capture::error::CaptureError;
        if let Some(ce) = e.downcast_ref::<CaptureError>() {
            return match ce {
                CaptureError::Timeout | CaptureError::NotReady(_) => FlowError::AcquisitionTimeout,
                other => FlowError::Acquisition(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FlowError::AcquisitionTimeout
    } else {
        FlowError::Acquisition(s)
    }
}
