use std::fmt;

/// Lifecycle of a [`super::PipelineController`].
///
/// `Init -> Running -> Stopping -> Stopped`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Init => "INIT",
            ControllerState::Running => "RUNNING",
            ControllerState::Stopping => "STOPPING",
            ControllerState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Why the capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The capture device returned no frame.
    CaptureFailure,
    /// An external stop signal was observed between iterations.
    Interrupted,
}

/// Counters for one run of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_captured: u64,
    pub frames_processed: u64,
    pub regions_accepted: u64,
    pub regions_skipped: u64,
    /// Records that were assigned a sequence id, whether or not their
    /// artifacts reached disk.
    pub records_persisted: u64,
    pub persist_failures: u64,
    pub notifications_sent: u64,
    pub stop_reason: Option<StopReason>,
}
