//! Command definitions for Tilt

/// Commands that can be dispatched from input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Recording
    ToggleRecording,
    StartRecording,
    StopRecording,
    ClearRecording,

    // Playback
    TogglePlayback,
    Play,
    StopPlayback,

    /// Stop whatever is running (recording or playback)
    Stop,

    // Calibration
    Recalibrate,

    // UI
    ToggleHelp,

    // Mode changes
    EnterCommandMode,
    EnterNormalMode,

    // Application
    Quit,
    Cancel,

    // Command mode
    ExecuteCommand(String),
}
