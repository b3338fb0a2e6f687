//! Test module organization for flow control
