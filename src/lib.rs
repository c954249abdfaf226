//! Touch-typing tutor core: keyboard layout emulation with dead key composition,
//! and the prompt matching state machine that scores a practice session.

pub mod app;
pub mod config;
pub mod event;
pub mod keyboard;
pub mod lesson;
pub mod session;
