//! Media playback orchestration engine.
//!
//! Resolves raw media URLs into ordered fallback candidate chains, drives
//! audio/video/HLS playback attempts with bounded timeouts, and exposes a
//! playlist-aware playback session with play/pause/seek/next/previous/stop
//! controls. Media elements and HLS clients are collaborators behind traits;
//! this crate performs no network I/O or decoding itself.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod attempt;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod handle;
pub mod hls;
pub mod orchestrator;
pub mod playlist;
pub mod resolver;
pub mod session;
