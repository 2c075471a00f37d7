// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `api`: the client boundary traits and error type.
// - `telegram`: the `grammers`-backed implementation of that boundary.
// - `ops`: upload, download, update and list over any boundary client.
// - `progress`: transfer progress rendering.
// - `config`: credentials and session location.
// - `ui`: menu loop, prompts and login.
pub mod api;
pub mod config;
pub mod ops;
pub mod progress;
pub mod telegram;
pub mod ui;
