// Library root
// -----------
// This crate exposes the library surface behind the `pockyt` CLI. The
// binary (`main.rs`) parses arguments and hands them to `ui`.
//
// Module responsibilities:
// - `format`: compiles a user template into a renderer and a parser.
// - `record`: the item model shared by every other module.
// - `retrieve`: filter payload and pagination over the `/get` endpoint.
// - `ingest`: reads input lines (prompt, stdin, argument, file) into records.
// - `mutate`: action selection and the single batch `/send` request.
// - `output`: console, file, JSON, browser and archive output.
// - `api`: the blocking HTTP client and the `Transport` seam.
// - `cli` / `ui`: argument parsing and the per-command flows.
// - `fs`, `browser`, `error`: small helpers and the error type.
pub mod api;
pub mod browser;
pub mod cli;
pub mod error;
pub mod format;
pub mod fs;
pub mod ingest;
pub mod mutate;
pub mod output;
pub mod record;
pub mod retrieve;
pub mod ui;

pub use error::{Error, Result};
pub use format::FormatSpec;
pub use record::{Field, Record};
