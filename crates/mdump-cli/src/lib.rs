//! Library wrapper around the `mdump` CLI implementation.
//!
//! The binary crate root (`main.rs`) is compiled as a module here so
//! `cargo test -p mdump-cli --lib` typechecks the CLI without building the
//! integration suite.

#[allow(dead_code)]
#[path = "main.rs"]
mod main_bin;
