//! Converts Kubernetes manifests offline, printing the resulting policy model objects.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cli;
mod manifest;

pub use self::{
    cli::{Args, OutputFormat},
    manifest::{convert, decode, Object, Report},
};
