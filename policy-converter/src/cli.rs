use crate::manifest;
use anyhow::{bail, Context, Result};
use clap::Parser;
use policy_converter_core::KvPair;
use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Debug, Parser)]
#[clap(
    name = "policy-converter",
    about = "Converts Kubernetes network policies, namespaces, and service accounts into policy model resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "policy_converter=info,warn",
        env = "POLICY_CONVERTER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// Output encoding: `json` or `yaml`.
    #[clap(short, long, default_value = "json")]
    output: OutputFormat,

    /// Namespace of NetworkPolicies and ServiceAccounts that don't set one.
    #[clap(short, long, default_value = "default")]
    namespace: String,

    /// Fails if any policy rule could not be converted.
    #[clap(long)]
    strict: bool,

    /// Manifest to convert. Reads standard input when omitted or `-`.
    input: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

// === impl Args ===

impl Args {
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            output,
            namespace,
            strict,
            input,
        } = self;

        log_format.try_init(log_level)?;

        let manifest = match input.as_deref() {
            Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            _ => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read standard input")?;
                buf
            }
        };

        let objects = manifest::decode(&manifest)?;
        let report = manifest::convert(objects, &namespace);
        output.write(&report.converted, io::stdout().lock())?;
        info!(
            converted = report.converted.len(),
            failed = report.failures.len(),
            "Converted manifest"
        );

        if !report.failures.is_empty() {
            bail!("{} object(s) could not be converted", report.failures.len());
        }
        if strict && !report.rule_errors.is_empty() {
            bail!(
                "{} policies have rules that could not be converted",
                report.rule_errors.len()
            );
        }
        Ok(())
    }
}

// === impl OutputFormat ===

impl OutputFormat {
    /// Writes resources as a JSON array or a YAML sequence.
    pub fn write(self, resources: &[KvPair], mut out: impl Write) -> Result<()> {
        match self {
            Self::Json => {
                serde_json::to_writer_pretty(&mut out, resources)?;
                writeln!(out)?;
            }
            Self::Yaml => serde_yaml::to_writer(&mut out, resources)?,
        }
        out.flush()?;
        Ok(())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            s => bail!("invalid output format: {s:?}"),
        }
    }
}
