//! Turning contract sources into deployable artifacts
//!
//! A contract compiles to `<name>.wasm` plus `<name>.abi`. When a compiler is
//! configured it is run with the output directory and source path; otherwise
//! the source is expected to be a directory of prebuilt artifacts.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::common::config::BuilderConfig;
use crate::common::{paths, Error, Result};

/// Compiled contract code and its ABI document
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Contract name, taken from the source path
    pub name: String,
    pub source: PathBuf,
    pub code: Vec<u8>,
    /// Raw ABI JSON; validated when deployed
    pub abi: String,
    /// Hex SHA-256 of `code`
    pub code_hash: String,
}

impl Artifact {
    /// Read `<dir>/<name>.wasm` and `<dir>/<name>.abi`
    pub fn load(dir: &Path, name: &str, source: &Path) -> Result<Self> {
        let wasm_path = dir.join(format!("{}.wasm", name));
        let abi_path = dir.join(format!("{}.abi", name));

        let code = std::fs::read(&wasm_path).map_err(|e| {
            Error::build(source, format!("cannot read '{}': {}", wasm_path.display(), e))
        })?;
        if code.is_empty() {
            return Err(Error::build(
                source,
                format!("'{}' is empty", wasm_path.display()),
            ));
        }
        let abi = std::fs::read_to_string(&abi_path).map_err(|e| {
            Error::build(source, format!("cannot read '{}': {}", abi_path.display(), e))
        })?;

        let code_hash = hex::encode(Sha256::digest(&code));
        Ok(Self {
            name: name.to_string(),
            source: source.to_path_buf(),
            code,
            abi,
            code_hash,
        })
    }
}

/// Contract name for a source path
///
/// Directories keep their full name (`entu.burnpool`); files drop their
/// extension (`hello.cpp` gives `hello`).
pub fn contract_name(source: &Path) -> Result<String> {
    let name = if source.is_dir() {
        source.file_name()
    } else {
        source.file_stem()
    };
    name.and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::build(source, "cannot derive a contract name"))
}

/// Produces artifacts from contract sources
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, source: &Path) -> Result<Artifact>;
}

/// Loads artifacts that were compiled ahead of time
#[derive(Debug, Default)]
pub struct PrebuiltLoader;

#[async_trait]
impl Builder for PrebuiltLoader {
    async fn build(&self, source: &Path) -> Result<Artifact> {
        if !source.is_dir() {
            return Err(Error::build(
                source,
                "no compiler configured and source is not an artifact directory",
            ));
        }
        let name = contract_name(source)?;
        Artifact::load(source, &name, source)
    }
}

/// Runs an external compiler: `<program> [args...] <out_dir> <source>`
#[derive(Debug)]
pub struct CommandBuilder {
    program: PathBuf,
    args: Vec<String>,
    out_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(program: PathBuf, args: Vec<String>, out_dir: PathBuf) -> Self {
        Self {
            program,
            args,
            out_dir,
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    async fn build(&self, source: &Path) -> Result<Artifact> {
        if !source.exists() {
            return Err(Error::build(source, "source does not exist"));
        }
        let name = contract_name(source)?;
        let out_dir = self.out_dir.join(&name);
        std::fs::create_dir_all(&out_dir)
            .map_err(|e| Error::build(source, format!("cannot create output dir: {}", e)))?;

        let program = if self.program.exists() {
            self.program.clone()
        } else {
            which::which(&self.program).map_err(|_| {
                Error::build(
                    source,
                    format!("compiler '{}' not found", self.program.display()),
                )
            })?
        };

        let output = Command::new(&program)
            .args(&self.args)
            .arg(&out_dir)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::build(source, format!("failed to run compiler: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::build(
                source,
                format!(
                    "compiler exited with {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            ));
        }

        tracing::debug!(out_dir = %out_dir.display(), "Compiler finished");
        Artifact::load(&out_dir, &name, source)
    }
}

/// Builder described by the `[builder]` configuration section
pub fn from_config(config: &BuilderConfig) -> Box<dyn Builder> {
    match &config.program {
        Some(program) => {
            let out_dir = config
                .out_dir
                .clone()
                .unwrap_or_else(paths::artifact_dir);
            Box::new(CommandBuilder::new(
                program.clone(),
                config.args.clone(),
                out_dir,
            ))
        }
        None => Box::new(PrebuiltLoader),
    }
}
