//! The forking/subprocess build executor (step 3.d's `fork(pkg, fn)`).
//!
//! The workspace denies `unsafe_code`, so there is no literal `fork(2)` here (see DESIGN.md's
//! "fork simplification" decision): the recipe's `install` runs in-process, and genuine OS
//! process isolation happens one level down, at each `configure`/`make`/`cmake` invocation,
//! which this module actually spawns via `std::process::Command` — matching the source's real
//! unit of isolation (each build tool invocation is its own child process) without requiring a
//! literal fork of the driver itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crucible_core::{Error, Result, Spec};

use crate::env::EnvironmentModifications;

/// One subprocess invocation: program, arguments, working directory, environment, and where
/// to capture output (: "Open `spack-build.out` as build log; redirect child
/// stdout/stderr into it (and optionally tee to terminal)").
#[derive(Debug)]
pub struct RunRequest<'a> {
    pub program: &'a str,
    pub args: &'a [&'a str],
    pub cwd: &'a Path,
    pub env: &'a EnvironmentModifications,
    pub log_path: &'a Path,
    pub verbose: bool,
}

/// The build-environment collaborator: runs one build-tool invocation, capturing its
/// output into the build log and optionally teeing it to the terminal.
pub trait BuildEnv: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns [`crucible_core::Error::install_with_log`] if the child exits non-zero or
    /// fails to spawn, annotated with `request.log_path` so the operator knows where to look.
    fn run(&self, request: &RunRequest<'_>) -> Result<()>;
}

/// Spawns real child processes via `std::process::Command`, appending their combined output to
/// the build log on every invocation (a single install typically calls `run` several times:
/// configure, then make, then make install).
#[derive(Debug, Default)]
pub struct ProcessBuildEnv;

impl BuildEnv for ProcessBuildEnv {
    fn run(&self, request: &RunRequest<'_>) -> Result<()> {
        if let Some(parent) = request.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut cmd = Command::new(request.program);
        cmd.args(request.args)
            .current_dir(request.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        request.env.apply_to_command(&mut cmd);

        tracing::info!(program = request.program, args = ?request.args, "running build step");

        let output = cmd.output().map_err(|e| {
            Error::install_with_log(
                format!("failed to spawn '{}': {e}", request.program),
                request.log_path.to_path_buf(),
            )
        })?;

        let mut log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(request.log_path)
            .map_err(|e| Error::io(request.log_path.to_path_buf(), e))?;
        log_file
            .write_all(&output.stdout)
            .and_then(|()| log_file.write_all(&output.stderr))
            .map_err(|e| Error::io(request.log_path.to_path_buf(), e))?;

        if request.verbose {
            let _ = std::io::stdout().write_all(&output.stdout);
            let _ = std::io::stderr().write_all(&output.stderr);
        }

        if !output.status.success() {
            return Err(Error::install_with_log(
                format!("'{}' exited with {}", request.program, output.status),
                request.log_path.to_path_buf(),
            ));
        }

        Ok(())
    }
}

/// The value passed to a recipe's `install` method.
pub struct BuildContext<'a> {
    pub spec: &'a Spec,
    prefix: &'a Path,
    source_dir: &'a Path,
    make_jobs: u32,
    dependency_prefixes: &'a [(String, PathBuf)],
    build_env: &'a dyn BuildEnv,
    env: &'a EnvironmentModifications,
    log_path: &'a Path,
    verbose: bool,
}

impl<'a> BuildContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: &'a Spec,
        prefix: &'a Path,
        source_dir: &'a Path,
        make_jobs: u32,
        dependency_prefixes: &'a [(String, PathBuf)],
        build_env: &'a dyn BuildEnv,
        env: &'a EnvironmentModifications,
        log_path: &'a Path,
        verbose: bool,
    ) -> Self {
        Self {
            spec,
            prefix,
            source_dir,
            make_jobs,
            dependency_prefixes,
            build_env,
            env,
            log_path,
            verbose,
        }
    }

    #[must_use]
    pub const fn prefix(&self) -> &Path {
        self.prefix
    }

    #[must_use]
    pub const fn source_dir(&self) -> &Path {
        self.source_dir
    }

    #[must_use]
    pub const fn make_jobs(&self) -> u32 {
        self.make_jobs
    }

    fn request(&self, program: &'a str, args: &'a [&'a str]) -> RunRequest<'a> {
        RunRequest {
            program,
            args,
            cwd: self.source_dir,
            env: self.env,
            log_path: self.log_path,
            verbose: self.verbose,
        }
    }

    /// Runs an arbitrary build-tool invocation in the staged source directory.
    pub fn run(&self, program: &'a str, args: &'a [&'a str]) -> Result<()> {
        self.build_env.run(&self.request(program, args))
    }

    /// Runs `./configure --prefix=<prefix> <extra_args>`.
    pub fn configure(&self, extra_args: &[&str]) -> Result<()> {
        let mut owned = vec![format!("--prefix={}", self.prefix.display())];
        owned.extend(extra_args.iter().map(|s| (*s).to_string()));
        let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.build_env.run(&RunRequest {
            program: "./configure",
            args: &refs,
            cwd: self.source_dir,
            env: self.env,
            log_path: self.log_path,
            verbose: self.verbose,
        })
    }

    /// Runs `make -j<make_jobs> <targets>`.
    pub fn make(&self, targets: &[&str]) -> Result<()> {
        let jobs_arg = format!("-j{}", self.make_jobs);
        let mut owned = vec![jobs_arg];
        owned.extend(targets.iter().map(|s| (*s).to_string()));
        let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.build_env.run(&RunRequest {
            program: "make",
            args: &refs,
            cwd: self.source_dir,
            env: self.env,
            log_path: self.log_path,
            verbose: self.verbose,
        })
    }

    /// Runs `cmake -DCMAKE_INSTALL_PREFIX=<prefix> <extra_args> <source_dir>`.
    pub fn cmake(&self, extra_args: &[&str]) -> Result<()> {
        let mut owned = vec![format!("-DCMAKE_INSTALL_PREFIX={}", self.prefix.display())];
        owned.extend(extra_args.iter().map(|s| (*s).to_string()));
        owned.push(self.source_dir.display().to_string());
        let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.build_env.run(&RunRequest {
            program: "cmake",
            args: &refs,
            cwd: self.source_dir,
            env: self.env,
            log_path: self.log_path,
            verbose: self.verbose,
        })
    }

    /// The accumulated library search path for the spec's dependency closure.
    #[must_use]
    pub fn rpath(&self) -> Vec<PathBuf> {
        self.dependency_prefixes.iter().map(|(_, prefix)| prefix.join("lib")).collect()
    }

    /// `rpath` formatted as linker arguments.
    #[must_use]
    pub fn rpath_args(&self) -> String {
        self.rpath()
            .iter()
            .map(|p| format!("-Wl,-rpath,{}", p.display()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
