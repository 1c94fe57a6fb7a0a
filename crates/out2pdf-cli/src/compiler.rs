use out2pdf_config::CompilerSettings;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

/// XeLaTeX needs a second run to resolve bookmarks and page references.
const PASSES: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("Failed to execute {command} (pass {pass}) for file {tex:?}: {status}")]
    Invocation {
        command: String,
        pass: u8,
        tex: PathBuf,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error("Package manager '{command}' failed to {action}: {status}")]
    PackageManager {
        command: String,
        action: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

impl CompilerError {
    /// Captured output of the failed process, if any.
    pub fn output(&self) -> Option<(&str, &str)> {
        match self {
            Self::Invocation { stdout, stderr, .. } | Self::PackageManager { stdout, stderr, .. } => {
                Some((stdout.as_str(), stderr.as_str()))
            }
            Self::Spawn { .. } => None,
        }
    }
}

/// Runs the external document compiler.
pub struct CompilerDriver {
    settings: CompilerSettings,
}

impl CompilerDriver {
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    /// Compiles `tex` into `output_dir`, always running both passes.
    pub fn compile(&self, tex: &Path, output_dir: &Path) -> Result<(), CompilerError> {
        for pass in 1..=PASSES {
            log::info!(
                "running {} on {} (pass {} of {})",
                self.settings.command,
                tex.display(),
                pass,
                PASSES
            );
            let output = run(&self.settings.command, self.compile_args(tex, output_dir))?;
            if !output.status.success() {
                return Err(CompilerError::Invocation {
                    command: self.settings.command.clone(),
                    pass,
                    tex: tex.to_path_buf(),
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
        }
        Ok(())
    }

    fn compile_args(&self, tex: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-interaction=nonstopmode".into(),
            "-output-directory".into(),
            output_dir.into(),
        ];
        if let Some(aux_dir) = &self.settings.aux_dir {
            args.push("-aux-directory".into());
            args.push(aux_dir.into());
        }
        args.push(tex.into());
        args
    }

    /// Installs whichever of `required` the package manager does not list as
    /// installed. Returns the packages that were installed.
    ///
    /// Does nothing when no package manager is configured.
    pub fn ensure_packages(&self, required: &[&str]) -> Result<Vec<String>, CompilerError> {
        let Some(manager) = &self.settings.package_manager else {
            log::debug!("no package manager configured, skipping package check");
            return Ok(Vec::new());
        };

        log::info!("checking installed packages with {manager}");
        let listing = run_checked(manager, ["--list"], "list packages")?;
        let installed = parse_installed_packages(&listing);

        let mut added = Vec::new();
        for package in required.iter().filter(|p| !installed.iter().any(|i| i == *p)) {
            log::info!("installing package \"{package}\"");
            run_checked(
                manager,
                ["--install", *package],
                &format!("install package \"{package}\""),
            )?;
            added.push(package.to_string());
        }
        log::info!("all required packages installed");
        Ok(added)
    }
}

/// Package names from a `--list` listing: lines flagged `i`, last column.
fn parse_installed_packages(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            match columns.next() {
                Some("i") => columns.last().map(String::from),
                _ => None,
            }
        })
        .collect()
}

fn run<I, S>(command: &str, args: I) -> Result<Output, CompilerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(command)
        .args(args)
        .output()
        .map_err(|source| CompilerError::Spawn {
            command: command.to_string(),
            source,
        })
}

fn run_checked<I, S>(command: &str, args: I, action: &str) -> Result<String, CompilerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = run(command, args)?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(CompilerError::PackageManager {
            command: command.to_string(),
            action: action.to_string(),
            status: output.status,
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(stdout)
}
