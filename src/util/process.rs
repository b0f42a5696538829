//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command, appending stdout and stderr to `log`.
    ///
    /// With `echo`, every line is also copied to this process's stderr. Output
    /// is only recorded, never interpreted.
    pub fn exec_logged(&self, log: &Path, echo: bool) -> Result<ExitStatus> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .with_context(|| format!("failed to open log file: {}", log.display()))?;
        let sink = Mutex::new(file);

        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let teed = std::thread::scope(|scope| -> Result<()> {
            let sink = &sink;
            let drain = stderr.map(|pipe| scope.spawn(move || tee(pipe, sink, echo)));
            let out = match stdout {
                Some(pipe) => tee(pipe, sink, echo),
                None => Ok(()),
            };
            // The stderr reader only finishes once the child closes its end.
            if out.is_err() {
                let _ = child.kill();
            }
            let err = match drain {
                Some(handle) => handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("stderr reader panicked"))?,
                None => Ok(()),
            };
            out.and(err)
                .with_context(|| format!("failed to write log file: {}", log.display()))
        });

        if let Err(e) = teed {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn tee(pipe: impl Read, sink: &Mutex<File>, echo: bool) -> io::Result<()> {
    let reader = BufReader::new(pipe);
    for line in reader.split(b'\n') {
        let mut line = line?;
        line.push(b'\n');
        {
            let mut file = sink.lock().map_err(|_| io::Error::other("log file lock poisoned"))?;
            file.write_all(&line)?;
        }
        if echo {
            io::stderr().write_all(&line)?;
        }
    }
    Ok(())
}

/// Append a line to the log file.
pub fn append_log_line(log: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .with_context(|| format!("failed to open log file: {}", log.display()))?;
    writeln!(file, "{}", line)
        .with_context(|| format!("failed to write log file: {}", log.display()))
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
