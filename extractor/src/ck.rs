use async_trait::async_trait;
use model::{ClassMetrics, ExtractorContext};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AnalysisError;

pub const CLASS_TABLE: &str = "class.csv";

/// Something that turns a source directory into CK-style per-class rows.
#[async_trait]
pub trait StaticAnalyzer: Send + Sync {
    /// Analyzes `source_dir`, writing the tool's console output to `log_file`.
    async fn analyze(
        &self,
        source_dir: &Path,
        log_file: &Path,
    ) -> Result<Vec<ClassMetrics>, AnalysisError>;
}

/// Runs `java -jar ck.jar . true 0 true <out>/` from inside the source directory.
#[derive(Debug, Clone)]
pub struct CkAnalyzer {
    java: PathBuf,
    jar: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CkAnalyzer {
    /// Jar and output paths are made absolute because CK runs with a different working directory.
    pub fn new(ctx: &ExtractorContext) -> Result<Self, AnalysisError> {
        Ok(Self {
            java: ctx.java_path.clone(),
            jar: absolute(&ctx.ck_jar)?,
            output_dir: absolute(&ctx.ck_output_dir)?,
            timeout: Duration::from_secs(ctx.settings.analysis_timeout_secs),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// CK only ever appends to its output, so every run starts from an empty directory.
    fn reset_output_dir(&self) -> Result<(), AnalysisError> {
        match fs::remove_dir_all(&self.output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AnalysisError::io(&self.output_dir, e)),
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| AnalysisError::io(&self.output_dir, e))
    }

    /// CK concatenates the output argument and the file name, hence the trailing separator.
    fn output_arg(&self) -> PathBuf {
        let mut arg = self.output_dir.clone().into_os_string();
        if !arg.to_string_lossy().ends_with(MAIN_SEPARATOR_STR) {
            arg.push(MAIN_SEPARATOR_STR);
        }
        PathBuf::from(arg)
    }
}

#[async_trait]
impl StaticAnalyzer for CkAnalyzer {
    async fn analyze(
        &self,
        source_dir: &Path,
        log_file: &Path,
    ) -> Result<Vec<ClassMetrics>, AnalysisError> {
        self.reset_output_dir()?;

        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
        }
        let stdout = File::create(log_file).map_err(|e| AnalysisError::io(log_file, e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| AnalysisError::io(log_file, e))?;

        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .arg(".")
            .args(["true", "0", "true"])
            .arg(self.output_arg())
            .current_dir(source_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        debug!(source_dir = %source_dir.display(), "starting ck");
        let mut child = cmd.spawn().map_err(|e| AnalysisError::AnalysisFailed {
            source_dir: source_dir.to_path_buf(),
            reason: format!("could not start {}: {}", self.java.display(), e),
            log_file: log_file.to_path_buf(),
        })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "ck already exited");
                }
                append_timeout_marker(log_file);
                Err(AnalysisError::AnalysisTimeout {
                    source_dir: source_dir.to_path_buf(),
                    timeout: self.timeout,
                    log_file: log_file.to_path_buf(),
                })
            }
            Ok(Err(e)) => Err(AnalysisError::io(source_dir, e)),
            Ok(Ok(status)) if !status.success() => Err(AnalysisError::AnalysisFailed {
                source_dir: source_dir.to_path_buf(),
                reason: status.to_string(),
                log_file: log_file.to_path_buf(),
            }),
            Ok(Ok(_)) => read_class_table(&self.output_dir.join(CLASS_TABLE)),
        }
    }
}

fn append_timeout_marker(log_file: &Path) {
    let appended = OpenOptions::new()
        .append(true)
        .open(log_file)
        .and_then(|mut f| f.write_all(b"\n\n--- TIMEOUT ---\n"));
    if let Err(e) = appended {
        debug!(error = %e, "could not mark log as timed out");
    }
}

/// Reads CK's per-class table. A missing or empty file is zero rows;
/// rows that do not parse are skipped.
pub fn read_class_table(path: &Path) -> Result<Vec<ClassMetrics>, AnalysisError> {
    if !path.is_file() {
        warn!("    -> {} was not produced", path.display());
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(io) => AnalysisError::io(path, io),
        other => AnalysisError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{other:?}")),
        ),
    })?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<ClassMetrics>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("    -> skipping row {} of {}: {}", line + 2, path.display(), e),
        }
    }
    Ok(rows)
}

fn absolute(path: &Path) -> Result<PathBuf, AnalysisError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| AnalysisError::io(path, e))
}
