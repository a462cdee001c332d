use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting `{key}` is not defined")]
    ConfigurationMissing { key: &'static str },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorSettings {
    pub target_count: usize,
    pub page_size: u32,
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            target_count: 1000,
            page_size: 50,
            page_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractorSettings {
    pub git_path: PathBuf,
    pub clone_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub max_repositories: Option<usize>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            git_path: PathBuf::from("git"),
            clone_timeout_secs: 300,
            analysis_timeout_secs: 600,
            max_repositories: None,
        }
    }
}

/// Everything the pipeline reads from the outside world, loaded once at startup.
///
/// Stages never read this directly; they narrow it into their own context with
/// [`PipelineContext::collector`], [`PipelineContext::extractor`] or
/// [`PipelineContext::report`], which is where missing settings are rejected.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineContext {
    pub github_token: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    /// Not `language`: that name collides with the `LANGUAGE` locale variable.
    #[serde(default = "default_language")]
    pub source_language: String,
    pub path_repositories: Option<PathBuf>,
    pub path_output_ck: Option<PathBuf>,
    pub path_ck_jar: Option<PathBuf>,
    pub java_path: Option<PathBuf>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_charts_dir")]
    pub charts_dir: PathBuf,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub extractor: ExtractorSettings,
}

fn default_github_api_url() -> String {
    "https://api.github.com/graphql".to_owned()
}

fn default_language() -> String {
    "java".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from("charts")
}

#[derive(Debug, Clone)]
pub struct CollectorContext {
    pub token: String,
    pub api_url: String,
    pub language: String,
    pub data_dir: PathBuf,
    pub settings: CollectorSettings,
}

impl CollectorContext {
    pub fn search_query(&self) -> String {
        format!("language:{} sort:stars-desc", self.language)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorContext {
    pub repositories_dir: PathBuf,
    pub ck_output_dir: PathBuf,
    pub ck_jar: PathBuf,
    pub java_path: PathBuf,
    pub data_dir: PathBuf,
    pub language: String,
    pub settings: ExtractorSettings,
}

impl ExtractorContext {
    /// File extension of the language's sources, without the dot.
    pub fn source_extension(&self) -> &str {
        match self.language.to_ascii_lowercase().as_str() {
            "java" => "java",
            "kotlin" => "kt",
            "scala" => "scala",
            "groovy" => "groovy",
            _ => &self.language,
        }
    }

    /// Conventional module source root, e.g. `src/main/java`.
    pub fn module_source_root(&self) -> PathBuf {
        PathBuf::from("src").join("main").join(&self.language)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("ck_logs")
    }
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub data_dir: PathBuf,
    pub charts_dir: PathBuf,
}

impl PipelineContext {
    /// Layers environment variables over an optional TOML file.
    ///
    /// `GITHUB_TOKEN` maps to `github_token`, `COLLECTOR__TARGET_COUNT` to
    /// `collector.target_count`.
    pub fn load_config(config_path: &str) -> Result<Self, ConfigError> {
        let ctx = Config::builder()
            .add_source(
                File::with_name(config_path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(ctx)
    }

    pub fn collector(&self) -> Result<CollectorContext, ConfigError> {
        Ok(CollectorContext {
            token: require(&self.github_token, "GITHUB_TOKEN")?,
            api_url: self.github_api_url.clone(),
            language: self.source_language.clone(),
            data_dir: self.data_dir.clone(),
            settings: self.collector.clone(),
        })
    }

    pub fn extractor(&self) -> Result<ExtractorContext, ConfigError> {
        Ok(ExtractorContext {
            repositories_dir: require_path(&self.path_repositories, "PATH_REPOSITORIES")?,
            ck_output_dir: require_path(&self.path_output_ck, "PATH_OUTPUT_CK")?,
            ck_jar: require_path(&self.path_ck_jar, "PATH_CK_JAR")?,
            java_path: require_path(&self.java_path, "JAVA_PATH")?,
            data_dir: self.data_dir.clone(),
            language: self.source_language.clone(),
            settings: self.extractor.clone(),
        })
    }

    pub fn report(&self) -> ReportContext {
        ReportContext {
            data_dir: self.data_dir.clone(),
            charts_dir: self.charts_dir.clone(),
        }
    }
}

fn require(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(ConfigError::ConfigurationMissing { key }),
    }
}

fn require_path(value: &Option<PathBuf>, key: &'static str) -> Result<PathBuf, ConfigError> {
    match value {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.clone()),
        _ => Err(ConfigError::ConfigurationMissing { key }),
    }
}
