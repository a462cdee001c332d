//! Per-repository lifecycle: `NOT_CLONED → CLONED → ANALYZED → CLEANED`.
//!
//! The clone is held by a [`ClonedRepository`] guard for the duration of
//! [`process_repository`], so `CLEANED` is reached on every path out of it.

use database::Context;
use model::{ClassMetrics, ExtractorContext, MetricsRecord, RepositoryRecord};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::checkout::ClonedRepository;
use crate::ck::StaticAnalyzer;
use crate::error::AnalysisError;
use crate::layout::{find_module_roots, has_source_files, module_label};

/// Clone, analyze and aggregate one repository.
///
/// `Ok(None)` means there was nothing to measure: no source files of the
/// target language, or the analyzer produced no rows.
pub async fn process_repository<A>(
    ctx: &ExtractorContext,
    analyzer: &A,
    record: &RepositoryRecord,
) -> Result<Option<MetricsRecord>, AnalysisError>
where
    A: StaticAnalyzer + ?Sized,
{
    let checkout = ClonedRepository::acquire(
        &ctx.settings.git_path,
        &record.url,
        &ctx.repositories_dir,
        Duration::from_secs(ctx.settings.clone_timeout_secs),
    )
    .await?;

    if !has_source_files(checkout.path(), ctx.source_extension()) {
        warn!(
            "  No .{} files found in this repository, skipping analysis.",
            ctx.source_extension()
        );
        return Ok(None);
    }

    // Log names carry the owner, like the checkout directory.
    let log_stem = record.full_name.replace('/', "_");
    let classes = analyze_checkout(ctx, analyzer, checkout.path(), &log_stem).await?;
    if classes.is_empty() {
        warn!("  Analysis ran but produced no class metrics.");
    } else {
        info!("  Analysis finished, {} classes analyzed.", classes.len());
    }
    Ok(MetricsRecord::aggregate(record, &classes))
}

/// One analyzer run per module root, or a single run over the whole checkout
/// when the repository does not follow the conventional layout.
async fn analyze_checkout<A>(
    ctx: &ExtractorContext,
    analyzer: &A,
    checkout: &Path,
    log_stem: &str,
) -> Result<Vec<ClassMetrics>, AnalysisError>
where
    A: StaticAnalyzer + ?Sized,
{
    let module_root = ctx.module_source_root();
    let modules = find_module_roots(checkout, &module_root);
    let logs_dir = ctx.logs_dir();

    if modules.is_empty() {
        info!("  Non-standard layout, analyzing the whole repository...");
        let log_file = logs_dir.join(format!("{log_stem}-all-ck.log"));
        return analyzer.analyze(checkout, &log_file).await;
    }

    info!(
        "  Module layout detected, {} source root(s) found.",
        modules.len()
    );
    let mut combined = Vec::new();
    let mut last_error = None;
    let mut succeeded = 0usize;

    for module in &modules {
        let label = module_label(checkout, module, &module_root);
        info!("    Analyzing module: {}", label);
        let log_file = logs_dir.join(format!("{log_stem}-{label}-ck.log"));
        match analyzer.analyze(module, &log_file).await {
            Ok(rows) => {
                succeeded += 1;
                combined.extend(rows);
            }
            Err(e) => {
                warn!("    -> module {} failed: {}", label, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(combined),
    }
}

/// Runs the extractor over `repos.csv` and overwrites `metrics.csv`.
///
/// Per-repository failures are logged and skipped. The metrics table is
/// written even when empty so the report stage fails on the join, not on a
/// missing file.
pub async fn extract_all<A>(
    ctx: &ExtractorContext,
    analyzer: &A,
    storage: &Context,
) -> Result<Vec<MetricsRecord>, AnalysisError>
where
    A: StaticAnalyzer + ?Sized,
{
    let repositories = storage.repository_stg().read_all()?;
    let limit = ctx
        .settings
        .max_repositories
        .unwrap_or(repositories.len())
        .min(repositories.len());

    let mut metrics = Vec::new();
    for (index, record) in repositories.iter().take(limit).enumerate() {
        info!("[ {}/{} ] {}", index + 1, limit, record.full_name);
        match process_repository(ctx, analyzer, record).await {
            Ok(Some(m)) => {
                info!("  Metrics for {} collected.", record.repo_name);
                metrics.push(m);
            }
            Ok(None) => info!("  No metrics produced for {}.", record.repo_name),
            Err(e) => error!(
                repo = %record.full_name,
                url = %record.url,
                "  Repository skipped: {}",
                e
            ),
        }
    }

    let table = storage.metrics_stg();
    table.write_all(&metrics)?;
    if metrics.is_empty() {
        warn!("No CK metrics were produced.");
    } else {
        info!(
            "{} repositories analyzed, metrics saved to {}",
            metrics.len(),
            table.path().display()
        );
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model::settings::ExtractorSettings;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    type Script = Box<dyn Fn(&Path) -> Result<Vec<ClassMetrics>, AnalysisError> + Send + Sync>;

    struct FakeAnalyzer {
        script: Script,
        calls: Mutex<Vec<PathBuf>>,
        logs: Mutex<Vec<PathBuf>>,
    }

    impl FakeAnalyzer {
        fn new(
            script: impl Fn(&Path) -> Result<Vec<ClassMetrics>, AnalysisError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
                logs: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }

        fn log_names(&self) -> Vec<String> {
            self.logs
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
                .collect()
        }
    }

    #[async_trait]
    impl StaticAnalyzer for FakeAnalyzer {
        async fn analyze(
            &self,
            source_dir: &Path,
            log_file: &Path,
        ) -> Result<Vec<ClassMetrics>, AnalysisError> {
            self.calls.lock().unwrap().push(source_dir.to_path_buf());
            self.logs.lock().unwrap().push(log_file.to_path_buf());
            (self.script)(source_dir)
        }
    }

    fn rows(n: usize, cbo: i64, loc: i64) -> Vec<ClassMetrics> {
        (0..n)
            .map(|i| ClassMetrics {
                file: format!("C{i}.java"),
                cbo,
                dit: 1.0,
                lcom: 0.0,
                loc,
            })
            .collect()
    }

    fn failure(dir: &Path) -> AnalysisError {
        AnalysisError::AnalysisFailed {
            source_dir: dir.to_path_buf(),
            reason: "exit status: 1".to_owned(),
            log_file: PathBuf::from("ck.log"),
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        ctx: ExtractorContext,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let ctx = ExtractorContext {
                repositories_dir: root.path().join("repos"),
                ck_output_dir: root.path().join("ck-out"),
                ck_jar: PathBuf::from("/opt/ck/ck.jar"),
                java_path: PathBuf::from("/usr/bin/java"),
                data_dir: root.path().join("data"),
                language: "java".to_owned(),
                settings: ExtractorSettings {
                    git_path: PathBuf::from("/nonexistent/bin/git"),
                    ..ExtractorSettings::default()
                },
            };
            Self { _root: root, ctx }
        }

        /// Pre-populates a checkout so no clone is attempted.
        fn checkout(&self, name: &str, files: &[&str]) -> PathBuf {
            self.checkout_of("acme", name, files)
        }

        fn checkout_of(&self, owner: &str, name: &str, files: &[&str]) -> PathBuf {
            let dir = self.ctx.repositories_dir.join(format!("{owner}_{name}"));
            for file in files {
                let path = dir.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, "class X {}").unwrap();
            }
            fs::create_dir_all(dir.join(".git")).unwrap();
            fs::write(dir.join(".git/index"), b"DIRC").unwrap();
            dir
        }

        fn record(&self, name: &str) -> RepositoryRecord {
            self.record_of("acme", name)
        }

        fn record_of(&self, owner: &str, name: &str) -> RepositoryRecord {
            RepositoryRecord {
                owner: owner.to_owned(),
                repo_name: name.to_owned(),
                full_name: format!("{owner}/{name}"),
                url: format!("https://github.com/{owner}/{name}"),
                stars_count: 100,
                releases_count: 2,
                repo_age_years: 3.0,
            }
        }
    }

    #[tokio::test]
    async fn test_no_source_files_never_reaches_analyzer() {
        let fx = Fixture::new();
        let checkout = fx.checkout("docs", &["README.md", "site/index.html"]);
        let analyzer = FakeAnalyzer::new(|_| Ok(rows(1, 1, 1)));

        let result = process_repository(&fx.ctx, &analyzer, &fx.record("docs"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(analyzer.calls().is_empty());
        assert!(!checkout.exists());
    }

    #[tokio::test]
    async fn test_multi_module_results_are_concatenated() {
        let fx = Fixture::new();
        let checkout = fx.checkout(
            "shop",
            &["core/src/main/java/A.java", "web/src/main/java/B.java"],
        );
        let analyzer = FakeAnalyzer::new(|dir| {
            if dir.starts_with_module("core") {
                Ok(rows(2, 1, 10))
            } else {
                Ok(rows(1, 4, 5))
            }
        });

        let record = process_repository(&fx.ctx, &analyzer, &fx.record("shop"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.full_name, "acme/shop");
        assert_eq!(record.java_files_count, 3);
        assert_eq!(record.ck_cbo, 6);
        assert_eq!(record.ck_loc, 25);
        assert_eq!(
            analyzer.calls(),
            vec![
                checkout.join("core/src/main/java"),
                checkout.join("web/src/main/java"),
            ]
        );
        assert_eq!(
            analyzer.log_names(),
            vec!["acme_shop-core-ck.log", "acme_shop-web-ck.log"]
        );
        assert!(!checkout.exists());
    }

    #[tokio::test]
    async fn test_failed_module_keeps_sibling_results() {
        let fx = Fixture::new();
        fx.checkout(
            "shop",
            &["core/src/main/java/A.java", "web/src/main/java/B.java"],
        );
        let analyzer = FakeAnalyzer::new(|dir| {
            if dir.starts_with_module("web") {
                Err(failure(dir))
            } else {
                Ok(rows(2, 1, 10))
            }
        });

        let record = process_repository(&fx.ctx, &analyzer, &fx.record("shop"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.java_files_count, 2);
        assert_eq!(analyzer.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_every_module_failing_is_reported_and_cleaned() {
        let fx = Fixture::new();
        let checkout = fx.checkout("shop", &["core/src/main/java/A.java"]);
        let analyzer = FakeAnalyzer::new(|dir| Err(failure(dir)));

        let err = process_repository(&fx.ctx, &analyzer, &fx.record("shop"))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::AnalysisFailed { .. }));
        assert!(!checkout.exists());
    }

    #[tokio::test]
    async fn test_flat_layout_falls_back_to_single_pass() {
        let fx = Fixture::new();
        let checkout = fx.checkout("flat", &["src/org/acme/App.java"]);
        let analyzer = FakeAnalyzer::new(|_| Ok(rows(1, 2, 30)));

        let record = process_repository(&fx.ctx, &analyzer, &fx.record("flat"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.java_files_count, 1);
        assert_eq!(analyzer.calls(), vec![checkout]);
        assert_eq!(analyzer.log_names(), vec!["acme_flat-all-ck.log"]);
    }

    #[tokio::test]
    async fn test_empty_analysis_yields_no_record() {
        let fx = Fixture::new();
        fx.checkout("quiet", &["src/main/java/A.java"]);
        let analyzer = FakeAnalyzer::new(|_| Ok(Vec::new()));

        let result = process_repository(&fx.ctx, &analyzer, &fx.record("quiet"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_extract_all_skips_failures_and_writes_metrics() {
        let fx = Fixture::new();
        let storage = Context::new(&fx.ctx.data_dir);
        storage
            .repository_stg()
            .write_all(&[fx.record("alpha"), fx.record("missing"), fx.record("beta")])
            .unwrap();
        fx.checkout(
            "alpha",
            &["core/src/main/java/A.java", "core/src/main/java/B.java"],
        );
        fx.checkout("beta", &["src/main/java/C.java"]);
        let analyzer = FakeAnalyzer::new(|dir| {
            if dir.starts_with_module("alpha") {
                Ok(rows(2, 1, 10))
            } else {
                Ok(rows(1, 1, 10))
            }
        });

        let metrics = extract_all(&fx.ctx, &analyzer, &storage).await.unwrap();

        assert_eq!(metrics.len(), 2);
        let persisted = storage.metrics_stg().read_all().unwrap();
        let counts: Vec<(&str, u64)> = persisted
            .iter()
            .map(|m| (m.repo_name.as_str(), m.java_files_count))
            .collect();
        assert_eq!(counts, vec![("alpha", 2), ("beta", 1)]);
    }

    #[tokio::test]
    async fn test_namesakes_are_measured_separately() {
        let fx = Fixture::new();
        let storage = Context::new(&fx.ctx.data_dir);
        storage
            .repository_stg()
            .write_all(&[fx.record_of("acme", "Java"), fx.record_of("other", "Java")])
            .unwrap();
        fx.checkout_of("acme", "Java", &["src/main/java/A.java"]);
        fx.checkout_of("other", "Java", &["src/main/java/B.java"]);
        let analyzer = FakeAnalyzer::new(|dir| {
            if dir.starts_with_module("acme_Java") {
                Ok(rows(10, 1, 100))
            } else {
                Ok(rows(1, 1, 20))
            }
        });

        extract_all(&fx.ctx, &analyzer, &storage).await.unwrap();

        let persisted = storage.metrics_stg().read_all().unwrap();
        let measured: Vec<(&str, u64, i64)> = persisted
            .iter()
            .map(|m| (m.full_name.as_str(), m.java_files_count, m.ck_loc))
            .collect();
        assert_eq!(measured, vec![("acme/Java", 10, 1000), ("other/Java", 1, 20)]);
        assert_eq!(
            analyzer.log_names(),
            vec!["acme_Java-root-ck.log", "other_Java-root-ck.log"]
        );
    }

    #[tokio::test]
    async fn test_extract_all_honours_limit() {
        let mut fx = Fixture::new();
        fx.ctx.settings.max_repositories = Some(1);
        let storage = Context::new(&fx.ctx.data_dir);
        storage
            .repository_stg()
            .write_all(&[fx.record("alpha"), fx.record("beta")])
            .unwrap();
        fx.checkout("alpha", &["A.java"]);
        fx.checkout("beta", &["B.java"]);
        let analyzer = FakeAnalyzer::new(|_| Ok(rows(1, 1, 1)));

        let metrics = extract_all(&fx.ctx, &analyzer, &storage).await.unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(analyzer.calls().len(), 1);
    }

    trait ModulePath {
        fn starts_with_module(&self, name: &str) -> bool;
    }

    impl ModulePath for Path {
        /// True when any component of the path is `name`.
        fn starts_with_module(&self, name: &str) -> bool {
            self.components().any(|c| c.as_os_str() == name)
        }
    }
}
