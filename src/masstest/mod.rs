//! Run a unit-test executable over and over to shake out flaky tests.
//!
//! The executable and the shared libraries it needs are copied into a work
//! directory and the copy is started once per run. Boost.Test prints
//! `*** No errors detected` on stderr when every test passed; anything else
//! on stderr marks the run as failed and its stdout goes to the log.

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::cleanup::CleanupGuard;
use crate::runtime::path::normalize_path;
use crate::runtime::{CommandOutput, Runtime};

pub const SUCCESS_MARKER: &str = "*** No errors detected";
pub const DEFAULT_RUNS: u32 = 4;
pub const DEFAULT_LOG: &str = "MassTest.log";

#[derive(Debug, Clone, PartialEq)]
pub struct MassTestPlan {
    pub executable: PathBuf,
    pub libraries: Vec<PathBuf>,
    pub work_dir: PathBuf,
    pub runs: u32,
    pub log_path: PathBuf,
}

impl MassTestPlan {
    /// Plan with the default run count, logging to `MassTest.log` in `work_dir`.
    pub fn new(executable: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            executable,
            libraries: Vec::new(),
            log_path: work_dir.join(DEFAULT_LOG),
            work_dir,
            runs: DEFAULT_RUNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MassTestReport {
    pub runs: u32,
    /// 1-based numbers of the runs that failed.
    pub failures: Vec<u32>,
}

impl MassTestReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn is_successful_run(output: &CommandOutput) -> bool {
    output.stderr.trim() == SUCCESS_MARKER
}

/// Copy `source` into `work_dir`, registering the copy for removal.
fn stage<'a, R: Runtime>(
    runtime: &'a R,
    cleanup: &mut CleanupGuard<'a, R>,
    source: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| anyhow!("{:?} does not name a file", source))?;
    let dest = work_dir.join(name);

    // Already in place; copying onto itself would truncate it and cleanup would delete the source
    if normalize_path(&dest) == normalize_path(source) {
        debug!("{:?} is already in the work directory", source);
        return Ok(dest);
    }

    runtime
        .copy(source, &dest)
        .with_context(|| format!("Failed to copy {:?} to {:?}", source, dest))?;
    cleanup.add(dest.clone());
    Ok(dest)
}

/// Run the plan. `on_run` sees every run's output as soon as it finishes.
///
/// Copied files are removed before returning, on success and on error.
#[tracing::instrument(skip(runtime, on_run))]
pub fn run_mass_test<R: Runtime>(
    runtime: &R,
    plan: &MassTestPlan,
    mut on_run: impl FnMut(u32, &CommandOutput),
) -> Result<MassTestReport> {
    runtime
        .create_dir_all(&plan.work_dir)
        .with_context(|| format!("Failed to create {:?}", plan.work_dir))?;

    let mut cleanup = CleanupGuard::new(runtime);
    let executable = stage(runtime, &mut cleanup, &plan.executable, &plan.work_dir)?;
    for library in &plan.libraries {
        stage(runtime, &mut cleanup, library, &plan.work_dir)?;
    }

    let mut report = MassTestReport {
        runs: plan.runs,
        failures: Vec::new(),
    };
    let mut log = String::new();

    for run in 1..=plan.runs {
        info!("Run {} of {}", run, plan.runs);
        let output = runtime
            .run(&executable, &[], &plan.work_dir)
            .with_context(|| format!("Failed to start {:?}", executable))?;
        on_run(run, &output);

        if is_successful_run(&output) {
            continue;
        }
        warn!("Run {} failed (exit code {:?})", run, output.code);
        report.failures.push(run);
        log.push_str(&format!(
            "===== run {} of {} (exit code {:?}) =====\n",
            run, plan.runs, output.code
        ));
        log.push_str(&output.stdout);
        if !output.stdout.ends_with('\n') {
            log.push('\n');
        }
    }

    if !report.passed() {
        runtime
            .write(&plan.log_path, log.as_bytes())
            .with_context(|| format!("Failed to write {:?}", plan.log_path))?;
        info!("Failed runs logged to {:?}", plan.log_path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn output(stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn plan() -> MassTestPlan {
        let mut plan = MassTestPlan::new(
            PathBuf::from("/build/x64/Debug/GameBackboneTests.exe"),
            PathBuf::from("/work"),
        );
        plan.libraries = vec![PathBuf::from("/build/x64/Debug/GameBackboneDll.dll")];
        plan
    }

    /// Runtime that copies into /work, replays `outputs` and records writes and removals.
    fn staged_runtime(
        outputs: Vec<CommandOutput>,
    ) -> (MockRuntime, Arc<Mutex<Vec<PathBuf>>>, Arc<Mutex<Option<String>>>) {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime.expect_copy().times(2).returning(|_, _| Ok(1));

        let outputs = Arc::new(Mutex::new(VecDeque::from(outputs)));
        runtime
            .expect_run()
            .with(
                eq(PathBuf::from("/work/GameBackboneTests.exe")),
                eq(Vec::<String>::new()),
                eq(PathBuf::from("/work")),
            )
            .returning(move |_, _, _| Ok(outputs.lock().unwrap().pop_front().unwrap()));

        let log = Arc::new(Mutex::new(None));
        let log_clone = log.clone();
        runtime
            .expect_write()
            .with(eq(PathBuf::from("/work/MassTest.log")), mockall::predicate::always())
            .returning(move |_, contents| {
                *log_clone.lock().unwrap() = Some(String::from_utf8(contents.to_vec()).unwrap());
                Ok(())
            });

        let removed = Arc::new(Mutex::new(Vec::new()));
        let removed_clone = removed.clone();
        runtime.expect_exists().returning(|_| true);
        runtime.expect_is_dir().returning(|_| false);
        runtime.expect_remove_file().returning(move |path| {
            removed_clone.lock().unwrap().push(path.to_path_buf());
            Ok(())
        });

        (runtime, removed, log)
    }

    #[test]
    fn test_success_marker_ignores_surrounding_whitespace() {
        assert!(is_successful_run(&output("", "\r\n*** No errors detected\r\n")));
        assert!(!is_successful_run(&output("", "*** 1 failure is detected")));
        assert!(!is_successful_run(&output("", "")));
    }

    #[test]
    fn test_all_runs_pass() {
        let outputs = (0..4)
            .map(|_| output("Running 12 test cases...\n", "\n*** No errors detected\n"))
            .collect();
        let (runtime, removed, log) = staged_runtime(outputs);

        let mut seen = Vec::new();
        let report = run_mass_test(&runtime, &plan(), |run, _| seen.push(run)).unwrap();

        assert!(report.passed());
        assert_eq!(report.runs, 4);
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert!(log.lock().unwrap().is_none());
        assert_eq!(
            *removed.lock().unwrap(),
            vec![
                PathBuf::from("/work/GameBackboneDll.dll"),
                PathBuf::from("/work/GameBackboneTests.exe"),
            ]
        );
    }

    #[test_log::test]
    fn test_failed_runs_are_logged() {
        let outputs = vec![
            output("run one\n", "*** No errors detected"),
            output("run two: check failed\n", "*** 1 failure is detected"),
            output("run three\n", "*** No errors detected"),
            output("run four: crashed", "unknown location: fatal error"),
        ];
        let (runtime, removed, log) = staged_runtime(outputs);

        let report = run_mass_test(&runtime, &plan(), |_, _| {}).unwrap();

        assert_eq!(report.failures, vec![2, 4]);
        let log = log.lock().unwrap().clone().unwrap();
        assert!(log.contains("===== run 2 of 4"));
        assert!(log.contains("run two: check failed\n"));
        assert!(log.contains("===== run 4 of 4"));
        assert!(log.contains("run four: crashed\n"));
        assert!(!log.contains("run one"));
        assert_eq!(removed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_copies_removed_when_executable_cannot_start() {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime.expect_copy().returning(|_, _| Ok(1));
        runtime
            .expect_run()
            .returning(|_, _, _| Err(anyhow!("exec format error")));
        runtime.expect_write().never();
        runtime.expect_exists().returning(|_| true);
        runtime.expect_is_dir().returning(|_| false);
        runtime.expect_remove_file().times(2).returning(|_| Ok(()));

        let result = run_mass_test(&runtime, &plan(), |_, _| {});
        assert!(result.is_err());
    }

    #[test_log::test]
    fn test_copy_failure_removes_earlier_copies() {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_copy()
            .with(
                eq(PathBuf::from("/build/x64/Debug/GameBackboneTests.exe")),
                mockall::predicate::always(),
            )
            .returning(|_, _| Ok(1));
        runtime
            .expect_copy()
            .with(
                eq(PathBuf::from("/build/x64/Debug/GameBackboneDll.dll")),
                mockall::predicate::always(),
            )
            .returning(|_, _| Err(anyhow!("No such file")));
        runtime.expect_run().never();
        runtime.expect_exists().returning(|_| true);
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_remove_file()
            .with(eq(PathBuf::from("/work/GameBackboneTests.exe")))
            .times(1)
            .returning(|_| Ok(()));

        let err = run_mass_test(&runtime, &plan(), |_, _| {}).unwrap_err();
        assert!(err.to_string().contains("GameBackboneDll.dll"));
    }

    #[test]
    fn test_executable_already_in_work_dir_is_not_copied() {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime.expect_copy().never();
        runtime
            .expect_run()
            .returning(|_, _, _| Ok(output("", "*** No errors detected")));
        runtime.expect_remove_file().never();

        let mut plan = MassTestPlan::new(
            PathBuf::from("/work/GameBackboneTests.exe"),
            PathBuf::from("/work"),
        );
        plan.runs = 2;

        let report = run_mass_test(&runtime, &plan, |_, _| {}).unwrap();
        assert!(report.passed());
    }
}
