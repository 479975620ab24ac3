/// Verification Driver - Compile Once, Run Every Sample
///
/// **Core Responsibility:**
/// Coordinate resolver, runner and comparator over a sequence of samples
/// and produce one verdict per sample plus an aggregate.
///
/// **Session shape:**
/// Compiling -> Running(sample i of N) -> Done, strictly sequential; no two
/// executions overlap. One `ResolveContext` spans the whole session so the
/// compile step and every run step agree on temp file paths, and its
/// teardown happens on every exit path.
///
/// The driver is the glue layer - it knows nothing about how templates
/// resolve (template's job), how processes run (process's job) or how
/// outputs are judged (compare's job).
use std::path::Path;
use std::time::Duration;

use crate::compare::{self, Verdict};
use crate::error::CoreError;
use crate::process::{self, Capture, ExitKind};
use crate::samples::Sample;
use crate::template::{CommandTemplate, ResolveContext};

/// Per-language command pair plus extra compiler flags, supplied by the
/// glue layer. The compile template is absent for interpreted languages;
/// extra flags are appended after the resolved compile vector.
#[derive(Debug, Clone)]
pub struct LanguageCommands {
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
    pub extra_compile_flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    pub debug: bool,
    /// Skip remaining samples once one fails. Skipping only reduces work;
    /// it never changes the aggregate.
    pub fail_fast: bool,
}

/// Verdict and timing for one sample.
#[derive(Debug, Clone)]
pub struct SampleReport {
    pub id: String,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct VerifySummary {
    pub all_passed: bool,
    pub reports: Vec<SampleReport>,
}

/// Run one full verification session.
///
/// Fatal errors (launch failure, compile failure, unresolvable template,
/// unreadable answer file) abort the session; per-sample failures are
/// recorded in the summary and never abort the remaining samples unless
/// fail-fast is requested.
pub async fn verify(
    source: &Path,
    commands: &LanguageCommands,
    samples: &[Sample],
    options: &VerifyOptions,
) -> Result<VerifySummary, CoreError> {
    let mut templates: Vec<&CommandTemplate> = Vec::new();
    if let Some(compile) = &commands.compile {
        templates.push(compile);
    }
    templates.push(&commands.run);

    let ctx = ResolveContext::prepare(source, options.debug, &templates)?;
    let outcome = drive(&ctx, commands, samples, options).await;

    // Teardown runs on success, failure and error alike. Cleanup trouble
    // is worth a warning, never worth masking the session outcome.
    if let Err(e) = ctx.close() {
        tracing::warn!(error = %e, "failed to remove session temp files");
    }

    outcome
}

async fn drive(
    ctx: &ResolveContext,
    commands: &LanguageCommands,
    samples: &[Sample],
    options: &VerifyOptions,
) -> Result<VerifySummary, CoreError> {
    if let Some(compile) = &commands.compile {
        let mut argv = ctx.resolve(compile)?;
        argv.extend(commands.extra_compile_flags.iter().cloned());

        println!("→ Compiling {}", ctx.source().display());
        // Streamed so compiler diagnostics reach the console as they appear.
        let result = process::execute(&argv, None, Capture::Streamed { echo_stderr: true }).await?;
        if !result.exit.is_success() {
            return Err(CoreError::CompileFailed {
                status: result.exit,
            });
        }
        println!("  ✓ Compiled ({:.2}s)", result.elapsed.as_secs_f64());
        tracing::debug!(elapsed_ms = result.elapsed.as_millis() as u64, "compile step done");
    }

    let run_argv = ctx.resolve(&commands.run)?;

    let mut all_passed = true;
    let mut reports = Vec::with_capacity(samples.len());

    for sample in samples {
        if options.fail_fast && !all_passed {
            println!("→ Sample {}: skipped", sample.id);
            reports.push(SampleReport {
                id: sample.id.clone(),
                verdict: Verdict::Skipped,
                elapsed: Duration::ZERO,
            });
            continue;
        }

        println!("→ Sample {}", sample.id);

        // Buffered when there is an answer to judge against; streamed for
        // ad hoc runs where the output itself is the point.
        let capture = match &sample.answer {
            Some(_) => Capture::Buffered,
            None => Capture::Streamed {
                echo_stderr: options.debug,
            },
        };

        let run = process::execute(&run_argv, Some(&sample.input), capture).await?;

        let verdict = match (&run.exit, &sample.answer) {
            (ExitKind::Success, Some(answer)) => {
                let expected = std::fs::read_to_string(answer)?;
                compare::compare(&run.stdout, &expected)
            }
            (ExitKind::Success, None) => Verdict::Accepted,
            // Failed runs never reach the comparator.
            (exit, _) => Verdict::RuntimeFailure(*exit),
        };

        report(&verdict, run.elapsed);

        if !verdict.is_accepted() {
            all_passed = false;
        }
        reports.push(SampleReport {
            id: sample.id.clone(),
            verdict,
            elapsed: run.elapsed,
        });
    }

    Ok(VerifySummary {
        all_passed,
        reports,
    })
}

fn report(verdict: &Verdict, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    match verdict {
        Verdict::Accepted => println!("  ✓ Success ({:.2}s)", secs),
        Verdict::AcceptedApprox { abs_err, rel_err } => {
            println!("  ✓ Success ({:.2}s)", secs);
            println!(
                "    within float tolerance: abs error {:.2e}, rel error {:.2e}",
                abs_err, rel_err
            );
        }
        Verdict::WrongOutput { actual, expected } => {
            println!("  ✗ Wrong output ({:.2}s)", secs);
            println!("    expected:");
            for line in expected.lines() {
                println!("      {}", line);
            }
            println!("    got:");
            for line in actual.lines() {
                println!("      {}", line);
            }
        }
        Verdict::RuntimeFailure(exit) => println!("  ✗ {} ({:.2}s)", exit, secs),
        Verdict::Skipped => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;
    use std::fs;
    use std::path::PathBuf;

    /// A "language" built entirely from coreutils: the compile step copies
    /// the source script to the shared temp file, the run step executes it
    /// through sh. Exercises compile + run temp sharing end to end.
    fn sh_language() -> LanguageCommands {
        LanguageCommands {
            compile: Some(CommandTemplate::from_tokens([
                "cp",
                "{source}",
                "{tmp:binary}",
            ])),
            run: CommandTemplate::from_tokens(["sh", "{tmp:binary}"]),
            extra_compile_flags: Vec::new(),
        }
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("sol.sh");
        fs::write(&path, body).unwrap();
        path
    }

    fn write_sample(dir: &Path, id: &str, input: &str, answer: Option<&str>) {
        fs::write(dir.join(format!("{}.in", id)), input).unwrap();
        if let Some(answer) = answer {
            fs::write(dir.join(format!("{}.ans", id)), answer).unwrap();
        }
    }

    #[tokio::test]
    async fn echo_solution_passes_all_samples() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "cat\n");
        write_sample(dir.path(), "1", "hello\n", Some("hello\n"));
        write_sample(dir.path(), "2", "world\n", Some("world\n"));

        let samples = samples::discover(dir.path()).unwrap();
        let summary = verify(&source, &sh_language(), &samples, &VerifyOptions::default())
            .await
            .unwrap();

        assert!(summary.all_passed);
        assert_eq!(summary.reports.len(), 2);
        assert!(summary.reports.iter().all(|r| r.verdict.is_accepted()));
    }

    #[tokio::test]
    async fn wrong_answer_fails_aggregate_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "cat\n");
        write_sample(dir.path(), "1", "a\n", Some("a\n"));
        write_sample(dir.path(), "2", "b\n", Some("not b\n"));
        write_sample(dir.path(), "3", "c\n", Some("c\n"));

        let samples = samples::discover(dir.path()).unwrap();
        let summary = verify(&source, &sh_language(), &samples, &VerifyOptions::default())
            .await
            .unwrap();

        assert!(!summary.all_passed);
        assert!(summary.reports[0].verdict.is_accepted());
        assert!(matches!(
            summary.reports[1].verdict,
            Verdict::WrongOutput { .. }
        ));
        assert!(summary.reports[2].verdict.is_accepted());
    }

    #[tokio::test]
    async fn fail_fast_skips_remaining_samples() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "cat\n");
        write_sample(dir.path(), "1", "a\n", Some("a\n"));
        write_sample(dir.path(), "2", "b\n", Some("mismatch\n"));
        for id in ["3", "4", "5"] {
            write_sample(dir.path(), id, "x\n", Some("x\n"));
        }

        let samples = samples::discover(dir.path()).unwrap();
        let options = VerifyOptions {
            fail_fast: true,
            ..Default::default()
        };
        let summary = verify(&source, &sh_language(), &samples, &options)
            .await
            .unwrap();

        assert!(!summary.all_passed);
        assert!(summary.reports[0].verdict.is_accepted());
        assert!(matches!(
            summary.reports[1].verdict,
            Verdict::WrongOutput { .. }
        ));
        for report in &summary.reports[2..] {
            assert_eq!(report.verdict, Verdict::Skipped);
            assert_eq!(report.elapsed, Duration::ZERO);
        }
    }

    #[tokio::test]
    async fn runtime_failure_never_reaches_the_comparator() {
        let dir = tempfile::tempdir().unwrap();
        // Prints the right answer but then exits non-zero.
        let source = write_script(dir.path(), "cat; exit 4\n");
        write_sample(dir.path(), "1", "a\n", Some("a\n"));

        let samples = samples::discover(dir.path()).unwrap();
        let summary = verify(&source, &sh_language(), &samples, &VerifyOptions::default())
            .await
            .unwrap();

        assert!(!summary.all_passed);
        assert_eq!(
            summary.reports[0].verdict,
            Verdict::RuntimeFailure(ExitKind::Code(4))
        );
    }

    #[tokio::test]
    async fn compile_failure_aborts_before_any_sample() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "cat\n");
        write_sample(dir.path(), "1", "a\n", Some("a\n"));

        let commands = LanguageCommands {
            // cp to a directory that does not exist fails with non-zero exit.
            compile: Some(CommandTemplate::from_tokens([
                "cp",
                "{source}",
                "/nonexistent-dir-xyz/out",
            ])),
            run: CommandTemplate::from_tokens(["sh", "{source}"]),
            extra_compile_flags: Vec::new(),
        };

        let samples = samples::discover(dir.path()).unwrap();
        let err = verify(&source, &commands, &samples, &VerifyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CompileFailed { .. }));
    }

    #[tokio::test]
    async fn answerless_sample_counts_as_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "cat\n");
        write_sample(dir.path(), "1", "just run me\n", None);

        let samples = samples::discover(dir.path()).unwrap();
        let summary = verify(&source, &sh_language(), &samples, &VerifyOptions::default())
            .await
            .unwrap();

        assert!(summary.all_passed);
        assert_eq!(summary.reports[0].verdict, Verdict::Accepted);
    }

    #[tokio::test]
    async fn float_tolerant_sample_is_reported_approx() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script(dir.path(), "echo 1.5\n");
        write_sample(dir.path(), "1", "\n", Some("1.4\n"));

        let samples = samples::discover(dir.path()).unwrap();
        let summary = verify(&source, &sh_language(), &samples, &VerifyOptions::default())
            .await
            .unwrap();

        assert!(summary.all_passed);
        assert!(matches!(
            summary.reports[0].verdict,
            Verdict::AcceptedApprox { .. }
        ));
    }
}
