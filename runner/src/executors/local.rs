use super::ExecutorError;
use crate::{
    config::{ConfigErrors, HarnessConfig},
    database::{ResultStore, RunResult, Transcript},
    experiments::Experiment,
    ingest::{Ingestors, RunOutput},
    sweep::{command_line, RunConfig, Step},
};
use std::{
    io::{self, Read},
    path::PathBuf,
    process::Command,
    time::Instant,
};
use tracing::{debug, error, info, instrument, trace};

/// Executor that runs one benchmark process at a time on the local machine
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    benchmarks: Vec<PathBuf>,
    ingestor: Ingestors,
    output_directory: PathBuf,
    dry_run: bool,
}

impl LocalExecutor {
    pub fn load(config: &HarnessConfig, dry_run: bool) -> Result<Self, ConfigErrors> {
        Ok(Self {
            benchmarks: config.benchmarks.clone(),
            ingestor: Ingestors::load(&config.ingest)?,
            output_directory: config.output.directory.clone(),
            dry_run,
        })
    }

    /// Run a single benchmark invocation to completion.
    ///
    /// stdout and stderr share one pipe, so the captured text is interleaved the
    /// way a terminal would show it. There is no timeout.
    pub fn execute(&self, config: &RunConfig) -> Result<RunOutput, ExecutorError> {
        let exec = self
            .benchmarks
            .get(config.variant)
            .ok_or(ExecutorError::UnknownVariant(config.variant))?;
        let args = config.args(exec);
        let command = command_line(&args);

        println!("{command}");

        let pipe_error = |source| ExecutorError::Pipe {
            command: command.clone(),
            source,
        };
        let (mut reader, writer) = io::pipe().map_err(pipe_error)?;
        let stderr = writer.try_clone().map_err(pipe_error)?;

        let start = Instant::now();
        // the Command and with it both write ends are dropped after spawning,
        // otherwise reading would never see EOF
        let mut child = Command::new(exec)
            .args(&args[1..])
            .stdout(writer)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: command.clone(),
                source,
            })?;

        let mut raw = Vec::new();
        let status = reader
            .read_to_end(&mut raw)
            .and_then(|_| child.wait())
            .map_err(|source| ExecutorError::Wait {
                command: command.clone(),
                source,
            })?;
        let elapsed = start.elapsed();
        let output = String::from_utf8_lossy(&raw).into_owned();

        debug!(
            "Finished in {} ns | status: {}",
            elapsed.as_nanos(),
            status.success()
        );
        trace!("Output: {output}");

        if !status.success() {
            error!(command = %command, status = %status, "Benchmark failed, output:\n{output}");

            return Err(ExecutorError::Failed { command, status });
        }

        Ok(RunOutput {
            command,
            output,
            runtime: elapsed.as_nanos(),
        })
    }

    /// Execute, extract and record one configuration
    pub fn run_single(
        &self,
        config: &RunConfig,
        store: &mut ResultStore,
        transcript: &mut Transcript,
    ) -> Result<RunResult, ExecutorError> {
        let key = config.key();
        let output = self.execute(config)?;
        let result = self.ingestor.ingest(&output)?;

        transcript.push_run(&output.command, &output.output);
        store.upsert(&key, result);

        debug!(
            key = %key,
            time = result.time,
            array_size = result.array_size,
            runtime_ns = %output.runtime,
            "Recorded run"
        );

        Ok(result)
    }

    /// Run every step of `experiment` in order, then save the transcript and flush the store.
    /// Any failure aborts before anything is written.
    #[instrument(skip(self, store), level = "info")]
    pub fn run_experiment(
        &self,
        experiment: Experiment,
        repetitions: u32,
        store: &mut ResultStore,
    ) -> Result<(), ExecutorError> {
        println!("@@@@\n@@@ Starting experiment: {experiment}:");

        let steps = experiment.steps(repetitions);
        let total = steps.iter().filter(|step| step.run().is_some()).count();
        let mut transcript = Transcript::new(experiment.stem());
        let mut processed = 0;

        for step in steps {
            match step {
                Step::Series { .. } => {
                    if let Some(banner) = step.banner() {
                        println!("{banner}");
                        transcript.push_banner(&banner);
                    }
                }
                Step::Run(config) => {
                    if self.dry_run {
                        let exec = self
                            .benchmarks
                            .get(config.variant)
                            .ok_or(ExecutorError::UnknownVariant(config.variant))?;

                        println!("{}", command_line(&config.args(exec)));
                        continue;
                    }

                    self.run_single(&config, store, &mut transcript)?;

                    processed += 1;
                    info!("Done with {processed}/{total}");
                }
            }
        }

        if self.dry_run {
            info!("Dry run, nothing was executed or written");

            return Ok(());
        }

        transcript.save(&self.output_directory)?;
        store.flush()?;

        info!("Done with {experiment}");

        Ok(())
    }
}
