//! Producer processes and the strategy used to spawn them

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

/// Program run by the default spawn strategy
pub const DEFAULT_PRODUCER: &str = "irw";

/// A running producer: a line stream plus a way to stop it
pub trait Producer: Send {
    /// Take the producer's output stream. Returns `None` once taken.
    fn take_output(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Terminate the producer. Must tolerate an already-exited producer.
    fn kill(&mut self) -> io::Result<()>;

    /// OS process id, if the producer is a real process
    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Producer backed by an operating system child process
pub struct CommandProducer {
    child: Child,
}

impl CommandProducer {
    /// Spawn `program` with `args`, capturing its stdout
    pub fn spawn(program: &str, args: &[String]) -> io::Result<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        Ok(Self { child })
    }
}

impl Producer for CommandProducer {
    fn take_output(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as Box<dyn Read + Send>)
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited; still reap below
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        self.child.wait()?;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

type SpawnFn = dyn Fn() -> io::Result<Box<dyn Producer>> + Send + Sync;

/// How the lifecycle manager starts a producer
///
/// The default runs [`DEFAULT_PRODUCER`] with no arguments. Any other
/// command, or an arbitrary factory, can be installed process-wide with
/// [`set_spawn_strategy`](crate::set_spawn_strategy).
#[derive(Clone)]
pub struct SpawnStrategy {
    label: String,
    spawn: Arc<SpawnFn>,
}

impl SpawnStrategy {
    /// Run an external command and read its stdout
    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let label = program.clone();

        Self {
            label,
            spawn: Arc::new(move || {
                CommandProducer::spawn(&program, &args).map(|p| Box::new(p) as Box<dyn Producer>)
            }),
        }
    }

    /// Use an arbitrary factory, e.g. an in-memory fake
    pub fn from_fn<F>(label: impl Into<String>, spawn: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Producer>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            spawn: Arc::new(spawn),
        }
    }

    /// Name used in logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn spawn(&self) -> io::Result<Box<dyn Producer>> {
        (self.spawn)()
    }
}

impl Default for SpawnStrategy {
    fn default() -> Self {
        Self::command(DEFAULT_PRODUCER, Vec::<String>::new())
    }
}

impl fmt::Debug for SpawnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnStrategy")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_irw() {
        assert_eq!(SpawnStrategy::default().label(), "irw");
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let strategy = SpawnStrategy::command("/nonexistent/irreceive-producer", ["-x"]);
        let err = strategy.spawn().err().expect("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_producer_output_and_kill() {
        let strategy = SpawnStrategy::command("sh", ["-c", "echo '0 00 KEY_OK tv'; sleep 30"]);
        let mut producer = strategy.spawn().unwrap();
        assert!(producer.pid().is_some());

        let mut output = producer.take_output().unwrap();
        assert!(producer.take_output().is_none());

        let mut first = [0u8; 15];
        output.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"0 00 KEY_OK tv\n");

        producer.kill().unwrap();
        // Killing twice is harmless
        assert!(producer.kill().is_ok());
    }
}
