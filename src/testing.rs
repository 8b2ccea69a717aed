//! Test support: an in-memory producer and a lock serializing tests that
//! touch the process-wide producer and dispatcher.

use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use crate::producer::{self, Producer, SpawnStrategy};

static SERIAL: Mutex<()> = Mutex::new(());

/// Hands lines to a fake producer's output stream
#[derive(Clone)]
pub(crate) struct Feed {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Feed {
    /// Emit one complete line
    pub(crate) fn line(&self, line: &str) {
        self.raw(&format!("{line}\n"));
    }

    /// Emit raw bytes, possibly without a line terminator
    pub(crate) fn raw(&self, bytes: &str) {
        if !bytes.is_empty() {
            let _ = self.tx.send(bytes.as_bytes().to_vec());
        }
    }

    /// End the stream, as if the producer exited on its own
    pub(crate) fn close(&self) {
        let _ = self.tx.send(Vec::new());
    }
}

/// Blocking reader over chunks; an empty chunk means end of stream
struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.chunk.len() {
            if self.closed {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(chunk) if !chunk.is_empty() => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                _ => {
                    self.closed = true;
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct FakeProducer {
    feed: Feed,
    output: Option<ChannelReader>,
    kills: Arc<AtomicUsize>,
}

impl Producer for FakeProducer {
    fn take_output(&mut self) -> Option<Box<dyn Read + Send>> {
        self.output
            .take()
            .map(|reader| Box::new(reader) as Box<dyn Read + Send>)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.feed.close();
        Ok(())
    }
}

/// Installs an in-memory spawn strategy for the duration of a test
///
/// Holds the serialization lock; dropping it kills any running producer
/// and restores the default strategy.
pub(crate) struct FakeProducers {
    feeds: Arc<Mutex<Vec<Feed>>>,
    kills: Arc<AtomicUsize>,
    _serial: MutexGuard<'static, ()>,
}

impl FakeProducers {
    pub(crate) fn install() -> Self {
        let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        producer::force_kill();

        let feeds: Arc<Mutex<Vec<Feed>>> = Arc::default();
        let kills = Arc::new(AtomicUsize::new(0));

        let spawned = Arc::clone(&feeds);
        let killed = Arc::clone(&kills);
        producer::set_spawn_strategy(SpawnStrategy::from_fn("fake-irw", move || {
            let (tx, rx) = mpsc::channel();
            let feed = Feed { tx };
            spawned
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(feed.clone());

            Ok(Box::new(FakeProducer {
                feed,
                output: Some(ChannelReader {
                    rx,
                    chunk: Vec::new(),
                    pos: 0,
                    closed: false,
                }),
                kills: Arc::clone(&killed),
            }) as Box<dyn Producer>)
        }));

        Self {
            feeds,
            kills,
            _serial: serial,
        }
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Feed of the most recently spawned producer
    pub(crate) fn latest(&self) -> Feed {
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .expect("no producer spawned")
    }
}

impl Drop for FakeProducers {
    fn drop(&mut self) {
        producer::force_kill();
        producer::reset_spawn_strategy();
    }
}
