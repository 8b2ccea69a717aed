//! Producer output reader
//!
//! Runs on a dedicated thread per spawned producer. Only complete,
//! newline-terminated lines are parsed; each parsed event is dispatched
//! to completion before the next line is read.

use std::io::{self, BufRead, BufReader, Read};
use std::thread;

use tracing::{debug, info, warn};

use super::manager::manager;
use crate::dispatch::dispatcher;
use crate::events::{parse_line, IrEvent};

/// Start the reader thread for producer `generation`
pub(crate) fn spawn_reader(generation: u64, output: Box<dyn Read + Send>) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("ir-producer-{generation}"))
        .spawn(move || {
            debug!(generation, "producer reader started");

            let lines = pump(
                BufReader::new(output),
                || manager().is_current(generation),
                |event| {
                    dispatcher().dispatch(generation, &event);
                },
            );

            manager().producer_exited(generation);
            info!(generation, lines, "producer reader stopped");
        })?;

    Ok(())
}

/// Read lines until end of stream, a read error, or `is_live` turns false
///
/// Returns the number of complete lines read.
fn pump<R, L, S>(mut reader: R, mut is_live: L, mut sink: S) -> usize
where
    R: BufRead,
    L: FnMut() -> bool,
    S: FnMut(IrEvent),
{
    let mut buf = Vec::new();
    let mut lines = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) if buf.last() != Some(&b'\n') => {
                debug!(bytes = buf.len(), "dropping partial line at end of stream");
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "producer read failed");
                break;
            }
        }

        if !is_live() {
            break;
        }
        lines += 1;

        let line = String::from_utf8_lossy(&buf);
        match parse_line(&line) {
            Ok(event) => sink(event),
            Err(e) => debug!(error = %e, line = %line.trim_end(), "dropping unparseable line"),
        }
    }

    lines
}
