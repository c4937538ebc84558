use maquette_common::hal::driver::DeviceMux;
use std::time::{Duration, Instant};

/// Longest reply line kept; extra characters are dropped.
const REPLY_CAPACITY: usize = 31;

/// Read reply lines until `accept` returns `Some` or `timeout` elapses.
///
/// Empty lines are skipped. Lines `accept` rejects are discarded and the
/// wait continues.
pub(crate) fn await_reply<T>(
    mux: &mut dyn DeviceMux,
    timeout: Duration,
    mut accept: impl FnMut(&str) -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + timeout;
    let mut line = String::with_capacity(REPLY_CAPACITY);

    while Instant::now() < deadline {
        let Some(byte) = mux.read_byte() else {
            std::thread::yield_now();
            continue;
        };
        match byte {
            b'\r' | b'\n' => {
                if !line.is_empty() {
                    if let Some(value) = accept(line.trim()) {
                        return Some(value);
                    }
                }
                line.clear();
            }
            _ if line.len() < REPLY_CAPACITY => line.push(char::from(byte)),
            _ => {}
        }
    }
    None
}

/// Discard anything already waiting on the channel.
pub(crate) fn flush_input(mux: &mut dyn DeviceMux) {
    while mux.read_byte().is_some() {}
}
