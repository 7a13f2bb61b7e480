// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted in-memory connection for testing the blocking transports.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use super::Connection;

/// What happens on the next read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadEvent {
    Data(Vec<u8>),
    Timeout,
    Eof,
}

/// Replays the scripted read events and records all writes.
///
/// An exhausted script behaves like a silent line, i.e. every read
/// times out. Clones share their state.
///
/// Like a serial port, reads and writes share a single timeout. The
/// timeout in effect is recorded for every read and write.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockConnection {
    script: Arc<Mutex<VecDeque<ReadEvent>>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicUsize>,
    timeout: Arc<Mutex<Option<Duration>>>,
    read_timeouts: Arc<Mutex<Vec<Option<Duration>>>>,
    write_timeouts: Arc<Mutex<Vec<Option<Duration>>>>,
}

impl MockConnection {
    pub(crate) fn new(script: impl IntoIterator<Item = ReadEvent>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Default::default()
        }
    }

    pub(crate) fn push(&self, event: ReadEvent) {
        self.script.lock().unwrap().push_back(event);
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn read_timeouts(&self) -> Vec<Option<Duration>> {
        self.read_timeouts.lock().unwrap().clone()
    }

    pub(crate) fn write_timeouts(&self) -> Vec<Option<Duration>> {
        self.write_timeouts.lock().unwrap().clone()
    }

    fn set_timeout(&self, timeout: Duration) {
        *self.timeout.lock().unwrap() = Some(timeout);
    }

    fn current_timeout(&self) -> Option<Duration> {
        *self.timeout.lock().unwrap()
    }
}

impl Read for MockConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_timeouts.lock().unwrap().push(self.current_timeout());
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(ReadEvent::Data(mut data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                if len < data.len() {
                    script.push_front(ReadEvent::Data(data.split_off(len)));
                }
                Ok(len)
            }
            Some(ReadEvent::Eof) => Ok(0),
            Some(ReadEvent::Timeout) | None => Err(io::ErrorKind::TimedOut.into()),
        }
    }
}

impl Write for MockConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_timeouts.lock().unwrap().push(self.current_timeout());
        self.written.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for MockConnection {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout);
        Ok(())
    }

    fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
