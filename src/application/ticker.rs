// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use core::future::Future;
use core::pin::pin;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker as IntervalTicker};
use log::{debug, warn};
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle, Thread};

type StopSignal = Signal<CriticalSectionRawMutex, ()>;

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives `future` on the calling thread, parking it until the time driver or
/// the stop signal wakes it.
fn run_parked<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        thread::park();
    }
}

/// Background thread calling `tick` at a fixed interval until stopped, or
/// until `tick` returns false.
pub(crate) struct Ticker {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub(crate) fn every<F>(interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let stop = Arc::new(StopSignal::new());

        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("weighing-ticker".into())
            .spawn(move || {
                debug!("Ticker running every {} ms", interval.as_millis());
                run_parked(async {
                    let mut ticker = IntervalTicker::every(interval);
                    loop {
                        match select(ticker.next(), thread_stop.wait()).await {
                            Either::First(()) => {
                                if !tick() {
                                    break;
                                }
                            }
                            Either::Second(()) => break,
                        }
                    }
                });
                debug!("Ticker stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signals the thread and waits for it to finish, unless called from the
    /// ticker thread itself, in which case the loop ends after the current
    /// tick.
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.signal(());

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let ticker = Ticker::every(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::Relaxed);
            true
        })
        .unwrap();

        while count.load(Ordering::Relaxed) < 3 {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        ticker.stop();

        let after_stop = count.load(Ordering::Relaxed);
        thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
    }

    #[test]
    fn stops_promptly_with_a_long_interval() {
        let ticker = Ticker::every(Duration::from_secs(3600), || true).unwrap();
        let started = std::time::Instant::now();
        ticker.stop();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn returning_false_ends_the_thread() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let ticker = Ticker::every(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::Relaxed);
            false
        })
        .unwrap();

        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), 1);
        ticker.stop();
    }
}
