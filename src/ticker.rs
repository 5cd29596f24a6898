use crate::widget::Widget;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, select};
use std::{thread::JoinHandle, time::Duration};

/// Builder for the [`Ticker`].
#[derive(Debug, Clone)]
pub struct Builder {
    tick_interval: Duration,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Change the interval between increments.
    ///
    /// Default is 1s.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Start incrementing `widget` on a worker thread.
    ///
    /// The worker logs through the subscriber that is current on the calling
    /// thread.
    pub fn spawn(self, widget: Widget) -> Ticker {
        let (tx_stop, rx_stop) = crossbeam::channel::bounded(0);
        let (tx_done, rx_done) = crossbeam::channel::bounded(0);
        let dispatch = tracing::dispatcher::get_default(|dispatch| dispatch.clone());

        let handle = std::thread::spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                tick_worker(widget, rx_stop, tx_done, self.tick_interval)
            })
        });

        Ticker {
            tx_stop,
            rx_done,
            handle,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running counter loop.
///
/// Dropping the handle stops the loop without waiting for it.
pub struct Ticker {
    tx_stop: Sender<()>,
    rx_done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Close the stop channel and wait up to `timeout` for the worker to exit.
    ///
    /// Returns `false` if the worker was still running when the timeout
    /// elapsed; it is left detached in that case.
    pub fn stop(self, timeout: Duration) -> bool {
        let Ticker {
            tx_stop,
            rx_done,
            handle,
        } = self;

        drop(tx_stop);

        match rx_done.recv_timeout(timeout) {
            // the worker never sends, it only drops its end on exit
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                handle.join().ok();
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "counter loop did not stop in time");
                false
            }
        }
    }
}

fn tick_worker(widget: Widget, rx_stop: Receiver<()>, tx_done: Sender<()>, interval: Duration) {
    let rx_tick = crossbeam::channel::tick(interval);

    loop {
        select! {
            recv(rx_stop) -> _ => {
                break;
            },
            recv(rx_tick) -> _ => {
                // select picks at random when both are ready
                if !matches!(rx_stop.try_recv(), Err(TryRecvError::Empty)) {
                    break;
                }

                let value = widget.increment();
                tracing::info!("widget is now {value}");
            },
        }
    }

    drop(tx_done);
}
