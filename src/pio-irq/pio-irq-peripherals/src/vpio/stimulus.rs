use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use pio_irq_core::PioId;

use super::registers::VirtualPio;

/// A state machine raising one of the host-visible IRQ flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagEvent {
    pub pio: PioId,
    pub flag: u32,
}

/// Background source of flag events, standing in for running PIO programs
///
/// Events cross to the caller's thread over a channel; [`Stimulus::drain`]
/// raises them on that thread's [`VirtualPio`].
pub struct Stimulus {
    rx: Receiver<FlagEvent>,
    thread: Option<JoinHandle<()>>,
}

// Replays `pattern` every `period` until the receiving side goes away
fn stimulus_thread(tx: Sender<FlagEvent>, pattern: Vec<FlagEvent>, period: Duration) {
    loop {
        for event in pattern.iter() {
            if tx.send(*event).is_err() {
                debug!("Stimulus receiver dropped, stopping");
                return;
            }
            std::thread::sleep(period);
        }
    }
}

impl Stimulus {
    pub fn spawn(pattern: Vec<FlagEvent>, period: Duration) -> Self {
        let (tx, rx) = bounded(pattern.len().max(1));
        let thread = if pattern.is_empty() {
            None
        } else {
            Some(std::thread::spawn(move || {
                stimulus_thread(tx, pattern, period)
            }))
        };
        Stimulus { rx, thread }
    }

    /// Raise every event received so far; returns how many were raised
    pub fn drain(&self) -> usize {
        let mut raised = 0;
        for event in self.rx.try_iter() {
            VirtualPio::raise(event.pio, event.flag);
            raised += 1;
        }
        raised
    }

    /// Wait up to `timeout` for one event and raise it
    pub fn step(&self, timeout: Duration) -> Option<FlagEvent> {
        let event = self.rx.recv_timeout(timeout).ok()?;
        VirtualPio::raise(event.pio, event.flag);
        Some(event)
    }
}

impl Drop for Stimulus {
    fn drop(&mut self) {
        // Disconnect first so a sender blocked on a full channel returns
        let rx = std::mem::replace(&mut self.rx, crossbeam_channel::never());
        drop(rx);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
