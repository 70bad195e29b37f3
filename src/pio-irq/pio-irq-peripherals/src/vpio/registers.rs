use std::cell::RefCell;

use heapless::{Deque, Vec};
use log::{debug, error, warn};

use pio_irq_core::constants::irq::{NUM_LINES, NUM_PIO_IRQS, PIO0_IRQ_0, SM0_IRQ_SOURCE};
use pio_irq_core::constants::pio::{NUM_PIOS, SM_FLAG_MASK};
use pio_irq_core::utils::irq_number;
use pio_irq_core::{InterruptSource, IrqLine, IrqNumber, PioId, PioPlatform};

pub const JOURNAL_DEPTH: usize = 64;
pub const MAX_SHARED_HANDLERS: usize = 4;

// Width of the PIO IRQ flag register
pub const NUM_IRQ_FLAGS: u32 = 8;

// Back-to-back vector entries before a source is considered stuck
pub const STORM_LIMIT: usize = 16;

/// Register writes seen by the virtual platform, oldest first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterWrite {
    SourceEnable {
        pio: PioId,
        line: IrqLine,
        source: InterruptSource,
        enabled: bool,
    },
    FlagClear {
        pio: PioId,
        flag: u32,
    },
    HandlerInstall {
        irq: IrqNumber,
        order_priority: u8,
    },
    IrqEnable {
        irq: IrqNumber,
        enabled: bool,
    },
}

#[derive(Clone, Copy)]
struct SharedHandler {
    handler: fn(),
    order_priority: u8,
}

#[derive(Clone, Copy, Default)]
struct PioBlock {
    irq: u32,                 // IRQ flag register
    inte: [u32; NUM_LINES],   // IRQ0_INTE / IRQ1_INTE
}

struct VirtualState {
    blocks: [PioBlock; NUM_PIOS],
    irq_enabled: [bool; NUM_PIO_IRQS],
    shared: [Vec<SharedHandler, MAX_SHARED_HANDLERS>; NUM_PIO_IRQS],
    journal: Deque<RegisterWrite, JOURNAL_DEPTH>,
}

impl VirtualState {
    fn new() -> Self {
        Self {
            blocks: [PioBlock::default(); NUM_PIOS],
            irq_enabled: [false; NUM_PIO_IRQS],
            shared: core::array::from_fn(|_| Vec::new()),
            journal: Deque::new(),
        }
    }

    fn record(&mut self, write: RegisterWrite) {
        if self.journal.is_full() {
            self.journal.pop_front();
        }
        let _ = self.journal.push_back(write);
    }

    /// Shared handlers of every vector of `pio` that currently requests service
    fn pending_handlers(&self, pio: PioId) -> Vec<fn(), { NUM_LINES * MAX_SHARED_HANDLERS }> {
        let block = &self.blocks[pio.index()];
        let sources = (block.irq & SM_FLAG_MASK) << SM0_IRQ_SOURCE;
        let mut pending = Vec::new();

        for line in IrqLine::all() {
            let vector = vector_index(irq_number(pio, line));
            if sources & block.inte[line.index()] == 0 || !self.irq_enabled[vector] {
                continue;
            }
            for shared in self.shared[vector].iter() {
                let _ = pending.push(shared.handler);
            }
        }
        pending
    }
}

std::thread_local! {
    static STATE: RefCell<VirtualState> = RefCell::new(VirtualState::new());
}

fn with_state<R>(f: impl FnOnce(&mut VirtualState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

fn flag_mask(flag: u32) -> u32 {
    assert!(flag < NUM_IRQ_FLAGS, "PIO IRQ flag {} out of range", flag);
    1 << flag
}

fn vector_index(irq: IrqNumber) -> usize {
    (irq.0 - PIO0_IRQ_0) as usize
}

fn is_pio_vector(irq: IrqNumber) -> bool {
    irq.0 >= PIO0_IRQ_0 && vector_index(irq) < NUM_PIO_IRQS
}

/// Host-side model of the PIO interrupt registers and the vector table
///
/// State is per thread: every test thread sees its own chip. Handlers run on
/// the thread that calls [`VirtualPio::raise`] or [`VirtualPio::deliver`].
pub struct VirtualPio;

impl VirtualPio {
    /// Power-on state: no flags, no sources, no handlers, empty journal
    pub fn reset() {
        with_state(|state| *state = VirtualState::new());
    }

    /// Set flag `flag` of `pio` without delivering it
    pub fn set_flag(pio: PioId, flag: u32) {
        let mask = flag_mask(flag);
        with_state(|state| state.blocks[pio.index()].irq |= mask);
    }

    /// Set flag `flag` of `pio` and run the vectors it triggers
    pub fn raise(pio: PioId, flag: u32) -> usize {
        Self::set_flag(pio, flag);
        Self::deliver(pio)
    }

    /// Enter the vectors of `pio` for as long as an enabled source is pending.
    /// Returns the number of vector entries.
    pub fn deliver(pio: PioId) -> usize {
        let mut entries = 0;
        loop {
            // The borrow must end before handlers call back into the platform
            let pending = with_state(|state| state.pending_handlers(pio));
            if pending.is_empty() {
                return entries;
            }
            if entries == STORM_LIMIT {
                warn!(
                    "PIO{}: interrupt storm, flags 0x{:x} still raised after {} entries",
                    pio.index(),
                    Self::raised_flags(pio),
                    entries
                );
                return entries;
            }
            for handler in pending {
                handler();
            }
            entries += 1;
        }
    }

    pub fn source_enabled(pio: PioId, line: IrqLine, source: InterruptSource) -> bool {
        with_state(|state| state.blocks[pio.index()].inte[line.index()] & source.mask() != 0)
    }

    pub fn irq_enabled(irq: IrqNumber) -> bool {
        with_state(|state| is_pio_vector(irq) && state.irq_enabled[vector_index(irq)])
    }

    pub fn shared_handler_count(irq: IrqNumber) -> usize {
        with_state(|state| {
            if is_pio_vector(irq) {
                state.shared[vector_index(irq)].len()
            } else {
                0
            }
        })
    }

    pub fn journal() -> Vec<RegisterWrite, JOURNAL_DEPTH> {
        with_state(|state| {
            let mut writes = Vec::new();
            for write in state.journal.iter() {
                let _ = writes.push(*write);
            }
            writes
        })
    }

    pub fn clear_journal() {
        with_state(|state| while state.journal.pop_front().is_some() {});
    }
}

impl PioPlatform for VirtualPio {
    fn set_source_enabled(pio: PioId, line: IrqLine, source: InterruptSource, enabled: bool) {
        with_state(|state| {
            let inte = &mut state.blocks[pio.index()].inte[line.index()];
            if enabled {
                *inte |= source.mask();
            } else {
                *inte &= !source.mask();
            }
            state.record(RegisterWrite::SourceEnable {
                pio,
                line,
                source,
                enabled,
            });
        });
    }

    fn raised_flags(pio: PioId) -> u32 {
        with_state(|state| state.blocks[pio.index()].irq)
    }

    fn clear_flag(pio: PioId, flag: u32) {
        let mask = flag_mask(flag);
        with_state(|state| {
            state.blocks[pio.index()].irq &= !mask;
            state.record(RegisterWrite::FlagClear { pio, flag });
        });
    }

    fn add_shared_handler(irq: IrqNumber, handler: fn(), order_priority: u8) {
        if !is_pio_vector(irq) {
            error!("Shared handler for non-PIO vector {}", irq.0);
            return;
        }
        with_state(|state| {
            let handlers = &mut state.shared[vector_index(irq)];
            if handlers
                .iter()
                .any(|shared| shared.handler as usize == handler as usize)
            {
                return;
            }
            if handlers
                .push(SharedHandler {
                    handler,
                    order_priority,
                })
                .is_err()
            {
                error!("Vector {}: no room for another shared handler", irq.0);
                return;
            }
            // Higher order priority runs first, ties keep install order
            handlers.sort_by(|a, b| b.order_priority.cmp(&a.order_priority));
            let count = handlers.len();
            state.record(RegisterWrite::HandlerInstall {
                irq,
                order_priority,
            });
            debug!("Vector {}: {} shared handler(s)", irq.0, count);
        });
    }

    fn set_irq_enabled(irq: IrqNumber, enabled: bool) {
        if !is_pio_vector(irq) {
            error!("Enable of non-PIO vector {}", irq.0);
            return;
        }
        with_state(|state| {
            state.irq_enabled[vector_index(irq)] = enabled;
            state.record(RegisterWrite::IrqEnable { irq, enabled });
        });
    }
}
