mod registers;
mod stimulus;

#[cfg(test)]
mod dispatch_tests;

pub use registers::{
    RegisterWrite, VirtualPio, JOURNAL_DEPTH, MAX_SHARED_HANDLERS, NUM_IRQ_FLAGS,
    STORM_LIMIT,
};
pub use stimulus::{FlagEvent, Stimulus};
