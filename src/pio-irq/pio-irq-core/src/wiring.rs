use log::debug;

use crate::constants::irq::SHARED_IRQ_HANDLER_DEFAULT_ORDER_PRIORITY;
use crate::constants::pio::MAX_INTERRUPT_NUMBER;
use crate::dispatch::trampoline_for;
use crate::ids::{InterruptSource, IrqLine, PioId, SmId};
use crate::platform::PioPlatform;
use crate::registry::IrqTable;
use crate::utils::{irq_number, relative_flag};

fn checked_line(line: u8) -> IrqLine {
    match IrqLine::from_index(line) {
        Some(line) => line,
        None => panic!("invalid PIO interrupt line {} (expected 0 or 1)", line),
    }
}

/// Routes the flag of `sm` for table `T` to interrupt line `line` of `pio`
///
/// Enables the state machine's relative flag as a source on `line`, installs
/// the table's trampoline for `pio` as a shared handler on the line's vector
/// and, with `enable`, enables that vector at the interrupt controller.
/// Installing the trampoline again is harmless, so several tables may share
/// one vector.
///
/// Panics if `line` is not 0 or 1.
pub fn wire<T: IrqTable>(line: u8, pio: PioId, sm: SmId, enable: bool) {
    const { assert!(T::IRQ <= MAX_INTERRUPT_NUMBER, "PIO interrupt number must be 0..=3") };
    let line = checked_line(line);

    let flag = relative_flag(T::IRQ, sm);
    T::Platform::set_source_enabled(pio, line, InterruptSource::for_flag(flag), true);

    let irq = irq_number(pio, line);
    T::Platform::add_shared_handler(
        irq,
        trampoline_for::<T>(pio),
        SHARED_IRQ_HANDLER_DEFAULT_ORDER_PRIORITY,
    );
    if enable {
        T::Platform::set_irq_enabled(irq, true);
    }

    debug!(
        "PIO{} SM{}: flag {} wired to IRQ{} (vector {}, enabled: {})",
        pio.index(),
        sm.index(),
        flag,
        line.index(),
        irq.0,
        enable
    );
}

/// Disables the source enabled by [`wire`]; the shared handler stays installed
pub fn unwire<T: IrqTable>(line: u8, pio: PioId, sm: SmId) {
    let line = checked_line(line);
    let flag = relative_flag(T::IRQ, sm);
    T::Platform::set_source_enabled(pio, line, InterruptSource::for_flag(flag), false);
    debug!(
        "PIO{} SM{}: flag {} removed from IRQ{}",
        pio.index(),
        sm.index(),
        flag,
        line.index()
    );
}
