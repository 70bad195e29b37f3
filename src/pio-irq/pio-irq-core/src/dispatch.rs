use log::trace;

use crate::constants::pio::MAX_INTERRUPT_NUMBER;
use crate::ids::PioId;
use crate::platform::PioPlatform;
use crate::registry::{IrqHandler, IrqTable};
use crate::utils::{relative_flag, resolve_state_machine};

/// Forwards a PIO interrupt of `pio` to the handler bound in table `T`
///
/// The flag of the firing state machine is cleared before the lookup, whether
/// or not a handler is bound, so an unhandled source cannot fire again.
pub fn dispatch<T: IrqTable>(pio: PioId) {
    const { assert!(T::IRQ <= MAX_INTERRUPT_NUMBER, "PIO interrupt number must be 0..=3") };

    let raised = T::Platform::raised_flags(pio);
    if raised == 0 {
        return; // no state machine to attribute the interrupt to
    }

    let sm = match resolve_state_machine(raised) {
        Some(sm) => sm,
        None => panic!(
            "PIO{} interrupt without state machine flag (raised 0x{:x})",
            pio.index(),
            raised
        ),
    };

    let flag = relative_flag(T::IRQ, sm);
    T::Platform::clear_flag(pio, flag);
    trace!("PIO{} SM{}: cleared flag {}", pio.index(), sm.index(), flag);

    if let Some(handler) = T::bound(pio, sm) {
        handler.on_irq();
    }
}

fn trampoline<T: IrqTable, const PIO: u8>() {
    dispatch::<T>(PioId(PIO))
}

/// The fixed entry point of table `T` for `pio`
pub fn trampoline_for<T: IrqTable>(pio: PioId) -> fn() {
    match pio.index() {
        0 => trampoline::<T, 0> as fn(),
        1 => trampoline::<T, 1> as fn(),
        #[cfg(feature = "rp2350")]
        2 => trampoline::<T, 2> as fn(),
        _ => unreachable!(),
    }
}
