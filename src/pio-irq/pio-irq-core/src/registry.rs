use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use log::warn;

use crate::constants::pio::NUM_HANDLER_SLOTS;
use crate::dispatch;
use crate::ids::{PioId, SmId};
use crate::platform::PioPlatform;
use crate::utils::slot_index;
use crate::wiring;

/// Application side of a state machine interrupt
///
/// Runs in interrupt context: it must return quickly, must not block and
/// must not allocate.
pub trait IrqHandler: Sync {
    fn on_irq(&self);
}

impl<F> IrqHandler for F
where
    F: Fn() + Sync,
{
    fn on_irq(&self) {
        self()
    }
}

/// Handler references for every (PIO, state machine) pair
///
/// Slots hold borrowed `'static` references and never own a handler. There is
/// no lock: slots are changed with plain loads and stores, so `bind` and
/// `unbind` must only run while the matching interrupt source is disabled.
pub struct HandlerSlots<H> {
    slots: [AtomicPtr<H>; NUM_HANDLER_SLOTS],
}

impl<H> HandlerSlots<H> {
    /// All slots empty
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicPtr::new(ptr::null_mut()) }; NUM_HANDLER_SLOTS],
        }
    }
}

impl<H> Default for HandlerSlots<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: IrqHandler> HandlerSlots<H> {
    /// Install `handler` for `pio`/`sm`.
    /// Returns false if this replaced a handler, which then stops receiving interrupts.
    pub fn bind(&self, pio: PioId, sm: SmId, handler: &'static H) -> bool {
        let slot = &self.slots[slot_index(pio, sm)];
        let was_empty = slot.load(Ordering::Acquire).is_null();
        slot.store(handler as *const H as *mut H, Ordering::Release);
        if !was_empty {
            warn!(
                "PIO{} SM{}: interrupt handler replaced",
                pio.index(),
                sm.index()
            );
        }
        was_empty
    }

    pub fn unbind(&self, pio: PioId, sm: SmId) -> bool {
        self.slots[slot_index(pio, sm)].store(ptr::null_mut(), Ordering::Release);
        true
    }

    pub fn bound(&self, pio: PioId, sm: SmId) -> Option<&'static H> {
        let handler = self.slots[slot_index(pio, sm)].load(Ordering::Acquire);
        // SAFETY: non-null slot values are only ever stored from `&'static H` in `bind`
        unsafe { handler.as_ref() }
    }
}

/// A handler table for one (handler type, interrupt number) pair
///
/// Declared with [`pio_irq_table!`](crate::pio_irq_table), which owns the
/// zero-initialized `static` slot array for the table.
pub trait IrqTable: Sized + 'static {
    type Handler: IrqHandler + 'static;
    type Platform: PioPlatform;

    /// PIO IRQ flag index (0..=3) served by this table
    const IRQ: u32;

    fn slots() -> &'static HandlerSlots<Self::Handler>;

    fn bind(pio: PioId, sm: SmId, handler: &'static Self::Handler) -> bool {
        Self::slots().bind(pio, sm, handler)
    }

    fn unbind(pio: PioId, sm: SmId) -> bool {
        Self::slots().unbind(pio, sm)
    }

    fn bound(pio: PioId, sm: SmId) -> Option<&'static Self::Handler> {
        Self::slots().bound(pio, sm)
    }

    /// See [`wiring::wire`]
    fn wire(line: u8, pio: PioId, sm: SmId, enable: bool) {
        wiring::wire::<Self>(line, pio, sm, enable)
    }

    /// See [`wiring::unwire`]
    fn unwire(line: u8, pio: PioId, sm: SmId) {
        wiring::unwire::<Self>(line, pio, sm)
    }

    /// Context-free entry point for `pio`, as installed on its vectors
    fn trampoline(pio: PioId) -> fn() {
        dispatch::trampoline_for::<Self>(pio)
    }
}

/// Declares a handler table type and its `static` slot array.
///
/// ```ignore
/// pio_irq_table!(pub struct RxIrq<fn(), 0, MyPlatform>);
/// ```
#[macro_export]
macro_rules! pio_irq_table {
    ($(#[$attr:meta])* $vis:vis struct $name:ident<$handler:ty, $irq:expr, $platform:ty>) => {
        $(#[$attr])*
        $vis struct $name;

        impl $crate::registry::IrqTable for $name {
            type Handler = $handler;
            type Platform = $platform;
            const IRQ: u32 = $irq;

            fn slots() -> &'static $crate::registry::HandlerSlots<$handler> {
                static SLOTS: $crate::registry::HandlerSlots<$handler> =
                    $crate::registry::HandlerSlots::new();
                &SLOTS
            }
        }
    };
}
