use crate::ids::{InterruptSource, IrqLine, IrqNumber, PioId};

/// Register-level services of the PIO blocks and the interrupt controller
///
/// Trampolines are invoked by the vector table without any context, so every
/// operation is an associated function reached through the table's type.
pub trait PioPlatform {
    /// Enable or disable `source` on interrupt line `line` of `pio`
    fn set_source_enabled(pio: PioId, line: IrqLine, source: InterruptSource, enabled: bool);

    /// Raw IRQ flag register of `pio`
    fn raised_flags(pio: PioId) -> u32;

    /// Clear IRQ flag `flag` of `pio`
    fn clear_flag(pio: PioId, flag: u32);

    /// Add `handler` to the shared handlers of vector `irq`.
    /// Adding a handler that is already installed on `irq` must do nothing.
    fn add_shared_handler(irq: IrqNumber, handler: fn(), order_priority: u8);

    /// Enable or disable vector `irq` at the interrupt controller
    fn set_irq_enabled(irq: IrqNumber, enabled: bool);
}
