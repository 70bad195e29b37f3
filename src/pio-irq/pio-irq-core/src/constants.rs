pub mod pio {
    // Number of PIO blocks on the target chip
    #[cfg(not(feature = "rp2350"))]
    pub const NUM_PIOS: usize = 2;
    #[cfg(feature = "rp2350")]
    pub const NUM_PIOS: usize = 3;

    pub const NUM_STATE_MACHINES: usize = 4;
    pub const NUM_HANDLER_SLOTS: usize = NUM_PIOS * NUM_STATE_MACHINES;

    // Host-visible state machine flags (IRQ register bits 0-3)
    pub const SM_FLAG_MASK: u32 = 0b1111;

    // Relative flag indices are added modulo 4 on the two LSBs
    pub const RELATIVE_FLAG_MASK: u32 = 0x03;
    pub const MAX_INTERRUPT_NUMBER: u32 = 3;
}

pub mod irq {
    // Physical interrupt lines per PIO block (IRQ_0, IRQ_1)
    pub const NUM_LINES: usize = 2;

    // First PIO vector at the interrupt controller, followed by
    // PIO0_IRQ_1, PIO1_IRQ_0, PIO1_IRQ_1, ...
    #[cfg(not(feature = "rp2350"))]
    pub const PIO0_IRQ_0: u16 = 7;
    #[cfg(feature = "rp2350")]
    pub const PIO0_IRQ_0: u16 = 15;

    pub const NUM_PIO_IRQS: usize = super::pio::NUM_PIOS * NUM_LINES;

    // Bit of SM0's flag in the IRQn_INTE/INTS registers
    pub const SM0_IRQ_SOURCE: u32 = 8;

    // Shared handlers are installed at the SDK's default order priority
    pub const SHARED_IRQ_HANDLER_DEFAULT_ORDER_PRIORITY: u8 = 0x80;
}
