use crate::constants::irq::PIO0_IRQ_0;
use crate::constants::pio::{NUM_STATE_MACHINES, RELATIVE_FLAG_MASK, SM_FLAG_MASK};
use crate::ids::{IrqLine, IrqNumber, PioId, SmId};

// Relative IRQ flag of a state machine: the state machine id is added to the
// flag index by modulo-4 addition on the two LSBs, upper bits pass through
pub fn relative_flag(base: u32, sm: SmId) -> u32 {
    let offset = ((base & RELATIVE_FLAG_MASK) + sm.index() as u32) % 4;
    offset | (base & !RELATIVE_FLAG_MASK)
}

// State machine owning the lowest raised flag among bits 0-3
pub fn resolve_state_machine(raised: u32) -> Option<SmId> {
    let flags = raised & SM_FLAG_MASK;
    if flags == 0 {
        return None;
    }
    SmId::new(flags.trailing_zeros() as u8)
}

// Position of the (pio, sm) pair in a handler table: PIO0[0..3], PIO1[0..3], ...
pub fn slot_index(pio: PioId, sm: SmId) -> usize {
    pio.index() * NUM_STATE_MACHINES + sm.index()
}

// Controller vector serving `line` of `pio`
pub fn irq_number(pio: PioId, line: IrqLine) -> IrqNumber {
    IrqNumber(PIO0_IRQ_0 + 2 * pio.index() as u16 + line.index() as u16)
}
