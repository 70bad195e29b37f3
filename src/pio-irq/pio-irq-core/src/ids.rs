use crate::constants::irq::SM0_IRQ_SOURCE;
use crate::constants::pio::{NUM_PIOS, NUM_STATE_MACHINES};

/// One of the PIO blocks of the chip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PioId(pub(crate) u8);

impl PioId {
    pub const PIO0: PioId = PioId(0);
    pub const PIO1: PioId = PioId(1);
    #[cfg(feature = "rp2350")]
    pub const PIO2: PioId = PioId(2);

    /// Returns `None` for blocks the chip does not have
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < NUM_PIOS {
            Some(PioId(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = PioId> {
        (0..NUM_PIOS as u8).map(PioId)
    }
}

/// A state machine inside a PIO block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmId(u8);

impl SmId {
    pub const SM0: SmId = SmId(0);
    pub const SM1: SmId = SmId(1);
    pub const SM2: SmId = SmId(2);
    pub const SM3: SmId = SmId(3);

    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < NUM_STATE_MACHINES {
            Some(SmId(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = SmId> {
        (0..NUM_STATE_MACHINES as u8).map(SmId)
    }
}

/// Physical interrupt line of a PIO block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqLine {
    Irq0,
    Irq1,
}

impl IrqLine {
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(IrqLine::Irq0),
            1 => Some(IrqLine::Irq1),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            IrqLine::Irq0 => 0,
            IrqLine::Irq1 => 1,
        }
    }

    pub fn all() -> impl Iterator<Item = IrqLine> {
        [IrqLine::Irq0, IrqLine::Irq1].into_iter()
    }
}

/// Vector number at the top-level interrupt controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqNumber(pub u16);

/// Bit position of an interrupt source in a line's enable register
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSource(u32);

impl InterruptSource {
    /// Source raised by state machine flag `flag` (SM0_IRQ source plus the flag index)
    pub const fn for_flag(flag: u32) -> Self {
        InterruptSource(SM0_IRQ_SOURCE + flag)
    }

    pub const fn bit(self) -> u32 {
        self.0
    }

    pub const fn mask(self) -> u32 {
        1 << self.0
    }
}
