use core::sync::atomic::{AtomicUsize, Ordering};

use pio_irq_core::constants::irq::SHARED_IRQ_HANDLER_DEFAULT_ORDER_PRIORITY;
use pio_irq_core::pio_irq_table;
use pio_irq_core::utils::irq_number;
use pio_irq_core::{InterruptSource, IrqHandler, IrqLine, IrqTable, PioId, PioPlatform, SmId};

use super::registers::{RegisterWrite, VirtualPio};

struct Counter(AtomicUsize);

impl Counter {
    const fn new() -> Self {
        Counter(AtomicUsize::new(0))
    }

    fn hits(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl IrqHandler for Counter {
    fn on_irq(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn flag_clears() -> Vec<u32> {
    VirtualPio::journal()
        .iter()
        .filter_map(|write| match write {
            RegisterWrite::FlagClear { flag, .. } => Some(*flag),
            _ => None,
        })
        .collect()
}

#[test]
fn test_single_state_machine_end_to_end() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static HANDLER: Counter = Counter::new();
    VirtualPio::reset();

    assert!(Table::bind(PioId::PIO0, SmId::SM2, &HANDLER));
    Table::wire(0, PioId::PIO0, SmId::SM2, true);
    assert!(VirtualPio::source_enabled(
        PioId::PIO0,
        IrqLine::Irq0,
        InterruptSource::for_flag(2)
    ));
    VirtualPio::clear_journal();

    assert_eq!(VirtualPio::raise(PioId::PIO0, 2), 1);
    assert_eq!(HANDLER.hits(), 1);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO0), 0);
    assert_eq!(flag_clears(), [2]);
}

#[test]
fn test_rebinding_redirects_interrupts() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static FIRST: Counter = Counter::new();
    static SECOND: Counter = Counter::new();
    VirtualPio::reset();

    assert!(Table::bind(PioId::PIO0, SmId::SM1, &FIRST));
    assert!(!Table::bind(PioId::PIO0, SmId::SM1, &SECOND));
    Table::wire(0, PioId::PIO0, SmId::SM1, true);

    VirtualPio::raise(PioId::PIO0, 1);
    assert_eq!(FIRST.hits(), 0);
    assert_eq!(SECOND.hits(), 1);
}

#[test]
fn test_unhandled_source_is_still_cleared() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    VirtualPio::reset();

    Table::wire(1, PioId::PIO0, SmId::SM3, true);
    VirtualPio::clear_journal();

    // One entry: the flag is cleared, so the vector does not fire again
    assert_eq!(VirtualPio::raise(PioId::PIO0, 3), 1);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO0), 0);
    assert_eq!(flag_clears(), [3]);
}

#[test]
fn test_unbound_after_unbind() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static HANDLER: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM0, &HANDLER);
    Table::wire(0, PioId::PIO0, SmId::SM0, true);
    VirtualPio::raise(PioId::PIO0, 0);
    assert!(Table::unbind(PioId::PIO0, SmId::SM0));
    assert!(Table::unbind(PioId::PIO0, SmId::SM0));
    VirtualPio::raise(PioId::PIO0, 0);

    assert_eq!(HANDLER.hits(), 1);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO0), 0);
}

#[test]
fn test_empty_flag_word_touches_nothing() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static HANDLER: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM0, &HANDLER);
    let trampoline = Table::trampoline(PioId::PIO0);
    trampoline();

    assert!(VirtualPio::journal().is_empty());
    assert_eq!(HANDLER.hits(), 0);
}

#[test]
#[should_panic(expected = "without state machine flag")]
fn test_internal_flag_only_is_fatal() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    VirtualPio::reset();

    VirtualPio::set_flag(PioId::PIO0, 5);
    Table::trampoline(PioId::PIO0)();
}

#[test]
fn test_invalid_line_fails_before_register_writes() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    VirtualPio::reset();

    let result = std::panic::catch_unwind(|| Table::wire(2, PioId::PIO0, SmId::SM0, true));
    assert!(result.is_err());
    assert!(VirtualPio::journal().is_empty());

    let result = std::panic::catch_unwind(|| Table::unwire(7, PioId::PIO0, SmId::SM0));
    assert!(result.is_err());
    assert!(VirtualPio::journal().is_empty());
}

#[test]
fn test_wire_installs_trampoline_once() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    VirtualPio::reset();

    Table::wire(1, PioId::PIO1, SmId::SM2, true);
    Table::wire(1, PioId::PIO1, SmId::SM2, true);

    let irq = irq_number(PioId::PIO1, IrqLine::Irq1);
    assert_eq!(VirtualPio::shared_handler_count(irq), 1);
    assert!(VirtualPio::irq_enabled(irq));

    let source = InterruptSource::for_flag(2);
    let expected = [
        RegisterWrite::SourceEnable {
            pio: PioId::PIO1,
            line: IrqLine::Irq1,
            source,
            enabled: true,
        },
        RegisterWrite::HandlerInstall {
            irq,
            order_priority: SHARED_IRQ_HANDLER_DEFAULT_ORDER_PRIORITY,
        },
        RegisterWrite::IrqEnable { irq, enabled: true },
        RegisterWrite::SourceEnable {
            pio: PioId::PIO1,
            line: IrqLine::Irq1,
            source,
            enabled: true,
        },
        RegisterWrite::IrqEnable { irq, enabled: true },
    ];
    assert_eq!(VirtualPio::journal().as_slice(), expected);
}

#[test]
fn test_wire_without_enable_leaves_vector_masked() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static HANDLER: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM1, &HANDLER);
    Table::wire(0, PioId::PIO0, SmId::SM1, false);
    let irq = irq_number(PioId::PIO0, IrqLine::Irq0);
    assert!(!VirtualPio::irq_enabled(irq));

    assert_eq!(VirtualPio::raise(PioId::PIO0, 1), 0);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO0), 0b10);

    VirtualPio::set_irq_enabled(irq, true);
    assert_eq!(VirtualPio::deliver(PioId::PIO0), 1);
    assert_eq!(HANDLER.hits(), 1);
}

#[test]
fn test_unwire_stops_delivery() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static HANDLER: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM3, &HANDLER);
    Table::wire(0, PioId::PIO0, SmId::SM3, true);
    VirtualPio::raise(PioId::PIO0, 3);

    Table::unwire(0, PioId::PIO0, SmId::SM3);
    assert!(!VirtualPio::source_enabled(
        PioId::PIO0,
        IrqLine::Irq0,
        InterruptSource::for_flag(3)
    ));
    assert_eq!(VirtualPio::raise(PioId::PIO0, 3), 0);
    assert_eq!(HANDLER.hits(), 1);
}

#[test]
fn test_simultaneous_flags_each_dispatched() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static SM1: Counter = Counter::new();
    static SM3: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM1, &SM1);
    Table::bind(PioId::PIO0, SmId::SM3, &SM3);
    Table::wire(0, PioId::PIO0, SmId::SM1, true);
    Table::wire(0, PioId::PIO0, SmId::SM3, true);
    VirtualPio::clear_journal();

    VirtualPio::set_flag(PioId::PIO0, 3);
    VirtualPio::set_flag(PioId::PIO0, 1);
    assert_eq!(VirtualPio::deliver(PioId::PIO0), 2);

    assert_eq!(SM1.hits(), 1);
    assert_eq!(SM3.hits(), 1);
    assert_eq!(flag_clears(), [1, 3]);
}

#[test]
fn test_blocks_are_independent() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static PIO0_SM1: Counter = Counter::new();
    static PIO1_SM1: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM1, &PIO0_SM1);
    Table::bind(PioId::PIO1, SmId::SM1, &PIO1_SM1);
    Table::wire(0, PioId::PIO0, SmId::SM1, true);
    Table::wire(1, PioId::PIO1, SmId::SM1, true);

    VirtualPio::raise(PioId::PIO1, 1);
    assert_eq!(PIO0_SM1.hits(), 0);
    assert_eq!(PIO1_SM1.hits(), 1);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO0), 0);
}

#[test]
fn test_tables_are_independent() {
    pio_irq_table!(struct Rx<Counter, 0, VirtualPio>);
    pio_irq_table!(struct Tx<Counter, 0, VirtualPio>);
    static RX: Counter = Counter::new();
    VirtualPio::reset();

    Rx::bind(PioId::PIO0, SmId::SM0, &RX);
    assert!(Tx::bound(PioId::PIO0, SmId::SM0).is_none());
    assert!(Tx::bind(PioId::PIO0, SmId::SM0, &RX));

    let rx = Rx::trampoline(PioId::PIO0) as usize;
    let tx = Tx::trampoline(PioId::PIO0) as usize;
    assert_ne!(rx, tx);
    assert_eq!(rx, Rx::trampoline(PioId::PIO0) as usize);
}

#[test]
fn test_function_handlers() {
    static HITS: AtomicUsize = AtomicUsize::new(0);
    fn on_done() {
        HITS.fetch_add(1, Ordering::Relaxed);
    }
    static ON_DONE: fn() = on_done;

    pio_irq_table!(struct Table<fn(), 0, VirtualPio>);
    VirtualPio::reset();

    Table::bind(PioId::PIO1, SmId::SM0, &ON_DONE);
    Table::wire(0, PioId::PIO1, SmId::SM0, true);
    VirtualPio::raise(PioId::PIO1, 0);
    assert_eq!(HITS.load(Ordering::Relaxed), 1);
}

// With a non-zero interrupt number the raised bit position still names the
// state machine, while the cleared flag is offset by the interrupt number.
#[test]
fn test_nonzero_irq_attributes_by_raw_flag_bit() {
    pio_irq_table!(struct Table<Counter, 1, VirtualPio>);
    static SM1: Counter = Counter::new();
    static SM2: Counter = Counter::new();
    VirtualPio::reset();

    Table::bind(PioId::PIO0, SmId::SM1, &SM1);
    Table::bind(PioId::PIO0, SmId::SM2, &SM2);
    Table::wire(0, PioId::PIO0, SmId::SM1, true);
    assert!(VirtualPio::source_enabled(
        PioId::PIO0,
        IrqLine::Irq0,
        InterruptSource::for_flag(2)
    ));
    VirtualPio::clear_journal();

    VirtualPio::set_flag(PioId::PIO0, 2);
    Table::trampoline(PioId::PIO0)();

    assert_eq!(SM1.hits(), 0);
    assert_eq!(SM2.hits(), 1);
    assert_eq!(flag_clears(), [3]);
}

#[cfg(feature = "rp2350")]
#[test]
fn test_third_block_dispatches() {
    pio_irq_table!(struct Table<Counter, 0, VirtualPio>);
    static PIO1_SM3: Counter = Counter::new();
    static PIO2_SM3: Counter = Counter::new();
    VirtualPio::reset();

    assert!(Table::bind(PioId::PIO1, SmId::SM3, &PIO1_SM3));
    assert!(Table::bind(PioId::PIO2, SmId::SM3, &PIO2_SM3));
    Table::wire(1, PioId::PIO2, SmId::SM3, true);
    let vector = irq_number(PioId::PIO2, IrqLine::Irq1);
    assert!(VirtualPio::irq_enabled(vector));
    assert_eq!(VirtualPio::shared_handler_count(vector), 1);
    VirtualPio::clear_journal();

    assert_eq!(VirtualPio::raise(PioId::PIO2, 3), 1);
    assert_eq!(PIO2_SM3.hits(), 1);
    assert_eq!(PIO1_SM3.hits(), 0);
    assert_eq!(VirtualPio::raised_flags(PioId::PIO2), 0);
    assert_eq!(
        VirtualPio::journal().as_slice(),
        [RegisterWrite::FlagClear {
            pio: PioId::PIO2,
            flag: 3
        }]
    );
}
