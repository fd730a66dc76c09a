//! BCM2837 mini UART on GPIO 14/15, polled.

use core::fmt;

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

use crate::gpio;
use crate::mmio::Mmio;
use crate::param::{IO_BASE, MINI_UART_BAUD_DIVISOR};

const AUX_BASE: usize = IO_BASE + 0x21_5000;

register_bitfields! {
    u32,

    AUX_ENABLES [
        MINI_UART OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ]
    ],

    AUX_MU_IO [
        DATA OFFSET(0) NUMBITS(8) []
    ],

    AUX_MU_IER [
        RX_INTERRUPT OFFSET(0) NUMBITS(1) [],
        TX_INTERRUPT OFFSET(1) NUMBITS(1) []
    ],

    /// On write, bits 1-2 clear the FIFOs.
    AUX_MU_IIR [
        FIFO_CLEAR OFFSET(1) NUMBITS(2) [
            Receive = 0b01,
            Transmit = 0b10,
            All = 0b11
        ]
    ],

    AUX_MU_LCR [
        DATA_SIZE OFFSET(0) NUMBITS(2) [
            SevenBit = 0b00,
            EightBit = 0b11
        ]
    ],

    AUX_MU_MCR [
        RTS OFFSET(1) NUMBITS(1) []
    ],

    AUX_MU_LSR [
        TX_EMPTY OFFSET(5) NUMBITS(1) [],
        DATA_READY OFFSET(0) NUMBITS(1) []
    ],

    AUX_MU_CNTL [
        TX_EN OFFSET(1) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],
        RX_EN OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ]
    ],

    AUX_MU_BAUD [
        RATE OFFSET(0) NUMBITS(16) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => _reserved1),
        (0x04 => AUX_ENABLES: ReadWrite<u32, AUX_ENABLES::Register>),
        (0x08 => _reserved2),
        (0x40 => AUX_MU_IO: ReadWrite<u32, AUX_MU_IO::Register>),
        (0x44 => AUX_MU_IER: ReadWrite<u32, AUX_MU_IER::Register>),
        (0x48 => AUX_MU_IIR: ReadWrite<u32, AUX_MU_IIR::Register>),
        (0x4c => AUX_MU_LCR: ReadWrite<u32, AUX_MU_LCR::Register>),
        (0x50 => AUX_MU_MCR: ReadWrite<u32, AUX_MU_MCR::Register>),
        (0x54 => AUX_MU_LSR: ReadOnly<u32, AUX_MU_LSR::Register>),
        (0x58 => _reserved3),
        (0x60 => AUX_MU_CNTL: ReadWrite<u32, AUX_MU_CNTL::Register>),
        (0x64 => _reserved4),
        (0x68 => AUX_MU_BAUD: ReadWrite<u32, AUX_MU_BAUD::Register>),
        (0x6c => @END),
    }
}

/// Handle to the mini UART. The device has no state of its own beyond its
/// registers, so handles are free to create once `initialize` has run.
pub struct MiniUart {
    registers: Mmio<RegisterBlock>,
}

impl MiniUart {
    /// Routes GPIO 14/15 to the mini UART and brings it up at 8N1.
    pub fn initialize() -> MiniUart {
        gpio::map_mini_uart();

        let uart = MiniUart::attach();
        let registers = &uart.registers;

        registers.AUX_ENABLES.modify(AUX_ENABLES::MINI_UART::Enabled);
        registers
            .AUX_MU_CNTL
            .write(AUX_MU_CNTL::RX_EN::Disabled + AUX_MU_CNTL::TX_EN::Disabled);
        registers.AUX_MU_IER.set(0);
        registers.AUX_MU_LCR.write(AUX_MU_LCR::DATA_SIZE::EightBit);
        registers.AUX_MU_MCR.set(0);
        registers.AUX_MU_IIR.write(AUX_MU_IIR::FIFO_CLEAR::All);
        registers
            .AUX_MU_BAUD
            .write(AUX_MU_BAUD::RATE.val(MINI_UART_BAUD_DIVISOR));
        registers
            .AUX_MU_CNTL
            .write(AUX_MU_CNTL::RX_EN::Enabled + AUX_MU_CNTL::TX_EN::Enabled);

        uart
    }

    pub fn attach() -> MiniUart {
        MiniUart {
            registers: unsafe { Mmio::new(AUX_BASE) },
        }
    }

    pub fn can_read(&self) -> bool {
        self.registers.AUX_MU_LSR.is_set(AUX_MU_LSR::DATA_READY)
    }

    pub fn read_byte(&mut self) -> u8 {
        while !self.can_read() {}
        self.registers.AUX_MU_IO.read(AUX_MU_IO::DATA) as u8
    }

    pub fn write_byte(&mut self, byte: u8) {
        while !self.registers.AUX_MU_LSR.is_set(AUX_MU_LSR::TX_EMPTY) {}
        self.registers.AUX_MU_IO.write(AUX_MU_IO::DATA.val(byte as u32));
    }
}

impl fmt::Write for MiniUart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}
