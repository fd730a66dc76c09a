//! BCM2837 GPIO, only as much as it takes to hand pins 14/15 to the mini UART.

use tock_registers::interfaces::{ReadWriteable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::mmio::Mmio;
use crate::param::IO_BASE;

const GPIO_BASE: usize = IO_BASE + 0x20_0000;

register_bitfields! {
    u32,

    GPFSEL1 [
        FSEL15 OFFSET(15) NUMBITS(3) [
            Input = 0b000,
            Output = 0b001,
            AltFunc5 = 0b010
        ],
        FSEL14 OFFSET(12) NUMBITS(3) [
            Input = 0b000,
            Output = 0b001,
            AltFunc5 = 0b010
        ]
    ],

    GPPUD [
        PUD OFFSET(0) NUMBITS(2) [
            Off = 0b00,
            PullDown = 0b01,
            PullUp = 0b10
        ]
    ],

    GPPUDCLK0 [
        PUDCLK15 OFFSET(15) NUMBITS(1) [
            NoEffect = 0,
            AssertClock = 1
        ],
        PUDCLK14 OFFSET(14) NUMBITS(1) [
            NoEffect = 0,
            AssertClock = 1
        ]
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => _reserved1),
        (0x04 => GPFSEL1: ReadWrite<u32, GPFSEL1::Register>),
        (0x08 => _reserved2),
        (0x94 => GPPUD: ReadWrite<u32, GPPUD::Register>),
        (0x98 => GPPUDCLK0: ReadWrite<u32, GPPUDCLK0::Register>),
        (0x9c => @END),
    }
}

fn spin(cycles: usize) {
    for _ in 0..cycles {
        unsafe { core::arch::asm!("nop") }
    }
}

/// Routes GPIO 14/15 to the mini UART (ALT5) with pulls disabled.
pub fn map_mini_uart() {
    let registers: Mmio<RegisterBlock> = unsafe { Mmio::new(GPIO_BASE) };

    registers
        .GPFSEL1
        .modify(GPFSEL1::FSEL14::AltFunc5 + GPFSEL1::FSEL15::AltFunc5);

    // The pull control latches only while its clock is asserted, and needs
    // 150 cycles of setup on either side.
    registers.GPPUD.write(GPPUD::PUD::Off);
    spin(150);
    registers
        .GPPUDCLK0
        .write(GPPUDCLK0::PUDCLK14::AssertClock + GPPUDCLK0::PUDCLK15::AssertClock);
    spin(150);
    registers.GPPUDCLK0.set(0);
}
