use core::arch::global_asm;
use core::fmt::Write;
use core::panic::PanicInfo;

use crate::uart::MiniUart;

// Core 0 sets up its stack, clears BSS and enters `kmain`; the other cores
// park. Nothing here may touch the stack before `sp` is set.
global_asm!(
    ".section .text._start, \"ax\"",
    ".global _start",
    "_start:",
    "    mrs     x1, mpidr_el1",
    "    and     x1, x1, #3",
    "    cbz     x1, 2f",
    "1:  wfe",
    "    b       1b",
    "2:  ldr     x1, =__stack_top",
    "    mov     sp, x1",
    "    ldr     x1, =__bss_beg",
    "    ldr     x2, =__bss_end",
    "3:  cmp     x1, x2",
    "    b.hs    4f",
    "    str     xzr, [x1], #8",
    "    b       3b",
    "4:  bl      kmain",
    "    b       1b",
);

#[panic_handler]
fn panic(panic_info: &PanicInfo) -> ! {
    let mut uart = MiniUart::attach();
    let _ = writeln!(uart, "\n---------- BOOTLOADER PANIC ----------");
    let _ = writeln!(uart, "{}", panic_info);

    loop {
        unsafe { core::arch::asm!("wfe") }
    }
}
