use core::arch::asm;

use chainload::Launch;

/// Branches to the loaded image with its four parameters in `x0`-`x3`.
///
/// # Safety
///
/// `launch.entry` must point at code the transfer just finished writing.
pub unsafe fn jump_to(launch: &Launch) -> ! {
    let [x0, x1, x2, x3] = launch.parameters;

    // The image was written through the data side; make it visible to
    // instruction fetch before branching into it.
    asm!(
        "dsb sy",
        "ic iallu",
        "dsb sy",
        "isb",
        "br {entry}",
        entry = in(reg) launch.entry,
        in("x0") x0,
        in("x1") x1,
        in("x2") x2,
        in("x3") x3,
        options(noreturn)
    );
}
