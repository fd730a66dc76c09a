use std::env;

pub fn main() {
    println!("cargo:rerun-if-changed=layout.ld");
    println!("cargo:rerun-if-env-changed=VERBOSE_BUILD");

    // Host builds only exist to run the unit tests.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
        println!("cargo:rustc-link-arg-bins=--script={}/layout.ld", manifest_dir);
    }
}
