//! Puts `memory.x` where the linker can find it, for the firmware build.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
	let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR not set"));
	File::create(out.join("memory.x"))
		.expect("creating memory.x")
		.write_all(include_bytes!("memory.x"))
		.expect("writing memory.x");
	println!("cargo:rustc-link-search={}", out.display());
	println!("cargo:rerun-if-changed=memory.x");
	println!("cargo:rerun-if-changed=build.rs");
}
