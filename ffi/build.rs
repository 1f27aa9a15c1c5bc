//! Generates `include/xfer.h` from the `extern "C"` surface.

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let out_dir = crate_dir.join("include");
    if let Err(err) = std::fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create {}: {err}", out_dir.display());
        return;
    }

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("XFER_H".to_string()),
        ..Default::default()
    };
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("xfer.h"));
        }
        Err(err) => println!("cargo:warning=header generation skipped: {err}"),
    }
}
