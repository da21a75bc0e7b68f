//! Build script for mdb-sys.
//!
//! 1. Locates the `libmdb` shared library shipped with the Axis ACAP SDK.
//! 2. Optionally runs `bindgen` to regenerate Rust bindings (feature `regenerate`).
//! 3. Configures the linker for dynamic linking against `libmdb`.
//!
//! # Environment variables
//!
//! - `MDB_LIB_DIR` — Directory containing `libmdb.so`. Takes precedence over
//!   the SDK sysroot.
//!
//! - `SDKTARGETSYSROOT` — Sysroot exported by the ACAP SDK environment script.
//!   Libraries are searched in `usr/lib` and headers in `usr/include`.
//!
//! - `MDB_UPDATE_BINDINGS` — When set (any value) alongside the `regenerate`
//!   feature, the freshly generated `bindings.rs` is copied back to
//!   `src/bindings.rs` so it can be committed to the repository.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=MDB_LIB_DIR");
    println!("cargo:rerun-if-env-changed=SDKTARGETSYSROOT");
    println!("cargo:rerun-if-env-changed=MDB_UPDATE_BINDINGS");
    println!("cargo:rerun-if-env-changed=DOCS_RS");

    // docs.rs has no ACAP sysroot; the crate still compiles for docs.
    if env::var("DOCS_RS").is_ok() {
        return;
    }

    let sysroot = env::var("SDKTARGETSYSROOT").ok().map(PathBuf::from);

    if let Ok(lib_dir) = env::var("MDB_LIB_DIR") {
        println!("cargo:rustc-link-search=native={lib_dir}");
    } else if let Some(root) = &sysroot {
        let lib_dir = root.join("usr").join("lib");
        println!("cargo:rustc-link-search=native={}", lib_dir.display());
    } else {
        println!(
            "cargo:warning=neither MDB_LIB_DIR nor SDKTARGETSYSROOT is set; relying on the default linker search path for libmdb"
        );
    }

    #[cfg(feature = "regenerate")]
    {
        let include_dir = sysroot
            .as_ref()
            .map(|root| root.join("usr").join("include"))
            .expect("SDKTARGETSYSROOT must be set to regenerate bindings");
        let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
        generate_bindings(&include_dir, &out_dir);
    }

    println!("cargo:rustc-link-lib=dylib=mdb");
}

/// Run `bindgen` on the `mdb/*.h` headers to produce `$OUT_DIR/bindings.rs`.
#[cfg(feature = "regenerate")]
fn generate_bindings(include_dir: &std::path::Path, out_dir: &std::path::Path) {
    use std::fs;

    let wrapper = out_dir.join("mdb_wrapper.h");
    fs::write(
        &wrapper,
        "#include <mdb/connection.h>\n\
         #include <mdb/error.h>\n\
         #include <mdb/message.h>\n\
         #include <mdb/subscriber.h>\n",
    )
    .expect("Failed to write wrapper header");

    let bindings = bindgen::Builder::default()
        .header(wrapper.to_str().expect("path is not valid UTF-8"))
        .clang_arg(format!("-I{}", include_dir.display()))
        .use_core()
        .allowlist_function("mdb_.*")
        .allowlist_type("mdb_.*")
        .allowlist_type("timespec")
        .opaque_type("mdb_connection_t")
        .opaque_type("mdb_subscriber_t")
        .opaque_type("mdb_subscriber_config_t")
        .opaque_type("mdb_message_t")
        .derive_debug(true)
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate()
        .expect("bindgen failed to generate bindings from mdb headers");

    let out_file = out_dir.join("bindings.rs");
    bindings
        .write_to_file(&out_file)
        .expect("Failed to write bindings.rs");

    if env::var("MDB_UPDATE_BINDINGS").is_ok() {
        let manifest_dir =
            PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
        let committed = manifest_dir.join("src").join("bindings.rs");
        fs::copy(&out_file, &committed).expect("Failed to copy bindings.rs to src/");
        println!(
            "cargo:warning=Updated committed bindings: {}",
            committed.display()
        );
    }
}
