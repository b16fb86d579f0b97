use std::env;
use std::path::PathBuf;

use wayland_scanner::{generate_code, Side};

fn main() {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());

    generate_code(
        "protocol/mosaic-layout-unstable-v1.xml",
        out_dir.join("mosaic_layout_v1_server.rs"),
        Side::Server,
    );
    generate_code(
        "protocol/mosaic-control-unstable-v1.xml",
        out_dir.join("mosaic_control_v1_server.rs"),
        Side::Server,
    );

    println!("cargo:rerun-if-changed=protocol/mosaic-layout-unstable-v1.xml");
    println!("cargo:rerun-if-changed=protocol/mosaic-control-unstable-v1.xml");
}
