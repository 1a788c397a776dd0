//! Golden fixture generator for the CAR conformance test suite.
//!
//! Writes every archive under `tests/golden/`. Run it after a wire-format
//! change to regenerate the committed fixtures; snapshot files (`.snap`)
//! are updated separately via `cargo insta review` after running the
//! conformance tests.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_golden -p car-tests
//! ```
//!
//! # Generated fixtures
//!
//! | File             | Contents                                               |
//! |------------------|--------------------------------------------------------|
//! | hello.car        | Root `hello` (absent), one block "random meaningless bytes" |
//! | v0_root.car      | Legacy v0 root, present as the only block              |
//! | multi_block.car  | Two roots, raw + dag-cbor, a duplicate, an empty block |
//! | empty.car        | Header with no roots and no blocks                     |

#![allow(clippy::pedantic)]

use std::path::Path;

use car_encoder::CarEncoder;
use car_types::{Block, Hasher, Sha2_256Hasher, codec};
use car_wire::Cid;

fn main() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let golden_dir = manifest_dir.join("tests/golden");

    generate_hello(&golden_dir);
    generate_v0_root(&golden_dir);
    generate_multi_block(&golden_dir);
    generate_empty(&golden_dir);

    println!("All golden fixtures written to {}", golden_dir.display());
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn write_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create_dir_all");
    }
    std::fs::write(path, data).expect("write_file");
    println!("  wrote {}", path.display());
}

fn raw(data: &'static [u8]) -> Block {
    Block::encode(codec::RAW, &Sha2_256Hasher, data)
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn generate_hello(dir: &Path) {
    let root = raw(b"hello");
    let block = raw(b"random meaningless bytes");
    let bytes = CarEncoder::new(vec![root.cid])
        .add(block)
        .encode()
        .expect("encode hello");
    write_file(&dir.join("hello.car"), &bytes);
}

fn generate_v0_root(dir: &Path) {
    let cid = Cid::new_v0(Sha2_256Hasher.digest(b"hello")).expect("v0 cid");
    let bytes = CarEncoder::new(vec![cid.clone()])
        .add_block(cid, &b"hello"[..])
        .encode()
        .expect("encode v0_root");
    write_file(&dir.join("v0_root.car"), &bytes);
}

fn generate_multi_block(dir: &Path) {
    let alpha = raw(b"alpha");
    let map = Block::encode(codec::DAG_CBOR, &Sha2_256Hasher, &b"\xa1aa\x01"[..]);
    let bytes = CarEncoder::new(vec![alpha.cid.clone(), map.cid.clone()])
        .add(alpha.clone())
        .add(map)
        .add(alpha)
        .add(raw(b"delta"))
        .add(raw(b""))
        .encode()
        .expect("encode multi_block");
    write_file(&dir.join("multi_block.car"), &bytes);
}

fn generate_empty(dir: &Path) {
    let bytes = CarEncoder::new(vec![]).encode().expect("encode empty");
    write_file(&dir.join("empty.car"), &bytes);
}
