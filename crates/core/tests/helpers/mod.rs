//! Shared fixture loading for engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

pub fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    assert!(dir.exists(), "Fixture '{name}' not found at {}", dir.display());
    dir
}

/// Load `(input.c, expected.c)` for a named fixture.
pub fn load_fixture(name: &str) -> (String, String) {
    let dir = fixture_dir(name);
    let read = |file: &str| {
        std::fs::read_to_string(dir.join(file))
            .unwrap_or_else(|e| panic!("Could not read {name}/{file}: {e}"))
    };
    (read("input.c"), read("expected.c"))
}

/// Lines strictly between a line equal to `open` and the next `};`.
pub fn array_elements<'a>(text: &'a str, open: &str) -> Vec<&'a str> {
    text.lines()
        .skip_while(|l| *l != open)
        .skip(1)
        .take_while(|l| *l != "};")
        .collect()
}
