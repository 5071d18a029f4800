//! Shared test utilities for integration tests
//!
//! Provides a small web project fixture and canned AI responses
//! used across multiple test files.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Response that updates one existing file and creates another.
pub const UPDATE_AND_CREATE: &str = "Here is the fix for the score display.\n\
\n\
file: src/game.js\n\
```js\n\
let score = 10;\n\
```\n\
\n\
Create file: src/hud.js\n\
```js\n\
export function hud() {}\n\
```\n";

/// Response with three named files, in that order.
pub const THREE_FILES: &str = "Three small tweaks.\n\
\n\
file: a.js\n\
```js\n\
let a = 2;\n\
```\n\
file: b.js\n\
```js\n\
let b = 2;\n\
```\n\
file: c.js\n\
```js\n\
let c = 2;\n\
```\n";

/// Build a tiny project with a game script, a page and an ignored
/// dependency directory.
pub fn make_web_fixture() -> assert_fs::TempDir
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("src/game.js")
        .write_str("let score = 0;\n")
        .expect("write game.js");
    tmp.child("index.html")
        .write_str("<html><body></body></html>\n")
        .expect("write index.html");

    // Ignored by the default project globs
    tmp.child("node_modules/lib/index.js")
        .write_str("module.exports = {};\n")
        .expect("write node_modules");

    tmp
}

/// Write `text` as `response.md` outside the project and return it.
pub fn write_response(text: &str) -> assert_fs::TempDir
{
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("response.md")
        .write_str(text)
        .expect("write response");
    dir
}
