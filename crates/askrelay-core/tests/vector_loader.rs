//! JSON test vector loader shared by the envelope and content tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::Deserialize;

/// One content validation case from `content_cases.json`.
#[derive(Debug, Deserialize)]
pub struct ContentCase {
    pub description: String,
    pub item: serde_json::Value,
    pub valid: bool,
}

pub fn read(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}"))
        .unwrap_or_else(|e| panic!("missing test vector {name}: {e}"))
}

pub fn content_cases() -> Vec<ContentCase> {
    serde_json::from_str(&read("content_cases.json")).expect("content_cases.json must parse")
}
