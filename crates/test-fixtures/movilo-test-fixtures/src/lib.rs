use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    markers: HashMap<String, String>,
    forces: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_bytes(rel: &str) -> Result<Vec<u8>> {
    let path = resolve_path(rel);
    fs::read(&path).with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// File name (last path component) of a fixture, for extension checks.
fn file_name(rel: &str) -> String {
    Path::new(rel)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel.to_string())
}

pub mod markers {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.markers.keys().cloned().collect()
    }

    pub fn bytes(name: &str) -> Result<Vec<u8>> {
        read_bytes(lookup(&MANIFEST.markers, "marker", name)?)
    }

    pub fn file_name(name: &str) -> Result<String> {
        Ok(super::file_name(lookup(&MANIFEST.markers, "marker", name)?))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.markers, "marker", name)?))
    }
}

pub mod forces {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.forces.keys().cloned().collect()
    }

    pub fn bytes(name: &str) -> Result<Vec<u8>> {
        read_bytes(lookup(&MANIFEST.forces, "force", name)?)
    }

    pub fn file_name(name: &str) -> Result<String> {
        Ok(super::file_name(lookup(&MANIFEST.forces, "force", name)?))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.forces, "force", name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_exists() {
        for key in markers::keys() {
            assert!(markers::path(&key).unwrap().exists(), "missing marker fixture {key}");
        }
        for key in forces::keys() {
            assert!(forces::path(&key).unwrap().exists(), "missing force fixture {key}");
        }
    }

    #[test]
    fn unknown_fixture_is_an_error() {
        let err = markers::bytes("nope").unwrap_err();
        assert!(err.to_string().contains("unknown marker fixture"));
    }
}
