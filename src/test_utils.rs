// src/test_utils.rs

//! Test utilities: synthesized .deb archives

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Builds in-memory .deb archives laid out like dpkg-deb output
pub struct DebBuilder {
    control: Vec<u8>,
    control_member: String,
    control_path: String,
    include_control: bool,
    raw_control: Option<Vec<u8>>,
}

impl DebBuilder {
    pub fn new(control: &str) -> Self {
        Self {
            control: control.as_bytes().to_vec(),
            control_member: "control.tar.gz".to_string(),
            control_path: "./control".to_string(),
            include_control: true,
            raw_control: None,
        }
    }

    /// Replace the control file with arbitrary bytes
    pub fn control_bytes(mut self, bytes: &[u8]) -> Self {
        self.control = bytes.to_vec();
        self
    }

    /// AR member name of the control bundle
    pub fn control_member(mut self, member: &str) -> Self {
        self.control_member = member.to_string();
        self
    }

    /// Path of the control file inside the control bundle
    pub fn control_path(mut self, path: &str) -> Self {
        self.control_path = path.to_string();
        self
    }

    pub fn without_control(mut self) -> Self {
        self.include_control = false;
        self
    }

    /// Use these bytes verbatim as the control bundle
    pub fn raw_control(mut self, bytes: Vec<u8>) -> Self {
        self.raw_control = Some(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut archive = ar::Builder::new(Vec::new());

        append_member(&mut archive, "debian-binary", b"2.0\n");

        if self.include_control {
            let bundle = match &self.raw_control {
                Some(bytes) => bytes.clone(),
                None => compress(
                    &self.control_member,
                    &tar_with(&[("./", None), (self.control_path.as_str(), Some(self.control.as_slice()))]),
                ),
            };
            append_member(&mut archive, &self.control_member, &bundle);
        }

        let data = compress("data.tar.gz", &tar_with(&[("./", None)]));
        append_member(&mut archive, "data.tar.gz", &data);

        archive.into_inner().unwrap()
    }
}

fn append_member(archive: &mut ar::Builder<Vec<u8>>, name: &str, data: &[u8]) {
    let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
    archive.append(&header, data).unwrap();
}

/// Tar stream with raw member names, so `./` prefixes survive as dpkg writes them
fn tar_with(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        let raw_name = name.as_bytes();
        header.as_old_mut().name[..raw_name.len()].copy_from_slice(raw_name);

        match content {
            Some(content) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(content.len() as u64);
                header.set_cksum();
                builder.append(&header, *content).unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
        }
    }

    builder.into_inner().unwrap()
}

fn compress(member: &str, data: &[u8]) -> Vec<u8> {
    if member.ends_with(".gz") {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    } else if member.ends_with(".xz") {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    } else if member.ends_with(".zst") {
        zstd::encode_all(data, 0).unwrap()
    } else {
        data.to_vec()
    }
}

/// Write `content` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Minimal control stanza for a package
pub fn control(name: &str, architecture: &str) -> String {
    format!(
        "Package: {}\nVersion: 1.0-1\nArchitecture: {}\nMaintainer: Test User <test@example.com>\nDescription: {} package\n",
        name, architecture, name
    )
}
