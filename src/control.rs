// src/control.rs

//! Debian control stanza grammar
//!
//! A control stanza is an ordered list of `Field: value` pairs in deb822
//! format. Parsing is done by `deb822-lossless`; this module adds the field
//! tables that order and check the stanzas written to Packages and Release
//! files.

use crate::error::{Error, Result};
use deb822_lossless::lossy::Deb822;
use std::fmt;

/// One entry of a field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub mandatory: bool,
    pub multiline: bool,
}

impl FieldSchema {
    const fn optional(name: &'static str) -> Self {
        Self {
            name,
            mandatory: false,
            multiline: false,
        }
    }

    const fn mandatory(name: &'static str) -> Self {
        Self {
            name,
            mandatory: true,
            multiline: false,
        }
    }

    const fn multiline(name: &'static str, mandatory: bool) -> Self {
        Self {
            name,
            mandatory,
            multiline: true,
        }
    }
}

/// Field table of a binary package stanza in a Packages index
pub const PACKAGES_FIELDS: &[FieldSchema] = &[
    FieldSchema::mandatory("Package"),
    FieldSchema::optional("Source"),
    FieldSchema::optional("Version"),
    FieldSchema::optional("Installed-Size"),
    FieldSchema::optional("Maintainer"),
    FieldSchema::optional("Architecture"),
    FieldSchema::optional("Multi-Arch"),
    FieldSchema::optional("Essential"),
    FieldSchema::optional("Replaces"),
    FieldSchema::optional("Provides"),
    FieldSchema::optional("Depends"),
    FieldSchema::optional("Pre-Depends"),
    FieldSchema::optional("Recommends"),
    FieldSchema::optional("Suggests"),
    FieldSchema::optional("Enhances"),
    FieldSchema::optional("Conflicts"),
    FieldSchema::optional("Breaks"),
    FieldSchema::mandatory("Filename"),
    FieldSchema::mandatory("Size"),
    FieldSchema::optional("MD5sum"),
    FieldSchema::optional("SHA1"),
    FieldSchema::optional("SHA256"),
    FieldSchema::optional("Section"),
    FieldSchema::optional("Priority"),
    FieldSchema::optional("Homepage"),
    FieldSchema::multiline("Description", false),
];

/// Field table of the Release file inside `<component>/binary-<arch>/`
pub const COMPONENT_RELEASE_FIELDS: &[FieldSchema] = &[
    FieldSchema::optional("Archive"),
    FieldSchema::optional("Version"),
    FieldSchema::mandatory("Component"),
    FieldSchema::optional("Origin"),
    FieldSchema::optional("Label"),
    FieldSchema::mandatory("Architecture"),
];

/// Field table of the top-level Release file of a distribution
pub const DISTRIBUTION_RELEASE_FIELDS: &[FieldSchema] = &[
    FieldSchema::optional("Origin"),
    FieldSchema::optional("Label"),
    FieldSchema::mandatory("Codename"),
    FieldSchema::mandatory("Date"),
    FieldSchema::mandatory("Architectures"),
    FieldSchema::mandatory("Components"),
    FieldSchema::multiline("Description", false),
    FieldSchema::multiline("MD5Sum", true),
    FieldSchema::multiline("SHA1", true),
    FieldSchema::multiline("SHA256", true),
];

/// An ordered control stanza
///
/// Field names are matched case-insensitively, as dpkg does. Values keep
/// their continuation lines separated by `\n`, without the indentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFile {
    fields: Vec<(String, String)>,
}

impl ControlFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the first stanza of `content`, which must be valid UTF-8
    pub fn parse(content: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(content)
            .map_err(|e| Error::ParseError(format!("Control data is not valid UTF-8: {}", e)))?;

        let stanzas = Deb822::from_reader(text.as_bytes())
            .map_err(|e| Error::ParseError(format!("Invalid control stanza: {}", e)))?;

        let mut control = Self::new();
        if let Some(paragraph) = stanzas.into_iter().next() {
            for field in paragraph.fields {
                control.set(field.name, field.value);
            }
        }

        Ok(control)
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a field, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .fields
            .iter_mut()
            .find(|(field, _)| field.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.fields.push((name, value)),
        }
    }

    /// Set a field only when a value is present
    pub fn set_opt(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Mandatory fields of `schema` that are not set
    pub fn missing_fields(&self, schema: &[FieldSchema]) -> Vec<&'static str> {
        schema
            .iter()
            .filter(|field| field.mandatory && self.get(field.name).is_none())
            .map(|field| field.name)
            .collect()
    }

    /// Serialize the stanza using the field order of `schema`
    ///
    /// Fields known to the schema come first, in schema order; any other
    /// field follows in insertion order. The result ends with a newline but
    /// carries no trailing blank line.
    pub fn to_stanza(&self, schema: &[FieldSchema]) -> String {
        let mut out = String::new();

        for field in schema {
            if let Some((name, value)) = self
                .fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field.name))
            {
                write_field(&mut out, name, value, field.multiline);
            }
        }

        for (name, value) in &self.fields {
            let known = schema
                .iter()
                .any(|field| field.name.eq_ignore_ascii_case(name));
            if !known {
                write_field(&mut out, name, value, false);
            }
        }

        out
    }
}

/// Append one field to a stanza
///
/// Empty interior lines of multiline fields become ` .`, the Debian paragraph
/// marker. Folded fields carry no meaning in blank lines, so those are dropped.
fn write_field(out: &mut String, name: &str, value: &str, multiline: bool) {
    let mut lines = value.split('\n');
    let first = lines.next().unwrap_or_default();

    out.push_str(name);
    out.push(':');
    if !first.is_empty() {
        out.push(' ');
        out.push_str(first);
    }
    out.push('\n');

    for line in lines {
        if line.is_empty() {
            if multiline {
                out.push_str(" .\n");
            }
            continue;
        }
        out.push(' ');
        out.push_str(line);
        out.push('\n');
    }
}

impl fmt::Display for ControlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_stanza(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL: &str = "Package: test-package
Version: 1.0.0-1
Architecture: amd64
Maintainer: Test User <test@example.com>
Depends: libc6 (>= 2.34),
 zlib1g
Description: A test package
 This is a longer description
 .
 that spans multiple lines.
";

    #[test]
    fn test_parse_control() {
        let control = ControlFile::parse(CONTROL.as_bytes()).unwrap();
        assert_eq!(control.len(), 6);
        assert_eq!(control.get("Package"), Some("test-package"));
        assert_eq!(control.get("architecture"), Some("amd64"));
        assert_eq!(control.get("Depends"), Some("libc6 (>= 2.34),\nzlib1g"));
        assert_eq!(
            control.get("Description"),
            Some("A test package\nThis is a longer description\n.\nthat spans multiple lines.")
        );
    }

    #[test]
    fn test_serialize_is_lossless() {
        let control = ControlFile::parse(CONTROL.as_bytes()).unwrap();
        assert_eq!(control.to_string(), CONTROL);

        let reparsed = ControlFile::parse(control.to_string().as_bytes()).unwrap();
        assert_eq!(reparsed, control);
    }

    #[test]
    fn test_parse_takes_first_stanza() {
        let content = "Package: a\n\nPackage: b\n";
        let control = ControlFile::parse(content.as_bytes()).unwrap();
        assert_eq!(control.len(), 1);
        assert_eq!(control.get("Package"), Some("a"));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let result = ControlFile::parse(b"Package: caf\xe9\nArchitecture: amd64\n");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(ControlFile::parse(b"").unwrap().is_empty());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut control = ControlFile::new();
        control.set("Package", "a");
        control.set("Version", "1");
        control.set("package", "b");

        let fields: Vec<_> = control.iter().collect();
        assert_eq!(fields, vec![("package", "b"), ("Version", "1")]);

        control.set_opt("Label", None::<String>);
        assert_eq!(control.get("Label"), None);
    }

    #[test]
    fn test_schema_ordering() {
        let mut control = ControlFile::new();
        control.set("X-Custom", "value");
        control.set("SHA256", "abc");
        control.set("Filename", "pool/main/f/foo/foo.deb");
        control.set("Package", "foo");

        assert_eq!(
            control.to_stanza(PACKAGES_FIELDS),
            "Package: foo\nFilename: pool/main/f/foo/foo.deb\nSHA256: abc\nX-Custom: value\n"
        );
    }

    #[test]
    fn test_checksum_block_serialization() {
        let mut control = ControlFile::new();
        control.set("Codename", "devel");
        control.set("MD5Sum", "\nabc 12 main/binary-amd64/Packages");

        assert_eq!(
            control.to_stanza(DISTRIBUTION_RELEASE_FIELDS),
            "Codename: devel\nMD5Sum:\n abc 12 main/binary-amd64/Packages\n"
        );
    }

    #[test]
    fn test_missing_fields() {
        let mut control = ControlFile::new();
        control.set("Component", "main");

        assert_eq!(control.missing_fields(COMPONENT_RELEASE_FIELDS), vec!["Architecture"]);

        control.set("Architecture", "amd64");
        assert!(control.missing_fields(COMPONENT_RELEASE_FIELDS).is_empty());
    }
}
