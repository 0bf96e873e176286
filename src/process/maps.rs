//! Line classifier for `/proc/<pid>/maps` listings.
//!
//! Each line has the fixed layout
//!
//! ```text
//! address           perms offset  dev   inode      pathname
//! 7f2c4e1b1000-7f2c4e1d7000 r-xp 00000000 fd:01 1835027    /usr/lib/libssl.so.3 (deleted)
//! ```
//!
//! The kernel appends ` (deleted)` to the pathname once the backing file has
//! been unlinked while still mapped. Those are the lines this module picks out.

/// Suffix the kernel appends to pathnames of unlinked backing files.
pub const DELETED_SUFFIX: &str = " (deleted)";

/// One parsed line of a maps listing, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry<'a> {
    pub perms: &'a str,
    /// Backing pathname with any ` (deleted)` suffix removed.
    pub pathname: Option<&'a str>,
    pub deleted: bool,
}

impl<'a> MapEntry<'a> {
    /// Parses a single maps line. Returns `None` for lines that do not carry
    /// the five leading fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let (_address, rest) = next_field(line)?;
        let (perms, rest) = next_field(rest)?;
        let (_offset, rest) = next_field(rest)?;
        let (_dev, rest) = next_field(rest)?;
        let (_inode, rest) = next_field(rest)?;

        let raw = rest.trim_start();
        if raw.is_empty() {
            return Some(Self {
                perms,
                pathname: None,
                deleted: false,
            });
        }

        let (pathname, deleted) = match raw.strip_suffix(DELETED_SUFFIX) {
            Some(p) => (p, true),
            None => (raw, false),
        };

        Some(Self {
            perms,
            pathname: Some(pathname),
            deleted,
        })
    }

    /// True for private executable mappings (`r-xp`, `rwxp`, `--xp`, `-wxp`).
    ///
    /// Shared mappings and non-executable segments never qualify, so a
    /// library counts through its text segment only.
    pub fn is_private_executable(&self) -> bool {
        matches!(
            self.perms.as_bytes(),
            [b'r' | b'-', b'w' | b'-', b'x', b'p']
        )
    }

    /// Returns the absolute path of a deleted private executable mapping.
    pub fn deleted_path(&self) -> Option<&'a str> {
        if !self.deleted || !self.is_private_executable() {
            return None;
        }
        self.pathname.filter(|p| p.starts_with('/'))
    }
}

/// Splits off the next whitespace-delimited field.
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some(s.split_at(end)),
        None => Some((s, "")),
    }
}

/// Classifies one maps line, returning the path of a deleted library mapping.
///
/// Absence of a match is the normal outcome; malformed input is never an error.
pub fn deleted_mapping_path(line: &str) -> Option<&str> {
    MapEntry::parse(line)?.deleted_path()
}
