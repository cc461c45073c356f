//! OWNERS-file attribution.
//!
//! Walks up from a module file's directory looking for the nearest `OWNERS`
//! file and reads the owner identifier out of it. The analyzer never
//! interprets ownership content beyond that single string; it is only
//! stamped onto reports and optionally used to filter them.

use std::fs;
use std::io;
use std::path::Path;

/// Finds the owner for `start_dir`, searching it and its ancestors up to and
/// including `stop_dir`. Returns `None` when no OWNERS file exists or the
/// nearest one names nobody.
pub fn find_owner(start_dir: &Path, stop_dir: &Path) -> io::Result<Option<String>> {
    let mut dir = start_dir;
    loop {
        match fs::read_to_string(dir.join("OWNERS")) {
            Ok(contents) => return Ok(parse_owner(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if dir == stop_dir {
            break;
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
    Ok(None)
}

/// First non-empty, non-comment line, trimmed.
fn parse_owner(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}
