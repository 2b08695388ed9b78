// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;
use once_cell::sync::Lazy;

/// Get the first line in a file and parse it.
pub fn read_from_file<T, P: AsRef<Path>>(path: &P) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let reader = File::open(path)
        .map(BufReader::new)
        .with_context(|| format!("Couldn't open {}", path.as_ref().display()))?;
    let first_line = reader.lines().next().context("No content in file")??;
    let first_line = first_line.trim();
    first_line
        .parse()
        .with_context(|| format!("Couldn't parse \"{}\"", first_line))
}

static PAGE_SIZE: Lazy<u64> = Lazy::new(|| {
    // SAFETY: sysconf is memory safe.
    unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as u64 }
});

pub fn get_page_size() -> u64 {
    *PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_from_file() {
        let file = write_temp("42\n");
        assert_eq!(read_from_file::<u64, _>(&file.path()).unwrap(), 42);

        let file = write_temp("  -5  \nsecond line ignored\n");
        assert_eq!(read_from_file::<i16, _>(&file.path()).unwrap(), -5);
    }

    #[test]
    fn test_read_from_file_rejects_garbage() {
        let file = write_temp("not a number\n");
        assert!(read_from_file::<u64, _>(&file.path()).is_err());

        let file = write_temp("");
        assert!(read_from_file::<u64, _>(&file.path()).is_err());
    }

    #[test]
    fn test_get_page_size() {
        let page_size = get_page_size();
        assert!(page_size >= 1024);
        assert!(page_size.is_power_of_two());
    }
}
