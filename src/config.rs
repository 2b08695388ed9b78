// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use log::error;

use crate::common::read_from_file;

pub const CONFIG_DIR: &str = "run/reclaimd";

const MINFREE_FILENAME: &str = "minfree";
const ADJ_FILENAME: &str = "adj";
const COST_FILENAME: &str = "cost";
const DEBUG_LEVEL_FILENAME: &str = "debug_level";

/// Writes with more entries than this are rejected. The effective
/// threshold table can still be shorter: it is the overlapping prefix
/// of the minfree and adj lists.
pub const MAX_TABLE_LEN: usize = 6;

const DEFAULT_MINFREE: [u64; 4] = [
    3 * 512,   // 6 MiB
    2 * 1024,  // 8 MiB
    4 * 1024,  // 16 MiB
    16 * 1024, // 64 MiB
];
const DEFAULT_ADJ: [i16; 4] = [0, 1, 6, 12];
const DEFAULT_COST: u32 = 32;
const DEFAULT_DEBUG_LEVEL: u32 = 2;

/// Parse a comma-separated list of numbers, e.g. "0,1,6,12".
fn parse_list<T>(value: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let entries = value
        .trim()
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            entry
                .parse()
                .with_context(|| format!("Couldn't parse \"{}\"", entry))
        })
        .collect::<Result<Vec<T>>>()?;
    if entries.len() > MAX_TABLE_LEN {
        bail!("More than {} entries", MAX_TABLE_LEN);
    }
    Ok(entries)
}

fn join_list<T: ToString>(list: &[T]) -> String {
    list.iter()
        .map(T::to_string)
        .collect::<Vec<String>>()
        .join(",")
}

/// The reclaim policy parameters. Mutated only through validated
/// writes; the scan itself never touches them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tunables {
    /// Ascending free-page breakpoints. Ascending order is assumed, not
    /// enforced.
    minfree: Vec<u64>,
    /// Ascending score thresholds, parallel to |minfree|.
    adj: Vec<i16>,
    /// Poll-eagerness hint; the monitor's poll period scales with it.
    cost: u32,
    /// Verbosity of reclaim diagnostics, 0-5.
    debug_level: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            minfree: DEFAULT_MINFREE.to_vec(),
            adj: DEFAULT_ADJ.to_vec(),
            cost: DEFAULT_COST,
            debug_level: DEFAULT_DEBUG_LEVEL,
        }
    }
}

impl Tunables {
    pub fn minfree(&self) -> &[u64] {
        &self.minfree
    }

    pub fn adj(&self) -> &[i16] {
        &self.adj
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn debug_level(&self) -> u32 {
        self.debug_level
    }

    /// Parse and commit one parameter write. A write that fails
    /// validation leaves the previous value untouched.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            MINFREE_FILENAME => self.minfree = parse_list(value)?,
            ADJ_FILENAME => self.adj = parse_list(value)?,
            COST_FILENAME => {
                self.cost = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Couldn't parse \"{}\"", value.trim()))?
            }
            DEBUG_LEVEL_FILENAME => {
                self.debug_level = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Couldn't parse \"{}\"", value.trim()))?
            }
            _ => bail!("Unknown parameter {}", key),
        }
        Ok(())
    }

    /// Re-read every parameter file under |root|. A key whose file is
    /// missing or fails validation keeps its previous value.
    pub fn refresh_from(&mut self, root: &Path) {
        for key in [
            MINFREE_FILENAME,
            ADJ_FILENAME,
            COST_FILENAME,
            DEBUG_LEVEL_FILENAME,
        ] {
            let path = root.join(CONFIG_DIR).join(key);
            match read_from_file::<String, _>(&path) {
                Ok(value) => {
                    if let Err(e) = self.apply(key, &value) {
                        error!("Rejected {} write: {:#}", key, e);
                    }
                }
                Err(e) => error!("Couldn't read {}: {:#}", path.display(), e),
            }
        }
    }

    /// Materialize the parameter files under |root| if needed and load
    /// them.
    pub fn load_or_init(root: &Path) -> Result<Self> {
        init_config_files(root)?;
        let mut tunables = Self::default();
        tunables.refresh_from(root);
        Ok(tunables)
    }
}

fn write_default_file(path: &Path, content: &str) -> Result<()> {
    if !path.exists() {
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
    } else if !path.is_file() {
        bail!("The config path {} is not a regular file.", path.display());
    }
    Ok(())
}

/// Create the config directory and the parameter files with default
/// values. Files that already exist are left intact.
pub fn init_config_files(root: &Path) -> Result<()> {
    let config_path = root.join(CONFIG_DIR);
    if !config_path.exists() {
        std::fs::create_dir_all(&config_path)
            .with_context(|| format!("Couldn't create {}", config_path.display()))?;
    } else if !config_path.is_dir() {
        bail!(
            "The config directory {} is not a directory.",
            config_path.display()
        );
    }

    write_default_file(
        &config_path.join(MINFREE_FILENAME),
        &join_list(&DEFAULT_MINFREE),
    )?;
    write_default_file(&config_path.join(ADJ_FILENAME), &join_list(&DEFAULT_ADJ))?;
    write_default_file(&config_path.join(COST_FILENAME), &DEFAULT_COST.to_string())?;
    write_default_file(
        &config_path.join(DEBUG_LEVEL_FILENAME),
        &DEFAULT_DEBUG_LEVEL.to_string(),
    )?;

    Ok(())
}
