//! Canonical file names and collision-free moves.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

/// Stands in for month and day when no date was found.
pub const DATE_PLACEHOLDER: &str = "XXXX";

/// Upper bound on suffixes tried before giving up on a name.
const MAX_SUFFIX: u32 = 10_000;

/// `soares` -> `Soares`.
pub fn display_supplier(identity: &str) -> String {
    let mut chars = identity.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `{YYYYMMDD}_{Supplier}` or `{year}XXXX_{Supplier}`.
pub fn canonical_stem(date: Option<NaiveDate>, identity: &str, current_year: i32) -> String {
    let date_part = match date {
        Some(d) => format!("{:04}{:02}{:02}", d.year(), d.month(), d.day()),
        None => format!("{}{}", current_year, DATE_PLACEHOLDER),
    };
    format!("{}_{}", date_part, display_supplier(identity))
}

/// A destination reserved for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameClaim {
    dir: PathBuf,
    stem: String,
    extension: String,
    suffix: u32,
}

impl NameClaim {
    /// Full destination path.
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }

    pub fn file_name(&self) -> String {
        let stem = if self.suffix == 0 {
            self.stem.clone()
        } else {
            format!("{}_{}", self.stem, self.suffix)
        };
        if self.extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, self.extension)
        }
    }
}

/// Hands out destination names that collide neither with files on disk nor
/// with names handed out earlier in the same run.
///
/// Claims are recorded in dry runs too, so a dry run and a live run over the
/// same folder compute the same names.
#[derive(Debug, Default)]
pub struct NameResolver {
    claimed: HashSet<PathBuf>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the canonical name for a classified document.
    pub fn claim_canonical(
        &mut self,
        dir: &Path,
        date: Option<NaiveDate>,
        identity: &str,
        current_year: i32,
    ) -> io::Result<NameClaim> {
        let stem = canonical_stem(date, identity, current_year);
        self.claim(dir, &stem, "pdf", 0)
    }

    /// Claim the original file name (suffixed on collision).
    pub fn claim_original(&mut self, dir: &Path, original: &Path) -> io::Result<NameClaim> {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = original
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.claim(dir, &stem, &extension, 0)
    }

    /// Smallest free suffix starting at `from`.
    fn claim(&mut self, dir: &Path, stem: &str, extension: &str, from: u32) -> io::Result<NameClaim> {
        for suffix in from..MAX_SUFFIX {
            let claim = NameClaim {
                dir: dir.to_path_buf(),
                stem: stem.to_string(),
                extension: extension.to_string(),
                suffix,
            };
            let path = claim.path();
            if self.claimed.contains(&path) || path.exists() {
                continue;
            }
            self.claimed.insert(path);
            return Ok(claim);
        }
        Err(io::Error::other(format!(
            "no free name for {} in {}",
            stem,
            dir.display()
        )))
    }

    /// Move `source` to the claimed destination without overwriting.
    ///
    /// If the destination appeared since it was claimed, the next free
    /// suffix is claimed and tried. Returns the claim actually used.
    pub fn move_into(&mut self, source: &Path, mut claim: NameClaim) -> io::Result<NameClaim> {
        loop {
            let target = claim.path();
            match move_no_clobber(source, &target) {
                Ok(()) => return Ok(claim),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} appeared concurrently, trying next suffix", target.display());
                    claim = self.claim(&claim.dir, &claim.stem, &claim.extension, claim.suffix + 1)?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Rename that fails with `AlreadyExists` instead of replacing the target.
fn move_no_clobber(source: &Path, target: &Path) -> io::Result<()> {
    match fs::hard_link(source, target) {
        Ok(()) => fs::remove_file(source),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            // Different filesystem or no hard link support.
            debug!("hard link failed ({}), copying {}", e, source.display());
            copy_no_clobber(source, target)?;
            fs::remove_file(source)
        }
    }
}

/// Copy into a newly created `target`. A partial copy is removed.
fn copy_no_clobber(source: &Path, target: &Path) -> io::Result<()> {
    let mut src = fs::File::open(source)?;
    let mut dest = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;

    let copied = io::copy(&mut src, &mut dest).and_then(|_| dest.sync_all());
    if let Err(e) = copied {
        drop(dest);
        if let Err(cleanup) = fs::remove_file(target) {
            warn!("could not remove partial copy {}: {}", target.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}
