//! Glyph metadata used by the radical and stroke-count groupings.
//!
//! Public API:
//! - `GlyphInfo` - Kangxi radical number, residual strokes and total strokes of one char
//! - `GlyphLookup` - read-only lookup the candidate grouping depends on
//! - `GlyphTable` - in-memory table with bincode (de)serialization
//! - `RedbGlyphTable` - persistent table in a `redb` database with an LRU read cache
//! - `GlyphWhitelist` - `fst` set of renderable chars, usable as a `CandidateFilter`
//!
//! Grouping looks at the first char of a candidate only; a missing entry, or
//! one with a zero radical/stroke count, leaves the candidate out of that view.

use crate::candidate::CandidateFilter;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::num::NonZeroUsize;
use std::path::Path;

/// Number of Kangxi radicals.
pub const RADICAL_COUNT: u8 = 214;

const KANGXI_RADICALS_START: u32 = 0x2F00;

/// Kangxi radical glyph for a 1-based radical number (1 -> '⼀').
pub fn radical_char(radical: u8) -> Option<char> {
    if radical == 0 || radical > RADICAL_COUNT {
        return None;
    }
    char::from_u32(KANGXI_RADICALS_START + u32::from(radical) - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GlyphInfo {
    /// 1-based Kangxi radical number, 0 when unknown
    pub radical: u8,
    /// Strokes outside the radical
    pub radical_stroke: u8,
    pub total_stroke: u8,
}

impl GlyphInfo {
    pub fn new(radical: u8, radical_stroke: u8, total_stroke: u8) -> Self {
        Self {
            radical,
            radical_stroke,
            total_stroke,
        }
    }

    pub fn has_radical(&self) -> bool {
        self.radical > 0 && self.radical <= RADICAL_COUNT
    }

    pub fn has_total_stroke(&self) -> bool {
        self.total_stroke > 0
    }
}

pub trait GlyphLookup {
    fn glyph_info(&self, ch: char) -> Option<GlyphInfo>;

    /// Metadata of the first char of `text`.
    fn leading_glyph_info(&self, text: &str) -> Option<GlyphInfo> {
        text.chars().next().and_then(|ch| self.glyph_info(ch))
    }
}

impl<T: GlyphLookup + ?Sized> GlyphLookup for &T {
    fn glyph_info(&self, ch: char) -> Option<GlyphInfo> {
        (**self).glyph_info(ch)
    }
}

impl<T: GlyphLookup + ?Sized> GlyphLookup for Box<T> {
    fn glyph_info(&self, ch: char) -> Option<GlyphInfo> {
        (**self).glyph_info(ch)
    }
}

/// In-memory glyph table keyed by code point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlyphTable {
    entries: HashMap<u32, GlyphInfo>,
}

impl GlyphTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ch: char, info: GlyphInfo) {
        self.entries.insert(u32::from(ch), info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by code point.
    pub fn iter_sorted(&self) -> Vec<(char, GlyphInfo)> {
        let mut out: Vec<(char, GlyphInfo)> = self
            .entries
            .iter()
            .filter_map(|(cp, info)| char::from_u32(*cp).map(|ch| (ch, *info)))
            .collect();
        out.sort_by_key(|(ch, _)| *ch);
        out
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let table: Self = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("decode glyph table {}", path.display()))?;
        Ok(table)
    }
}

impl GlyphLookup for GlyphTable {
    fn glyph_info(&self, ch: char) -> Option<GlyphInfo> {
        self.entries.get(&u32::from(ch)).copied()
    }
}

impl FromIterator<(char, GlyphInfo)> for GlyphTable {
    fn from_iter<I: IntoIterator<Item = (char, GlyphInfo)>>(iter: I) -> Self {
        let mut table = GlyphTable::new();
        for (ch, info) in iter {
            table.insert(ch, info);
        }
        table
    }
}

/// Glyph table persisted in a `redb` database.
///
/// Values are bincode-encoded `GlyphInfo`. Lookups go through an LRU cache,
/// negative results included, since the same few chars are asked for on every
/// regrouping.
pub struct RedbGlyphTable {
    db: redb::Database,
    cache: RefCell<lru::LruCache<u32, Option<GlyphInfo>>>,
}

impl RedbGlyphTable {
    const TABLE_DEF: redb::TableDefinition<'static, u32, &'static [u8]> =
        redb::TableDefinition::new("glyphs");

    const DEFAULT_CACHE_SIZE: usize = 512;

    /// Create or open a database at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = redb::Database::create(path)
            .with_context(|| format!("open glyph database {}", path.display()))?;
        // Make sure the table exists so readers never see TableDoesNotExist.
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(Self::TABLE_DEF)?;
        }
        write_txn.commit()?;
        Ok(Self::with_db(db))
    }

    /// Open an existing database.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = redb::Database::open(path)
            .with_context(|| format!("open glyph database {}", path.display()))?;
        Ok(Self::with_db(db))
    }

    fn with_db(db: redb::Database) -> Self {
        let capacity = NonZeroUsize::new(Self::DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            db,
            cache: RefCell::new(lru::LruCache::new(capacity)),
        }
    }

    pub fn insert(&self, ch: char, info: GlyphInfo) -> anyhow::Result<()> {
        self.insert_all(std::iter::once((ch, info)))
    }

    /// Insert every entry in one write transaction.
    pub fn insert_all<I: IntoIterator<Item = (char, GlyphInfo)>>(
        &self,
        entries: I,
    ) -> anyhow::Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE_DEF)?;
            for (ch, info) in entries {
                let bytes = bincode::serialize(&info)?;
                table.insert(u32::from(ch), bytes.as_slice())?;
                self.cache.borrow_mut().pop(&u32::from(ch));
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Copy every entry of an in-memory table.
    pub fn import(&self, table: &GlyphTable) -> anyhow::Result<usize> {
        let entries = table.iter_sorted();
        let count = entries.len();
        self.insert_all(entries)?;
        Ok(count)
    }

    pub fn get(&self, ch: char) -> anyhow::Result<Option<GlyphInfo>> {
        use redb::ReadableTable;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(Self::TABLE_DEF)?;
        let Some(guard) = table.get(u32::from(ch))? else {
            return Ok(None);
        };
        let info: GlyphInfo = bincode::deserialize(guard.value())?;
        Ok(Some(info))
    }

    pub fn len(&self) -> anyhow::Result<u64> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(Self::TABLE_DEF)?;
        Ok(table.len()?)
    }
}

impl GlyphLookup for RedbGlyphTable {
    fn glyph_info(&self, ch: char) -> Option<GlyphInfo> {
        let key = u32::from(ch);
        if let Some(cached) = self.cache.borrow_mut().get(&key) {
            return *cached;
        }
        let info = match self.get(ch) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(%ch, error = %err, "glyph lookup failed");
                None
            }
        };
        self.cache.borrow_mut().put(key, info);
        info
    }
}

/// Set of chars the display font can render.
///
/// Candidates containing any char outside the set are filtered out.
pub struct GlyphWhitelist {
    set: fst::Set<Vec<u8>>,
}

impl GlyphWhitelist {
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> anyhow::Result<Self> {
        let keys: BTreeSet<String> = chars.into_iter().map(String::from).collect();
        let mut builder = fst::SetBuilder::memory();
        for key in &keys {
            builder.insert(key)?;
        }
        let set = fst::Set::new(builder.into_inner()?)?;
        Ok(Self { set })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let set = fst::Set::new(bytes).context("decode glyph whitelist")?;
        Ok(Self { set })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, self.set.as_fst().as_bytes())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.set.contains(ch.encode_utf8(&mut buf).as_bytes())
    }
}

impl CandidateFilter for GlyphWhitelist {
    fn accept(&self, candidate: &str) -> bool {
        candidate.chars().all(|ch| self.contains(ch))
    }
}
