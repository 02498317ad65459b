use anyhow::{Context, Result};
use jyutboard_core::{GlyphInfo, GlyphTable, GlyphWhitelist, RedbGlyphTable};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where `run` writes its outputs. Any of them may be skipped.
pub struct Outputs<'a> {
    pub bincode: Option<&'a Path>,
    pub redb: Option<&'a Path>,
    pub whitelist: Option<&'a Path>,
}

/// Accepts `U+6211`, `0x6211`, a bare hex code point, or the char itself.
pub fn parse_codepoint(field: &str) -> Option<char> {
    let field = field.trim();
    let hex = field
        .strip_prefix("U+")
        .or_else(|| field.strip_prefix("u+"))
        .or_else(|| field.strip_prefix("0x"));
    if let Some(hex) = hex {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_ascii_hexdigit() => Some(c),
        _ => u32::from_str_radix(field, 16).ok().and_then(char::from_u32),
    }
}

/// Parse one `codepoint radical radical_stroke total_stroke` line.
pub fn parse_line(line: &str) -> Option<(char, GlyphInfo)> {
    let parts: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    };
    if parts.len() < 4 {
        return None;
    }
    let ch = parse_codepoint(parts[0])?;
    let radical = parts[1].trim().parse::<u8>().ok()?;
    let radical_stroke = parts[2].trim().parse::<u8>().ok()?;
    let total_stroke = parts[3].trim().parse::<u8>().ok()?;
    Some((ch, GlyphInfo::new(radical, radical_stroke, total_stroke)))
}

/// Read every input into one table. Later files override earlier ones.
pub fn read_tables(inputs: &[PathBuf]) -> Result<GlyphTable> {
    let mut table = GlyphTable::new();
    for input in inputs {
        let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
        let reader = BufReader::new(file);
        let mut skipped = 0usize;
        for (line_no, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line = line.trim_end();
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((ch, info)) => table.insert(ch, info),
                None => {
                    skipped += 1;
                    warn!(file = %input.display(), line = line_no + 1, "unparsable glyph row");
                }
            }
        }
        debug!(file = %input.display(), skipped, "glyph table read");
    }
    Ok(table)
}

/// Convert TSV inputs and write the requested outputs. Returns the entry count.
pub fn run(inputs: &[PathBuf], outputs: &Outputs<'_>) -> Result<usize> {
    let table = read_tables(inputs)?;

    if let Some(path) = outputs.bincode {
        table.save_bincode(path)?;
    }
    if let Some(path) = outputs.redb {
        let db = RedbGlyphTable::create(path)?;
        db.import(&table)?;
    }
    if let Some(path) = outputs.whitelist {
        let chars = table.iter_sorted().into_iter().map(|(ch, _)| ch);
        GlyphWhitelist::from_chars(chars)?.save(path)?;
    }
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jyutboard_core::GlyphLookup;

    #[test]
    fn codepoint_forms() {
        assert_eq!(parse_codepoint("U+6211"), Some('我'));
        assert_eq!(parse_codepoint("0x6211"), Some('我'));
        assert_eq!(parse_codepoint("6211"), Some('我'));
        assert_eq!(parse_codepoint("我"), Some('我'));
        assert_eq!(parse_codepoint("U+D800"), None);
        assert_eq!(parse_codepoint("xyz"), None);
    }

    #[test]
    fn rows_with_missing_fields_are_rejected() {
        assert_eq!(
            parse_line("U+4FC4\t9\t7\t9"),
            Some(('俄', GlyphInfo::new(9, 7, 9)))
        );
        assert_eq!(parse_line("我 62 3 7"), Some(('我', GlyphInfo::new(62, 3, 7))));
        assert_eq!(parse_line("U+4FC4\t9\t7"), None);
        assert_eq!(parse_line("U+4FC4\t999\t7\t9"), None);
    }

    #[test]
    fn writes_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("glyphs.tsv");
        std::fs::write(
            &input,
            "# codepoint radical radical_stroke total_stroke\nU+6211\t62\t3\t7\nbroken\nU+9D5D\t196\t7\t18\n",
        )
        .unwrap();
        let bin = dir.path().join("glyphs.bin");
        let redb = dir.path().join("glyphs.redb");
        let fst = dir.path().join("whitelist.fst");
        let outputs = Outputs {
            bincode: Some(&bin),
            redb: Some(&redb),
            whitelist: Some(&fst),
        };

        assert_eq!(run(&[input], &outputs).unwrap(), 2);
        assert_eq!(GlyphTable::load_bincode(&bin).unwrap().len(), 2);
        let db = RedbGlyphTable::open(&redb).unwrap();
        assert_eq!(db.glyph_info('鵝'), Some(GlyphInfo::new(196, 7, 18)));
        let whitelist = GlyphWhitelist::load(&fst).unwrap();
        assert!(whitelist.contains('我'));
        assert!(!whitelist.contains('餓'));
    }
}
