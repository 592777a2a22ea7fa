use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::index::fmindex::FmMeta;
use crate::index::project::{DbFile, ProjectRecord};
use crate::index::types::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

const TABLE_SUFFIXES: [&str; 9] = [
    PROJECT_SUFFIX,
    ALPHABET_SUFFIX,
    ENCSEQ_SUFFIX,
    SUFTAB_SUFFIX,
    LCPTAB_SUFFIX,
    LARGE_LCP_SUFFIX,
    BWTTAB_SUFFIX,
    FM_ASCII_SUFFIX,
    FM_DATA_SUFFIX,
];

/// Summary of an index on disk
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub index: PathBuf,
    pub integer_width: u32,
    pub total_length: Seqpos,
    pub num_of_sequences: u64,
    pub num_of_chars: usize,
    pub special: SpecialCharInfo,
    pub prefix_length: u64,
    pub longest: Option<Seqpos>,
    pub large_lcp_values: Option<u64>,
    pub max_branch_depth: Option<u64>,
    pub files: Vec<DbFile>,
    /// Present index files with their sizes in bytes
    pub tables: Vec<(String, u64)>,
    pub fm: Option<FmMeta>,
}

impl IndexInfo {
    pub fn collect(indexname: &Path, config: &LoaderConfig) -> Result<Self> {
        let project = ProjectRecord::read(indexname, config)?;
        let alphabet = Alphabet::read_al1(&index_file(indexname, ALPHABET_SUFFIX))?;

        let tables = TABLE_SUFFIXES
            .iter()
            .filter_map(|suffix| {
                let meta = std::fs::metadata(index_file(indexname, suffix)).ok()?;
                Some((suffix.to_string(), meta.len()))
            })
            .collect();

        let fm = if index_file(indexname, FM_ASCII_SUFFIX).exists() {
            Some(FmMeta::read(indexname)?)
        } else {
            None
        };

        Ok(Self {
            index: indexname.to_path_buf(),
            integer_width: project.integer_width.bits(),
            total_length: project.total_length,
            num_of_sequences: project.num_of_sequences,
            num_of_chars: alphabet.num_of_chars(),
            special: project.special,
            prefix_length: project.prefix_length,
            longest: project.longest,
            large_lcp_values: project.large_lcp_values,
            max_branch_depth: project.max_branch_depth,
            files: project.files,
            tables,
            fm,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.tables.iter().map(|(_, size)| size).sum()
    }
}

/// Display index statistics
pub fn show_info(indexname: &Path, config: &LoaderConfig, json: bool) -> anyhow::Result<()> {
    let info = IndexInfo::collect(indexname, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index:            {}", info.index.display());
    println!("Integer width:    {} bits", info.integer_width);
    println!("Total length:     {}", info.total_length);
    println!("Sequences:        {}", info.num_of_sequences);
    println!("Alphabet size:    {}", info.num_of_chars);
    println!("Special chars:    {}", info.special.special_characters);
    println!("Special ranges:   {}", info.special.special_ranges);
    println!("Prefix length:    {}", info.prefix_length);
    if let Some(longest) = info.longest {
        println!("Longest:          {}", longest);
    }
    if let Some(large) = info.large_lcp_values {
        println!("Large LCP values: {}", large);
    }
    if let Some(depth) = info.max_branch_depth {
        println!("Max branch depth: {}", depth);
    }

    if !info.files.is_empty() {
        println!();
        println!("Sequence files:");
        for file in info.files.iter().take(15) {
            println!("  {:30} {}", file.name, file.length);
        }
        if info.files.len() > 15 {
            println!("  ... and {} more", info.files.len() - 15);
        }
    }

    if let Some(fm) = &info.fm {
        println!();
        println!("FM-index:");
        println!("  Block size:     {}", 1u64 << fm.log2_block_size);
        println!("  Mark distance:  {}", 1u64 << fm.log2_mark_dist);
        println!("  Positions:      {}", if fm.store_index_pos { "stored" } else { "not stored" });
        println!("  Suffix length:  {}", fm.suffix_length);
    }

    println!();
    for (suffix, size) in &info.tables {
        println!("  {:6} {}", suffix, format_size(*size));
    }
    println!("Index size:       {}", format_size(info.total_size()));

    Ok(())
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::fmindex::{FmIndexConfig, FmIndexWriter};
    use crate::index::suffix_array::{SuffixArrayBuilder, SuffixArrayWriter};

    #[test]
    fn test_collect_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = SuffixArrayBuilder::with_defaults(Alphabet::dna());
        builder.add_file("reads.fa", [&b"ACGTNACGT"[..], b"GGA"]).unwrap();
        let built = builder.build().unwrap();

        let sa = dir.path().join("reads");
        SuffixArrayWriter::write(&sa, &built).unwrap();
        let info = IndexInfo::collect(&sa, &LoaderConfig::default()).unwrap();
        assert_eq!(info.total_length, 13);
        assert_eq!(info.num_of_sequences, 2);
        assert_eq!(info.num_of_chars, 4);
        assert_eq!(info.files.len(), 1);
        assert!(info.fm.is_none());
        assert!(info.tables.iter().any(|(s, size)| s == ".suf" && *size > 0));

        let fm = dir.path().join("reads-fm");
        FmIndexWriter::write(&fm, &built, &FmIndexConfig::default()).unwrap();
        let info = IndexInfo::collect(&fm, &LoaderConfig::default()).unwrap();
        assert_eq!(info.fm.map(|m| m.suffix_length), Some(3));

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"total_length\":13"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
