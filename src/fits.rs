use crate::metadata::MetadataSource;
use crate::utils::truncate_string;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

// HMI level 1.5 headers span a handful of blocks; anything far beyond that
// is not a header.
const MAX_HEADER_BLOCKS: usize = 64;

/// Keywords shown by default when displaying a header
const CALIBRATION_KEYWORDS: &[&str] = &[
    "TELESCOP", "INSTRUME", "CONTENT", "DATE-OBS", "T_OBS", "CDELT1", "CDELT2", "CUNIT1",
    "CUNIT2", "CRPIX1", "CRPIX2", "RSUN_REF", "RSUN_OBS", "R_SUN", "DSUN_OBS",
];

/// Header cards of every HDU in a FITS file
#[derive(Debug, serde::Serialize)]
pub struct FitsHeaders {
    pub filename: String,
    pub headers: Vec<FitsHeader>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FitsHeader {
    pub hdu_index: usize,
    pub hdu_name: Option<String>,
    pub keywords: HashMap<String, String>,
}

impl MetadataSource for FitsHeader {
    fn get(&self, key: &str) -> Option<f64> {
        MetadataSource::get(&self.keywords, key)
    }

    fn contains(&self, key: &str) -> bool {
        self.keywords.contains_key(key)
    }
}

impl FitsHeaders {
    /// First HDU whose header carries `keyword`.
    ///
    /// Compressed HMI products keep an empty primary HDU and put the
    /// calibration keywords on the compressed image extension.
    pub fn find_calibration_hdu(&self, keyword: &str) -> Option<&FitsHeader> {
        self.headers.iter().find(|h| h.keywords.contains_key(keyword))
    }
}

/// Read the headers of all HDUs in a FITS file without touching the data
pub fn read_fits_headers(path: &Path) -> Result<FitsHeaders> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open FITS file: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut headers = Vec::new();
    while let Some(header_data) = read_header_blocks(&mut reader, headers.len())
        .with_context(|| format!("Failed to read FITS header in {}", path.display()))?
    {
        let hdu_index = headers.len();
        let keywords = parse_fits_header(&header_data);

        let data_size = data_unit_size(&keywords)
            .with_context(|| format!("Invalid data unit description in HDU {}", hdu_index))?;
        let padded = data_size.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
        reader.seek(SeekFrom::Current(padded as i64))?;

        tracing::debug!(
            "HDU {}: {} keywords, {} data bytes",
            hdu_index,
            keywords.len(),
            data_size
        );

        headers.push(FitsHeader {
            hdu_index,
            hdu_name: keywords.get("EXTNAME").cloned(),
            keywords,
        });
    }

    if headers.is_empty() {
        return Err(anyhow::anyhow!("Empty FITS file: {}", path.display()));
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(FitsHeaders { filename, headers })
}

/// Read header blocks up to and including the one holding `END`.
///
/// Returns `None` when the reader is at end of file before the first block.
fn read_header_blocks<R: Read>(reader: &mut R, hdu_index: usize) -> Result<Option<Vec<u8>>> {
    let mut header_data = Vec::new();
    loop {
        let mut block = vec![0u8; BLOCK_SIZE];
        match reader.read_exact(&mut block) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof && header_data.is_empty() => {
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(anyhow::anyhow!(
                    "Truncated header in HDU {}: no END card before end of file",
                    hdu_index
                ));
            }
            Err(e) => return Err(e.into()),
        }

        if hdu_index == 0 && header_data.is_empty() && !block.starts_with(b"SIMPLE") {
            return Err(anyhow::anyhow!("Not a FITS file (first card is not SIMPLE)"));
        }

        let has_end = block.chunks(CARD_SIZE).any(|card| card_keyword(card) == "END");
        header_data.extend_from_slice(&block);
        if has_end {
            return Ok(Some(header_data));
        }

        if header_data.len() >= MAX_HEADER_BLOCKS * BLOCK_SIZE {
            return Err(anyhow::anyhow!(
                "Header in HDU {} exceeds {} blocks without an END card",
                hdu_index,
                MAX_HEADER_BLOCKS
            ));
        }
    }
}

fn card_keyword(card: &[u8]) -> &str {
    let end = card.len().min(8);
    std::str::from_utf8(&card[..end]).unwrap_or("").trim_end()
}

/// Parse header cards into keyword/value pairs
fn parse_fits_header(data: &[u8]) -> HashMap<String, String> {
    let mut keywords = HashMap::new();

    for chunk in data.chunks(CARD_SIZE) {
        let keyword = card_keyword(chunk);
        if keyword == "END" {
            break;
        }
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }

        // Value indicator lives in columns 9-10
        if chunk.len() < 10 || &chunk[8..10] != b"= " {
            continue;
        }

        let Ok(field) = std::str::from_utf8(&chunk[10..]) else {
            continue;
        };

        keywords.insert(keyword.to_string(), parse_card_value(field));
    }

    keywords
}

/// Extract the value field of a card, dropping any inline comment
fn parse_card_value(field: &str) -> String {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote
        let mut value = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    value.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return value.trim_end().to_string();
    }

    match field.find('/') {
        Some(comment_pos) => field[..comment_pos].trim().to_string(),
        None => field.trim().to_string(),
    }
}

fn header_int(keywords: &HashMap<String, String>, key: &str) -> Result<Option<i64>> {
    match keywords.get(key) {
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("{} is not an integer: {}", key, value)),
        None => Ok(None),
    }
}

/// Size in bytes of the data unit following a header, before padding
fn data_unit_size(keywords: &HashMap<String, String>) -> Result<u64> {
    let bitpix = header_int(keywords, "BITPIX")?
        .ok_or_else(|| anyhow::anyhow!("Missing BITPIX header"))?;
    let naxis = header_int(keywords, "NAXIS")?
        .ok_or_else(|| anyhow::anyhow!("Missing NAXIS header"))?;

    if naxis == 0 {
        return Ok(0);
    }

    let mut elements: u64 = 1;
    for i in 1..=naxis {
        let key = format!("NAXIS{}", i);
        let dim = header_int(keywords, &key)?
            .ok_or_else(|| anyhow::anyhow!("Missing {} header", key))?;
        elements = elements
            .checked_mul(u64::try_from(dim).with_context(|| format!("{} is negative", key))?)
            .ok_or_else(|| anyhow::anyhow!("Data unit size overflows"))?;
    }

    let pcount = header_int(keywords, "PCOUNT")?.unwrap_or(0).max(0) as u64;
    let gcount = header_int(keywords, "GCOUNT")?.unwrap_or(1).max(1) as u64;
    let bytes_per_element = bitpix.unsigned_abs() / 8;

    let size = pcount
        .checked_add(elements)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_element))
        .filter(|&n| n <= i64::MAX as u64 - BLOCK_SIZE as u64)
        .ok_or_else(|| anyhow::anyhow!("Data unit size overflows"))?;

    Ok(size)
}

/// Format FITS headers for display
pub fn format_fits_headers(headers: &FitsHeaders, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("FITS File: {}\n", headers.filename));
    output.push_str(&format!("HDUs: {}\n", headers.headers.len()));

    for header in &headers.headers {
        output.push_str(&format!("\nHDU {}", header.hdu_index));
        if let Some(ref name) = header.hdu_name {
            output.push_str(&format!(" ({})", name));
        }

        if verbose {
            output.push_str(" - All Keywords:\n");
            let mut sorted_keys: Vec<_> = header.keywords.iter().collect();
            sorted_keys.sort_by_key(|&(k, _)| k);
            for (key, value) in sorted_keys {
                output.push_str(&format!("  {:<16} = {}\n", key, truncate_string(value, 60)));
            }
            continue;
        }

        output.push_str(" - Calibration Keywords:\n");
        let mut found = 0;
        for key in CALIBRATION_KEYWORDS {
            if let Some(value) = header.keywords.get(*key) {
                output.push_str(&format!("  {:<16} = {}\n", key, truncate_string(value, 60)));
                found += 1;
            }
        }
        if found == 0 {
            output.push_str("  (none)\n");
        }
    }

    output
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn card(text: &str) -> String {
        format!("{:<80}", text)
    }

    /// Join cards and pad with spaces to whole blocks
    pub(crate) fn header_bytes(cards: &[&str]) -> Vec<u8> {
        let mut text: String = cards.iter().map(|c| card(c)).collect();
        text.push_str(&card("END"));
        let padded = text.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        let mut bytes = text.into_bytes();
        bytes.resize(padded, b' ');
        bytes
    }

    pub(crate) fn data_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes.resize(len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
        bytes
    }

    pub(crate) fn write_temp_fits(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hmi_pixel_{}_{}.fits",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Empty primary HDU followed by a compressed-image style extension
    pub(crate) fn compressed_hmi_file() -> Vec<u8> {
        let mut bytes = header_bytes(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
            "EXTEND  =                    T",
        ]);
        bytes.extend(header_bytes(&[
            "XTENSION= 'BINTABLE'           / binary table extension",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                    8",
            "NAXIS2  =                   16",
            "PCOUNT  =                 3000",
            "GCOUNT  =                    1",
            "TFIELDS =                    1",
            "EXTNAME = 'COMPRESSED_IMAGE'",
            "TELESCOP= 'SDO/HMI '           / Telescope",
            "INSTRUME= 'HMI_SIDE1'",
            "CDELT1  =             0.504295 / [arcsec/pixel] image scale in the x direction",
            "CDELT2  =             0.504295 / [arcsec/pixel] image scale in the y direction",
            "CUNIT2  = 'arcsec  '",
            "RSUN_REF=        6.96000000D+08 / [m] Reference radius of the Sun",
            "RSUN_OBS=           952.475708 / [arcsec] angular radius of Sun",
            "R_SUN   =          1888.735107 / [pixel] Radius of the Sun",
            "COMMENT This card is skipped",
        ]));
        bytes.extend(data_bytes(8 * 16 + 3000));
        bytes
    }

    #[test]
    fn test_parse_card_value() {
        assert_eq!(parse_card_value("             0.504295 / comment"), "0.504295");
        assert_eq!(parse_card_value("'SDO/HMI '           / Telescope"), "SDO/HMI");
        assert_eq!(parse_card_value("'O''HARA'"), "O'HARA");
        assert_eq!(parse_card_value("                   T"), "T");
    }

    #[test]
    fn test_parse_header_ignores_end_prefix_keywords() {
        let data = header_bytes(&[
            "SIMPLE  =                    T",
            "ENDTIME = '2024-01-01T00:00:00'",
            "CDELT2  =                  0.5",
        ]);
        let keywords = parse_fits_header(&data);
        assert_eq!(keywords.get("ENDTIME").map(String::as_str), Some("2024-01-01T00:00:00"));
        assert_eq!(keywords.get("CDELT2").map(String::as_str), Some("0.5"));
    }

    #[test]
    fn test_data_unit_size() {
        let keywords: HashMap<String, String> = [
            ("BITPIX", "-32"),
            ("NAXIS", "2"),
            ("NAXIS1", "4096"),
            ("NAXIS2", "4096"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(data_unit_size(&keywords).unwrap(), 4 * 4096 * 4096);
    }

    #[test]
    fn test_data_unit_size_overflow() {
        let keywords: HashMap<String, String> = [
            ("BITPIX", "8"),
            ("NAXIS", "2"),
            ("NAXIS1", "8"),
            ("NAXIS2", "1"),
            ("PCOUNT", "9223372036854775807"),
            ("GCOUNT", "4"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let err = data_unit_size(&keywords).unwrap_err();
        assert_eq!(err.to_string(), "Data unit size overflows");
    }

    #[test]
    fn test_read_headers_of_compressed_product() {
        let path = write_temp_fits("compressed", &compressed_hmi_file());
        let headers = read_fits_headers(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(headers.headers.len(), 2);
        assert!(headers.headers[0].keywords.get("CDELT2").is_none());

        let hdu = headers.find_calibration_hdu("CDELT2").unwrap();
        assert_eq!(hdu.hdu_index, 1);
        assert_eq!(hdu.hdu_name.as_deref(), Some("COMPRESSED_IMAGE"));
        assert_eq!(hdu.get("CDELT2"), Some(0.504295));
        assert_eq!(hdu.get("RSUN_REF"), Some(6.96e8));
        assert_eq!(hdu.keywords.get("TELESCOP").map(String::as_str), Some("SDO/HMI"));
        assert!(!hdu.keywords.contains_key("COMMENT"));
    }

    #[test]
    fn test_read_headers_rejects_non_fits() {
        let mut bytes = header_bytes(&["CDELT2  =                  0.5"]);
        bytes.truncate(BLOCK_SIZE);
        let path = write_temp_fits("not_fits", &bytes);
        let result = read_fits_headers(&path);
        std::fs::remove_file(&path).ok();
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Not a FITS file"), "{}", message);
    }

    #[test]
    fn test_read_headers_truncated() {
        let mut text: String = ["SIMPLE  =                    T", "BITPIX  =                    8"]
            .iter()
            .map(|c| card(c))
            .collect();
        text.push_str(&" ".repeat(BLOCK_SIZE - text.len()));
        let path = write_temp_fits("truncated", text.as_bytes());
        let result = read_fits_headers(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_format_fits_headers() {
        let path = write_temp_fits("format", &compressed_hmi_file());
        let headers = read_fits_headers(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let output = format_fits_headers(&headers, false);
        assert!(output.contains("HDUs: 2"));
        assert!(output.contains("HDU 1 (COMPRESSED_IMAGE) - Calibration Keywords:"));
        assert!(output.contains("CDELT2"));
        assert!(output.contains("(none)"));
        assert!(!output.contains("TFIELDS"));

        let verbose = format_fits_headers(&headers, true);
        assert!(verbose.contains("TFIELDS"));
    }
}
