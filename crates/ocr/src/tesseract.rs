//! Tesseract OCR engine (CLI wrapper)

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use ocrr_core::{BBox, OcrPage, OcrToken};
use serde::{Deserialize, Serialize};

use crate::{command, OcrEngine, OcrError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TesseractConfig {
    pub binary_path: Option<String>,
    pub tessdata_path: Option<String>,
    pub lang: String,
    /// Page segmentation mode; 11 finds sparse text in any order.
    pub psm: u8,
    pub oem: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            tessdata_path: None,
            lang: "eng".to_string(),
            psm: 11,
            oem: 3,
        }
    }
}

impl TesseractConfig {
    pub fn binary(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }
}

pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
}

impl TesseractEngine {
    /// Creates the engine after checking that the binary runs.
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let version = get_tesseract_version(config.binary())?;
        log::info!("[Tesseract] ready, version {}", version);
        Ok(Self { config, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize_file(&self, image_path: &Path) -> Result<OcrPage, OcrError> {
        self.run(image_path, None)
    }

    fn recognize_file_until(&self, image_path: &Path, deadline: Instant) -> Result<OcrPage, OcrError> {
        self.run(image_path, Some(deadline))
    }
}

impl TesseractEngine {
    fn run(&self, image_path: &Path, deadline: Option<Instant>) -> Result<OcrPage, OcrError> {
        let start = Instant::now();

        let mut cmd = Command::new(self.config.binary());
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.lang)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("--oem")
            .arg(self.config.oem.to_string())
            .arg("tsv");

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::debug!(
            "[Tesseract] running: {} {} -l {} --psm {} --oem {} tsv",
            self.config.binary(),
            image_path.display(),
            self.config.lang,
            self.config.psm,
            self.config.oem
        );

        let output = command::output_until(&mut cmd, deadline)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!("tesseract failed: {}", stderr.trim())));
        }

        let page = parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout));

        log::info!(
            "[Tesseract] {} recognised in {} ms: {} tokens, {} lines",
            image_path.display(),
            start.elapsed().as_millis(),
            page.tokens.len(),
            page.lines.len()
        );

        Ok(page)
    }
}

/// Parses Tesseract TSV output.
///
/// Columns:
/// level, page_num, block_num, par_num, line_num, word_num, left, top,
/// width, height, conf, text
///
/// Word rows (level 5) become tokens with absolute boxes; words sharing a
/// (block, paragraph, line) key are joined into one text line, in order of
/// first appearance.
pub fn parse_tesseract_tsv(tsv: &str) -> OcrPage {
    let mut tokens = Vec::new();
    let mut line_order: Vec<(u32, u32, u32)> = Vec::new();
    let mut line_words: HashMap<(u32, u32, u32), Vec<String>> = HashMap::new();

    // skip header
    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        let num = |i: usize| cols[i].parse::<i32>().unwrap_or(0);
        let bbox = BBox::from_ltwh(num(6), num(7), num(8), num(9));
        tokens.push(OcrToken::new(bbox, text));

        let key = (num(2) as u32, num(3) as u32, num(4) as u32);
        line_words
            .entry(key)
            .or_insert_with(|| {
                line_order.push(key);
                Vec::new()
            })
            .push(text.to_string());
    }

    let lines = line_order
        .iter()
        .filter_map(|key| line_words.get(key))
        .map(|words| words.join(" "))
        .collect();

    OcrPage::new(tokens, lines)
}

/// Tesseract version string.
pub fn get_tesseract_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::EngineUnavailable(format!("cannot run {}: {}", binary_path, e)))?;

    if !output.status.success() {
        return Err(OcrError::EngineUnavailable(
            "tesseract --version failed".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    // "tesseract 5.3.0" or "tesseract v5.3.0" on the first line
    for line in combined.lines() {
        if line.contains("tesseract") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                return Ok(parts[1].trim_start_matches('v').to_string());
            }
        }
    }

    Ok("unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(level: u8, block: u8, line: u8, word: u8, ltwh: [i32; 4], conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t{}\t1\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            level, block, line, word, ltwh[0], ltwh[1], ltwh[2], ltwh[3], conf, text
        )
    }

    #[test]
    fn test_parse_words_and_lines() {
        let tsv = [
            HEADER.to_string(),
            row(1, 0, 0, 0, [0, 0, 800, 600], -1.0, ""),
            row(4, 1, 1, 0, [10, 10, 300, 30], -1.0, ""),
            row(5, 1, 1, 1, [10, 10, 100, 30], 96.0, "INCOME"),
            row(5, 1, 1, 2, [120, 10, 60, 30], 95.5, "TAX"),
            row(5, 2, 1, 1, [10, 80, 200, 30], 91.0, "ABCDE1234F"),
            row(5, 2, 1, 2, [220, 80, 20, 30], 12.0, "  "),
            row(5, 1, 2, 1, [10, 40, 150, 30], 90.0, "DEPARTMENT"),
        ]
        .join("\n");

        let page = parse_tesseract_tsv(&tsv);
        let texts: Vec<_> = page.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["INCOME", "TAX", "ABCDE1234F", "DEPARTMENT"]);
        assert_eq!(page.tokens[1].bbox, BBox::new(120, 10, 180, 40));
        assert_eq!(page.lines, ["INCOME TAX", "ABCDE1234F", "DEPARTMENT"]);
    }

    #[test]
    fn test_parse_skips_malformed_rows() {
        let tsv = format!("{}\nnot\ta\trow\n5\t1", HEADER);
        assert!(parse_tesseract_tsv(&tsv).is_empty());
        assert!(parse_tesseract_tsv("").is_empty());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let err = TesseractEngine::new(TesseractConfig {
            binary_path: Some("/nonexistent/tesseract-binary".into()),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, OcrError::EngineUnavailable(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config: TesseractConfig = serde_json::from_str(r#"{"lang":"eng+hin"}"#).unwrap();
        assert_eq!(config.lang, "eng+hin");
        assert_eq!(config.psm, 11);
        assert_eq!(config.oem, 3);
        assert_eq!(config.binary(), "tesseract");
    }
}
