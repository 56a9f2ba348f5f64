//! Token and box primitives shared by the OCR adapter and the extractors.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in absolute pixel coordinates.
///
/// `(x1, y1)` is the top-left corner, `(x2, y2)` the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a box from Tesseract-style `left, top, width, height`.
    pub const fn from_ltwh(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Keeps the left `fraction` of the box width.
    ///
    /// The covered width is truncated towards zero, so a 100px box with a
    /// fraction of 0.65 yields a 65px mask.
    pub fn mask_left(&self, fraction: f64) -> Self {
        // epsilon absorbs binary representation error (0.65 * 100 = 64.999..)
        let covered = (fraction * self.width() as f64 + 1e-9).trunc() as i32;
        Self::new(self.x1, self.y1, self.x1 + covered, self.y2)
    }

    /// Upper half of the box, used for QR codes.
    pub fn top_half(&self) -> Self {
        Self::new(self.x1, self.y1, self.x2, (self.y1 + self.y2) / 2)
    }

    /// Box spanning from the top-left of `self` to the bottom-right of `last`.
    pub fn span_to(&self, last: &BBox) -> Self {
        Self::new(self.x1, self.y1, last.x2, last.y2)
    }

    /// Box covering the top 80% of an image, used when a document is rejected.
    pub fn rejection_cover(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, (height as f64 * 0.8) as i32)
    }
}

/// Single recognised fragment with its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub bbox: BBox,
    pub text: String,
}

impl OcrToken {
    pub fn new(bbox: BBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }
}

/// OCR output for one image: word tokens in reading order plus the text
/// block split into lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub tokens: Vec<OcrToken>,
    pub lines: Vec<String>,
}

impl OcrPage {
    /// Creates a page, dropping blank tokens and empty lines.
    pub fn new(tokens: Vec<OcrToken>, lines: Vec<String>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter_map(|t| {
                let text = t.text.trim();
                (!text.is_empty()).then(|| OcrToken::new(t.bbox, text))
            })
            .collect();
        let lines = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self { tokens, lines }
    }

    /// Lays text rows out on a fixed grid: each word is 100x30, words are
    /// 120px apart and rows 40px apart. Each row is also a line.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut tokens = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            for (col, word) in line.split_whitespace().enumerate() {
                let (x, y) = (col as i32 * 120, row as i32 * 40);
                tokens.push(OcrToken::new(BBox::new(x, y, x + 100, y + 30), word));
            }
        }
        Self::new(tokens, rows.iter().map(|r| r.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.lines.is_empty()
    }

    /// All texts the classifier looks at: token texts followed by lines.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .chain(self.lines.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_rows_uses_grid() {
        let page = OcrPage::from_rows(&["GOVERNMENT OF INDIA", "", "1234"]);
        assert_eq!(page.tokens.len(), 4);
        assert_eq!(page.tokens[2].bbox, BBox::new(240, 0, 340, 30));
        assert_eq!(page.tokens[3].bbox, BBox::new(0, 80, 100, 110));
        assert_eq!(page.lines, vec!["GOVERNMENT OF INDIA", "1234"]);
    }

    #[test]
    fn test_mask_left_truncates() {
        let b = BBox::new(100, 10, 200, 30);
        assert_eq!(b.mask_left(0.65), BBox::new(100, 10, 165, 30));
        assert_eq!(b.mask_left(0.35), BBox::new(100, 10, 135, 30));

        let odd = BBox::new(0, 0, 37, 5);
        // 0.5 * 37 = 18.5
        assert_eq!(odd.mask_left(0.5).x2, 18);
    }

    #[test]
    fn test_top_half_and_rejection_cover() {
        let qr = BBox::new(10, 20, 110, 121);
        assert_eq!(qr.top_half(), BBox::new(10, 20, 110, 70));
        assert_eq!(BBox::rejection_cover(640, 480), BBox::new(0, 0, 640, 384));
        assert_eq!(BBox::rejection_cover(10, 7).y2, 5);
    }

    #[test]
    fn test_page_drops_blank_tokens() {
        let page = OcrPage::new(
            vec![
                OcrToken::new(BBox::from_ltwh(0, 0, 10, 10), "  "),
                OcrToken::new(BBox::from_ltwh(10, 0, 10, 10), " INDIA "),
            ],
            vec!["".into(), "  GOVT OF INDIA ".into()],
        );
        assert_eq!(page.tokens.len(), 1);
        assert_eq!(page.tokens[0].text, "INDIA");
        assert_eq!(page.lines, vec!["GOVT OF INDIA".to_string()]);
        assert_eq!(page.texts().count(), 2);
    }
}
