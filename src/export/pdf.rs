//! Minimal single-font PDF writer for tabular exports.

use std::fmt::Write as _;

const PAGE_WIDTH: u32 = 842;
const PAGE_HEIGHT: u32 = 595;
const MARGIN: u32 = 30;
const FONT_SIZE: u32 = 6;
const LEADING: u32 = 8;
const COLUMN_GAP: usize = 2;

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize
}

/// Courier glyphs are 0.6 em wide.
fn chars_per_line() -> usize {
    ((PAGE_WIDTH - 2 * MARGIN) as f32 / (FONT_SIZE as f32 * 0.6)) as usize
}

/// Renders rows as a fixed-width table across landscape A4 pages.
pub(super) fn write_table(rows: &[Vec<String>]) -> Vec<u8> {
    let lines = layout(rows);
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(lines_per_page()).collect()
    };

    // 1 catalog, 2 page tree, 3 font, then a page and its content stream per page
    let mut objects = Vec::with_capacity(3 + pages.len() * 2);
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>".to_string());

    for (i, page) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            5 + 2 * i
        ));
        let stream = content_stream(page);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
    }

    let xref_at = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(out, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );

    out.into_bytes()
}

/// Pads every cell to a shared column width that fits the page.
fn layout(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }
    let cap = (chars_per_line().saturating_sub(COLUMN_GAP * (columns - 1)) / columns).max(1);

    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .min(cap)
        })
        .collect();

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (c, width) in widths.iter().enumerate() {
                let cell = row.get(c).map(String::as_str).unwrap_or("");
                let clipped: String = cell.chars().take(*width).collect();
                let _ = write!(line, "{:<w$}", clipped, w = *width);
                if c + 1 < columns {
                    line.push_str(&" ".repeat(COLUMN_GAP));
                }
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn content_stream(lines: &[String]) -> String {
    let mut s = format!(
        "BT\n/F1 {} Tf\n{} TL\n{} {} Td\n",
        FONT_SIZE,
        LEADING,
        MARGIN,
        PAGE_HEIGHT - MARGIN - LEADING
    );
    for line in lines {
        let _ = writeln!(s, "({}) Tj T*", escape(line));
    }
    s.push_str("ET");
    s
}

/// Escapes a PDF literal string; anything outside printable ASCII becomes `?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_delimiters_and_non_ascii() {
        assert_eq!(escape("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape("café"), "caf?");
    }

    #[test]
    fn long_tables_span_pages() {
        let rows: Vec<Vec<String>> = (0..150).map(|i| vec![format!("row {}", i)]).collect();
        let pdf = String::from_utf8(write_table(&rows)).unwrap();
        assert!(pdf.contains(&format!("/Count {}", 150usize.div_ceil(lines_per_page()))));
        assert!(pdf.contains("(row 149) Tj"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = write_table(&[vec!["pr_number".into(), "title".into()]]);
        let text = String::from_utf8(pdf.clone()).unwrap();
        let xref = text.find("xref\n").unwrap();
        let first_entry = text[xref..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }

    #[test]
    fn empty_input_still_produces_a_page() {
        let pdf = String::from_utf8(write_table(&[])).unwrap();
        assert!(pdf.contains("/Count 1"));
    }
}
