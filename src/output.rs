use crate::schema::ColumnDescriptor;
use terminal_size::{terminal_size, Width};

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";
pub const GRAY: &str = "\x1b[90m";

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const MIN_CELL_WIDTH: usize = 8;
const MAX_CELL_WIDTH: usize = 48;
const COLUMN_GAP: &str = "  ";

fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
}

pub fn print_header(title: &str) {
    println!("{CYAN}{BOLD}{}{RESET}", title);
    println!("{GRAY}{}{RESET}", "─".repeat(title.chars().count().max(3)));
}

pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

pub fn print_warning(msg: &str) {
    println!("{YELLOW}Warning:{RESET} {}", msg);
}

pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

/// Print a dimmed `(N item(s))` footer.
pub fn print_count(count: usize, noun: &str) {
    println!(
        "{GRAY}({} {}{}){RESET}",
        count,
        noun,
        if count == 1 { "" } else { "s" }
    );
}

// ============================================================================
// Tables
// ============================================================================

/// Shorten `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = single_line.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Widest a cell may be so that `columns` cells fit in `total` characters.
fn cell_width_limit(columns: usize, total: usize) -> usize {
    if columns == 0 {
        return MAX_CELL_WIDTH;
    }
    let gaps = COLUMN_GAP.len() * columns.saturating_sub(1);
    (total.saturating_sub(gaps) / columns).clamp(MIN_CELL_WIDTH, MAX_CELL_WIDTH)
}

/// Render a plain-text table. Header labels come from the column
/// descriptors; each row holds one cell per column.
pub fn format_table(columns: &[ColumnDescriptor], rows: &[Vec<String>], total_width: usize) -> String {
    let limit = cell_width_limit(columns.len(), total_width);
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| c.label.chars().count().min(limit))
        .collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count().min(limit));
        }
    }

    let mut out = String::new();
    out.push_str(&render_row(columns.iter().map(|c| c.label.as_str()), &widths));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", truncate(cell, width)))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}

pub fn print_table(columns: &[ColumnDescriptor], rows: &[Vec<String>]) {
    let table = format_table(columns, rows, terminal_width());
    let mut lines = table.lines();
    if let Some(header) = lines.next() {
        println!("{BOLD}{}{RESET}", header);
    }
    for line in lines {
        println!("{}", line);
    }
}

/// Bar for a score in `[0, 1]`; out-of-range scores are clamped.
pub fn make_score_bar(score: f64, width: usize) -> String {
    if score.is_nan() {
        return " ".repeat(width);
    }
    let filled = ((score.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!(
        "{GREEN}{}{RESET}{GRAY}{}{RESET}",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(labels: &[&str]) -> Vec<ColumnDescriptor> {
        labels.iter().map(|l| ColumnDescriptor::new(l.to_lowercase(), *l)).collect()
    }

    // ========================================================================
    // Truncation
    // ========================================================================

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn test_truncate_marks_cut() {
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_truncate_flattens_newlines() {
        assert_eq!(truncate("a\nb", 10), "a b");
    }

    #[test]
    fn test_cell_width_limit_bounds() {
        assert_eq!(cell_width_limit(1, 1000), MAX_CELL_WIDTH);
        assert_eq!(cell_width_limit(20, 40), MIN_CELL_WIDTH);
        assert_eq!(cell_width_limit(0, 80), MAX_CELL_WIDTH);
    }

    // ========================================================================
    // Tables
    // ========================================================================

    #[test]
    fn test_format_table_aligns_columns() {
        let table = format_table(
            &columns(&["ID", "Score"]),
            &[
                vec!["r1".to_string(), "0.50".to_string()],
                vec!["run-22".to_string(), "1".to_string()],
            ],
            80,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines, vec!["ID      Score", "r1      0.50", "run-22  1"]);
    }

    #[test]
    fn test_format_table_truncates_wide_cells() {
        let long = "x".repeat(200);
        let table = format_table(&columns(&["Input"]), &[vec![long]], 80);
        let row = table.lines().nth(1).unwrap();
        assert_eq!(row.chars().count(), MAX_CELL_WIDTH);
        assert!(row.ends_with('…'));
    }

    #[test]
    fn test_format_table_without_rows() {
        assert_eq!(format_table(&columns(&["ID"]), &[], 80), "ID\n");
    }

    #[test]
    fn test_print_table_no_panic() {
        print_table(&columns(&["ID"]), &[vec!["a".to_string()]]);
    }

    // ========================================================================
    // Score bars
    // ========================================================================

    #[test]
    fn test_make_score_bar() {
        let full = make_score_bar(1.0, 10);
        assert_eq!(full.matches('█').count(), 10);
        let half = make_score_bar(0.5, 10);
        assert_eq!(half.matches('█').count(), 5);
        assert_eq!(half.matches('░').count(), 5);
        let over = make_score_bar(3.0, 4);
        assert_eq!(over.matches('█').count(), 4);
        assert_eq!(make_score_bar(f64::NAN, 4), "    ");
    }
}
