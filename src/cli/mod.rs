//! ASCII table rendering for the interactive CLI.

const MAX_COL_WIDTH: usize = 60; // cap to keep output readable

/// Render rows as an ASCII table with a header. Returns false (printing
/// nothing) when there are no rows, so callers can fall back to a message.
pub fn print_table(columns: &[&str], rows: &[Vec<String>]) -> bool {
    if rows.is_empty() {
        return false;
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len().min(MAX_COL_WIDTH)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            let w = display_len(cell);
            if w > widths[i] {
                widths[i] = w.min(MAX_COL_WIDTH);
            }
        }
    }

    let sep = build_separator(&widths);
    let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    println!("{}", sep);
    println!("{}", build_row(&header, &widths));
    println!("{}", sep);
    for row in rows {
        println!("{}", build_row(row, &widths));
    }
    println!("{}", sep);
    println!("rows: {}", rows.len());
    true
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let align_right = is_numeric_like(&cell);
        s.push(' ');
        if align_right {
            let pad = w.saturating_sub(display_len(&text));
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            let pad = w.saturating_sub(display_len(&text));
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning numbers to the right
    let st = s.trim();
    if st.is_empty() {
        return false;
    }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() {
            has_digit = true;
            continue;
        }
        if ".-+eE,_".contains(ch) {
            continue;
        }
        return false;
    }
    has_digit
}
