//! Terminal display width helpers.
//!
//! Labels may carry ANSI styling, so escapes are stripped before the width is
//! computed. Measurement and rendering both go through [`display_width`] so a
//! measured command always occupies the cells the renderer gives it.

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Display width clamped into the `u16` cell range used by layout.
pub fn cell_width(text: &str) -> u16 {
    display_width(text).min(u16::MAX as usize) as u16
}

/// Truncate or pad `text` so it occupies exactly `width` cells.
pub fn fit_to_width(text: &str, width: u16) -> String {
    let mut fitted = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width as usize {
            break;
        }
        fitted.push(ch);
        used += ch_width;
    }
    while used < width as usize {
        fitted.push(' ');
        used += 1;
    }
    fitted
}
