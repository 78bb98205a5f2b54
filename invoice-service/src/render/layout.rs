//! Page layout as data.
//!
//! Sections build a flat list of [`Command`]s; the document engine executes
//! them. Keeping layout as data keeps every coordinate decision testable
//! without touching the PDF engine, and leaves room to add pagination by
//! rewriting the command list instead of the sections.
//!
//! All coordinates are PDF points measured from the top-left of the page,
//! matching the upstream layout. The constants bake in A4 at 50 pt margins;
//! there is no pagination, so item counts that do not fit run past the
//! footer.

/// A4 portrait, in points.
pub const PAGE_WIDTH: f64 = 595.28;
pub const PAGE_HEIGHT: f64 = 841.89;
pub const MARGIN: f64 = 50.0;

/// Horizontal rules and the line-total column end here.
pub const RULE_LEFT: f64 = 50.0;
pub const RULE_RIGHT: f64 = 550.0;

/// Line-item table geometry.
pub const TABLE_TOP: f64 = 330.0;
pub const ROW_HEIGHT: f64 = 30.0;
pub const COL_ITEM_X: f64 = 50.0;
pub const COL_DESCRIPTION_X: f64 = 150.0;
/// Right edges of the two fixed-width right-aligned columns.
pub const COL_UNIT_COST_RIGHT: f64 = 370.0;
pub const COL_QUANTITY_RIGHT: f64 = 460.0;

pub const BODY_SIZE: f64 = 10.0;
pub const TITLE_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

/// How the `x` coordinate of a text command is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// `x` is the left edge of the text.
    Left,
    /// `x` is the right edge of the text.
    Right,
    /// `x` is the horizontal center of the text.
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text {
        x: f64,
        y: f64,
        size: f64,
        style: FontStyle,
        align: Align,
        text: String,
    },
    /// Fixed-width horizontal rule at the given vertical offset.
    Rule { y: f64 },
    /// Logo image, scaled to `width` points.
    Logo { x: f64, y: f64, width: f64 },
}

pub fn text(x: f64, y: f64, size: f64, style: FontStyle, align: Align, text: &str) -> Command {
    Command::Text {
        x,
        y,
        size,
        style,
        align,
        text: text.to_string(),
    }
}

pub fn rule(y: f64) -> Command {
    Command::Rule { y }
}

/// Five-column table row: item, description, unit cost, quantity, line
/// total. Unit cost and quantity are right-aligned within their fixed
/// columns; line total is right-aligned to the table's right edge.
pub fn table_row(
    y: f64,
    style: FontStyle,
    item: &str,
    description: &str,
    unit_cost: &str,
    quantity: &str,
    line_total: &str,
) -> Vec<Command> {
    vec![
        text(COL_ITEM_X, y, BODY_SIZE, style, Align::Left, item),
        text(COL_DESCRIPTION_X, y, BODY_SIZE, style, Align::Left, description),
        text(COL_UNIT_COST_RIGHT, y, BODY_SIZE, style, Align::Right, unit_cost),
        text(COL_QUANTITY_RIGHT, y, BODY_SIZE, style, Align::Right, quantity),
        text(RULE_RIGHT, y, BODY_SIZE, style, Align::Right, line_total),
    ]
}

/// Width of `text` at `size` points, from the standard AFM advance widths
/// (1000 units per em). Characters outside printable ASCII fall back to the
/// width of a digit.
pub fn text_width(text: &str, style: FontStyle, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| advance_units(c, style)).sum();
    units as f64 * size / 1000.0
}

fn advance_units(c: char, style: FontStyle) -> u32 {
    let table = match style {
        FontStyle::Regular => &HELVETICA_WIDTHS,
        FontStyle::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let code = c as u32;
    if (0x20..=0x7e).contains(&code) {
        table[(code - 0x20) as usize] as u32
    } else {
        556
    }
}

/// Helvetica advance widths for U+0020..U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // A..P
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // Q..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // a..p
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // q..z
    334, 260, 334, 584, // {..~
];

/// Helvetica-Bold advance widths for U+0020..U+007E.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // sp..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, // A..P
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // Q..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, // a..p
    611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // q..z
    389, 280, 389, 584, // {..~
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_share_one_width() {
        let ten = text_width("10", FontStyle::Regular, 10.0);
        let ninety_nine = text_width("99", FontStyle::Regular, 10.0);
        assert_eq!(ten, ninety_nine);
        assert!((ten - 11.12).abs() < 0.01);
    }

    #[test]
    fn bold_runs_wider_than_regular() {
        let regular = text_width("Balance Due", FontStyle::Regular, 10.0);
        let bold = text_width("Balance Due", FontStyle::Bold, 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn table_row_pins_columns() {
        let row = table_row(330.0, FontStyle::Regular, "A1", "Widget", "$5", "2", "$10");
        assert_eq!(row.len(), 5);
        assert!(matches!(
            &row[0],
            Command::Text { x, align: Align::Left, .. } if *x == COL_ITEM_X
        ));
        assert!(matches!(
            &row[2],
            Command::Text { x, align: Align::Right, .. } if *x == COL_UNIT_COST_RIGHT
        ));
        assert!(matches!(
            &row[4],
            Command::Text { x, align: Align::Right, .. } if *x == RULE_RIGHT
        ));
    }
}
