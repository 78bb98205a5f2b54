//! The four fixed document sections.
//!
//! Each section is a pure function from invoice data to layout commands.
//! Assembly order is fixed: header, customer information, line-item table,
//! footer.

use crate::models::Invoice;
use crate::render::format::{format_currency, format_date};
use crate::render::layout::{
    rule, table_row, text, Align, Command, FontStyle, BODY_SIZE, COL_DESCRIPTION_X, MARGIN,
    ROW_HEIGHT, RULE_LEFT, RULE_RIGHT, TABLE_TOP, TITLE_SIZE,
};
use chrono::NaiveDate;

const COMPANY_NAME: &str = "Bluebird Supply Co.";
const COMPANY_STREET: &str = "123 Main Street";
const COMPANY_CITY_LINE: &str = "San Francisco, CA, 94103";
const PAYMENT_TERMS: &str =
    "Payment is due within 15 days. Thank you for your business.";

/// Branding block. Static content, no invoice data consulted.
pub fn header() -> Vec<Command> {
    vec![
        Command::Logo {
            x: MARGIN,
            y: 45.0,
            width: 50.0,
        },
        text(110.0, 57.0, TITLE_SIZE, FontStyle::Bold, Align::Left, COMPANY_NAME),
        text(RULE_RIGHT, 50.0, BODY_SIZE, FontStyle::Regular, Align::Right, COMPANY_NAME),
        text(RULE_RIGHT, 65.0, BODY_SIZE, FontStyle::Regular, Align::Right, COMPANY_STREET),
        text(RULE_RIGHT, 80.0, BODY_SIZE, FontStyle::Regular, Align::Right, COMPANY_CITY_LINE),
    ]
}

/// Invoice metadata on the left, bill-to block on the right.
///
/// The bill-to rows are only present when the inbound payload carried a
/// customer block.
pub fn customer_information(invoice: &Invoice, today: NaiveDate) -> Vec<Command> {
    let top = 200.0;
    let mut commands = vec![
        text(MARGIN, 160.0, TITLE_SIZE, FontStyle::Bold, Align::Left, "Invoice"),
        rule(185.0),
        text(MARGIN, top, BODY_SIZE, FontStyle::Regular, Align::Left, "Invoice Number:"),
        text(
            COL_DESCRIPTION_X,
            top,
            BODY_SIZE,
            FontStyle::Bold,
            Align::Left,
            &invoice.invoice_number,
        ),
        text(MARGIN, top + 15.0, BODY_SIZE, FontStyle::Regular, Align::Left, "Invoice Date:"),
        text(
            COL_DESCRIPTION_X,
            top + 15.0,
            BODY_SIZE,
            FontStyle::Regular,
            Align::Left,
            &format_date(today),
        ),
        text(MARGIN, top + 30.0, BODY_SIZE, FontStyle::Regular, Align::Left, "Balance Due:"),
        text(
            COL_DESCRIPTION_X,
            top + 30.0,
            BODY_SIZE,
            FontStyle::Regular,
            Align::Left,
            &format_currency(invoice.balance_due()),
        ),
    ];

    if let Some(customer) = &invoice.customer {
        let right_x = 300.0;
        commands.extend([
            text(right_x, top, BODY_SIZE, FontStyle::Bold, Align::Left, &customer.company_name),
            text(
                right_x,
                top + 15.0,
                BODY_SIZE,
                FontStyle::Regular,
                Align::Left,
                &customer.customer_name,
            ),
            text(
                right_x,
                top + 30.0,
                BODY_SIZE,
                FontStyle::Regular,
                Align::Left,
                &customer.address_street,
            ),
            text(
                right_x,
                top + 45.0,
                BODY_SIZE,
                FontStyle::Regular,
                Align::Left,
                &format!("{}, {}, {}", customer.city, customer.postcode, customer.country),
            ),
        ]);
    }

    commands.push(rule(252.0));
    commands
}

/// Header row, per-item rows each followed by a rule, then the three
/// summary rows (no rules): Subtotal, Paid To Date, bold Balance Due.
pub fn line_item_table(invoice: &Invoice) -> Vec<Command> {
    let mut commands = table_row(
        TABLE_TOP,
        FontStyle::Bold,
        "Item",
        "Description",
        "Unit Cost",
        "Quantity",
        "Line Total",
    );
    commands.push(rule(TABLE_TOP + 20.0));

    for (i, item) in invoice.items.iter().enumerate() {
        let position = TABLE_TOP + (i as f64 + 1.0) * ROW_HEIGHT;
        commands.extend(table_row(
            position,
            FontStyle::Regular,
            &item.product_code,
            &item.line_description,
            &format_currency(item.unit_cost()),
            &item.quantity.to_string(),
            &format_currency(item.line_total()),
        ));
        commands.push(rule(position + 20.0));
    }

    let subtotal_position = TABLE_TOP + (invoice.items.len() as f64 + 1.0) * ROW_HEIGHT;
    commands.extend(summary_row(
        subtotal_position,
        FontStyle::Regular,
        "Subtotal",
        &format_currency(invoice.subtotal),
    ));
    commands.extend(summary_row(
        subtotal_position + 20.0,
        FontStyle::Regular,
        "Paid To Date",
        &format_currency(invoice.paid),
    ));
    commands.extend(summary_row(
        subtotal_position + 45.0,
        FontStyle::Bold,
        "Balance Due",
        &format_currency(invoice.balance_due()),
    ));
    commands
}

fn summary_row(y: f64, style: FontStyle, label: &str, amount: &str) -> Vec<Command> {
    use crate::render::layout::COL_QUANTITY_RIGHT;
    vec![
        text(COL_QUANTITY_RIGHT, y, BODY_SIZE, style, Align::Right, label),
        text(RULE_RIGHT, y, BODY_SIZE, style, Align::Right, amount),
    ]
}

/// Fixed payment-terms notice near the page bottom.
pub fn footer() -> Vec<Command> {
    let center = (RULE_LEFT + RULE_RIGHT) / 2.0;
    vec![text(
        center,
        780.0,
        BODY_SIZE,
        FontStyle::Regular,
        Align::Center,
        PAYMENT_TERMS,
    )]
}
