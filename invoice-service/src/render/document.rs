//! Command-list execution against the PDF engine.

use crate::models::Invoice;
use crate::render::layout::{
    text_width, Align, Command, FontStyle, PAGE_HEIGHT, PAGE_WIDTH, RULE_LEFT, RULE_RIGHT,
};
use crate::render::sections;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Pt, Rgb,
};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("logo asset unavailable: {0}")]
    Logo(String),

    #[error("pdf engine error: {0}")]
    Engine(String),

    #[error("render task aborted: {0}")]
    Aborted(String),
}

/// Layout coordinates are f64; the engine's unit types are f32. All
/// conversion happens here, at the boundary.
fn pt(value: f64) -> Mm {
    Mm::from(Pt(value as f32))
}

/// Build the full command list for one invoice, dated today.
pub fn assemble(invoice: &Invoice) -> Vec<Command> {
    let today = chrono::Local::now().date_naive();
    let mut commands = sections::header();
    commands.extend(sections::customer_information(invoice, today));
    commands.extend(sections::line_item_table(invoice));
    commands.extend(sections::footer());
    commands
}

/// Render one invoice onto a single A4 page and return the document bytes.
pub fn render_invoice(invoice: &Invoice, logo: &[u8]) -> Result<Vec<u8>, RenderError> {
    let commands = assemble(invoice);

    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", invoice.invoice_number),
        pt(PAGE_WIDTH),
        pt(PAGE_HEIGHT),
        "invoice",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Engine(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Engine(e.to_string()))?;

    // #444444 text, #aaaaaa rules, matching the upstream layout.
    layer.set_fill_color(Color::Rgb(Rgb::new(0.266, 0.266, 0.266, None)));
    layer.set_outline_color(Color::Rgb(Rgb::new(0.667, 0.667, 0.667, None)));
    layer.set_outline_thickness(1.0);

    for command in &commands {
        run_command(&layer, &regular, &bold, logo, command)?;
    }

    doc.save_to_bytes()
        .map_err(|e| RenderError::Engine(e.to_string()))
}

fn run_command(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    logo: &[u8],
    command: &Command,
) -> Result<(), RenderError> {
    match command {
        Command::Text {
            x,
            y,
            size,
            style,
            align,
            text,
        } => {
            let width = text_width(text, *style, *size);
            let left = match align {
                Align::Left => *x,
                Align::Right => *x - width,
                Align::Center => *x - width / 2.0,
            };
            // Command y is the top of the line; the baseline sits one em
            // below it.
            let baseline = PAGE_HEIGHT - (y + size);
            let font = match style {
                FontStyle::Regular => regular,
                FontStyle::Bold => bold,
            };
            layer.use_text(text.clone(), *size as f32, pt(left), pt(baseline), font);
        }
        Command::Rule { y } => {
            let pdf_y = PAGE_HEIGHT - y;
            let line = Line {
                points: vec![
                    (Point::new(pt(RULE_LEFT), pt(pdf_y)), false),
                    (Point::new(pt(RULE_RIGHT), pt(pdf_y)), false),
                ],
                is_closed: false,
            };
            layer.add_line(line);
        }
        Command::Logo { x, y, width } => {
            let decoder = PngDecoder::new(Cursor::new(logo))
                .map_err(|e| RenderError::Logo(e.to_string()))?;
            let image = Image::try_from(decoder).map_err(|e| RenderError::Logo(e.to_string()))?;

            let px_width = image.image.width.0 as f64;
            let px_height = image.image.height.0 as f64;
            let scale = width / px_width;
            // At 72 dpi one pixel is one point, so the scale factor maps
            // pixels straight to the requested point width.
            image.add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(pt(*x)),
                    translate_y: Some(pt(PAGE_HEIGHT - y - px_height * scale)),
                    scale_x: Some(scale as f32),
                    scale_y: Some(scale as f32),
                    dpi: Some(72.0),
                    ..Default::default()
                },
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Correlation, LineItem};
    use rust_decimal::Decimal;

    fn sample_invoice() -> Invoice {
        Invoice {
            items: vec![LineItem {
                product_code: "A1".to_string(),
                line_description: "Widget".to_string(),
                item_cost: Decimal::from(10),
                quantity: 2,
            }],
            subtotal: Decimal::from(20),
            paid: Decimal::ZERO,
            invoice_number: "INV-001".to_string(),
            correlation: Correlation::RecordId("rec123".to_string()),
            customer: None,
        }
    }

    #[test]
    fn rendered_bytes_carry_the_pdf_signature() {
        let logo = std::fs::read("assets/logo.png").unwrap();
        let bytes = render_invoice(&sample_invoice(), &logo).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn customer_invoice_renders_every_command_kind() {
        let logo = std::fs::read("assets/logo.png").unwrap();
        let mut invoice = sample_invoice();
        invoice.customer = Some(crate::models::CustomerInfo {
            company_name: "Globex Ltd".to_string(),
            customer_name: "Jane Smith".to_string(),
            address_street: "42 High Street".to_string(),
            city: "Leeds".to_string(),
            postcode: "LS1 4AP".to_string(),
            country: "UK".to_string(),
            opp_id: "opp789".to_string(),
            invoice_number: "INV-042".to_string(),
        });

        let bytes = render_invoice(&invoice, &logo).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn garbage_logo_is_a_logo_error() {
        let err = render_invoice(&sample_invoice(), b"not a png").unwrap_err();
        assert!(matches!(err, RenderError::Logo(_)));
    }

    #[test]
    fn rendering_twice_yields_the_same_totals() {
        let invoice = sample_invoice();
        let first = assemble(&invoice);
        let second = assemble(&invoice);
        // Same date within one test run, so the command lists match.
        assert_eq!(first, second);
    }
}
