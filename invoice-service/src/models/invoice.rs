//! Invoice record parsed from an inbound platform event.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload field {0} is missing or not a string")]
    MissingField(&'static str),

    #[error("embedded JSON in {field}: {source}")]
    Json {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("line item {0} has zero quantity")]
    ZeroQuantity(String),
}

/// One invoiced product/service entry.
///
/// `item_cost` carries whatever the CRM sent. The upstream flow treats it as
/// a line total: the displayed unit cost is `item_cost / quantity` and the
/// subtotal still multiplies by quantity. Preserved as-is until product
/// confirms which one `itemCost` is meant to be.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_code: String,
    pub line_description: String,
    pub item_cost: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn unit_cost(&self) -> Decimal {
        self.item_cost / Decimal::from(self.quantity)
    }

    pub fn line_total(&self) -> Decimal {
        self.item_cost
    }
}

/// Bill-to block carried by the variant payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub company_name: String,
    pub customer_name: String,
    pub address_street: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
    pub opp_id: String,
    pub invoice_number: String,
}

/// Identifier linking the response event back to the originating record.
///
/// The outbound field name follows the inbound payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    RecordId(String),
    OppId(String),
}

impl Correlation {
    pub fn field_name(&self) -> &'static str {
        match self {
            Correlation::RecordId(_) => "Related_Object_Id__c",
            Correlation::OppId(_) => "Related_OppId__c",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Correlation::RecordId(id) => id,
            Correlation::OppId(id) => id,
        }
    }
}

/// In-memory invoice, rebuilt from scratch for every inbound event.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub paid: Decimal,
    pub invoice_number: String,
    pub correlation: Correlation,
    pub customer: Option<CustomerInfo>,
}

impl Invoice {
    /// Decode an inbound event payload.
    ///
    /// Two shapes exist: the base payload carries one embedded JSON array in
    /// `Invoice_Line_Item_JSON__c` plus top-level correlation fields; the
    /// variant carries `Customer_Information__c` and
    /// `Line_Item_Information__c`, with correlation inside the customer
    /// block.
    pub fn from_payload(payload: &Value) -> Result<Self, ParseError> {
        let items_json = if payload.get("Customer_Information__c").is_some() {
            str_field(payload, "Line_Item_Information__c")?
        } else {
            str_field(payload, "Invoice_Line_Item_JSON__c")?
        };

        let items: Vec<LineItem> =
            serde_json::from_str(items_json).map_err(|source| ParseError::Json {
                field: "line items",
                source,
            })?;

        // Unit cost divides by quantity later, so a zero here is rejected
        // up front instead of blowing up mid-render.
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(ParseError::ZeroQuantity(item.product_code.clone()));
        }

        let customer = match payload.get("Customer_Information__c") {
            Some(_) => {
                let raw = str_field(payload, "Customer_Information__c")?;
                let info: CustomerInfo =
                    serde_json::from_str(raw).map_err(|source| ParseError::Json {
                        field: "customer information",
                        source,
                    })?;
                Some(info)
            }
            None => None,
        };

        let (invoice_number, correlation) = match &customer {
            Some(info) => (
                info.invoice_number.clone(),
                Correlation::OppId(info.opp_id.clone()),
            ),
            None => (
                str_field(payload, "Invoice_Number__c")?.to_string(),
                Correlation::RecordId(str_field(payload, "Source_Record_Id__c")?.to_string()),
            ),
        };

        let subtotal = items
            .iter()
            .map(|i| i.item_cost * Decimal::from(i.quantity))
            .sum();

        Ok(Invoice {
            items,
            subtotal,
            paid: Decimal::ZERO,
            invoice_number,
            correlation,
            customer,
        })
    }

    pub fn balance_due(&self) -> Decimal {
        self.subtotal - self.paid
    }
}

fn str_field<'a>(payload: &'a Value, field: &'static str) -> Result<&'a str, ParseError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_payload(items: &str) -> Value {
        json!({
            "Invoice_Line_Item_JSON__c": items,
            "Invoice_Number__c": "INV-001",
            "Source_Record_Id__c": "rec123",
        })
    }

    #[test]
    fn subtotal_sums_cost_times_quantity() {
        let items = r#"[
            {"productCode":"A1","lineDescription":"Widget","itemCost":10,"quantity":2},
            {"productCode":"B2","lineDescription":"Gadget","itemCost":4.5,"quantity":3}
        ]"#;
        let invoice = Invoice::from_payload(&base_payload(items)).unwrap();

        assert_eq!(invoice.subtotal, Decimal::from(20) + Decimal::new(135, 1));
        assert_eq!(invoice.paid, Decimal::ZERO);
        assert_eq!(invoice.balance_due(), invoice.subtotal);
    }

    #[test]
    fn unit_cost_divides_line_total_by_quantity() {
        let items = r#"[{"productCode":"A1","lineDescription":"Widget","itemCost":10,"quantity":2}]"#;
        let invoice = Invoice::from_payload(&base_payload(items)).unwrap();

        assert_eq!(invoice.items[0].unit_cost(), Decimal::from(5));
        assert_eq!(invoice.items[0].line_total(), Decimal::from(10));
    }

    #[test]
    fn base_payload_uses_record_id_correlation() {
        let invoice = Invoice::from_payload(&base_payload("[]")).unwrap();

        assert_eq!(invoice.invoice_number, "INV-001");
        assert_eq!(
            invoice.correlation,
            Correlation::RecordId("rec123".to_string())
        );
        assert_eq!(invoice.correlation.field_name(), "Related_Object_Id__c");
        assert!(invoice.customer.is_none());
        assert_eq!(invoice.subtotal, Decimal::ZERO);
    }

    #[test]
    fn variant_payload_parses_customer_block() {
        let payload = json!({
            "Customer_Information__c": r#"{
                "companyName":"Globex Ltd",
                "customerName":"Jane Smith",
                "addressStreet":"42 High Street",
                "city":"Leeds",
                "postcode":"LS1 4AP",
                "country":"UK",
                "oppId":"opp789",
                "invoiceNumber":"INV-042"
            }"#,
            "Line_Item_Information__c": r#"[{"productCode":"C3","lineDescription":"Service","itemCost":100,"quantity":1}]"#,
        });
        let invoice = Invoice::from_payload(&payload).unwrap();

        assert_eq!(invoice.invoice_number, "INV-042");
        assert_eq!(invoice.correlation, Correlation::OppId("opp789".to_string()));
        assert_eq!(invoice.correlation.field_name(), "Related_OppId__c");
        let customer = invoice.customer.unwrap();
        assert_eq!(customer.company_name, "Globex Ltd");
        assert_eq!(invoice.subtotal, Decimal::from(100));
    }

    #[test]
    fn malformed_embedded_json_is_a_parse_error() {
        let err = Invoice::from_payload(&base_payload("not json")).unwrap_err();
        assert!(matches!(err, ParseError::Json { .. }));
    }

    #[test]
    fn zero_quantity_item_is_a_parse_error() {
        let items = r#"[{"productCode":"A1","lineDescription":"Widget","itemCost":10,"quantity":0}]"#;
        let err = Invoice::from_payload(&base_payload(items)).unwrap_err();
        assert!(matches!(err, ParseError::ZeroQuantity(code) if code == "A1"));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let err = Invoice::from_payload(&json!({})).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField("Invoice_Line_Item_JSON__c")
        ));
    }
}
