use std::fmt::Write;

use crate::{db_types::Order, traits::EmailAttachment};

/// A rendered invoice. Rendering is deterministic: the same order always produces the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub filename: String,
    pub content: String,
}

impl Invoice {
    pub fn render(order: &Order, store_name: &str) -> Self {
        let filename = format!("invoice-{}.txt", order.id);
        let mut doc = String::new();
        // Writing to a String cannot fail
        let _ = write_invoice(&mut doc, order, store_name);
        Self { filename, content: doc }
    }

    pub fn to_attachment(&self) -> EmailAttachment {
        EmailAttachment {
            filename: self.filename.clone(),
            content_type: "text/plain; charset=utf-8".to_string(),
            data: self.content.as_bytes().to_vec(),
        }
    }
}

fn write_invoice(doc: &mut String, order: &Order, store_name: &str) -> std::fmt::Result {
    let rule = "-".repeat(60);
    writeln!(doc, "{store_name}")?;
    writeln!(doc, "INVOICE")?;
    writeln!(doc, "{rule}")?;
    writeln!(doc, "Order:      {}", order.id)?;
    writeln!(doc, "Receipt:    {}", order.receipt)?;
    writeln!(doc, "Order date: {}", order.created_at.format("%Y-%m-%d %H:%M UTC"))?;
    if let Some(payment) = &order.payment {
        writeln!(doc, "Payment:    {}", payment.gateway_payment_id)?;
    }
    writeln!(doc)?;
    let customer = &order.customer;
    let address = &customer.shipping_address;
    writeln!(doc, "Bill to:")?;
    writeln!(doc, "  {}", customer.name)?;
    writeln!(doc, "  {}", customer.email)?;
    if let Some(phone) = &customer.phone {
        writeln!(doc, "  {phone}")?;
    }
    writeln!(doc, "  {}", address.line1)?;
    if let Some(line2) = address.line2.as_ref().filter(|l| !l.is_empty()) {
        writeln!(doc, "  {line2}")?;
    }
    writeln!(doc, "  {}, {} {}", address.city, address.state, address.postal_code)?;
    writeln!(doc, "  {}", address.country)?;
    writeln!(doc)?;
    writeln!(doc, "{:<34}{:>5}{:>10}{:>11}", "Item", "Qty", "Price", "Total")?;
    writeln!(doc, "{rule}")?;
    for item in &order.items {
        let name = match &item.variant {
            Some(v) => format!("{} ({v})", item.name),
            None => item.name.clone(),
        };
        let line_total = item.line_total().map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        writeln!(doc, "{:<34}{:>5}{:>10}{:>11}", name, item.quantity, item.unit_price, line_total)?;
    }
    writeln!(doc, "{rule}")?;
    writeln!(doc, "{:<49}{:>11}", format!("Total ({})", order.currency), order.amount)?;
    writeln!(doc)?;
    writeln!(doc, "Thank you for shopping with {store_name}.")?;
    Ok(())
}
