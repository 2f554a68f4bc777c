use crate::domain::cart::CartSnapshot;
use crate::domain::money::Money;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ReceiptRow<'a> {
    kind: &'a str,
    item: Option<u64>,
    dish: Option<&'a str>,
    name: Option<&'a str>,
    quantity: Option<u64>,
    unit_price: Option<String>,
    amount: Option<String>,
}

impl<'a> ReceiptRow<'a> {
    fn summary(kind: &'a str, amount: Money) -> Self {
        Self {
            kind,
            item: None,
            dish: None,
            name: None,
            quantity: None,
            unit_price: None,
            amount: Some(amount.to_string()),
        }
    }
}

/// Writes a cart snapshot as CSV.
///
/// Columns are `kind,item,dish,name,quantity,unit_price,amount`. The
/// restaurant row comes first, then one row per line item in cart order, then
/// `subtotal`, `tax`, `tip` and `total`. The `total` row carries the item
/// count in `quantity`. Amounts are rounded to cents here and nowhere else.
pub struct ReceiptWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReceiptWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_snapshot(&mut self, snapshot: &CartSnapshot) -> Result<()> {
        let cart = &snapshot.cart;
        let totals = &snapshot.totals;

        if let Some(restaurant) = cart.restaurant() {
            self.writer.serialize(ReceiptRow {
                kind: "restaurant",
                item: None,
                dish: Some(&restaurant.id),
                name: Some(&restaurant.name),
                quantity: None,
                unit_price: None,
                amount: None,
            })?;
        }

        for item in cart.items() {
            self.writer.serialize(ReceiptRow {
                kind: "item",
                item: Some(item.id.value()),
                dish: Some(&item.dish_id),
                name: Some(&item.name),
                quantity: Some(u64::from(item.quantity)),
                unit_price: Some(Money::from(item.unit_price).to_string()),
                amount: Some(item.line_total()?.to_string()),
            })?;
        }

        self.writer
            .serialize(ReceiptRow::summary("subtotal", totals.subtotal))?;
        self.writer.serialize(ReceiptRow::summary("tax", totals.tax))?;
        self.writer.serialize(ReceiptRow::summary("tip", totals.tip))?;
        self.writer.serialize(ReceiptRow {
            quantity: Some(totals.item_count),
            ..ReceiptRow::summary("total", totals.total)
        })?;

        self.writer.flush()?;
        Ok(())
    }
}
