use crate::domain::customization::Fingerprint;
use crate::domain::money::{Money, UnitPrice};
use crate::error::{CartError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sales tax applied when nothing else is configured (Austin, TX).
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.0825);

/// Tip percentage a fresh cart starts with.
pub const DEFAULT_TIP_PERCENTAGE: Decimal = dec!(18);

/// Opaque handle for a line item, stable for the item's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(u64);

impl LineItemId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantBinding {
    pub id: String,
    pub name: String,
}

/// One dish in one configuration. `unit_price` and `fingerprint` are frozen
/// when the item is created; only `quantity` changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub dish_id: String,
    pub name: String,
    pub unit_price: UnitPrice,
    pub quantity: u32,
    pub fingerprint: Fingerprint,
}

impl LineItem {
    pub fn line_total(&self) -> Result<Money> {
        self.unit_price
            .times(self.quantity)
            .ok_or(CartError::AmountOverflow("line total"))
    }
}

/// How gratuity is computed. Exactly one form is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipPolicy {
    /// Percent of the subtotal, e.g. `18` for 18%.
    Percentage(Decimal),
    /// Flat amount regardless of the subtotal.
    Amount(Money),
}

impl Default for TipPolicy {
    fn default() -> Self {
        TipPolicy::Percentage(DEFAULT_TIP_PERCENTAGE)
    }
}

impl TipPolicy {
    pub fn percentage(percent: Decimal) -> Result<Self> {
        if percent < Decimal::ZERO {
            return Err(CartError::InvalidTipPolicy(format!(
                "percentage must not be negative, got {}",
                percent
            )));
        }
        Ok(TipPolicy::Percentage(percent))
    }

    pub fn amount(amount: Decimal) -> Result<Self> {
        if amount < Decimal::ZERO {
            return Err(CartError::InvalidTipPolicy(format!(
                "amount must not be negative, got {}",
                amount
            )));
        }
        Ok(TipPolicy::Amount(Money::new(amount)))
    }

    /// Builds a policy from two optional inputs, exactly one of which must be set.
    pub fn from_parts(percentage: Option<Decimal>, amount: Option<Decimal>) -> Result<Self> {
        match (percentage, amount) {
            (Some(p), None) => Self::percentage(p),
            (None, Some(a)) => Self::amount(a),
            (Some(_), Some(_)) => Err(CartError::InvalidTipPolicy(
                "specify either a percentage or an amount, not both".to_string(),
            )),
            (None, None) => Err(CartError::InvalidTipPolicy(
                "specify a percentage or an amount".to_string(),
            )),
        }
    }

    pub fn tip_on(&self, subtotal: Money) -> Result<Money> {
        match self {
            TipPolicy::Percentage(percent) => percent
                .checked_div(dec!(100))
                .and_then(|rate| subtotal.checked_mul(rate))
                .ok_or(CartError::AmountOverflow("tip")),
            TipPolicy::Amount(amount) => Ok(*amount),
        }
    }
}

/// Pricing configuration shared by every cart of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    tax_rate: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl Pricing {
    pub fn new(tax_rate: Decimal) -> Result<Self> {
        if tax_rate < Decimal::ZERO {
            return Err(CartError::InvalidTaxRate(tax_rate));
        }
        Ok(Self { tax_rate })
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }
}

/// Values derived from the cart. Never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub tip: Money,
    pub total: Money,
    pub item_count: u64,
}

/// The in-progress order of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    restaurant: Option<RestaurantBinding>,
    items: Vec<LineItem>,
    tip: TipPolicy,
    version: u64,
    next_item_id: u64,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl CartState {
    pub fn new() -> Self {
        Self {
            restaurant: None,
            items: Vec::new(),
            tip: TipPolicy::default(),
            version: 0,
            next_item_id: 1,
        }
    }

    pub fn restaurant(&self) -> Option<&RestaurantBinding> {
        self.restaurant.as_ref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn tip(&self) -> TipPolicy {
        self.tip
    }

    /// Bumped by every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Binds the cart to a restaurant. Switching to a different restaurant
    /// discards every line item and the tip policy.
    pub fn bind_restaurant(&mut self, id: &str, name: &str) {
        let binding = RestaurantBinding {
            id: id.to_string(),
            name: name.to_string(),
        };
        if let Some(current) = self.restaurant.take_if(|current| current.id != id) {
            tracing::info!(
                from = %current.id,
                to = %id,
                dropped = self.items.len(),
                "Switching restaurant, cart emptied"
            );
            self.reset();
        }
        self.restaurant = Some(binding);
        self.version += 1;
    }

    /// Adds `quantity` units of a configured dish.
    ///
    /// Items are keyed by `(dish_id, fingerprint)`. Adding a configuration
    /// already in the cart only grows its quantity and keeps the price it was
    /// first added with.
    pub fn add_item(
        &mut self,
        dish_id: &str,
        name: &str,
        unit_price: UnitPrice,
        quantity: i64,
        fingerprint: Fingerprint,
    ) -> Result<LineItemId> {
        let quantity = positive_quantity(quantity)?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.dish_id == dish_id && item.fingerprint == fingerprint)
        {
            existing.quantity =
                existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::QuantityOverflow {
                        item: existing.id,
                        current: existing.quantity,
                        added: quantity,
                    })?;
            let id = existing.id;
            tracing::debug!(item = %id, quantity = existing.quantity, "Merged into existing line item");
            self.version += 1;
            return Ok(id);
        }

        let id = LineItemId::new(self.next_item_id);
        self.next_item_id += 1;
        self.items.push(LineItem {
            id,
            dish_id: dish_id.to_string(),
            name: name.to_string(),
            unit_price,
            quantity,
            fingerprint,
        });
        tracing::debug!(item = %id, dish = dish_id, quantity, "Added line item");
        self.version += 1;
        Ok(id)
    }

    /// Sets the quantity of a line item. Zero or less removes it, which is a
    /// no-op when the item is already gone.
    pub fn update_quantity(&mut self, id: LineItemId, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            self.items.retain(|item| item.id != id);
            self.version += 1;
            return Ok(());
        }

        let quantity = positive_quantity(quantity)?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CartError::UnknownLineItem(id))?;
        item.quantity = quantity;
        self.version += 1;
        Ok(())
    }

    /// Removes a line item. An unknown id leaves the cart as it was and is
    /// reported to the caller.
    pub fn remove_item(&mut self, id: LineItemId) -> Result<LineItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CartError::UnknownLineItem(id))?;
        self.version += 1;
        Ok(self.items.remove(index))
    }

    pub fn set_tip_policy(&mut self, policy: TipPolicy) {
        self.tip = policy;
        self.version += 1;
    }

    /// Empties and unbinds the cart.
    pub fn clear(&mut self) {
        self.reset();
        self.restaurant = None;
        self.version += 1;
    }

    fn reset(&mut self) {
        self.items.clear();
        self.tip = TipPolicy::default();
    }

    /// Derives subtotal, tax, tip and total. Fails with `AmountOverflow`
    /// when any of them does not fit a `Decimal`.
    pub fn totals(&self, pricing: &Pricing) -> Result<CartTotals> {
        let mut subtotal = Money::ZERO;
        for item in &self.items {
            subtotal = subtotal
                .checked_add(item.line_total()?)
                .ok_or(CartError::AmountOverflow("subtotal"))?;
        }
        let tax = subtotal
            .checked_mul(pricing.tax_rate())
            .ok_or(CartError::AmountOverflow("tax"))?;
        let tip = self.tip.tip_on(subtotal)?;
        let total = subtotal
            .checked_add(tax)
            .and_then(|sum| sum.checked_add(tip))
            .ok_or(CartError::AmountOverflow("total"))?;

        Ok(CartTotals {
            subtotal,
            tax,
            tip,
            total,
            item_count: self.items.iter().map(|item| u64::from(item.quantity)).sum(),
        })
    }

    pub fn snapshot(&self, pricing: &Pricing) -> Result<CartSnapshot> {
        Ok(CartSnapshot {
            cart: self.clone(),
            totals: self.totals(pricing)?,
        })
    }
}

fn positive_quantity(quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CartError::InvalidQuantity(quantity))
}

/// The full cart plus its totals, as returned after every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSnapshot {
    #[serde(flatten)]
    pub cart: CartState,
    pub totals: CartTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: Decimal) -> UnitPrice {
        UnitPrice::new(value).unwrap()
    }

    fn fp(raw: &str) -> Fingerprint {
        Fingerprint::new(raw)
    }

    fn assert_subtotal_invariant(cart: &CartState) {
        let expected: Decimal = cart
            .items()
            .iter()
            .map(|i| i.unit_price.value() * Decimal::from(i.quantity))
            .sum();
        assert_eq!(
            cart.totals(&Pricing::default()).unwrap().subtotal.value(),
            expected
        );
    }

    #[test]
    fn test_same_configuration_merges_and_keeps_first_price() {
        let mut cart = CartState::new();
        let a = cart
            .add_item("dish_001", "Margherita", price(dec!(18.99)), 2, fp("large"))
            .unwrap();
        let b = cart
            .add_item("dish_001", "Margherita", price(dec!(25.00)), 3, fp("large"))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.items()[0].unit_price.value(), dec!(18.99));
        assert_subtotal_invariant(&cart);
    }

    #[test]
    fn test_different_configuration_is_a_separate_item() {
        let mut cart = CartState::new();
        cart.add_item("dish_001", "Margherita", price(dec!(18.99)), 1, fp("medium"))
            .unwrap();
        cart.add_item("dish_001", "Margherita", price(dec!(22.99)), 1, fp("large"))
            .unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].fingerprint, fp("medium"));
        assert_eq!(cart.items()[1].fingerprint, fp("large"));
        assert_subtotal_invariant(&cart);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = CartState::new();
        for bad in [0, -1] {
            assert!(matches!(
                cart.add_item("dish_001", "Margherita", price(dec!(1)), bad, fp("")),
                Err(CartError::InvalidQuantity(q)) if q == bad
            ));
        }
        assert!(cart.is_empty());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn test_update_to_zero_removes_then_update_is_noop() {
        let mut cart = CartState::new();
        let id = cart
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), 2, fp(""))
            .unwrap();

        cart.update_quantity(id, 0).unwrap();
        assert!(cart.item(id).is_none());

        // Removal through a non-positive quantity stays idempotent.
        cart.update_quantity(id, -3).unwrap();

        let before = cart.items().to_vec();
        assert!(matches!(
            cart.update_quantity(id, 4),
            Err(CartError::UnknownLineItem(missing)) if missing == id
        ));
        assert_eq!(cart.items(), before.as_slice());
    }

    #[test]
    fn test_update_sets_quantity() {
        let mut cart = CartState::new();
        let id = cart
            .add_item("dish_101", "Trailer Park", price(dec!(4.50)), 1, fp(""))
            .unwrap();
        cart.update_quantity(id, 6).unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, 6);
        assert_eq!(cart.totals(&Pricing::default()).unwrap().item_count, 6);
        assert_subtotal_invariant(&cart);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = CartState::new();
        let keep = cart
            .add_item("dish_101", "Trailer Park", price(dec!(4.50)), 1, fp(""))
            .unwrap();
        let drop = cart
            .add_item("dish_102", "Democrat", price(dec!(4.95)), 1, fp(""))
            .unwrap();

        let removed = cart.remove_item(drop).unwrap();
        assert_eq!(removed.dish_id, "dish_102");
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].id, keep);

        assert!(matches!(
            cart.remove_item(drop),
            Err(CartError::UnknownLineItem(_))
        ));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut cart = CartState::new();
        let first = cart
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp(""))
            .unwrap();
        cart.clear();
        let second = cart
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp(""))
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_bind_same_restaurant_keeps_items() {
        let mut cart = CartState::new();
        cart.bind_restaurant("rest_001", "Valentino's Pizzeria");
        cart.add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp(""))
            .unwrap();
        cart.bind_restaurant("rest_001", "Valentino's Pizzeria");

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.restaurant().unwrap().id, "rest_001");
    }

    #[test]
    fn test_bind_other_restaurant_empties_cart() {
        let mut cart = CartState::new();
        cart.bind_restaurant("rest_001", "Valentino's Pizzeria");
        cart.add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp(""))
            .unwrap();
        cart.set_tip_policy(TipPolicy::amount(dec!(5)).unwrap());

        cart.bind_restaurant("rest_004", "Torchy's Tacos");

        assert!(cart.is_empty());
        assert_eq!(
            cart.restaurant(),
            Some(&RestaurantBinding {
                id: "rest_004".to_string(),
                name: "Torchy's Tacos".to_string(),
            })
        );
        assert_eq!(cart.tip(), TipPolicy::default());
    }

    #[test]
    fn test_totals_reference_order() {
        let mut cart = CartState::new();
        cart.add_item("dish_001", "Margherita Pizza", price(dec!(18.99)), 1, fp(""))
            .unwrap();
        cart.set_tip_policy(TipPolicy::percentage(dec!(18)).unwrap());

        let totals = cart.totals(&Pricing::new(dec!(0.0825)).unwrap()).unwrap();
        assert_eq!(totals.subtotal.value(), dec!(18.99));
        assert_eq!(totals.tax.value(), dec!(1.566675));
        assert_eq!(totals.tip.value(), dec!(3.4182));
        assert_eq!(totals.total.value(), dec!(23.974875));
        assert_eq!(totals.total.to_string(), "23.97");
        assert_eq!(totals.item_count, 1);
    }

    #[test]
    fn test_flat_tip() {
        let mut cart = CartState::new();
        cart.add_item("dish_204", "Gyoza", price(dec!(8.00)), 2, fp(""))
            .unwrap();
        cart.set_tip_policy(TipPolicy::amount(dec!(3.50)).unwrap());

        let totals = cart.totals(&Pricing::new(dec!(0)).unwrap()).unwrap();
        assert_eq!(totals.tip.value(), dec!(3.50));
        assert_eq!(totals.total.value(), dec!(19.50));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cart = CartState::new();
        cart.bind_restaurant("rest_006", "Ramen Tatsu-Ya");
        cart.add_item("dish_201", "Tonkotsu Original", price(dec!(15.00)), 2, fp(""))
            .unwrap();
        cart.clear();

        let totals = cart.totals(&Pricing::default()).unwrap();
        assert!(cart.items().is_empty());
        assert!(cart.restaurant().is_none());
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn test_tip_policy_from_parts() {
        assert_eq!(
            TipPolicy::from_parts(Some(dec!(20)), None).unwrap(),
            TipPolicy::Percentage(dec!(20))
        );
        assert_eq!(
            TipPolicy::from_parts(None, Some(dec!(4))).unwrap(),
            TipPolicy::Amount(Money::new(dec!(4)))
        );
        assert!(matches!(
            TipPolicy::from_parts(Some(dec!(20)), Some(dec!(4))),
            Err(CartError::InvalidTipPolicy(_))
        ));
        assert!(matches!(
            TipPolicy::from_parts(None, None),
            Err(CartError::InvalidTipPolicy(_))
        ));
        assert!(TipPolicy::percentage(dec!(-1)).is_err());
        assert!(TipPolicy::amount(dec!(-1)).is_err());
    }

    #[test]
    fn test_merge_past_max_quantity_leaves_cart_unchanged() {
        let mut cart = CartState::new();
        let id = cart
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), i64::from(u32::MAX), fp(""))
            .unwrap();
        let before = cart.clone();

        let result = cart.add_item("dish_003", "Tiramisu", price(dec!(9.99)), 5, fp(""));
        assert!(matches!(
            result,
            Err(CartError::QuantityOverflow { item, current, added: 5 })
                if item == id && current == u32::MAX
        ));
        assert_eq!(cart, before);

        assert!(matches!(
            cart.add_item("dish_004", "Caesar Salad", price(dec!(1)), i64::from(u32::MAX) + 1, fp("")),
            Err(CartError::InvalidQuantity(_))
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let mut cart = CartState::new();
        cart.add_item("dish_003", "Tiramisu", price(dec!(9.99)), 10_000_000, fp(""))
            .unwrap();

        cart.set_tip_policy(TipPolicy::percentage(Decimal::MAX).unwrap());
        assert!(matches!(
            cart.totals(&Pricing::default()),
            Err(CartError::AmountOverflow("tip"))
        ));
        assert!(cart.snapshot(&Pricing::default()).is_err());

        cart.set_tip_policy(TipPolicy::amount(Decimal::MAX).unwrap());
        assert!(matches!(
            cart.totals(&Pricing::default()),
            Err(CartError::AmountOverflow("total"))
        ));

        cart.set_tip_policy(TipPolicy::default());
        assert!(matches!(
            cart.totals(&Pricing::new(Decimal::MAX).unwrap()),
            Err(CartError::AmountOverflow("tax"))
        ));
        assert!(cart.totals(&Pricing::default()).is_ok());
    }

    #[test]
    fn test_line_total_overflow_is_an_error() {
        let mut cart = CartState::new();
        cart.add_item("dish_003", "Tiramisu", price(Decimal::MAX), 2, fp(""))
            .unwrap();

        assert!(matches!(
            cart.items()[0].line_total(),
            Err(CartError::AmountOverflow("line total"))
        ));
        assert!(cart.totals(&Pricing::new(dec!(0)).unwrap()).is_err());
    }

    #[test]
    fn test_negative_tax_rate_rejected() {
        assert!(matches!(
            Pricing::new(dec!(-0.01)),
            Err(CartError::InvalidTaxRate(_))
        ));
    }

    #[test]
    fn test_cart_state_json_round_trip_keeps_counter() {
        let mut cart = CartState::new();
        cart.bind_restaurant("rest_001", "Valentino's Pizzeria");
        let id = cart
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp("{}"))
            .unwrap();
        cart.remove_item(id).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let mut restored: CartState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);

        let next = restored
            .add_item("dish_003", "Tiramisu", price(dec!(9.99)), 1, fp("{}"))
            .unwrap();
        assert_ne!(next, id);
    }
}
