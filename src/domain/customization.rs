use crate::domain::money::{Money, UnitPrice};
use crate::error::{CartError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Pick at most one option (size, crust, tortilla).
    Single,
    /// Pick any subset, optionally capped (toppings, extras).
    Multi,
}

/// One choosable option. For single-choice groups `price` is a modifier and
/// may be negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub id: String,
    pub name: String,
    pub kind: GroupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    pub options: Vec<DishOption>,
}

impl OptionGroup {
    fn option(&self, id: &str) -> Option<&DishOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// The option preselected for a single-choice group: the first one that
    /// does not change the price, else the first one.
    fn default_option(&self) -> Option<&DishOption> {
        self.options
            .iter()
            .find(|o| o.price.is_zero())
            .or_else(|| self.options.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboOffer {
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub drinks: Vec<String>,
    #[serde(default)]
    pub sides: Vec<DishOption>,
}

/// Everything a dish lets the customer configure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default)]
    pub groups: Vec<OptionGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combo: Option<ComboOffer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

/// The options a customer picked for one dish.
///
/// Groups and option ids live in sorted collections, so two selections made
/// in a different order compare and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub options: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combo: Option<ComboChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choose(mut self, group: impl Into<String>, option: impl Into<String>) -> Self {
        self.options
            .entry(group.into())
            .or_default()
            .insert(option.into());
        self
    }

    pub fn with_combo(mut self, drink: Option<&str>, side: Option<&str>) -> Self {
        self.combo = Some(ComboChoice {
            drink: drink.map(str::to_string),
            side: side.map(str::to_string),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Parses the compact form used in command files:
/// `size=large;toppings=olives|mushrooms;combo=on;combo.drink=Coke;combo.side=wings;note=no basil`.
impl FromStr for Selection {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self> {
        let mut selection = Selection::new();
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                CartError::InvalidSelection(format!("expected key=value, got '{}'", part))
            })?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "combo" => match value {
                    "on" | "yes" | "true" => {
                        selection.combo.get_or_insert_with(ComboChoice::default);
                    }
                    "off" | "no" | "false" => selection.combo = None,
                    other => {
                        return Err(CartError::InvalidSelection(format!(
                            "combo must be on or off, got '{}'",
                            other
                        )));
                    }
                },
                "combo.drink" => {
                    selection
                        .combo
                        .get_or_insert_with(ComboChoice::default)
                        .drink = Some(value.to_string());
                }
                "combo.side" => {
                    selection
                        .combo
                        .get_or_insert_with(ComboChoice::default)
                        .side = Some(value.to_string());
                }
                "note" => selection.note = Some(value.to_string()),
                group => {
                    let chosen = selection.options.entry(group.to_string()).or_default();
                    chosen.extend(
                        value
                            .split('|')
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                            .map(str::to_string),
                    );
                }
            }
        }
        Ok(selection)
    }
}

/// Canonical identity of a resolved selection, used only to decide whether
/// two additions are the same configured dish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn of(selection: &Selection) -> Result<Self> {
        Ok(Self(serde_json::to_string(selection)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Customizations {
    fn group(&self, id: &str) -> Option<&OptionGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Validates `selection` against this menu entry and fills in defaults
    /// for single-choice groups the customer left untouched.
    pub fn resolve(&self, selection: &Selection) -> Result<Selection> {
        let mut resolved = Selection::new();

        for (group_id, chosen) in &selection.options {
            if chosen.is_empty() {
                continue;
            }
            let group = self.group(group_id).ok_or_else(|| {
                CartError::InvalidSelection(format!("unknown option group '{}'", group_id))
            })?;
            if let Some(unknown) = chosen.iter().find(|id| group.option(id).is_none()) {
                return Err(CartError::InvalidSelection(format!(
                    "'{}' is not an option of '{}'",
                    unknown, group_id
                )));
            }
            match group.kind {
                GroupKind::Single if chosen.len() > 1 => {
                    return Err(CartError::InvalidSelection(format!(
                        "'{}' allows only one choice",
                        group_id
                    )));
                }
                GroupKind::Multi if group.max.is_some_and(|max| chosen.len() > max) => {
                    return Err(CartError::InvalidSelection(format!(
                        "'{}' allows at most {} choices",
                        group_id,
                        group.max.unwrap_or_default()
                    )));
                }
                _ => {}
            }
            resolved.options.insert(group_id.clone(), chosen.clone());
        }

        for group in self.groups.iter().filter(|g| g.kind == GroupKind::Single) {
            if resolved.options.contains_key(&group.id) {
                continue;
            }
            if let Some(default) = group.default_option() {
                resolved
                    .options
                    .insert(group.id.clone(), BTreeSet::from([default.id.clone()]));
            }
        }

        if let Some(choice) = &selection.combo {
            let offer = self.combo.as_ref().ok_or_else(|| {
                CartError::InvalidSelection("this dish has no combo".to_string())
            })?;
            if let Some(drink) = &choice.drink
                && !offer.drinks.iter().any(|d| d == drink)
            {
                return Err(CartError::InvalidSelection(format!(
                    "'{}' is not an offered drink",
                    drink
                )));
            }
            if let Some(side) = &choice.side
                && !offer.sides.iter().any(|s| &s.id == side)
            {
                return Err(CartError::InvalidSelection(format!(
                    "'{}' is not an offered side",
                    side
                )));
            }
            resolved.combo = Some(choice.clone());
        }

        resolved.note = selection
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(resolved)
    }

    /// Price of one unit for an already resolved selection.
    pub fn unit_price(&self, base: Decimal, resolved: &Selection) -> Result<UnitPrice> {
        let mut modifiers: Vec<Decimal> = Vec::new();

        for (group_id, chosen) in &resolved.options {
            if let Some(group) = self.group(group_id) {
                modifiers.extend(chosen.iter().filter_map(|id| group.option(id)).map(|o| o.price));
            }
        }

        if let (Some(choice), Some(offer)) = (&resolved.combo, &self.combo) {
            modifiers.push(offer.price);
            if let Some(side) = choice
                .side
                .as_ref()
                .and_then(|id| offer.sides.iter().find(|s| &s.id == id))
            {
                modifiers.push(side.price);
            }
        }

        let price = modifiers
            .into_iter()
            .try_fold(Money::new(base), |price, modifier| {
                price.checked_add(Money::new(modifier))
            })
            .ok_or(CartError::AmountOverflow("unit price"))?;
        UnitPrice::try_from(price)
    }
}
