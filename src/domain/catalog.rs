use crate::domain::customization::{Customizations, Fingerprint, Selection};
use crate::domain::money::UnitPrice;
use crate::error::{CartError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUILTIN_MENU: &str = include_str!("../../data/menu.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub base_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub dietary_info: Vec<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub customizations: Customizations,
}

/// A dish priced and fingerprinted for one particular selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredDish {
    pub selection: Selection,
    pub unit_price: UnitPrice,
    pub fingerprint: Fingerprint,
}

impl Dish {
    pub fn configure(&self, selection: &Selection) -> Result<ConfiguredDish> {
        let resolved = self.customizations.resolve(selection)?;
        let unit_price = self.customizations.unit_price(self.base_price, &resolved)?;
        let fingerprint = Fingerprint::of(&resolved)?;
        Ok(ConfiguredDish {
            selection: resolved,
            unit_price,
            fingerprint,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

/// Read-only menu data for every restaurant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub restaurants: Vec<Restaurant>,
}

impl Catalog {
    /// The sample menu bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Ok(serde_json::from_str(BUILTIN_MENU)?)
    }

    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn restaurant(&self, id: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.id == id)
    }

    /// All dishes of a restaurant; empty for an unknown restaurant.
    pub fn menu(&self, restaurant_id: &str) -> &[Dish] {
        self.restaurant(restaurant_id)
            .map(|r| r.dishes.as_slice())
            .unwrap_or_default()
    }

    pub fn dish(&self, restaurant_id: &str, dish_id: &str) -> Option<&Dish> {
        self.menu(restaurant_id).iter().find(|d| d.id == dish_id)
    }

    /// Like [`Catalog::dish`], but reports which lookup failed.
    pub fn require_dish(&self, restaurant_id: &str, dish_id: &str) -> Result<(&Restaurant, &Dish)> {
        let restaurant = self
            .restaurant(restaurant_id)
            .ok_or_else(|| CartError::UnknownRestaurant(restaurant_id.to_string()))?;
        let dish = restaurant
            .dishes
            .iter()
            .find(|d| d.id == dish_id)
            .ok_or_else(|| CartError::UnknownDish {
                restaurant: restaurant_id.to_string(),
                dish: dish_id.to_string(),
            })?;
        Ok((restaurant, dish))
    }

    pub fn popular(&self, restaurant_id: &str) -> Vec<&Dish> {
        self.menu(restaurant_id).iter().filter(|d| d.popular).collect()
    }

    /// Dishes grouped by category, categories in the order they first appear.
    pub fn by_category(&self, restaurant_id: &str) -> Vec<(&str, Vec<&Dish>)> {
        let mut groups: Vec<(&str, Vec<&Dish>)> = Vec::new();
        for dish in self.menu(restaurant_id) {
            match groups.iter_mut().find(|(c, _)| *c == dish.category) {
                Some((_, dishes)) => dishes.push(dish),
                None => groups.push((dish.category.as_str(), vec![dish])),
            }
        }
        groups
    }

    /// Case-insensitive match against name, description and category.
    pub fn search(&self, restaurant_id: &str, query: &str) -> Vec<&Dish> {
        let q = query.to_lowercase();
        self.menu(restaurant_id)
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&q)
                    || d.description.to_lowercase().contains(&q)
                    || d.category.to_lowercase().contains(&q)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.restaurants.len(), 3);
        assert_eq!(
            catalog.restaurant("rest_004").unwrap().name,
            "Torchy's Tacos"
        );
        assert_eq!(catalog.menu("rest_006").len(), 4);
        assert!(catalog.menu("rest_999").is_empty());
    }

    #[test]
    fn test_dish_lookup() {
        let catalog = Catalog::builtin().unwrap();
        let dish = catalog.dish("rest_001", "dish_001").unwrap();
        assert_eq!(dish.name, "Margherita Pizza");
        assert_eq!(dish.base_price, dec!(18.99));

        // Dishes are scoped to their restaurant.
        assert!(catalog.dish("rest_004", "dish_001").is_none());
    }

    #[test]
    fn test_require_dish_errors() {
        let catalog = Catalog::builtin().unwrap();
        assert!(matches!(
            catalog.require_dish("rest_999", "dish_001"),
            Err(CartError::UnknownRestaurant(_))
        ));
        assert!(matches!(
            catalog.require_dish("rest_001", "dish_999"),
            Err(CartError::UnknownDish { .. })
        ));
    }

    #[test]
    fn test_popular_and_categories() {
        let catalog = Catalog::builtin().unwrap();
        let popular: Vec<&str> = catalog
            .popular("rest_001")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(popular, vec!["dish_001", "dish_002"]);

        let categories: Vec<&str> = catalog
            .by_category("rest_001")
            .iter()
            .map(|(c, _)| *c)
            .collect();
        assert_eq!(categories, vec!["Pizza", "Desserts", "Salads"]);
        assert_eq!(catalog.by_category("rest_001")[0].1.len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = Catalog::builtin().unwrap();
        let hits: Vec<&str> = catalog
            .search("rest_006", "RAMEN")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(hits, vec!["dish_201", "dish_202", "dish_203"]);

        assert_eq!(catalog.search("rest_004", "queso").len(), 2);
        assert!(catalog.search("rest_004", "sushi").is_empty());
    }

    #[test]
    fn test_configure_margherita() {
        let catalog = Catalog::builtin().unwrap();
        let dish = catalog.dish("rest_001", "dish_001").unwrap();

        let plain = dish.configure(&Selection::new()).unwrap();
        assert_eq!(plain.unit_price.value(), dec!(18.99));
        assert!(plain.selection.options.contains_key("size"));
        assert!(plain.selection.options.contains_key("crust"));

        let loaded: Selection = "size=large;crust=thin;toppings=basil|olives;combo.drink=Sprite;combo.side=caesar"
            .parse()
            .unwrap();
        let configured = dish.configure(&loaded).unwrap();
        // 18.99 + 4.00 + 1.00 + 0.50 + 1.00 + 5.99 + 1.00
        assert_eq!(configured.unit_price.value(), dec!(32.48));
        assert_ne!(configured.fingerprint, plain.fingerprint);
    }

    #[test]
    fn test_catalog_from_reader() {
        let json = r#"{"restaurants":[{"id":"r1","name":"Diner","dishes":[
            {"id":"d1","name":"Pancakes","base_price":"7.50"}]}]}"#;
        let catalog = Catalog::from_reader(json.as_bytes()).unwrap();
        let dish = catalog.dish("r1", "d1").unwrap();
        assert_eq!(dish.base_price, dec!(7.50));
        assert!(dish.customizations.groups.is_empty());
        assert!(!dish.popular);
    }
}
