//! Pure cart domain: money, menu data, customization pricing and the cart
//! aggregate itself. Nothing here performs I/O except the catalog loaders.

pub mod cart;
pub mod catalog;
pub mod command;
pub mod customization;
pub mod money;
pub mod ports;
