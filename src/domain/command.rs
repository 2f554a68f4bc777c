use crate::domain::cart::{LineItemId, TipPolicy};
use crate::domain::customization::Selection;
use crate::error::{CartError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Bind,
    Add,
    Update,
    Remove,
    Tip,
    Clear,
}

impl CommandKind {
    fn name(self) -> &'static str {
        match self {
            CommandKind::Bind => "bind",
            CommandKind::Add => "add",
            CommandKind::Update => "update",
            CommandKind::Remove => "remove",
            CommandKind::Tip => "tip",
            CommandKind::Clear => "clear",
        }
    }
}

/// One row of a command file. Which columns are required depends on `command`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub command: CommandKind,
    #[serde(default)]
    pub restaurant: Option<String>,
    #[serde(default)]
    pub dish: Option<String>,
    #[serde(default)]
    pub item: Option<u64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub percentage: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum CartCommand {
    Bind {
        restaurant: String,
    },
    Add {
        restaurant: String,
        dish: String,
        quantity: i64,
        selection: Selection,
    },
    Update {
        item: LineItemId,
        quantity: i64,
    },
    Remove {
        item: LineItemId,
    },
    Tip(TipPolicy),
    Clear,
}

impl TryFrom<CommandRecord> for CartCommand {
    type Error = CartError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let command = record.command.name();
        let required = |field: &'static str| CartError::MissingField { command, field };

        Ok(match record.command {
            CommandKind::Bind => CartCommand::Bind {
                restaurant: record.restaurant.ok_or_else(|| required("restaurant"))?,
            },
            CommandKind::Add => CartCommand::Add {
                restaurant: record.restaurant.ok_or_else(|| required("restaurant"))?,
                dish: record.dish.ok_or_else(|| required("dish"))?,
                quantity: record.quantity.unwrap_or(1),
                selection: record
                    .options
                    .as_deref()
                    .map(str::parse::<Selection>)
                    .transpose()?
                    .unwrap_or_default(),
            },
            CommandKind::Update => CartCommand::Update {
                item: record
                    .item
                    .map(LineItemId::new)
                    .ok_or_else(|| required("item"))?,
                quantity: record.quantity.ok_or_else(|| required("quantity"))?,
            },
            CommandKind::Remove => CartCommand::Remove {
                item: record
                    .item
                    .map(LineItemId::new)
                    .ok_or_else(|| required("item"))?,
            },
            CommandKind::Tip => {
                CartCommand::Tip(TipPolicy::from_parts(record.percentage, record.amount)?)
            }
            CommandKind::Clear => CartCommand::Clear,
        })
    }
}
