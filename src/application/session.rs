use crate::domain::cart::{CartSnapshot, CartState, Pricing};
use crate::domain::catalog::Catalog;
use crate::domain::command::CartCommand;
use crate::domain::ports::{CartStoreBox, SessionId};
use crate::error::{CartError, Result};
use std::sync::Arc;

/// The cart of one ordering session.
///
/// `OrderSession` owns the working cart and persists it after every command.
/// Each command runs against a copy of the cart, so a command that fails
/// halfway leaves both the in-memory and the stored cart unchanged.
pub struct OrderSession {
    id: SessionId,
    store: CartStoreBox,
    catalog: Arc<Catalog>,
    pricing: Pricing,
    cart: CartState,
    persisted_version: u64,
}

impl OrderSession {
    /// Opens the session, resuming the stored cart when there is one.
    pub async fn open(
        id: SessionId,
        store: CartStoreBox,
        catalog: Arc<Catalog>,
        pricing: Pricing,
    ) -> Result<Self> {
        let (cart, persisted_version) = match store.load(&id).await? {
            Some(cart) => {
                tracing::info!(session = %id, items = cart.items().len(), "Resumed stored cart");
                let version = cart.version();
                (cart, version)
            }
            None => (CartState::new(), 0),
        };

        Ok(Self {
            id,
            store,
            catalog,
            pricing,
            cart,
            persisted_version,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn snapshot(&self) -> Result<CartSnapshot> {
        self.cart.snapshot(&self.pricing)
    }

    /// Applies one command and persists the result. A cart whose totals
    /// cannot be computed is rejected before anything is stored.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub async fn execute(&mut self, command: CartCommand) -> Result<CartSnapshot> {
        let mut next = self.cart.clone();
        self.apply(&mut next, command)?;
        let snapshot = next.snapshot(&self.pricing)?;

        self.store
            .save(&self.id, &next, self.persisted_version)
            .await?;
        self.persisted_version = next.version();
        self.cart = next;

        tracing::debug!(
            items = snapshot.totals.item_count,
            total = %snapshot.totals.total,
            "Command applied"
        );
        Ok(snapshot)
    }

    fn apply(&self, cart: &mut CartState, command: CartCommand) -> Result<()> {
        match command {
            CartCommand::Bind { restaurant } => {
                let name = self
                    .catalog
                    .restaurant(&restaurant)
                    .map(|r| r.name.clone())
                    .ok_or_else(|| CartError::UnknownRestaurant(restaurant.clone()))?;
                cart.bind_restaurant(&restaurant, &name);
            }
            CartCommand::Add {
                restaurant,
                dish,
                quantity,
                selection,
            } => {
                let (restaurant, dish) = self.catalog.require_dish(&restaurant, &dish)?;
                let configured = dish.configure(&selection)?;
                cart.bind_restaurant(&restaurant.id, &restaurant.name);
                cart.add_item(
                    &dish.id,
                    &dish.name,
                    configured.unit_price,
                    quantity,
                    configured.fingerprint,
                )?;
            }
            CartCommand::Update { item, quantity } => cart.update_quantity(item, quantity)?,
            CartCommand::Remove { item } => {
                cart.remove_item(item)?;
            }
            CartCommand::Tip(policy) => cart.set_tip_policy(policy),
            CartCommand::Clear => cart.clear(),
        }
        Ok(())
    }

    /// Empties the cart and drops its stored copy.
    pub async fn discard(&mut self) -> Result<()> {
        self.store.delete(&self.id).await?;
        self.cart = CartState::new();
        self.persisted_version = 0;
        Ok(())
    }
}
