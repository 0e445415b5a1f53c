//! Product catalog: CRUD through a reducer, plus search and lookup.

use crate::error::CatalogError;
use crate::types::{Money, ProductId, RequestId};
use merchant_console_core::effect::Effect;
use merchant_console_core::reducer::Reducer;
use merchant_console_core::version::Version;
use merchant_console_core::{smallvec, SmallVec};
use merchant_console_macros::{Action, State};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed product categories
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Milk, curd, paneer
    Dairy,
    /// Rice, atta, dal
    Staples,
    /// Chips, biscuits
    Snacks,
    /// Bread, buns
    Bakery,
    /// Fresh vegetables
    Vegetables,
    /// Fresh fruit
    Fruits,
    /// Tea, coffee, soft drinks
    Beverages,
}

impl Category {
    /// Every category in menu order
    pub const ALL: [Self; 7] = [
        Self::Dairy,
        Self::Staples,
        Self::Snacks,
        Self::Bakery,
        Self::Vegetables,
        Self::Fruits,
        Self::Beverages,
    ];

    /// Display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dairy => "Dairy",
            Self::Staples => "Staples",
            Self::Snacks => "Snacks",
            Self::Bakery => "Bakery",
            Self::Vegetables => "Vegetables",
            Self::Fruits => "Fruits",
            Self::Beverages => "Beverages",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

/// A catalog product
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Category from the fixed list
    pub category: Category,
    /// Current unit price
    pub price: Money,
    /// Units on hand
    pub stock_count: u32,
    /// Thumbnail URL, may be empty
    pub image_url: String,
    /// Inactive products stay listed but are hidden from customers
    pub is_active: bool,
}

/// Editable product fields as entered in the product form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Display name
    pub name: String,
    /// Category name, one of [`Category::ALL`]
    pub category: String,
    /// Unit price
    pub price: Money,
    /// Units on hand
    pub stock_count: u32,
    /// Thumbnail URL
    pub image_url: String,
    /// Whether the product is active
    pub is_active: bool,
}

impl ProductDraft {
    /// A new active draft with no stock and no image
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price,
            stock_count: 0,
            image_url: String::new(),
            is_active: true,
        }
    }

    /// Sets the stock count
    #[must_use]
    pub const fn with_stock(mut self, stock_count: u32) -> Self {
        self.stock_count = stock_count;
        self
    }

    /// Validates the draft into a product with the given id
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for a blank name or negative price,
    /// [`CatalogError::UnknownCategory`] for a category outside the list.
    pub fn into_product(self, id: ProductId) -> Result<Product, CatalogError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("product name must not be empty".to_string()));
        }
        if self.price.is_negative() {
            return Err(CatalogError::Validation(format!(
                "product '{name}' has negative price {}",
                self.price
            )));
        }
        let category = self.category.parse::<Category>()?;

        Ok(Product {
            id,
            name: name.to_string(),
            category,
            price: self.price,
            stock_count: self.stock_count,
            image_url: self.image_url.trim().to_string(),
            is_active: self.is_active,
        })
    }
}

/// Read access to the catalog for the aggregation engine
pub trait ProductDirectory {
    /// Number of products, active or not
    fn product_count(&self) -> usize;

    /// Looks up a product by id
    fn find_product(&self, id: &ProductId) -> Option<&Product>;
}

impl ProductDirectory for [Product] {
    fn product_count(&self) -> usize {
        self.len()
    }

    fn find_product(&self, id: &ProductId) -> Option<&Product> {
        self.iter().find(|product| &product.id == id)
    }
}

impl ProductDirectory for Vec<Product> {
    fn product_count(&self) -> usize {
        self.as_slice().product_count()
    }

    fn find_product(&self, id: &ProductId) -> Option<&Product> {
        self.as_slice().find_product(id)
    }
}

/// Products whose name or category contains `query`, ignoring case
#[must_use]
pub fn search_products<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.to_lowercase();
    products
        .iter()
        .filter(|product| {
            product.name.to_lowercase().contains(&needle)
                || product.category.as_str().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Catalog state
#[derive(State, Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogState {
    /// Products in creation order
    pub products: Vec<Product>,
    /// Incremented on every accepted write
    #[version]
    pub revision: Option<Version>,
    /// Error of the most recent command, cleared when a command succeeds
    pub last_error: Option<String>,
}

impl CatalogState {
    /// Catalog holding `products`, in the given order
    #[must_use]
    pub const fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            revision: None,
            last_error: None,
        }
    }

    fn position(&self, id: &ProductId) -> Result<usize, CatalogError> {
        self.products
            .iter()
            .position(|product| &product.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn bump_revision(&mut self) {
        let next = self.revision.unwrap_or(Version::INITIAL).next();
        self.set_version(next);
    }
}

impl ProductDirectory for CatalogState {
    fn product_count(&self) -> usize {
        self.products.product_count()
    }

    fn find_product(&self, id: &ProductId) -> Option<&Product> {
        self.products.find_product(id)
    }
}

/// Catalog commands and the events that resolve them
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CatalogAction {
    // ========== Commands ==========
    /// Command: add a product
    #[command]
    CreateProduct {
        /// Correlation id
        request_id: RequestId,
        /// Id for the new product
        id: ProductId,
        /// Product fields
        draft: ProductDraft,
    },

    /// Command: replace every editable field of a product
    #[command]
    UpdateProduct {
        /// Correlation id
        request_id: RequestId,
        /// Product to edit
        id: ProductId,
        /// New field values
        draft: ProductDraft,
    },

    /// Command: remove a product
    #[command]
    DeleteProduct {
        /// Correlation id
        request_id: RequestId,
        /// Product to remove
        id: ProductId,
    },

    /// Command: toggle the active flag
    #[command]
    SetProductActive {
        /// Correlation id
        request_id: RequestId,
        /// Product to toggle
        id: ProductId,
        /// New flag value
        active: bool,
    },

    // ========== Events ==========
    /// Event: a product was created or changed
    #[event]
    ProductSaved {
        /// Correlation id
        request_id: RequestId,
        /// Product as stored
        product: Product,
    },

    /// Event: a product was removed
    #[event]
    ProductDeleted {
        /// Correlation id
        request_id: RequestId,
        /// Removed product
        product: Product,
    },

    /// Event: a command was rejected
    #[event]
    CatalogRejected {
        /// Correlation id
        request_id: RequestId,
        /// Why
        error: CatalogError,
    },
}

impl CatalogAction {
    /// Request id carried by every variant
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::CreateProduct { request_id, .. }
            | Self::UpdateProduct { request_id, .. }
            | Self::DeleteProduct { request_id, .. }
            | Self::SetProductActive { request_id, .. }
            | Self::ProductSaved { request_id, .. }
            | Self::ProductDeleted { request_id, .. }
            | Self::CatalogRejected { request_id, .. } => *request_id,
        }
    }

    /// True if this is the event that resolves the command `request_id`
    #[must_use]
    pub fn resolves(&self, request_id: RequestId) -> bool {
        self.is_event() && self.request_id() == request_id
    }
}

/// Reducer for the product catalog
#[derive(Clone, Debug, Default)]
pub struct CatalogReducer;

impl CatalogReducer {
    fn create(
        state: &mut CatalogState,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        if state.find_product(&id).is_some() {
            return Err(CatalogError::AlreadyExists(id));
        }
        let product = draft.into_product(id)?;
        state.products.push(product.clone());
        Ok(product)
    }

    fn update(
        state: &mut CatalogState,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        let index = state.position(&id)?;
        let product = draft.into_product(id)?;
        state.products[index] = product.clone();
        Ok(product)
    }

    fn set_active(
        state: &mut CatalogState,
        id: &ProductId,
        active: bool,
    ) -> Result<Product, CatalogError> {
        let index = state.position(id)?;
        let product = &mut state.products[index];
        product.is_active = active;
        Ok(product.clone())
    }

    fn resolve(
        state: &mut CatalogState,
        request_id: RequestId,
        result: Result<CatalogAction, CatalogError>,
    ) -> SmallVec<[Effect<CatalogAction>; 4]> {
        let event = match result {
            Ok(event) => {
                state.bump_revision();
                state.last_error = None;
                event
            },
            Err(error) => {
                tracing::warn!(%error, "Catalog command rejected");
                state.last_error = Some(error.to_string());
                CatalogAction::CatalogRejected { request_id, error }
            },
        };
        smallvec![Effect::feedback(event)]
    }
}

impl Reducer for CatalogReducer {
    type State = CatalogState;
    type Action = CatalogAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CatalogAction::CreateProduct { request_id, id, draft } => {
                let result = Self::create(state, id, draft).map(|product| {
                    tracing::info!(
                        product_id = %product.id,
                        name = %product.name,
                        "Product created"
                    );
                    CatalogAction::ProductSaved { request_id, product }
                });
                Self::resolve(state, request_id, result)
            },
            CatalogAction::UpdateProduct { request_id, id, draft } => {
                let result = Self::update(state, id, draft).map(|product| {
                    tracing::info!(product_id = %product.id, "Product updated");
                    CatalogAction::ProductSaved { request_id, product }
                });
                Self::resolve(state, request_id, result)
            },
            CatalogAction::DeleteProduct { request_id, id } => {
                let result = state.position(&id).map(|index| {
                    let product = state.products.remove(index);
                    tracing::info!(product_id = %product.id, "Product deleted");
                    CatalogAction::ProductDeleted { request_id, product }
                });
                Self::resolve(state, request_id, result)
            },
            CatalogAction::SetProductActive { request_id, id, active } => {
                let result = Self::set_active(state, &id, active)
                    .map(|product| CatalogAction::ProductSaved { request_id, product });
                Self::resolve(state, request_id, result)
            },
            CatalogAction::ProductSaved { .. }
            | CatalogAction::ProductDeleted { .. }
            | CatalogAction::CatalogRejected { .. } => smallvec![Effect::None],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use merchant_console_testing::{assertions, ReducerTest};

    fn product(id: &str, name: &str, category: Category) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category,
            price: Money::from_rupees(40),
            stock_count: 10,
            image_url: String::new(),
            is_active: true,
        }
    }

    fn shelf() -> CatalogState {
        CatalogState::with_products(vec![
            product("p-milk", "Amul Taaza Milk", Category::Dairy),
            product("p-atta", "Aashirvaad Atta", Category::Staples),
            product("p-chips", "Masala Chips", Category::Snacks),
        ])
    }

    #[test]
    fn category_parse() {
        assert_eq!("Bakery".parse::<Category>().unwrap(), Category::Bakery);
        assert_eq!(
            "Frozen".parse::<Category>(),
            Err(CatalogError::UnknownCategory("Frozen".to_string()))
        );
    }

    #[test]
    fn search_matches_name_or_category_ignoring_case() {
        let state = shelf();
        let names = |query| -> Vec<String> {
            search_products(&state.products, query)
                .iter()
                .map(|p| p.name.clone())
                .collect()
        };

        assert_eq!(names("MILK"), ["Amul Taaza Milk"]);
        assert_eq!(names("staples"), ["Aashirvaad Atta"]);
        assert_eq!(names("").len(), 3);
        assert!(names("soap").is_empty());
    }

    #[test]
    fn directory_lookup() {
        let state = shelf();
        assert_eq!(state.product_count(), 3);
        assert!(state.find_product(&ProductId::new("p-atta")).is_some());
        assert!(state.find_product(&ProductId::new("p-gone")).is_none());
    }

    #[test]
    fn create_appends_product() {
        let request_id = RequestId::new();

        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::CreateProduct {
                request_id,
                id: ProductId::new("p-bread"),
                draft: ProductDraft::new("  Brown Bread ", "Bakery", Money::from_rupees(45))
                    .with_stock(12),
            })
            .then_state(|state| {
                assert_eq!(state.products.len(), 4);
                let bread = &state.products[3];
                assert_eq!(bread.name, "Brown Bread");
                assert_eq!(bread.category, Category::Bakery);
                assert_eq!(bread.stock_count, 12);
                assert_eq!(state.version(), Some(Version::new(1)));
            })
            .then_feedback(move |actions| {
                assert!(actions[0].resolves(request_id));
                assert!(matches!(actions[0], CatalogAction::ProductSaved { .. }));
            })
            .run();
    }

    #[test]
    fn create_rejects_duplicate_and_bad_category() {
        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::CreateProduct {
                request_id: RequestId::new(),
                id: ProductId::new("p-milk"),
                draft: ProductDraft::new("Milk", "Dairy", Money::from_rupees(30)),
            })
            .then_state(|state| {
                assert_eq!(state.products.len(), 3);
                assert!(state.last_error.is_some());
                assert_eq!(state.version(), None);
            })
            .then_feedback(|actions| {
                assert!(matches!(
                    &actions[0],
                    CatalogAction::CatalogRejected {
                        error: CatalogError::AlreadyExists(_),
                        ..
                    }
                ));
            })
            .run();

        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::CreateProduct {
                request_id: RequestId::new(),
                id: ProductId::new("p-ice"),
                draft: ProductDraft::new("Ice Cream", "Frozen", Money::from_rupees(30)),
            })
            .then_state(|state| assert_eq!(state.products.len(), 3))
            .then_feedback(|actions| {
                assert!(matches!(
                    &actions[0],
                    CatalogAction::CatalogRejected {
                        error: CatalogError::UnknownCategory(_),
                        ..
                    }
                ));
            })
            .run();
    }

    #[test]
    fn update_replaces_fields_in_place() {
        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::UpdateProduct {
                request_id: RequestId::new(),
                id: ProductId::new("p-atta"),
                draft: ProductDraft::new(
                    "Aashirvaad Atta 10kg",
                    "Staples",
                    Money::from_rupees(480),
                ),
            })
            .then_state(|state| {
                let atta = &state.products[1];
                assert_eq!(atta.id, ProductId::new("p-atta"));
                assert_eq!(atta.name, "Aashirvaad Atta 10kg");
                assert_eq!(atta.price, Money::from_rupees(480));
            })
            .run();
    }

    #[test]
    fn delete_and_missing_ids() {
        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::DeleteProduct {
                request_id: RequestId::new(),
                id: ProductId::new("p-milk"),
            })
            .then_state(|state| {
                assert_eq!(state.products.len(), 2);
                assert!(state.find_product(&ProductId::new("p-milk")).is_none());
            })
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();

        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::SetProductActive {
                request_id: RequestId::new(),
                id: ProductId::new("p-gone"),
                active: false,
            })
            .then_state(|state| {
                assert!(state.products.iter().all(|p| p.is_active));
                assert!(state.last_error.as_deref().unwrap().contains("p-gone"));
            })
            .run();
    }

    #[test]
    fn set_active_toggles_flag() {
        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(shelf())
            .when_action(CatalogAction::SetProductActive {
                request_id: RequestId::new(),
                id: ProductId::new("p-chips"),
                active: false,
            })
            .then_state(|state| {
                assert!(!state.products[2].is_active);
                assert_eq!(state.product_count(), 3);
            })
            .run();
    }

    #[test]
    fn success_clears_previous_error() {
        let mut state = shelf();
        state.last_error = Some("product p-gone not found".to_string());

        ReducerTest::new(CatalogReducer)
            .with_env(())
            .given_state(state)
            .when_action(CatalogAction::SetProductActive {
                request_id: RequestId::new(),
                id: ProductId::new("p-milk"),
                active: false,
            })
            .then_state(|state| {
                assert_eq!(state.last_error, None);
                assert!(!state.products[0].is_active);
            })
            .run();
    }
}
