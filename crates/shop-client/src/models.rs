//! Request and response bodies for the shop API
//!
//! The server omits or nulls many fields, so most response fields are
//! optional or defaulted. Loosely structured AI payloads stay as
//! [`serde_json::Value`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default currency reported by the server
pub const DEFAULT_CURRENCY: &str = "LKR";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// `{ "items": [...] }` list envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Items<T> {
    /// Listed entries
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `{ "ok": true }` acknowledgement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    /// Whether the server applied the change
    #[serde(default)]
    pub ok: bool,
}

/// `{ "id": ... }` creation acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    /// Identifier of the created record
    pub id: String,
}

// =============================================================================
// Auth
// =============================================================================

/// Account as returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Role ("user" or "admin")
    #[serde(default = "default_role")]
    pub role: String,
    /// Whether the account may sign in
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_true() -> bool {
    true
}

/// Login/register response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Short-lived access token
    pub access_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Signed-in account
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

// =============================================================================
// Catalog
// =============================================================================

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
    /// Item types offered in this category
    #[serde(default)]
    pub item_types: Vec<String>,
}

/// Face attribute vocabulary used by filters and recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Known skin types
    #[serde(default)]
    pub skin_types: Vec<String>,
    /// Known skin concerns
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// Product as it appears in lists, search and recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Product ID
    pub id: String,
    /// Product name
    #[serde(default)]
    pub name: Option<String>,
    /// Brand
    #[serde(default)]
    pub brand: Option<String>,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Absolute image URL
    #[serde(default)]
    pub hero_image: Option<String>,
    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
    /// Stock keeping unit
    #[serde(default)]
    pub sku: Option<String>,
    /// Units in stock
    #[serde(default)]
    pub stock: Option<i64>,
    /// Category name
    #[serde(default)]
    pub category: Option<String>,
    /// Item type within the category
    #[serde(default)]
    pub item_type: Option<String>,
}

/// Full product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    /// Product ID
    pub id: String,
    /// Product name
    #[serde(default)]
    pub name: Option<String>,
    /// Brand
    #[serde(default)]
    pub brand: Option<String>,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Units in stock
    #[serde(default)]
    pub stock: i64,
    /// Publication status
    #[serde(default)]
    pub status: Option<String>,
    /// Absolute image URL
    #[serde(default)]
    pub hero_image: Option<String>,
    /// Additional image URLs
    #[serde(default)]
    pub gallery: Vec<String>,
    /// Image alt text
    #[serde(default)]
    pub alt_text: Option<String>,
    /// One-line description
    #[serde(default)]
    pub short_description: Option<String>,
    /// Rich description
    #[serde(default)]
    pub description_html: Option<String>,
    /// Stock keeping unit
    #[serde(default)]
    pub sku: Option<String>,
    /// Category name
    #[serde(default)]
    pub category: Option<String>,
    /// Item type within the category
    #[serde(default)]
    pub item_type: Option<String>,
    /// Skin types the product suits
    #[serde(default)]
    pub skin_types: Vec<String>,
    /// Concerns the product targets
    #[serde(default)]
    pub concerns: Vec<String>,
    /// Size or volume label
    #[serde(default)]
    pub size_volume: Option<String>,
    /// Country of origin
    #[serde(default)]
    pub country_of_origin: Option<String>,
    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Average review rating
    #[serde(default)]
    pub rating_avg: f64,
    /// Number of reviews
    #[serde(default)]
    pub rating_count: u32,
}

/// One page of products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products on this page
    #[serde(default)]
    pub items: Vec<ProductSummary>,
    /// One-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size used by the server
    #[serde(default)]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

/// Sort order for product listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    /// Most recent first (server default)
    Newest,
    /// Cheapest first
    PriceAscending,
    /// Most expensive first
    PriceDescending,
    /// A to Z
    NameAscending,
    /// Z to A
    NameDescending,
}

impl ProductSort {
    /// Value of the `sort` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::Newest => "-created_at",
            ProductSort::PriceAscending => "price",
            ProductSort::PriceDescending => "-price",
            ProductSort::NameAscending => "name",
            ProductSort::NameDescending => "-name",
        }
    }
}

/// Product listing filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Full-text search
    pub q: Option<String>,
    /// Category ID or name
    pub category: Option<String>,
    /// Item type
    pub item_type: Option<String>,
    /// Concern the product must target
    pub concern: Option<String>,
    /// Skin type the product must suit
    pub skin_type: Option<String>,
    /// One-based page
    pub page: Option<u32>,
    /// Page size (the server caps this at 100)
    pub per_page: Option<u32>,
    /// Sort order
    pub sort: Option<ProductSort>,
}

impl ProductQuery {
    /// Empty query (first page, newest first)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search text
    pub fn search(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Filter by category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filter by item type
    pub fn item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// Filter by concern
    pub fn concern(mut self, concern: impl Into<String>) -> Self {
        self.concern = Some(concern.into());
        self
    }

    /// Filter by skin type
    pub fn skin_type(mut self, skin_type: impl Into<String>) -> Self {
        self.skin_type = Some(skin_type.into());
        self
    }

    /// Select a page
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// Set the sort order
    pub fn sort(mut self, sort: ProductSort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Query parameters in a stable order, skipping unset and blank filters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let text = [
            ("q", &self.q),
            ("category", &self.category),
            ("item_type", &self.item_type),
            ("concern", &self.concern),
            ("skin_type", &self.skin_type),
        ];

        let mut params: Vec<(String, String)> = text
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect();

        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.as_str().to_string()));
        }

        params
    }
}

/// Home screen rails
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    /// Latest products
    #[serde(default)]
    pub new_arrivals: Vec<ProductSummary>,
    /// Best reviewed products
    #[serde(default)]
    pub top_rated: Vec<ProductSummary>,
    /// Affordable picks
    #[serde(default)]
    pub budget_picks: Vec<ProductSummary>,
}

// =============================================================================
// Reviews
// =============================================================================

/// Product review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID
    pub id: String,
    /// Rating from 1 to 5
    pub rating: u8,
    /// Headline
    #[serde(default)]
    pub title: Option<String>,
    /// Review text
    #[serde(default)]
    pub body: Option<String>,
    /// Author display name
    #[serde(default)]
    pub user_name: Option<String>,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Review to post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    /// Rating from 1 to 5
    pub rating: u8,
    /// Headline
    pub title: String,
    /// Review text
    pub body: String,
}

// =============================================================================
// Addresses
// =============================================================================

/// Saved shipping address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Address ID
    pub id: String,
    /// Recipient name
    #[serde(default)]
    pub name: String,
    /// First address line
    #[serde(default)]
    pub line1: String,
    /// Second address line
    #[serde(default)]
    pub line2: String,
    /// City
    #[serde(default)]
    pub city: String,
    /// Region or province
    #[serde(default)]
    pub region: String,
    /// Postal code
    #[serde(default)]
    pub postal_code: String,
    /// ISO country code
    #[serde(default)]
    pub country: String,
    /// Contact phone
    #[serde(default)]
    pub phone: String,
    /// Whether this is the default address
    #[serde(default)]
    pub is_default: bool,
}

/// Address fields to create or update
///
/// Unset fields are omitted, so an update keeps their stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    /// Recipient name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// First address line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    /// Second address line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Region or province
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Postal code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO country code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Contact phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Make this the default address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

// =============================================================================
// Cart and checkout
// =============================================================================

/// Product and quantity, as sent for pricing and guest checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product ID
    pub product_id: String,
    /// Quantity
    pub qty: u32,
}

impl LineItem {
    /// Create a line item
    pub fn new(product_id: impl Into<String>, qty: u32) -> Self {
        Self { product_id: product_id.into(), qty }
    }
}

/// Priced cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    /// Product ID
    pub product_id: String,
    /// Product name
    #[serde(default)]
    pub name: Option<String>,
    /// Stock keeping unit
    #[serde(default)]
    pub sku: Option<String>,
    /// Quantity
    pub qty: u32,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// `price * qty`
    #[serde(default)]
    pub subtotal: f64,
    /// Absolute image URL
    #[serde(default)]
    pub hero_image: Option<String>,
}

/// Cart totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPricing {
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Priced lines
    #[serde(default)]
    pub items: Vec<PricedItem>,
    /// Sum of line subtotals
    #[serde(default)]
    pub subtotal: f64,
    /// Tax
    #[serde(default)]
    pub tax_total: f64,
    /// Shipping
    #[serde(default)]
    pub shipping_total: f64,
    /// Amount due
    #[serde(default)]
    pub total: f64,
}

/// Signed-in user's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Priced lines
    #[serde(default)]
    pub items: Vec<PricedItem>,
    /// Totals
    pub pricing: CartPricing,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuantityRequest {
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PriceRequest<'a> {
    pub items: &'a [LineItem],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PaymentIntentRequest {
    pub amount: f64,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery
    #[default]
    Cod,
    /// Card payment
    Card,
}

/// Checkout request
///
/// Signed-in users may leave `items` empty to check out their cart; guests
/// must send items and an email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Lines to order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub items: Vec<LineItem>,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Shipping address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressInput>,
    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Checkout result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// Order ID
    pub order_id: String,
    /// Human-readable order number
    pub order_no: String,
    /// Initial order status
    pub status: String,
}

/// Mock payment intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Client secret for the payment sheet
    pub client_secret: String,
    /// Charged amount
    pub amount: f64,
}

// =============================================================================
// Orders
// =============================================================================

/// Order in the order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Order ID
    pub id: String,
    /// Human-readable order number
    #[serde(default)]
    pub order_no: Option<String>,
    /// Status
    #[serde(default)]
    pub status: Option<String>,
    /// Amount charged
    #[serde(default)]
    pub total: Option<f64>,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Full order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    /// Order ID
    pub id: String,
    /// Human-readable order number
    #[serde(default)]
    pub order_no: Option<String>,
    /// Status
    #[serde(default)]
    pub status: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Contact name
    #[serde(default)]
    pub name: Option<String>,
    /// Priced lines
    #[serde(default)]
    pub items: Vec<PricedItem>,
    /// Sum of line subtotals
    #[serde(default)]
    pub subtotal: f64,
    /// Shipping
    #[serde(default)]
    pub shipping_total: f64,
    /// Tax
    #[serde(default)]
    pub tax_total: f64,
    /// Amount charged
    #[serde(default)]
    pub total: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Shipping address as submitted
    #[serde(default)]
    pub shipping_address: Value,
    /// Payment method
    #[serde(default)]
    pub payment_method: Option<String>,
}

// =============================================================================
// AI
// =============================================================================

/// Stored face analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProfileResponse {
    /// Whether an analysis exists
    pub has_profile: bool,
    /// Server hint when there is no profile
    #[serde(default)]
    pub message: Option<String>,
    /// Profile document
    #[serde(default)]
    pub profile: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyzeRequest {
    pub image_base64: String,
}

/// Face analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysis {
    /// Whether the analysis was saved to the user's profile
    #[serde(default)]
    pub saved: bool,
    /// Server path of the uploaded image
    #[serde(default)]
    pub image_path: Option<String>,
    /// Absolute URL of the uploaded image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Raw model output
    #[serde(default)]
    pub result: Value,
    /// Concerns merged across models
    #[serde(default)]
    pub merged: Value,
}

/// Recommended product with its match score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    /// Product
    #[serde(flatten)]
    pub product: ProductSummary,
    /// Match score
    #[serde(default)]
    pub score: f64,
    /// Signals the product matched
    #[serde(default)]
    pub matches: Vec<String>,
}

/// Recommendations, personalized or generic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Whether the picks used the user's profile or supplied signals
    #[serde(default)]
    pub personalized: bool,
    /// Why generic picks were returned
    #[serde(default)]
    pub reason: Option<String>,
    /// Skin type used for scoring
    #[serde(default)]
    pub skin_type: Option<String>,
    /// Concerns used for scoring
    #[serde(default)]
    pub signals: Vec<String>,
    /// Personalized picks
    #[serde(default)]
    pub items: Vec<ScoredProduct>,
    /// Generic picks: latest products
    #[serde(default)]
    pub new_arrivals: Vec<ProductSummary>,
    /// Generic picks: best reviewed
    #[serde(default)]
    pub top_rated: Vec<ProductSummary>,
}
