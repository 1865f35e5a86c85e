//! ShopApi - named operations for the Glowcart app screens
//!
//! Every operation goes through [`ApiClient`], so authenticated calls pick up
//! the current access token and recover from expiry transparently. Login and
//! register store the returned tokens; logout forgets them.
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_client::{ApiClient, ApiClientConfig, ShopApi};
//! use shop_client::models::ProductQuery;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ApiClientConfig::default())?;
//!     let shop = ShopApi::new(client);
//!
//!     let auth = shop.login("nadia@example.com", "correct horse").await?;
//!     println!("Signed in as {:?}", auth.user.name);
//!
//!     let page = shop.products(&ProductQuery::new().search("serum")).await?;
//!     println!("{} products", page.items.len());
//!
//!     Ok(())
//! }
//! ```

use crate::client::ApiClient;
use crate::http::ApiRequest;
use crate::models::{
    Address, AddressInput, AiProfileResponse, AnalyzeRequest, Attributes, AuthResponse, Cart,
    CartPricing, Category, CheckoutRequest, CheckoutResponse, Created, FaceAnalysis, HomeFeed,
    Items, LineItem, LoginRequest, NewReview, OkResponse, OrderDetail, OrderSummary,
    PaymentIntent, PaymentIntentRequest, PriceRequest, ProductDetail, ProductPage, ProductQuery,
    ProductSummary, QuantityRequest, Recommendations, RegisterRequest, Review, User, UserEnvelope,
};
use crate::Result;
use base64::Engine;

/// Percent-encode a caller-supplied path segment
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// High-level client for the shop API
#[derive(Clone)]
pub struct ShopApi {
    client: ApiClient,
}

impl ShopApi {
    /// Wrap an authenticated client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Whether tokens are currently held
    pub fn is_authenticated(&self) -> bool {
        self.client.store().is_authenticated()
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Create an account and sign in
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let request = ApiRequest::post("/auth/register")
            .json_body(&RegisterRequest { name, email, password })?
            .without_refresh();

        self.authenticate(request).await
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = ApiRequest::post("/auth/login")
            .json_body(&LoginRequest { email, password })?
            .without_refresh();

        self.authenticate(request).await
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<AuthResponse> {
        let auth: AuthResponse = self.client.fetch_json(request).await?;
        self.client
            .store()
            .set_tokens(auth.access_token.clone(), auth.refresh_token.clone());

        tracing::info!("Signed in as user {}", auth.user.id);

        Ok(auth)
    }

    /// Fetch the signed-in account
    pub async fn me(&self) -> Result<User> {
        let envelope: UserEnvelope = self.client.fetch_json(ApiRequest::get("/auth/me")).await?;
        Ok(envelope.user)
    }

    /// Forget the stored tokens
    pub fn logout(&self) {
        self.client.store().clear();
        tracing::info!("Signed out");
    }

    /// Ask for a password reset email
    pub async fn request_password_reset(&self, email: &str) -> Result<OkResponse> {
        let request = ApiRequest::post("/auth/password/request-reset")
            .json_body(&serde_json::json!({ "email": email }))?;
        self.client.fetch_json(request).await
    }

    /// Set a new password with a reset token
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<OkResponse> {
        let request = ApiRequest::post("/auth/password/reset")
            .json_body(&serde_json::json!({ "token": token, "password": password }))?;
        self.client.fetch_json(request).await
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// List categories
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let list: Items<Category> = self.client.fetch_json(ApiRequest::get("/categories")).await?;
        Ok(list.items)
    }

    /// Face attribute vocabulary
    pub async fn attributes(&self) -> Result<Attributes> {
        self.client.fetch_json(ApiRequest::get("/attributes")).await
    }

    /// List products
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let mut request = ApiRequest::get("/products");
        for (key, value) in query.to_params() {
            request = request.query(key, value);
        }
        self.client.fetch_json(request).await
    }

    /// Fetch a product by ID or slug
    pub async fn product(&self, id_or_slug: &str) -> Result<ProductDetail> {
        let path = format!("/products/{}", segment(id_or_slug));
        self.client.fetch_json(ApiRequest::get(path)).await
    }

    /// Products from the same category
    pub async fn related_products(&self, product_id: &str) -> Result<Vec<ProductSummary>> {
        let path = format!("/products/{}/related", segment(product_id));
        let list: Items<ProductSummary> = self.client.fetch_json(ApiRequest::get(path)).await?;
        Ok(list.items)
    }

    /// Full-text product search
    ///
    /// Blank queries return nothing without a round trip.
    pub async fn search(&self, q: &str) -> Result<Vec<ProductSummary>> {
        let q = q.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let list: Items<ProductSummary> =
            self.client.fetch_json(ApiRequest::get("/search").query("q", q)).await?;
        Ok(list.items)
    }

    /// Home screen rails
    pub async fn home(&self) -> Result<HomeFeed> {
        self.client.fetch_json(ApiRequest::get("/home")).await
    }

    // -------------------------------------------------------------------------
    // Reviews
    // -------------------------------------------------------------------------

    /// Reviews for a product, newest first
    pub async fn reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        let path = format!("/products/{}/reviews", segment(product_id));
        let list: Items<Review> = self.client.fetch_json(ApiRequest::get(path)).await?;
        Ok(list.items)
    }

    /// Post a review, returning its ID
    pub async fn create_review(&self, product_id: &str, review: &NewReview) -> Result<String> {
        let path = format!("/products/{}/reviews", segment(product_id));
        let created: Created =
            self.client.fetch_json(ApiRequest::post(path).json_body(review)?).await?;
        Ok(created.id)
    }

    /// Delete one of the user's reviews
    pub async fn delete_review(&self, review_id: &str) -> Result<OkResponse> {
        let path = format!("/reviews/{}", segment(review_id));
        self.client.fetch_json(ApiRequest::delete(path)).await
    }

    // -------------------------------------------------------------------------
    // Wishlist
    // -------------------------------------------------------------------------

    /// Wishlisted products
    pub async fn wishlist(&self) -> Result<Vec<ProductSummary>> {
        let list: Items<ProductSummary> =
            self.client.fetch_json(ApiRequest::get("/wishlist")).await?;
        Ok(list.items)
    }

    /// Add a product to the wishlist
    pub async fn add_to_wishlist(&self, product_id: &str) -> Result<OkResponse> {
        let path = format!("/wishlist/{}", segment(product_id));
        self.client.fetch_json(ApiRequest::post(path)).await
    }

    /// Remove a product from the wishlist
    pub async fn remove_from_wishlist(&self, product_id: &str) -> Result<OkResponse> {
        let path = format!("/wishlist/{}", segment(product_id));
        self.client.fetch_json(ApiRequest::delete(path)).await
    }

    // -------------------------------------------------------------------------
    // Addresses
    // -------------------------------------------------------------------------

    /// Saved addresses
    pub async fn addresses(&self) -> Result<Vec<Address>> {
        let list: Items<Address> = self.client.fetch_json(ApiRequest::get("/addresses")).await?;
        Ok(list.items)
    }

    /// Save a new address
    pub async fn add_address(&self, address: &AddressInput) -> Result<Address> {
        let request = ApiRequest::post("/addresses").json_body(address)?;
        self.client.fetch_json(request).await
    }

    /// Update an address; unset fields keep their stored values
    pub async fn update_address(&self, address_id: &str, address: &AddressInput) -> Result<OkResponse> {
        let path = format!("/addresses/{}", segment(address_id));
        self.client.fetch_json(ApiRequest::put(path).json_body(address)?).await
    }

    /// Delete an address
    pub async fn delete_address(&self, address_id: &str) -> Result<OkResponse> {
        let path = format!("/addresses/{}", segment(address_id));
        self.client.fetch_json(ApiRequest::delete(path)).await
    }

    // -------------------------------------------------------------------------
    // Cart and checkout
    // -------------------------------------------------------------------------

    /// The signed-in user's cart with pricing
    pub async fn cart(&self) -> Result<Cart> {
        self.client.fetch_json(ApiRequest::get("/cart")).await
    }

    /// Add units of a product; quantities merge with an existing line
    pub async fn add_to_cart(&self, product_id: &str, qty: u32) -> Result<OkResponse> {
        let request = ApiRequest::post("/cart").json_body(&LineItem::new(product_id, qty))?;
        self.client.fetch_json(request).await
    }

    /// Set a line's quantity; zero removes the line
    pub async fn update_cart_item(&self, product_id: &str, qty: u32) -> Result<OkResponse> {
        let path = format!("/cart/items/{}", segment(product_id));
        let request = ApiRequest::put(path).json_body(&QuantityRequest { qty })?;
        self.client.fetch_json(request).await
    }

    /// Remove a line
    pub async fn remove_cart_item(&self, product_id: &str) -> Result<OkResponse> {
        let path = format!("/cart/items/{}", segment(product_id));
        self.client.fetch_json(ApiRequest::delete(path)).await
    }

    /// Empty the cart
    pub async fn clear_cart(&self) -> Result<OkResponse> {
        self.client.fetch_json(ApiRequest::post("/cart/clear")).await
    }

    /// Price arbitrary items (guest carts)
    pub async fn price_cart(&self, items: &[LineItem]) -> Result<CartPricing> {
        let request = ApiRequest::post("/cart/price").json_body(&PriceRequest { items })?;
        self.client.fetch_json(request).await
    }

    /// Place an order
    pub async fn checkout(&self, checkout: &CheckoutRequest) -> Result<CheckoutResponse> {
        let request = ApiRequest::post("/checkout").json_body(checkout)?;
        let response: CheckoutResponse = self.client.fetch_json(request).await?;

        tracing::info!("Placed order {} ({})", response.order_no, response.status);

        Ok(response)
    }

    /// Create a payment intent for an amount
    pub async fn create_payment_intent(&self, amount: f64) -> Result<PaymentIntent> {
        let request =
            ApiRequest::post("/payments/create-intent").json_body(&PaymentIntentRequest { amount })?;
        self.client.fetch_json(request).await
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Order history, newest first
    pub async fn orders(&self) -> Result<Vec<OrderSummary>> {
        let list: Items<OrderSummary> = self.client.fetch_json(ApiRequest::get("/orders")).await?;
        Ok(list.items)
    }

    /// Fetch one order
    pub async fn order(&self, order_id: &str) -> Result<OrderDetail> {
        let path = format!("/orders/{}", segment(order_id));
        self.client.fetch_json(ApiRequest::get(path)).await
    }

    /// Cancel a pending or processing order
    pub async fn cancel_order(&self, order_id: &str) -> Result<OkResponse> {
        let path = format!("/orders/{}/cancel", segment(order_id));
        self.client.fetch_json(ApiRequest::post(path)).await
    }

    // -------------------------------------------------------------------------
    // AI
    // -------------------------------------------------------------------------

    /// The user's stored face analysis
    pub async fn ai_profile(&self) -> Result<AiProfileResponse> {
        self.client.fetch_json(ApiRequest::get("/ai/profile")).await
    }

    /// Delete the stored face analysis
    pub async fn delete_ai_profile(&self) -> Result<OkResponse> {
        self.client.fetch_json(ApiRequest::delete("/ai/profile")).await
    }

    /// Analyze a face photo
    ///
    /// Signed-in users get the result saved to their profile.
    pub async fn analyze_face(&self, image: &[u8]) -> Result<FaceAnalysis> {
        let body = AnalyzeRequest {
            image_base64: base64::engine::general_purpose::STANDARD.encode(image),
        };
        let request = ApiRequest::post("/ai/analyze").json_body(&body)?;
        self.client.fetch_json(request).await
    }

    /// Product recommendations
    ///
    /// The server prefers the stored profile; otherwise the supplied skin
    /// type and concerns are used, and with neither it returns generic picks.
    pub async fn recommendations(
        &self,
        skin_type: Option<&str>,
        concerns: &[&str],
    ) -> Result<Recommendations> {
        let concerns: Vec<&str> = concerns
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        let request = ApiRequest::get("/recommendations")
            .query_opt("skin_type", skin_type.filter(|s| !s.trim().is_empty()))
            .query_opt(
                "concerns",
                (!concerns.is_empty()).then(|| concerns.join(",")),
            );

        self.client.fetch_json(request).await
    }
}
