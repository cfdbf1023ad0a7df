//! Scripted [`StorefrontApi`] double for controller tests.
//!
//! Responses are queued per method; when a queue runs dry the method
//! answers with an empty-but-successful default. Every call bumps a named
//! counter so tests can assert how many requests an interaction produced.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use webstore_core::{ProductId, UserGuid, VariantId, ZoneId};

use crate::api::types::{
    Cart, CartPayload, CheckoutState, CityZone, OtpChallenge, Product, ZipcodeMatch, ZoneMatch,
};
use crate::api::StorefrontApi;
use crate::error::ApiError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Scripts {
    cart: VecDeque<Result<Cart, ApiError>>,
    quantity: VecDeque<Result<u32, ApiError>>,
    add: VecDeque<Result<CartPayload, ApiError>>,
    update_line: VecDeque<Result<CartPayload, ApiError>>,
    update_item: VecDeque<Result<CartPayload, ApiError>>,
    remove_line: VecDeque<Result<CartPayload, ApiError>>,
    remove_item: VecDeque<Result<CartPayload, ApiError>>,
    product: VecDeque<Result<Product, ApiError>>,
    wishlist: VecDeque<Result<bool, ApiError>>,
    checkout: VecDeque<Result<CheckoutState, ApiError>>,
    zipcodes: VecDeque<Result<Vec<ZipcodeMatch>, ApiError>>,
    zone: VecDeque<Result<ZoneMatch, ApiError>>,
    cities: VecDeque<Result<Vec<CityZone>, ApiError>>,
    select_zone: VecDeque<Result<(), ApiError>>,
    login: VecDeque<Result<(), ApiError>>,
    send_otp: VecDeque<Result<OtpChallenge, ApiError>>,
    verify_otp: VecDeque<Result<(), ApiError>>,
    section: VecDeque<Result<serde_json::Value, ApiError>>,
}

/// Scripted storefront backend.
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<Scripts>,
    counters: Mutex<HashMap<&'static str, u32>>,
    quantity_delay: Mutex<Option<Duration>>,
    /// Arguments of the most recent `add_to_cart` call.
    pub last_add: Mutex<Option<(ProductId, Option<VariantId>, u32)>>,
    /// Arguments of the most recent `select_zone` call.
    pub last_select_zone: Mutex<Option<(ZoneId, Option<String>)>>,
    /// Arguments of the most recent OTP verification call.
    pub last_verify: Mutex<Option<(Option<UserGuid>, String)>>,
}

impl ScriptedApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `method` was called.
    pub fn calls(&self, method: &str) -> u32 {
        lock(&self.counters).get(method).copied().unwrap_or(0)
    }

    fn bump(&self, method: &'static str) {
        *lock(&self.counters).entry(method).or_insert(0) += 1;
    }

    /// Make every `cart_quantity` fetch take this long.
    pub fn set_quantity_delay(&self, delay: Duration) {
        *lock(&self.quantity_delay) = Some(delay);
    }

    pub fn push_cart(&self, result: Result<Cart, ApiError>) {
        lock(&self.scripts).cart.push_back(result);
    }

    pub fn push_quantity(&self, result: Result<u32, ApiError>) {
        lock(&self.scripts).quantity.push_back(result);
    }

    pub fn push_add(&self, result: Result<CartPayload, ApiError>) {
        lock(&self.scripts).add.push_back(result);
    }

    pub fn push_update_line(&self, result: Result<CartPayload, ApiError>) {
        lock(&self.scripts).update_line.push_back(result);
    }

    pub fn push_update_item(&self, result: Result<CartPayload, ApiError>) {
        lock(&self.scripts).update_item.push_back(result);
    }

    pub fn push_remove_line(&self, result: Result<CartPayload, ApiError>) {
        lock(&self.scripts).remove_line.push_back(result);
    }

    pub fn push_remove_item(&self, result: Result<CartPayload, ApiError>) {
        lock(&self.scripts).remove_item.push_back(result);
    }

    pub fn push_product(&self, result: Result<Product, ApiError>) {
        lock(&self.scripts).product.push_back(result);
    }

    pub fn push_wishlist(&self, result: Result<bool, ApiError>) {
        lock(&self.scripts).wishlist.push_back(result);
    }

    pub fn push_checkout(&self, result: Result<CheckoutState, ApiError>) {
        lock(&self.scripts).checkout.push_back(result);
    }

    pub fn push_zipcodes(&self, result: Result<Vec<ZipcodeMatch>, ApiError>) {
        lock(&self.scripts).zipcodes.push_back(result);
    }

    pub fn push_zone(&self, result: Result<ZoneMatch, ApiError>) {
        lock(&self.scripts).zone.push_back(result);
    }

    pub fn push_cities(&self, result: Result<Vec<CityZone>, ApiError>) {
        lock(&self.scripts).cities.push_back(result);
    }

    pub fn push_select_zone(&self, result: Result<(), ApiError>) {
        lock(&self.scripts).select_zone.push_back(result);
    }

    pub fn push_login(&self, result: Result<(), ApiError>) {
        lock(&self.scripts).login.push_back(result);
    }

    pub fn push_send_otp(&self, result: Result<OtpChallenge, ApiError>) {
        lock(&self.scripts).send_otp.push_back(result);
    }

    pub fn push_verify_otp(&self, result: Result<(), ApiError>) {
        lock(&self.scripts).verify_otp.push_back(result);
    }

    pub fn push_section(&self, result: Result<serde_json::Value, ApiError>) {
        lock(&self.scripts).section.push_back(result);
    }
}

impl StorefrontApi for ScriptedApi {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.bump("get_cart");
        lock(&self.scripts)
            .cart
            .pop_front()
            .unwrap_or_else(|| Ok(Cart::default()))
    }

    async fn cart_quantity(&self) -> Result<u32, ApiError> {
        self.bump("cart_quantity");
        let delay = *lock(&self.quantity_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.scripts)
            .quantity
            .pop_front()
            .unwrap_or(Ok(0))
    }

    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        self.bump("add_to_cart");
        *lock(&self.last_add) = Some((product_id.clone(), variant_id.cloned(), quantity));
        lock(&self.scripts)
            .add
            .pop_front()
            .unwrap_or_else(|| Ok(CartPayload::default()))
    }

    async fn update_cart_line(
        &self,
        _product_id: &ProductId,
        _variant_id: Option<&VariantId>,
        _quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        self.bump("update_cart_line");
        lock(&self.scripts)
            .update_line
            .pop_front()
            .unwrap_or_else(|| Ok(CartPayload::default()))
    }

    async fn update_cart_item(
        &self,
        _product_id: &ProductId,
        _quantity: u32,
    ) -> Result<CartPayload, ApiError> {
        self.bump("update_cart_item");
        lock(&self.scripts)
            .update_item
            .pop_front()
            .unwrap_or_else(|| Ok(CartPayload::default()))
    }

    async fn remove_cart_line(
        &self,
        _product_id: &ProductId,
        _variant_id: Option<&VariantId>,
    ) -> Result<CartPayload, ApiError> {
        self.bump("remove_cart_line");
        lock(&self.scripts)
            .remove_line
            .pop_front()
            .unwrap_or_else(|| Ok(CartPayload::default()))
    }

    async fn remove_cart_item(&self, _product_id: &ProductId) -> Result<CartPayload, ApiError> {
        self.bump("remove_cart_item");
        lock(&self.scripts)
            .remove_item
            .pop_front()
            .unwrap_or_else(|| Ok(CartPayload::default()))
    }

    async fn get_product(&self, _product_id: &ProductId) -> Result<Product, ApiError> {
        self.bump("get_product");
        lock(&self.scripts)
            .product
            .pop_front()
            .unwrap_or_else(|| Ok(Product::default()))
    }

    async fn toggle_wishlist(&self, _product_id: &ProductId) -> Result<bool, ApiError> {
        self.bump("toggle_wishlist");
        lock(&self.scripts).wishlist.pop_front().unwrap_or(Ok(true))
    }

    async fn get_checkout(&self) -> Result<CheckoutState, ApiError> {
        self.bump("get_checkout");
        lock(&self.scripts)
            .checkout
            .pop_front()
            .unwrap_or_else(|| Ok(CheckoutState::default()))
    }

    async fn search_zipcodes(&self, _query: &str) -> Result<Vec<ZipcodeMatch>, ApiError> {
        self.bump("search_zipcodes");
        lock(&self.scripts)
            .zipcodes
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn zone_by_zipcode(&self, _zipcode: &str) -> Result<ZoneMatch, ApiError> {
        self.bump("zone_by_zipcode");
        lock(&self.scripts)
            .zone
            .pop_front()
            .unwrap_or_else(|| Ok(ZoneMatch::default()))
    }

    async fn list_cities(&self) -> Result<Vec<CityZone>, ApiError> {
        self.bump("list_cities");
        lock(&self.scripts)
            .cities
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn select_zone(&self, zone_id: &ZoneId, zipcode: Option<&str>) -> Result<(), ApiError> {
        self.bump("select_zone");
        *lock(&self.last_select_zone) = Some((zone_id.clone(), zipcode.map(str::to_string)));
        lock(&self.scripts)
            .select_zone
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn login(
        &self,
        _username: &str,
        _password: &SecretString,
        _remember: bool,
    ) -> Result<(), ApiError> {
        self.bump("login");
        lock(&self.scripts).login.pop_front().unwrap_or(Ok(()))
    }

    async fn send_email_otp(&self, _email: &str) -> Result<OtpChallenge, ApiError> {
        self.bump("send_email_otp");
        lock(&self.scripts)
            .send_otp
            .pop_front()
            .unwrap_or_else(|| Ok(OtpChallenge::default()))
    }

    async fn verify_email_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError> {
        self.bump("verify_email_otp");
        *lock(&self.last_verify) = Some((user_guid.cloned(), otp.to_string()));
        lock(&self.scripts).verify_otp.pop_front().unwrap_or(Ok(()))
    }

    async fn send_phone_otp(&self, _phone: &str) -> Result<OtpChallenge, ApiError> {
        self.bump("send_phone_otp");
        lock(&self.scripts)
            .send_otp
            .pop_front()
            .unwrap_or_else(|| Ok(OtpChallenge::default()))
    }

    async fn verify_phone_otp(
        &self,
        user_guid: Option<&UserGuid>,
        otp: &str,
    ) -> Result<(), ApiError> {
        self.bump("verify_phone_otp");
        *lock(&self.last_verify) = Some((user_guid.cloned(), otp.to_string()));
        lock(&self.scripts).verify_otp.pop_front().unwrap_or(Ok(()))
    }

    async fn get_section(&self, _name: &str) -> Result<serde_json::Value, ApiError> {
        self.bump("get_section");
        lock(&self.scripts)
            .section
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::Value::Null))
    }
}
