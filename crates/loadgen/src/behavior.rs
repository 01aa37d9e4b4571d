use std::fmt;
use std::str::FromStr;

use boutique_core::error::{BoutiqueError, Result};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::identity::CheckoutProfile;
use crate::weights::{CART_QUANTITIES, CURRENCIES, INVALID_PRODUCT, PRODUCTS, WeightedTable};

pub const CARD_EXPIRATION_MONTH: &str = "1";
pub const CARD_EXPIRATION_YEAR: &str = "2039";
pub const CHECKOUT_COUNTRY: &str = "United States";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Index,
    SetCurrency,
    BrowseProduct,
    ViewCart,
    AddToCart,
    Checkout,
    // shares the wire name with BrowseProduct, like `name()`
    #[serde(rename = "browseProduct", skip_deserializing)]
    BrowseInvalidProduct,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::SetCurrency => "setCurrency",
            Self::BrowseProduct | Self::BrowseInvalidProduct => "browseProduct",
            Self::ViewCart => "viewCart",
            Self::AddToCart => "addToCart",
            Self::Checkout => "checkout",
        }
    }
}

pub const STANDARD_ACTIONS: [(Action, u32); 6] = [
    (Action::Index, 1),
    (Action::SetCurrency, 2),
    (Action::BrowseProduct, 10),
    (Action::ViewCart, 3),
    (Action::AddToCart, 2),
    (Action::Checkout, 1),
];

pub const HACKER_ACTIONS: [(Action, u32); 1] = [(Action::BrowseInvalidProduct, 10)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Standard,
    Hacker,
}

impl Profile {
    pub fn actions(self) -> &'static [(Action, u32)] {
        match self {
            Self::Standard => &STANDARD_ACTIONS,
            Self::Hacker => &HACKER_ACTIONS,
        }
    }

    pub fn total_weight(self) -> u32 {
        self.actions().iter().map(|(_, w)| w).sum()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Hacker => f.write_str("hacker"),
        }
    }
}

impl FromStr for Profile {
    type Err = BoutiqueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "user" => Ok(Self::Standard),
            "hacker" => Ok(Self::Hacker),
            _ => Err(BoutiqueError::InvalidArgument(format!(
                "unknown profile: {s} (expected standard or hacker)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRequest {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<(String, String)>,
}

impl PlannedRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            form: Vec::new(),
        }
    }

    pub fn post(path: impl Into<String>, form: Vec<(&str, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            form: form.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    pub fn stats_name(&self) -> String {
        if self.path.starts_with("/product/") {
            format!("{} /product/[id]", self.method)
        } else {
            format!("{} {}", self.method, self.path)
        }
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    products: WeightedTable<&'static str>,
    currencies: WeightedTable<&'static str>,
    quantities: WeightedTable<u32>,
    standard: WeightedTable<Action>,
    hacker: WeightedTable<Action>,
}

impl Catalog {
    pub fn new() -> Result<Self> {
        Ok(Self {
            products: WeightedTable::from_pairs(PRODUCTS)?,
            currencies: WeightedTable::from_pairs(CURRENCIES)?,
            quantities: WeightedTable::uniform(CART_QUANTITIES.to_vec())?,
            standard: action_table(Profile::Standard)?,
            hacker: action_table(Profile::Hacker)?,
        })
    }

    pub fn choose_action<R: Rng + ?Sized>(&self, profile: Profile, rng: &mut R) -> Action {
        match profile {
            Profile::Standard => *self.standard.sample(rng),
            Profile::Hacker => *self.hacker.sample(rng),
        }
    }

    pub fn plan<R: Rng + ?Sized>(
        &self,
        action: Action,
        rng: &mut R,
        identity: &CheckoutProfile,
    ) -> Vec<PlannedRequest> {
        match action {
            Action::Index => vec![PlannedRequest::get("/")],
            Action::SetCurrency => vec![PlannedRequest::post(
                "/setCurrency",
                vec![("currency_code", self.currencies.sample(rng).to_string())],
            )],
            Action::BrowseProduct => vec![PlannedRequest::get(format!(
                "/product/{}",
                self.products.sample(rng)
            ))],
            Action::ViewCart => vec![PlannedRequest::get("/cart")],
            Action::AddToCart => {
                let product = *self.products.sample(rng);
                let quantity = *self.quantities.sample(rng);
                vec![
                    PlannedRequest::get(format!("/product/{product}")),
                    PlannedRequest::post(
                        "/cart",
                        vec![
                            ("product_id", product.to_string()),
                            ("quantity", quantity.to_string()),
                        ],
                    ),
                ]
            }
            Action::Checkout => vec![PlannedRequest::post(
                "/cart/checkout",
                vec![
                    ("email", identity.email.clone()),
                    ("street_address", identity.street_address.clone()),
                    ("zip_code", identity.postcode.clone()),
                    ("city", identity.city.clone()),
                    ("state", identity.country_code.clone()),
                    ("country", CHECKOUT_COUNTRY.to_string()),
                    ("credit_card_number", identity.credit_card_number.clone()),
                    (
                        "credit_card_expiration_month",
                        CARD_EXPIRATION_MONTH.to_string(),
                    ),
                    (
                        "credit_card_expiration_year",
                        CARD_EXPIRATION_YEAR.to_string(),
                    ),
                    ("credit_card_cvv", identity.credit_card_security_code.clone()),
                ],
            )],
            Action::BrowseInvalidProduct => {
                vec![PlannedRequest::get(format!("/product/{INVALID_PRODUCT}"))]
            }
        }
    }
}

fn action_table(profile: Profile) -> Result<WeightedTable<Action>> {
    WeightedTable::from_pairs(
        profile
            .actions()
            .iter()
            .map(|(action, weight)| (*action, f64::from(*weight))),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: Action,
    pub requests: Vec<PlannedRequest>,
}

pub fn dry_run(
    catalog: &Catalog,
    profile: Profile,
    seed: u64,
    count: usize,
) -> (CheckoutProfile, Vec<PlannedAction>) {
    let mut rng = Pcg64::seed_from_u64(seed);
    let identity = CheckoutProfile::generate(&mut rng);
    let actions = (0..count)
        .map(|_| {
            let action = catalog.choose_action(profile, &mut rng);
            PlannedAction {
                action,
                requests: catalog.plan(action, &mut rng, &identity),
            }
        })
        .collect();
    (identity, actions)
}
