use boutique_core::error::{BoutiqueError, Result};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

// the last id is not in the catalog; the frontend answers it with an error
pub const PRODUCTS: [(&str, f64); 10] = [
    ("0PUK6V6EV0", 0.1),
    ("1YMWWN1N4O", 0.2),
    ("2ZYFJ3GM2N", 0.2),
    ("66VCHSJNUP", 0.05),
    ("6E92ZMYYFZ", 0.03),
    ("9SIQT8TOJO", 0.07),
    ("L9ECAV7KIM", 0.05),
    ("LS4PSXUNUM", 0.15),
    ("OLJCESPC7Z", 0.08),
    (INVALID_PRODUCT, 0.02),
];

pub const INVALID_PRODUCT: &str = "OLJCESPRRR";

pub const CURRENCIES: [(&str, f64); 4] = [("EUR", 0.2), ("USD", 0.6), ("JPY", 0.1), ("CAD", 0.1)];

pub const CART_QUANTITIES: [u32; 6] = [1, 2, 3, 4, 5, 10];

#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    candidates: Vec<T>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl<T> WeightedTable<T> {
    pub fn new(candidates: Vec<T>, weights: Vec<f64>) -> Result<Self> {
        if candidates.len() != weights.len() {
            return Err(BoutiqueError::Config(format!(
                "weighted table has {} candidates but {} weights",
                candidates.len(),
                weights.len()
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(BoutiqueError::Config(format!(
                "weights must be finite and non-negative (got {bad})"
            )));
        }
        let index = WeightedIndex::new(&weights)
            .map_err(|e| BoutiqueError::Config(format!("invalid weight table: {e}")))?;
        Ok(Self {
            candidates,
            weights,
            index,
        })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, f64)>,
    {
        let (candidates, weights) = pairs.into_iter().unzip();
        Self::new(candidates, weights)
    }

    pub fn uniform(candidates: Vec<T>) -> Result<Self> {
        let weights = vec![1.0; candidates.len()];
        Self::new(candidates, weights)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.candidates[self.index.sample(rng)]
    }

    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }
}
