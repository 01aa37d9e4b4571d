use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const FIRST_NAMES: [&str; 12] = [
    "james", "mary", "robert", "patricia", "john", "jennifer", "michael", "linda", "david",
    "elizabeth", "maria", "thomas",
];
const LAST_NAMES: [&str; 12] = [
    "smith", "johnson", "williams", "brown", "jones", "garcia", "miller", "davis", "rodriguez",
    "martinez", "wilson", "anderson",
];
const EMAIL_DOMAINS: [&str; 4] = ["example.com", "example.org", "example.net", "mail.example"];
const STREET_NAMES: [&str; 10] = [
    "Amphitheatre", "Market", "Mission", "Valencia", "Castro", "Lombard", "Harbor", "Maple",
    "Oak", "Cedar",
];
const STREET_SUFFIXES: [&str; 5] = ["Street", "Avenue", "Parkway", "Road", "Lane"];
const CITIES: [&str; 10] = [
    "Mountain View",
    "San Francisco",
    "Seattle",
    "Austin",
    "Chicago",
    "Boston",
    "Denver",
    "Portland",
    "Atlanta",
    "Madison",
];
const COUNTRY_CODES: [&str; 10] = ["US", "CA", "GB", "DE", "FR", "JP", "AU", "BR", "IN", "NL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardNetwork {
    Visa,
    Mastercard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutProfile {
    pub email: String,
    pub street_address: String,
    pub credit_card_number: String,
    pub postcode: String,
    pub city: String,
    pub country_code: String,
    pub credit_card_security_code: String,
}

impl CheckoutProfile {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = pick(rng, &FIRST_NAMES);
        let last = pick(rng, &LAST_NAMES);
        let network = if rng.gen_bool(0.5) {
            CardNetwork::Visa
        } else {
            CardNetwork::Mastercard
        };

        Self {
            email: format!(
                "{first}.{last}{}@{}",
                rng.gen_range(1..100),
                pick(rng, &EMAIL_DOMAINS)
            ),
            street_address: format!(
                "{} {} {}",
                rng.gen_range(1..10_000),
                pick(rng, &STREET_NAMES),
                pick(rng, &STREET_SUFFIXES)
            ),
            credit_card_number: card_number(rng, network),
            postcode: digits(rng, 5),
            city: pick(rng, &CITIES).to_string(),
            country_code: pick(rng, &COUNTRY_CODES).to_string(),
            credit_card_security_code: digits(rng, 3),
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &'a [&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

fn digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn card_number<R: Rng + ?Sized>(rng: &mut R, network: CardNetwork) -> String {
    let mut number = match network {
        CardNetwork::Visa => "4".to_string(),
        CardNetwork::Mastercard => format!("5{}", rng.gen_range(1..=5)),
    };
    while number.len() < 15 {
        number.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    number.push(luhn_check_digit(&number));
    number
}

fn luhn_check_digit(payload: &str) -> char {
    let sum: u32 = payload
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    char::from(b'0' + ((10 - sum % 10) % 10) as u8)
}

pub fn luhn_valid(number: &str) -> bool {
    if number.len() < 2 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (payload, check) = number.split_at(number.len() - 1);
    check.starts_with(luhn_check_digit(payload))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;

    #[test]
    fn known_numbers_pass_luhn() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("5555555555554444"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("41111111111a1111"));
    }

    #[test]
    fn generated_cards_have_network_prefix_and_check_digit() {
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..200 {
            let visa = card_number(&mut rng, CardNetwork::Visa);
            assert_eq!(visa.len(), 16);
            assert!(visa.starts_with('4'));
            assert!(luhn_valid(&visa), "{visa}");

            let mc = card_number(&mut rng, CardNetwork::Mastercard);
            assert_eq!(mc.len(), 16);
            assert!(matches!(&mc[..2], "51" | "52" | "53" | "54" | "55"), "{mc}");
            assert!(luhn_valid(&mc), "{mc}");
        }
    }

    #[test]
    fn profile_fields_are_well_formed() {
        let mut rng = Pcg64::seed_from_u64(11);
        let profile = CheckoutProfile::generate(&mut rng);
        assert!(profile.email.contains('@'));
        assert_eq!(profile.postcode.len(), 5);
        assert_eq!(profile.credit_card_security_code.len(), 3);
        assert_eq!(profile.country_code.len(), 2);
        assert!(luhn_valid(&profile.credit_card_number));
    }

    #[test]
    fn profile_is_reproducible_from_seed() {
        let a = CheckoutProfile::generate(&mut Pcg64::seed_from_u64(5));
        let b = CheckoutProfile::generate(&mut Pcg64::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
