use rand::Rng;
use serde_json::{Value, json};
use uuid::Uuid;

const SYMBOLS: &[u8] = b"1234567890\
abcdefghijklmnopqrstuvwxyz\
ABCDEFGHIJKLMNOPQRSTUVWXYZ\
!@#$%^&*()_+=-\\|<>?,./";

pub fn random_property_name() -> String {
    Uuid::new_v4().to_string()
}

/// An int, long, bool, string or string array, picked uniformly.
pub fn random_property_value<R: Rng + ?Sized>(rng: &mut R) -> Value {
    match rng.gen_range(0..5) {
        0 => json!(rng.r#gen::<i32>()),
        1 => json!(rng.r#gen::<i64>()),
        2 => json!(rng.r#gen::<bool>()),
        3 => json!(random_string(rng, 50)),
        _ => json!([random_string(rng, 20), "", random_string(rng, 20)]),
    }
}

/// Up to `max_len - 1` symbols.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let len = rng.gen_range(0..max_len);
    (0..len)
        .map(|_| char::from(SYMBOLS[rng.gen_range(0..SYMBOLS.len())]))
        .collect()
}
