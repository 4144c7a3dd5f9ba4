use bigdecimal::{BigDecimal, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct Discount {
    pub id: i32,
    pub code: String,
    pub amount: BigDecimal,
}

impl Discount {
    /// Unit price after this discount. Never goes below zero.
    pub fn apply_to(&self, price: &BigDecimal) -> BigDecimal {
        let discounted = price - &self.amount;
        if discounted < BigDecimal::zero() {
            BigDecimal::zero()
        } else {
            discounted
        }
    }
}
