use std::sync::Arc;

use log::info;

use crate::domain::discount::Discount;
use crate::domain::errors::DomainError;
use crate::domain::ports::DiscountLookup;

#[derive(Clone)]
pub struct DiscountService {
    lookup: Arc<dyn DiscountLookup>,
}

impl DiscountService {
    pub fn new(lookup: Arc<dyn DiscountLookup>) -> Self {
        Self { lookup }
    }

    pub async fn get_discount(&self, code: &str) -> Result<Discount, DomainError> {
        let discount = self.lookup.get_discount(code).await?;
        info!(
            "Discount is operated with the {} code and the amount is {}",
            discount.code, discount.amount
        );
        Ok(discount)
    }
}
