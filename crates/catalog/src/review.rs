use serde::{Deserialize, Serialize};

use bazaar_core::{DomainError, DomainResult, ProductId};

/// A single star rating, 1 through 5.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(stars: i64) -> DomainResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&stars) {
            return Err(DomainError::validation(format!(
                "rating must be between {} and {}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(stars as u8))
    }

    pub fn stars(&self) -> i64 {
        i64::from(self.0)
    }
}

/// Accumulated review totals for one product.
///
/// Only sums are stored; the average is derived on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub product_id: ProductId,
    pub total_stars: i64,
    pub total_reviews: i64,
}

impl Review {
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            total_stars: 0,
            total_reviews: 0,
        }
    }

    pub fn accumulate(&mut self, rating: Rating) {
        self.total_stars += rating.stars();
        self.total_reviews += 1;
    }

    /// `None` until the first review arrives.
    pub fn average(&self) -> Option<f64> {
        if self.total_reviews == 0 {
            None
        } else {
            Some(self.total_stars as f64 / self.total_reviews as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_sum_and_count() {
        let mut review = Review::empty(ProductId::new());
        review.accumulate(Rating::new(4).unwrap());
        review.accumulate(Rating::new(5).unwrap());
        assert_eq!(review.total_stars, 9);
        assert_eq!(review.total_reviews, 2);
        assert_eq!(review.average(), Some(4.5));
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the derived average always stays within the rating bounds.
            #[test]
            fn average_stays_in_bounds(stars in proptest::collection::vec(1i64..=5, 1..50)) {
                let mut review = Review::empty(ProductId::new());
                for s in &stars {
                    review.accumulate(Rating::new(*s).unwrap());
                }
                let avg = review.average().unwrap();
                prop_assert!((1.0..=5.0).contains(&avg));
                prop_assert_eq!(review.total_reviews as usize, stars.len());
                prop_assert_eq!(review.total_stars, stars.iter().sum::<i64>());
            }
        }
    }
}
