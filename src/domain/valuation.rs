//! Valuation engine: forward pricing plus the inverse distribution helper.
//!
//! Everything here is a pure function of its inputs. Undefined ratios
//! (zero crates, zero reference weight) resolve to 0 by convention, so the
//! engine never produces NaN or infinity for valid form input.

use thiserror::Error;

use super::entities::{
    CalculatorForm, CargoInputs, Distribution, ValuationResult, EMPTY_CRATE_WEIGHT,
    RIYAL_PER_DIRHAM,
};

/// Input field identifiers for field-level validation feedback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    MlihCrates,
    DichiCrates,
    GrossWeight,
    MlihPrice,
    DichiPrice,
    Product,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0:?} is required")]
    Missing(Field),
    #[error("{0:?} must be a non-negative finite number")]
    OutOfRange(Field),
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Missing(field) | ValidationError::OutOfRange(field) => *field,
        }
    }
}

/// Checks the raw form and normalizes it into definite numbers.
///
/// Blank numeric fields become 0. A gross weight of zero and a missing
/// product selection both block the calculation, matching the behavior of
/// the calculate action in the app shell.
pub fn validate(form: &CalculatorForm) -> Result<CargoInputs, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let numeric_fields = [
        (Field::MlihCrates, form.mlih_crates),
        (Field::DichiCrates, form.dichi_crates),
        (Field::GrossWeight, form.gross_weight),
        (Field::MlihPrice, form.mlih_price),
        (Field::DichiPrice, form.dichi_price),
    ];
    for (field, value) in numeric_fields {
        let value = value.value();
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError::OutOfRange(field));
        }
    }

    if form.gross_weight.value() == 0.0 {
        errors.push(ValidationError::Missing(Field::GrossWeight));
    }

    let full_crate_weight = match &form.product {
        None => {
            errors.push(ValidationError::Missing(Field::Product));
            0.0
        }
        Some(product) if !product.full_crate_weight.is_finite() || product.full_crate_weight <= 0.0 => {
            errors.push(ValidationError::OutOfRange(Field::Product));
            0.0
        }
        Some(product) => product.full_crate_weight,
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CargoInputs {
        mlih_crates: form.mlih_crates.value(),
        dichi_crates: form.dichi_crates.value(),
        gross_weight: form.gross_weight.value(),
        full_crate_weight,
        mlih_price: form.mlih_price.value(),
        dichi_price: form.dichi_price.value(),
    })
}

/// Derives the full priced snapshot from one set of cargo inputs.
///
/// Net weight is allocated proportionally by crate count: both categories
/// share the same average fill weight per crate.
pub fn evaluate(inputs: &CargoInputs) -> ValuationResult {
    let total_crates = inputs.mlih_crates + inputs.dichi_crates;
    let total_empty_crates_weight = total_crates * EMPTY_CRATE_WEIGHT;
    // Clamped at zero: gross weight below the combined tare yields no product.
    let total_net_product_weight = (inputs.gross_weight - total_empty_crates_weight).max(0.0);
    let average_net_weight_per_crate = if total_crates > 0.0 {
        total_net_product_weight / total_crates
    } else {
        0.0
    };

    let net_weight_mlih = inputs.mlih_crates * average_net_weight_per_crate;
    let net_weight_dichi = inputs.dichi_crates * average_net_weight_per_crate;

    let virtual_crates_mlih = virtual_crates(net_weight_mlih, inputs.full_crate_weight);
    let virtual_crates_dichi = virtual_crates(net_weight_dichi, inputs.full_crate_weight);

    let total_price_mlih = virtual_crates_mlih * inputs.mlih_price;
    let total_price_dichi = virtual_crates_dichi * inputs.dichi_price;

    let grand_total_price = total_price_mlih + total_price_dichi;
    let grand_total_price_riyal = grand_total_price * RIYAL_PER_DIRHAM;

    ValuationResult {
        total_crates,
        total_empty_crates_weight,
        total_net_product_weight,
        average_net_weight_per_crate,
        net_weight_mlih,
        net_weight_dichi,
        virtual_crates_mlih,
        virtual_crates_dichi,
        total_virtual_crates: virtual_crates_mlih + virtual_crates_dichi,
        total_price_mlih,
        total_price_dichi,
        grand_total_price,
        grand_total_price_riyal,
    }
}

/// Normalizes an actual net weight into crate-equivalents of one reference
/// full crate.
fn virtual_crates(net_weight: f64, full_crate_weight: f64) -> f64 {
    if full_crate_weight > 0.0 {
        net_weight / full_crate_weight
    } else {
        0.0
    }
}

/// Inverse computation: how many gross crates (and how much gross weight)
/// correspond to a desired virtual-crate count, given the per-crate average
/// already derived by [`evaluate`].
pub fn distribute(
    desired_virtual_crates: f64,
    average_net_weight_per_crate: f64,
    full_crate_weight: f64,
) -> Distribution {
    if average_net_weight_per_crate <= 0.0 || full_crate_weight <= 0.0 {
        return Distribution::default();
    }

    let gross_crates = (full_crate_weight * desired_virtual_crates) / average_net_weight_per_crate;
    let total_weight =
        gross_crates * average_net_weight_per_crate + gross_crates * EMPTY_CRATE_WEIGHT;

    Distribution {
        gross_crates,
        total_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ProductType;

    const TOLERANCE: f64 = 1e-9;

    fn reference_inputs() -> CargoInputs {
        CargoInputs {
            mlih_crates: 72.0,
            dichi_crates: 48.0,
            gross_weight: 3280.0,
            full_crate_weight: 27.0,
            mlih_price: 85.0,
            dichi_price: 70.0,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn reference_batch_matches_expected_breakdown() {
        let result = evaluate(&reference_inputs());

        assert_eq!(result.total_crates, 120.0);
        assert_eq!(result.total_empty_crates_weight, 360.0);
        assert_eq!(result.total_net_product_weight, 2920.0);
        assert!(close(result.average_net_weight_per_crate, 24.33));
        assert!(close(result.net_weight_mlih, 1752.0));
        assert!(close(result.net_weight_dichi, 1168.0));
        assert!(close(result.virtual_crates_mlih, 64.89));
        assert!(close(result.virtual_crates_dichi, 43.26));
        assert!(close(result.total_price_mlih, 5515.56));
        assert!(close(result.total_price_dichi, 3028.15));
        assert!(close(result.grand_total_price, 8543.70));
        assert!(close(result.grand_total_price_riyal, 170874.07));
    }

    #[test]
    fn net_weight_never_goes_negative() {
        let result = evaluate(&CargoInputs {
            mlih_crates: 100.0,
            dichi_crates: 100.0,
            gross_weight: 50.0, // far below the 600 kg combined tare
            full_crate_weight: 27.0,
            mlih_price: 85.0,
            dichi_price: 70.0,
        });
        assert_eq!(result.total_net_product_weight, 0.0);
        assert_eq!(result.grand_total_price, 0.0);
    }

    #[test]
    fn zero_crates_yield_zero_average_without_nan() {
        let result = evaluate(&CargoInputs {
            gross_weight: 3280.0,
            full_crate_weight: 27.0,
            ..CargoInputs::default()
        });
        assert_eq!(result.average_net_weight_per_crate, 0.0);
        assert!(result.grand_total_price.is_finite());
    }

    #[test]
    fn category_net_weights_sum_to_total() {
        let result = evaluate(&reference_inputs());
        assert!(
            (result.net_weight_mlih + result.net_weight_dichi - result.total_net_product_weight)
                .abs()
                < TOLERANCE
        );
    }

    #[test]
    fn riyal_total_is_exactly_twenty_times_dirhams() {
        let result = evaluate(&reference_inputs());
        assert_eq!(
            result.grand_total_price_riyal,
            result.grand_total_price * 20.0
        );
    }

    #[test]
    fn distribution_round_trips_the_forward_computation() {
        let inputs = reference_inputs();
        let result = evaluate(&inputs);

        let distribution = distribute(
            result.total_virtual_crates,
            result.average_net_weight_per_crate,
            inputs.full_crate_weight,
        );
        assert!((distribution.gross_crates - result.total_crates).abs() < 1e-6);
        assert!((distribution.total_weight - inputs.gross_weight).abs() < 1e-6);
    }

    #[test]
    fn distribution_with_zero_average_is_zero() {
        let distribution = distribute(50.0, 0.0, 27.0);
        assert_eq!(distribution, Distribution::default());
        let distribution = distribute(50.0, 24.0, 0.0);
        assert_eq!(distribution, Distribution::default());
    }

    #[test]
    fn validation_rejects_zero_gross_weight_and_missing_product() {
        let form = CalculatorForm::default();
        let errors = validate(&form).unwrap_err();
        assert!(errors.contains(&ValidationError::Missing(Field::GrossWeight)));
        assert!(errors.contains(&ValidationError::Missing(Field::Product)));
    }

    #[test]
    fn validation_rejects_negative_values() {
        let form = CalculatorForm {
            mlih_crates: (-3.0).into(),
            gross_weight: 3280.0.into(),
            product: Some(ProductType::new("tomato", "Tomate", 27.0)),
            ..CalculatorForm::default()
        };
        let errors = validate(&form).unwrap_err();
        assert_eq!(errors, vec![ValidationError::OutOfRange(Field::MlihCrates)]);
    }

    #[test]
    fn validation_normalizes_blank_fields_to_zero() {
        let form = CalculatorForm {
            gross_weight: 3280.0.into(),
            product: Some(ProductType::new("tomato", "Tomate", 27.0)),
            ..CalculatorForm::default()
        };
        let inputs = validate(&form).unwrap();
        assert_eq!(inputs.mlih_crates, 0.0);
        assert_eq!(inputs.full_crate_weight, 27.0);
    }
}
