use crate::error::AppError;
use crate::models::money::Money;
use crate::models::order::{DeliveryType, GoodsDescriptor, PackageType};

const BASE_FEE: i64 = 20_000;

const NEAR_LIMIT_KM: f64 = 5.0;
const CITY_LIMIT_KM: f64 = 10.0;
const REGIONAL_LIMIT_KM: f64 = 20.0;
const NEAR_SURCHARGE: i64 = 10_000;
const CITY_SURCHARGE: i64 = 20_000;
const REGIONAL_SURCHARGE: i64 = 40_000;
const LONG_HAUL_SURCHARGE: i64 = 60_000;
const LONG_HAUL_PER_KM: i64 = 3_000;

const FREE_WEIGHT_KG: f64 = 5.0;
const PER_EXTRA_KG: i64 = 2_000;

const FRAGILE_SURCHARGE: i64 = 15_000;
const VALUABLE_SURCHARGE: i64 = 30_000;
const VEHICLE_FLAG_SURCHARGE: i64 = 100_000;

/// Express multiplier as a ratio, 3/2.
const EXPRESS_NUMERATOR: i64 = 3;
const EXPRESS_DENOMINATOR: i64 = 2;

/// Roughly half the Earth's circumference.
pub const MAX_DISTANCE_KM: f64 = 20_000.0;
pub const MAX_WEIGHT_KG: f64 = 100_000.0;

/// Shipping fee for a set of goods.
///
/// Distance, weight and flag surcharges are summed onto the base fee, the
/// express multiplier scales that running total, and the package-category
/// add-on is added last so it is never multiplied.
pub fn calculate_fee(goods: &GoodsDescriptor) -> Result<Money, AppError> {
    validate_goods(goods)?;

    let mut total = Money::from_major(BASE_FEE);
    total = add(total, distance_surcharge(goods.distance_km)?)?;
    total = add(total, weight_surcharge(goods.weight_kg)?)?;
    total = add(total, flag_surcharge(goods))?;

    if goods.delivery_type == DeliveryType::Express {
        total = total
            .scale(EXPRESS_NUMERATOR, EXPRESS_DENOMINATOR)
            .ok_or_else(overflow)?;
    }

    add(total, package_addon(goods.package_type))
}

/// Rejects negative, non-finite or out-of-range distance and weight.
pub fn validate_goods(goods: &GoodsDescriptor) -> Result<(), AppError> {
    validate_measure("distance_km", goods.distance_km, MAX_DISTANCE_KM)?;
    validate_measure("weight_kg", goods.weight_kg, MAX_WEIGHT_KG)
}

fn validate_measure(field: &str, value: f64, max: f64) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(AppError::Validation(format!("{field} cannot be negative")));
    }
    if value > max {
        return Err(AppError::Validation(format!("{field} cannot exceed {max}")));
    }
    Ok(())
}

fn overflow() -> AppError {
    AppError::Validation("shipping fee is out of range".to_string())
}

fn add(total: Money, amount: Money) -> Result<Money, AppError> {
    total.checked_add(amount).ok_or_else(overflow)
}

fn distance_surcharge(distance_km: f64) -> Result<Money, AppError> {
    let surcharge = if distance_km <= NEAR_LIMIT_KM {
        Money::from_major(NEAR_SURCHARGE)
    } else if distance_km <= CITY_LIMIT_KM {
        Money::from_major(CITY_SURCHARGE)
    } else if distance_km <= REGIONAL_LIMIT_KM {
        Money::from_major(REGIONAL_SURCHARGE)
    } else {
        let per_km = Money::per_unit(LONG_HAUL_PER_KM, distance_km - REGIONAL_LIMIT_KM)
            .ok_or_else(overflow)?;
        add(Money::from_major(LONG_HAUL_SURCHARGE), per_km)?
    };
    Ok(surcharge)
}

fn weight_surcharge(weight_kg: f64) -> Result<Money, AppError> {
    if weight_kg > FREE_WEIGHT_KG {
        Money::per_unit(PER_EXTRA_KG, weight_kg - FREE_WEIGHT_KG).ok_or_else(overflow)
    } else {
        Ok(Money::ZERO)
    }
}

fn flag_surcharge(goods: &GoodsDescriptor) -> Money {
    [
        (goods.is_fragile, FRAGILE_SURCHARGE),
        (goods.is_valuable, VALUABLE_SURCHARGE),
        (goods.is_vehicle, VEHICLE_FLAG_SURCHARGE),
    ]
    .into_iter()
    .filter(|(flag, _)| *flag)
    .map(|(_, amount)| Money::from_major(amount))
    .sum()
}

fn package_addon(package_type: PackageType) -> Money {
    match package_type {
        PackageType::Tv | PackageType::Computer => Money::from_major(30_000),
        PackageType::Laptop | PackageType::Cpu => Money::from_major(20_000),
        PackageType::Vehicle => Money::from_major(150_000),
        _ => Money::ZERO,
    }
}
