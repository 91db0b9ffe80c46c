//! Delivery charge banding.

use crate::models::DeliveryType;

/// City served at the base rate. Everything else is an outside-city delivery.
pub const HOME_CITY: &str = "Dhaka";

/// Added for every started kilogram beyond the first.
pub const PER_KG_BAND: f64 = 20.0;
pub const OUTSIDE_CITY_SURCHARGE: f64 = 70.0;
/// Express is only offered inside the home city.
pub const EXPRESS_SURCHARGE: f64 = 40.0;

/// Charge for one parcel given the shop's configured base charge.
///
/// Weight is banded by `ceil(weight) - 1`, so anything up to 1 kg costs the base
/// charge and 2.5 kg pays for two extra bands.
pub fn calculate(weight: f64, delivery_type: DeliveryType, city: &str, base_charge: f64) -> f64 {
    let bands = (weight.ceil() - 1.0).max(0.0);
    let mut charge = base_charge + PER_KG_BAND * bands;

    let inside_home_city = city.trim().eq_ignore_ascii_case(HOME_CITY);
    if !inside_home_city {
        charge += OUTSIDE_CITY_SURCHARGE;
    }
    if delivery_type == DeliveryType::Express && inside_home_city {
        charge += EXPRESS_SURCHARGE;
    }
    charge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_by_started_kilogram() {
        assert_eq!(calculate(2.5, DeliveryType::Regular, "Dhaka", 60.0), 100.0);
        assert_eq!(calculate(3.0, DeliveryType::Regular, "Dhaka", 60.0), 100.0);
        assert_eq!(calculate(3.01, DeliveryType::Regular, "Dhaka", 60.0), 120.0);
    }

    #[test]
    fn first_kilogram_is_covered_by_base_charge() {
        assert_eq!(calculate(0.4, DeliveryType::Regular, "Dhaka", 60.0), 60.0);
        assert_eq!(calculate(1.0, DeliveryType::Regular, "Dhaka", 75.0), 75.0);
    }

    #[test]
    fn outside_city_pays_surcharge_and_never_express() {
        assert_eq!(calculate(1.0, DeliveryType::Regular, "Chattogram", 60.0), 130.0);
        assert_eq!(calculate(1.0, DeliveryType::Express, "Chattogram", 60.0), 130.0);
    }

    #[test]
    fn express_inside_city_and_city_match_ignores_case() {
        assert_eq!(calculate(1.0, DeliveryType::Express, "dhaka", 60.0), 100.0);
        assert_eq!(calculate(2.0, DeliveryType::Express, " DHAKA ", 60.0), 120.0);
    }
}
