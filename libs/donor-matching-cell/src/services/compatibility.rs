use crate::models::BloodType;
use crate::models::BloodType::*;

/// Donor type -> recipient types it may give red cells to.
///
/// The only source of compatibility rules; both views below read it.
static DONATION_TABLE: [(BloodType, &[BloodType]); 8] = [
    (ONegative, &[ONegative, OPositive, ANegative, APositive, BNegative, BPositive, AbNegative, AbPositive]),
    (OPositive, &[OPositive, APositive, BPositive, AbPositive]),
    (ANegative, &[ANegative, APositive, AbNegative, AbPositive]),
    (APositive, &[APositive, AbPositive]),
    (BNegative, &[BNegative, BPositive, AbNegative, AbPositive]),
    (BPositive, &[BPositive, AbPositive]),
    (AbNegative, &[AbNegative, AbPositive]),
    (AbPositive, &[AbPositive]),
];

fn recipients_of(donor: BloodType) -> &'static [BloodType] {
    DONATION_TABLE
        .iter()
        .find(|(entry, _)| *entry == donor)
        .map(|(_, recipients)| *recipients)
        .unwrap_or(&[])
}

pub fn is_compatible(donor: BloodType, recipient: BloodType) -> bool {
    recipients_of(donor).contains(&recipient)
}

/// "Who can I donate to?"
pub fn can_donate_to(donor: BloodType) -> Vec<BloodType> {
    recipients_of(donor).to_vec()
}

/// "Who can donate to me?"
pub fn can_receive_from(recipient: BloodType) -> Vec<BloodType> {
    DONATION_TABLE
        .iter()
        .filter(|(_, recipients)| recipients.contains(&recipient))
        .map(|(donor, _)| *donor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_a_table_entry() {
        for blood_type in BloodType::ALL {
            assert!(!recipients_of(blood_type).is_empty(), "{} missing", blood_type);
            assert!(is_compatible(blood_type, blood_type), "{} cannot give to itself", blood_type);
        }
    }

    #[test]
    fn o_negative_gives_to_everyone() {
        for recipient in BloodType::ALL {
            assert!(is_compatible(ONegative, recipient));
        }
        assert_eq!(can_donate_to(ONegative).len(), 8);
    }

    #[test]
    fn ab_positive_receives_from_everyone() {
        for donor in BloodType::ALL {
            assert!(is_compatible(donor, AbPositive));
        }
        assert_eq!(can_receive_from(AbPositive).len(), 8);
    }

    #[test]
    fn rh_positive_never_gives_to_rh_negative() {
        for donor in [OPositive, APositive, BPositive, AbPositive] {
            for recipient in [ONegative, ANegative, BNegative, AbNegative] {
                assert!(!is_compatible(donor, recipient), "{} -> {}", donor, recipient);
            }
        }
    }

    #[test]
    fn views_agree_with_each_other() {
        for donor in BloodType::ALL {
            for recipient in BloodType::ALL {
                assert_eq!(
                    can_donate_to(donor).contains(&recipient),
                    can_receive_from(recipient).contains(&donor)
                );
            }
        }
    }

    #[test]
    fn a_negative_receives_from_a_and_o_negative_only() {
        let mut donors = can_receive_from(ANegative);
        donors.sort();
        assert_eq!(donors, vec![ANegative, ONegative]);
        assert!(!is_compatible(BNegative, ANegative));
    }
}
