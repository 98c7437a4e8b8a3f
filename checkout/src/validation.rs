//! Contact form validation, run when the contact step is submitted.

use crate::session::{ContactDetails, ContactField, ValidationErrors};

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Check every contact field. An empty result means the form may be submitted.
#[must_use]
pub fn validate_contact(details: &ContactDetails) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if details.first_name.trim().is_empty() {
        errors.insert(ContactField::FirstName, "First name is required");
    }
    if details.last_name.trim().is_empty() {
        errors.insert(ContactField::LastName, "Last name is required");
    }
    if details.email.trim().is_empty() {
        errors.insert(ContactField::Email, "Email is required");
    } else if !is_valid_email(details.email.trim()) {
        errors.insert(ContactField::Email, "Enter a valid email address");
    }
    if details.phone.trim().is_empty() {
        errors.insert(ContactField::Phone, "Phone number is required");
    } else if !is_valid_phone(&details.phone) {
        errors.insert(ContactField::Phone, "Enter a valid phone number");
    }
    if !details
        .referral_code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric())
    {
        errors.insert(
            ContactField::ReferralCode,
            "Referral codes contain only letters and digits",
        );
    }

    errors
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    phone.chars().all(allowed) && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ContactDetails {
        ContactDetails {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            referral_code: String::new(),
        }
    }

    #[test]
    fn complete_form_is_valid() {
        assert!(validate_contact(&valid()).is_empty());

        let with_code = ContactDetails {
            referral_code: "FRIEND10".to_string(),
            ..valid()
        };
        assert!(validate_contact(&with_code).is_empty());
    }

    #[test]
    fn empty_form_flags_required_fields() {
        let errors = validate_contact(&ContactDetails::default());

        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get(ContactField::FirstName), Some("First name is required"));
        assert!(!errors.contains(ContactField::ReferralCode));
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["ada", "@example.com", "ada@example", "ada@@example.com", "ada@.com", "a da@x.io"] {
            let details = ContactDetails {
                email: email.to_string(),
                ..valid()
            };
            assert!(
                validate_contact(&details).contains(ContactField::Email),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn phone_needs_seven_to_fifteen_digits() {
        for (phone, ok) in [
            ("555-1234", true),
            ("555123", false),
            ("+44 20 7946 0958", true),
            ("1234567890123456", false),
            ("555-CALL-NOW", false),
        ] {
            let details = ContactDetails {
                phone: phone.to_string(),
                ..valid()
            };
            assert_eq!(
                !validate_contact(&details).contains(ContactField::Phone),
                ok,
                "{phone}"
            );
        }
    }

    #[test]
    fn referral_code_must_be_alphanumeric() {
        let details = ContactDetails {
            referral_code: "FRIEND-10".to_string(),
            ..valid()
        };
        assert!(validate_contact(&details).contains(ContactField::ReferralCode));
    }
}
