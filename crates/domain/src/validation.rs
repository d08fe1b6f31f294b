//! Form validation for accounts and catalog products.
//!
//! Checks run in a fixed order and stop at the first failure, so callers get
//! exactly one reason back.

use chrono::NaiveDate;
use common::{Money, ProductCode, Run};
use serde::{Deserialize, Serialize};
use store::Product;
use thiserror::Error;

/// Email domains accepted at registration.
pub const ALLOWED_EMAIL_DOMAINS: [&str; 3] = ["@duoc.cl", "@profesor.duoc.cl", "@gmail.com"];

/// Minimum age, in whole years, to hold an account.
pub const MINIMUM_AGE: u32 = 10;

/// Birth date format, e.g. `24-12-2001`.
pub const BIRTH_DATE_FORMAT: &str = "%d-%m-%Y";

/// Reasons a form is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identity number is already registered")]
    RunTaken,

    #[error("email is already registered")]
    EmailTaken,

    #[error("identity number is not valid")]
    InvalidRun,

    #[error("name must have at least 3 characters")]
    NameTooShort,

    #[error("surnames must have at least 3 characters")]
    SurnamesTooShort,

    #[error("email must end in @duoc.cl, @profesor.duoc.cl or @gmail.com")]
    EmailDomain,

    #[error("password must have between 6 and 10 characters")]
    PasswordLength,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("phone must have 9 digits and start with 9")]
    InvalidPhone,

    #[error("must be at least 10 years old")]
    Underage,

    #[error("a region must be selected")]
    RegionRequired,

    #[error("a comuna must be selected")]
    ComunaRequired,

    #[error("address must have at least 3 characters")]
    AddressTooShort,

    #[error("product code must have more than 3 characters")]
    ProductCodeTooShort,

    #[error("product name must have more than 3 characters")]
    ProductNameTooShort,

    #[error("a category must be selected")]
    CategoryRequired,

    #[error("description must have more than 3 characters")]
    DescriptionTooShort,

    #[error("price must be zero or more")]
    NegativePrice,

    #[error("stock must be zero or more")]
    NegativeStock,

    #[error("critical stock must be zero or more")]
    NegativeCriticalStock,
}

type Validation = std::result::Result<(), ValidationError>;

fn at_least(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

/// Returns true if the email ends in one of the allowed domains.
pub fn is_allowed_email(email: &str) -> bool {
    ALLOWED_EMAIL_DOMAINS
        .iter()
        .any(|domain| email.ends_with(domain))
}

/// Returns true for a 9-digit mobile number starting with 9.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 9 && phone.starts_with('9') && phone.chars().all(|c| c.is_ascii_digit())
}

/// Returns the age in whole years on `today`, or None if the birth date is
/// not a `dd-MM-yyyy` date in the past.
pub fn age_on(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let born = NaiveDate::parse_from_str(birth_date.trim(), BIRTH_DATE_FORMAT).ok()?;
    today.years_since(born)
}

/// Returns true if the holder is at least [`MINIMUM_AGE`] on `today`.
pub fn is_old_enough(birth_date: &str, today: NaiveDate) -> bool {
    age_on(birth_date, today).is_some_and(|age| age >= MINIMUM_AGE)
}

fn check_password(password: &str, confirmation: &str) -> Validation {
    if !(6..=10).contains(&password.chars().count()) {
        return Err(ValidationError::PasswordLength);
    }
    check_confirmation(password, confirmation)
}

fn check_confirmation(password: &str, confirmation: &str) -> Validation {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

fn check_phone(phone: &str) -> Validation {
    if !phone.is_empty() && !is_valid_phone(phone) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(())
}

/// Sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub run: String,
    pub name: String,
    pub surnames: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// Optional; empty when not given.
    pub phone: String,
    /// `dd-MM-yyyy`.
    pub birth_date: String,
    pub region: String,
    pub comuna: String,
    pub address: String,
}

impl RegistrationForm {
    /// Returns the normalised identity number.
    pub fn run(&self) -> Run {
        Run::new(&self.run)
    }

    /// Checks every field rule. Duplicate checks need the account store and
    /// are done by the caller first.
    pub fn validate(&self, today: NaiveDate) -> Validation {
        if !self.run().is_valid() {
            return Err(ValidationError::InvalidRun);
        }
        if !at_least(&self.name, 3) {
            return Err(ValidationError::NameTooShort);
        }
        if !at_least(&self.surnames, 3) {
            return Err(ValidationError::SurnamesTooShort);
        }
        if !is_allowed_email(&self.email) {
            return Err(ValidationError::EmailDomain);
        }
        check_password(&self.password, &self.password_confirmation)?;
        check_phone(&self.phone)?;
        if !is_old_enough(&self.birth_date, today) {
            return Err(ValidationError::Underage);
        }
        if !at_least(&self.address, 3) {
            return Err(ValidationError::AddressTooShort);
        }
        Ok(())
    }
}

/// Profile edit form. A blank password keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub surnames: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub phone: String,
    pub birth_date: String,
    pub region: String,
    pub comuna: String,
    pub address: String,
}

impl ProfileForm {
    /// Returns the new password, if one was entered.
    pub fn new_password(&self) -> Option<&str> {
        (!self.password.is_empty()).then_some(self.password.as_str())
    }

    /// Checks the editable fields with the sign-up rules. A blank password
    /// passes only with a blank confirmation. Email ownership is checked by
    /// the caller.
    pub fn validate(&self, today: NaiveDate) -> Validation {
        if !at_least(&self.name, 3) {
            return Err(ValidationError::NameTooShort);
        }
        if !at_least(&self.surnames, 3) {
            return Err(ValidationError::SurnamesTooShort);
        }
        if !is_allowed_email(&self.email) {
            return Err(ValidationError::EmailDomain);
        }
        match self.new_password() {
            Some(password) => check_password(password, &self.password_confirmation)?,
            None => check_confirmation(&self.password, &self.password_confirmation)?,
        }
        check_phone(&self.phone)?;
        if !is_old_enough(&self.birth_date, today) {
            return Err(ValidationError::Underage);
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::RegionRequired);
        }
        if self.comuna.trim().is_empty() {
            return Err(ValidationError::ComunaRequired);
        }
        if !at_least(&self.address, 3) {
            return Err(ValidationError::AddressTooShort);
        }
        Ok(())
    }
}

/// Back-office product form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductForm {
    pub code: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub critical_stock: i64,
    pub image: String,
}

impl ProductForm {
    /// Checks the form, stopping at the first failing field.
    pub fn validate(&self) -> Validation {
        if self.code.chars().count() <= 3 {
            return Err(ValidationError::ProductCodeTooShort);
        }
        if self.name.chars().count() <= 3 {
            return Err(ValidationError::ProductNameTooShort);
        }
        if self.category.is_empty() {
            return Err(ValidationError::CategoryRequired);
        }
        if self.description.chars().count() <= 3 {
            return Err(ValidationError::DescriptionTooShort);
        }
        if self.price < 0 {
            return Err(ValidationError::NegativePrice);
        }
        if self.stock < 0 {
            return Err(ValidationError::NegativeStock);
        }
        if self.critical_stock < 0 {
            return Err(ValidationError::NegativeCriticalStock);
        }
        Ok(())
    }

    /// Converts the form into a product record.
    pub fn into_product(self) -> Product {
        Product {
            code: ProductCode::new(self.code),
            category: self.category,
            name: self.name,
            description: self.description,
            price: Money::new(self.price),
            stock: self.stock,
            critical_stock: self.critical_stock,
            image: self.image,
        }
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            code: product.code.to_string(),
            category: product.category.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount(),
            stock: product.stock,
            critical_stock: product.critical_stock,
            image: product.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn valid_registration() -> RegistrationForm {
        RegistrationForm {
            run: "12.345.678-5".to_string(),
            name: "Marco".to_string(),
            surnames: "Suazo Rojas".to_string(),
            email: "marco@duoc.cl".to_string(),
            password: "123456".to_string(),
            password_confirmation: "123456".to_string(),
            phone: "912345678".to_string(),
            birth_date: "24-12-2001".to_string(),
            region: "Metropolitana".to_string(),
            comuna: "Santiago".to_string(),
            address: "Av. Siempre Viva 123".to_string(),
        }
    }

    fn valid_profile() -> ProfileForm {
        let form = valid_registration();
        ProfileForm {
            name: form.name,
            surnames: form.surnames,
            email: form.email,
            password: String::new(),
            password_confirmation: String::new(),
            phone: form.phone,
            birth_date: form.birth_date,
            region: form.region,
            comuna: form.comuna,
            address: form.address,
        }
    }

    fn valid_product() -> ProductForm {
        ProductForm {
            code: "AC001".to_string(),
            category: "Accesorios".to_string(),
            name: "Mochila".to_string(),
            description: "Mochila con diseño".to_string(),
            price: 5990,
            stock: 10,
            critical_stock: 2,
            image: String::new(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert_eq!(valid_registration().validate(today()), Ok(()));
    }

    #[test]
    fn test_registration_rejects_bad_check_digit() {
        let mut form = valid_registration();
        form.run = "12.345.678-9".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::InvalidRun));
    }

    #[test]
    fn test_registration_checks_in_order() {
        let mut form = valid_registration();
        form.name = "Al".to_string();
        form.email = "marco@hotmail.com".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn test_name_is_trimmed() {
        let mut form = valid_registration();
        form.name = "  Al  ".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn test_email_domains() {
        assert!(is_allowed_email("a@duoc.cl"));
        assert!(is_allowed_email("a@profesor.duoc.cl"));
        assert!(is_allowed_email("a@gmail.com"));
        assert!(!is_allowed_email("a@yahoo.com"));
        assert!(!is_allowed_email("a@DUOC.CL"));
    }

    #[test]
    fn test_password_rules() {
        let mut form = valid_registration();
        form.password = "12345".to_string();
        form.password_confirmation = "12345".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::PasswordLength));

        form.password = "12345678901".to_string();
        form.password_confirmation = form.password.clone();
        assert_eq!(form.validate(today()), Err(ValidationError::PasswordLength));

        form.password = "1234567890".to_string();
        form.password_confirmation = "1234567899".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn test_phone_is_optional_but_checked() {
        assert!(is_valid_phone("912345678"));
        assert!(!is_valid_phone("812345678"));
        assert!(!is_valid_phone("91234567"));
        assert!(!is_valid_phone("9123a5678"));

        let mut form = valid_registration();
        form.phone = String::new();
        assert_eq!(form.validate(today()), Ok(()));
        form.phone = "12345".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::InvalidPhone));
    }

    #[test]
    fn test_minimum_age_boundary() {
        assert_eq!(age_on("15-06-2015", today()), Some(10));
        assert!(is_old_enough("15-06-2015", today()));
        assert!(!is_old_enough("16-06-2015", today()));
        assert!(!is_old_enough("2015-06-15", today()));
        assert!(!is_old_enough("", today()));
        assert_eq!(age_on("01-01-2030", today()), None);
    }

    #[test]
    fn test_registration_address() {
        let mut form = valid_registration();
        form.address = "Av".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::AddressTooShort));
    }

    #[test]
    fn test_profile_blank_password_is_kept() {
        let form = valid_profile();
        assert!(form.new_password().is_none());
        assert_eq!(form.validate(today()), Ok(()));
    }

    #[test]
    fn test_profile_new_password_checked() {
        let mut form = valid_profile();
        form.password = "abc".to_string();
        form.password_confirmation = "abc".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::PasswordLength));

        form.password = String::new();
        form.password_confirmation = "abcdef".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn test_profile_requires_region_and_comuna() {
        let mut form = valid_profile();
        form.region = String::new();
        assert_eq!(form.validate(today()), Err(ValidationError::RegionRequired));

        let mut form = valid_profile();
        form.comuna = " ".to_string();
        assert_eq!(form.validate(today()), Err(ValidationError::ComunaRequired));
    }

    #[test]
    fn test_product_form_rules() {
        assert_eq!(valid_product().validate(), Ok(()));

        let mut form = valid_product();
        form.code = "AC1".to_string();
        assert_eq!(form.validate(), Err(ValidationError::ProductCodeTooShort));

        let mut form = valid_product();
        form.category = String::new();
        assert_eq!(form.validate(), Err(ValidationError::CategoryRequired));

        let mut form = valid_product();
        form.price = -1;
        assert_eq!(form.validate(), Err(ValidationError::NegativePrice));

        let mut form = valid_product();
        form.critical_stock = -5;
        assert_eq!(form.validate(), Err(ValidationError::NegativeCriticalStock));
    }

    #[test]
    fn test_product_form_roundtrip() {
        let product = valid_product().into_product();
        assert_eq!(ProductForm::from(&product), valid_product());
    }
}
