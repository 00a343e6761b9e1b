//! Load demo data: seller accounts with approved stores, their products, and
//! coupons.
//!
//! The YAML file is parsed and every entry validated before anything is
//! written. Accounts that already exist are left untouched, so running the
//! command twice does not duplicate sellers.

use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use livestall_core::validation::{
    CouponInput, ProductInput, SellerApplicationInput, ValidationErrors,
};
use livestall_core::{Email, ProductStatus, UserId, UserRole};
use livestall_web::db::{
    CouponRepository, ProductRepository, RepositoryError, SellerRepository, UserRepository,
};
use livestall_web::services::auth::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub sellers: Vec<SeedSeller>,
    /// Coupons that apply to every seller's items.
    #[serde(default)]
    pub platform_coupons: Vec<CouponInput>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSeller {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub store: SellerApplicationInput,
    #[serde(default)]
    pub products: Vec<ProductInput>,
    #[serde(default)]
    pub coupons: Vec<CouponInput>,
}

/// What a seed run created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub sellers: usize,
    pub products: usize,
    pub coupons: usize,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{entry}: {errors}")]
    Invalid {
        entry: String,
        errors: ValidationErrors,
    },

    #[error("No admin account with email: {0}")]
    AdminNotFound(String),

    #[error("Account {email}: {message}")]
    Account { email: String, message: String },

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn invalid(entry: impl Into<String>) -> impl FnOnce(ValidationErrors) -> SeedError {
    let entry = entry.into();
    move |errors| SeedError::Invalid { entry, errors }
}

/// Check every entry so a typo fails before the first insert.
///
/// # Errors
///
/// Returns the first entry with a validation problem.
pub fn validate(file: &SeedFile) -> Result<(), SeedError> {
    for seller in &file.sellers {
        seller
            .store
            .validate()
            .map_err(invalid(format!("store of {}", seller.email)))?;
        for product in &seller.products {
            product
                .validate()
                .map_err(invalid(format!("product \"{}\"", product.title)))?;
        }
        for coupon in &seller.coupons {
            coupon
                .validate()
                .map_err(invalid(format!("coupon {}", coupon.code)))?;
        }
    }
    for coupon in &file.platform_coupons {
        coupon
            .validate()
            .map_err(invalid(format!("platform coupon {}", coupon.code)))?;
    }
    Ok(())
}

/// Seed demo data from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, the
/// reviewer is not an admin, or a database operation fails.
pub async fn demo_data(file_path: &str, admin_email: &str) -> Result<SeedSummary, SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed data");

    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    validate(&file)?;
    info!(
        sellers = file.sellers.len(),
        platform_coupons = file.platform_coupons.len(),
        "Seed file validated"
    );

    let pool = connect().await?;
    let reviewer = find_admin(&pool, admin_email).await?;

    let mut summary = SeedSummary::default();
    for seller in &file.sellers {
        seed_seller(&pool, reviewer, seller, &mut summary).await?;
    }

    let coupons = CouponRepository::new(&pool);
    for input in &file.platform_coupons {
        if create_coupon(&coupons, None, input).await? {
            summary.coupons += 1;
        }
    }

    Ok(summary)
}

async fn find_admin(pool: &PgPool, email: &str) -> Result<UserId, SeedError> {
    let parsed =
        Email::parse_normalized(email).map_err(|_| SeedError::AdminNotFound(email.to_owned()))?;
    UserRepository::new(pool)
        .get_by_email(&parsed)
        .await?
        .filter(|u| u.role == UserRole::Admin)
        .map(|u| u.id)
        .ok_or_else(|| SeedError::AdminNotFound(email.to_owned()))
}

async fn seed_seller(
    pool: &PgPool,
    reviewer: UserId,
    seller: &SeedSeller,
    summary: &mut SeedSummary,
) -> Result<(), SeedError> {
    let account_error = |message: String| SeedError::Account {
        email: seller.email.clone(),
        message,
    };

    let user = match AuthService::new(pool)
        .create_account(
            &seller.email,
            &seller.display_name,
            &seller.password,
            &seller.password,
            UserRole::Customer,
        )
        .await
    {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            info!(email = %seller.email, "Account exists, skipping seller");
            return Ok(());
        }
        Err(AuthError::Repository(e)) => return Err(e.into()),
        Err(e) => return Err(account_error(e.to_string())),
    };

    let sellers = SellerRepository::new(pool);
    let store = seller
        .store
        .validate()
        .map_err(invalid(format!("store of {}", seller.email)))?;
    let application = sellers.submit_application(user.id, &store).await?;
    let profile = sellers.approve(application, reviewer).await?;
    sellers.mark_welcome_seen(user.id).await?;
    summary.sellers += 1;
    info!(store = %profile.store_name, public_id = %profile.public_id, "Seller created");

    let products = ProductRepository::new(pool);
    for input in &seller.products {
        let fields = input
            .validate()
            .map_err(invalid(format!("product \"{}\"", input.title)))?;
        products
            .create(user.id, &fields, ProductStatus::Active)
            .await?;
        summary.products += 1;
    }

    let coupons = CouponRepository::new(pool);
    for input in &seller.coupons {
        if create_coupon(&coupons, Some(user.id), input).await? {
            summary.coupons += 1;
        }
    }

    Ok(())
}

/// Returns `false` when the code is already taken.
async fn create_coupon(
    coupons: &CouponRepository<'_>,
    owner: Option<UserId>,
    input: &CouponInput,
) -> Result<bool, SeedError> {
    let fields = input
        .validate()
        .map_err(invalid(format!("coupon {}", input.code)))?;
    match coupons.create(owner, &fields).await {
        Ok(_) => Ok(true),
        Err(RepositoryError::Conflict(_)) => {
            warn!(code = %fields.code, "Coupon code exists, skipping");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../seed/demo.yaml");

    #[test]
    fn test_demo_file_parses_and_validates() {
        let file: SeedFile = serde_yaml::from_str(DEMO).unwrap();
        assert!(!file.sellers.is_empty());
        assert!(file.sellers.iter().all(|s| !s.products.is_empty()));
        validate(&file).unwrap();
    }

    #[test]
    fn test_validation_names_the_bad_entry() {
        let yaml = r#"
sellers:
  - email: potter@example.com
    display_name: Pat
    password: correct-horse-battery
    store:
      store_name: Clay Co
      phone: "+1 555 0100"
      payout_account: US00 1234
    products:
      - title: Mug
        price: "-3"
        stock: "4"
        category: Kitchen
"#;
        let file: SeedFile = serde_yaml::from_str(yaml).unwrap();
        let err = validate(&file).unwrap_err();
        assert!(err.to_string().starts_with("product \"Mug\""));
    }

    #[test]
    fn test_sections_are_optional() {
        let file: SeedFile = serde_yaml::from_str("platform_coupons: []").unwrap();
        assert!(file.sellers.is_empty());
        validate(&file).unwrap();
    }
}
