// Mocked external collaborators.
//
// The catalog and user services are separate deployments reached through
// the gateway. This service only needs two lookups from them, both mocked
// as constants here: the checkout price per tonne and the certificate
// recipient's identity. Swapping these for real HTTP clients changes
// nothing else in the crate.

use rust_decimal::Decimal;

/// Price source for checkout. Stands in for the project catalog service.
#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog;

impl ProjectCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Price per tonne for a project. The real catalog service prices
    /// projects individually; the mock returns a flat rate.
    pub fn price_per_tonne(&self, _project_id: i64) -> Decimal {
        Decimal::from(50)
    }
}

/// Recipient identity used on generated certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

/// Identity source for certificate generation. Stands in for the user
/// service.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory;

impl UserDirectory {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, _user_id: i64) -> UserProfile {
        UserProfile {
            email: "user@example.com".to_string(),
            name: "User Name".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mock_price_is_constant_across_projects() {
        let catalog = ProjectCatalog::new();
        assert_eq!(catalog.price_per_tonne(1), dec!(50));
        assert_eq!(catalog.price_per_tonne(999), dec!(50));
    }
}
