use crate::cards::{Bsurf, Cord2r, Cquad4, Ctria3, Grid, Mat1, Pshell};
use crate::container::{CardContainer, DuplicatePolicy, Entity, EntityContainer};
use crate::error::{DeckError, Result};

/// Describes one record type the model can hold.
#[derive(Debug, Clone, Copy)]
pub struct ContainerSpec {
    pub keyword: &'static str,
    pub group: &'static str,
    pub description: &'static str,
    factory: fn(DuplicatePolicy, bool) -> Box<dyn CardContainer>,
}

impl ContainerSpec {
    /// Create an empty container for this record type.
    pub fn create(&self, policy: DuplicatePolicy, strict_build: bool) -> Box<dyn CardContainer> {
        (self.factory)(policy, strict_build)
    }
}

fn make<T: Entity>(policy: DuplicatePolicy, strict_build: bool) -> Box<dyn CardContainer> {
    Box::new(EntityContainer::<T>::new(policy, strict_build))
}

macro_rules! container_spec {
    ($entity:ty, $description:expr) => {
        ContainerSpec {
            keyword: <$entity as Entity>::KEYWORD,
            group: <$entity as Entity>::GROUP,
            description: $description,
            factory: make::<$entity>,
        }
    };
}

static GRID: ContainerSpec = container_spec!(Grid, "Node position and coordinate systems.");
static CORD2R: ContainerSpec = container_spec!(Cord2r, "Rectangular coordinate system from three points.");
static CQUAD4: ContainerSpec = container_spec!(Cquad4, "Four-noded shell element.");
static CTRIA3: ContainerSpec = container_spec!(Ctria3, "Three-noded shell element.");
static PSHELL: ContainerSpec = container_spec!(Pshell, "Shell element property.");
static MAT1: ContainerSpec = container_spec!(Mat1, "Isotropic material.");
static BSURF: ContainerSpec = container_spec!(Bsurf, "Contact surface from shell elements.");

/// Registry of the record types a default model is created with.
pub struct CardRegistry;

impl CardRegistry {
    /// Every built-in record type, in the order containers are registered.
    pub fn list() -> Vec<&'static ContainerSpec> {
        vec![&GRID, &CORD2R, &CQUAD4, &CTRIA3, &PSHELL, &MAT1, &BSURF]
    }

    /// Resolve a record type by keyword (case-insensitive).
    pub fn get(keyword: &str) -> Result<&'static ContainerSpec> {
        Self::list()
            .into_iter()
            .find(|spec| spec.keyword.eq_ignore_ascii_case(keyword.trim()))
            .ok_or_else(|| DeckError::UnknownKeyword {
                keyword: keyword.to_string(),
            })
    }

    /// Group headers in first-registration order.
    pub fn groups() -> Vec<&'static str> {
        let mut groups: Vec<&'static str> = Vec::new();
        for spec in Self::list() {
            if !groups.contains(&spec.group) {
                groups.push(spec.group);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(CardRegistry::get("cquad4").unwrap().keyword, "CQUAD4");
        assert!(matches!(
            CardRegistry::get("CHEXA"),
            Err(DeckError::UnknownKeyword { .. })
        ));
    }

    #[test]
    fn factory_builds_matching_container() {
        let container = CardRegistry::get("MAT1").unwrap().create(DuplicatePolicy::Reject, true);
        assert_eq!(container.keyword(), "MAT1");
        assert_eq!(container.group(), "MATERIALS");
        assert!(container.is_empty());
    }

    #[test]
    fn groups_keep_registration_order() {
        assert_eq!(
            CardRegistry::groups(),
            vec!["NODES", "COORDS", "ELEMENTS", "PROPERTIES", "MATERIALS", "CONTACT"]
        );
    }
}
