//! Routing of classified documents to downstream APIs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::supplier::{DocumentClass, DownstreamApi};
use crate::registry::SupplierRegistry;

/// Where one supplier's documents go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub document_class: DocumentClass,
    pub api: DownstreamApi,
    /// Parseur mailbox id or Docupipe workflow id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// Routing decisions for every registered supplier.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<String, RoutingDecision>,
}

impl RoutingTable {
    pub fn from_registry(registry: &SupplierRegistry) -> Self {
        let routes = registry
            .iter()
            .map(|profile| {
                let decision = RoutingDecision {
                    document_class: profile.document_class,
                    api: profile.target.api(),
                    workflow: profile.target.workflow().map(String::from),
                };
                (profile.identity.clone(), decision)
            })
            .collect();
        Self { routes }
    }

    /// Decision for a supplier identity; `None` for unknown identities.
    pub fn route(&self, identity: &str) -> Option<&RoutingDecision> {
        self.routes.get(identity)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_total_over_registry() {
        let registry = SupplierRegistry::builtin().unwrap();
        let table = RoutingTable::from_registry(&registry);
        assert_eq!(table.len(), registry.len());
        for profile in registry.iter() {
            assert!(table.route(&profile.identity).is_some(), "{}", profile.identity);
        }
    }

    #[test]
    fn test_invoice_suppliers_go_to_parseur() {
        let table = RoutingTable::from_registry(&SupplierRegistry::builtin().unwrap());
        assert_eq!(
            table.route("soares"),
            Some(&RoutingDecision {
                document_class: DocumentClass::Invoice,
                api: DownstreamApi::Parseur,
                workflow: Some("111948".to_string()),
            })
        );
    }

    #[test]
    fn test_receipts_go_to_docupipe() {
        let table = RoutingTable::from_registry(&SupplierRegistry::builtin().unwrap());
        let lidl = table.route("lidl").unwrap();
        assert_eq!(lidl.api, DownstreamApi::Docupipe);
        assert_eq!(lidl.workflow.as_deref(), Some("YxiR0kCy"));

        let kiabi = table.route("kiabi").unwrap();
        assert_eq!(kiabi.document_class, DocumentClass::Receipt);
        assert_eq!(kiabi.workflow, None);
    }

    #[test]
    fn test_unknown_identity() {
        let table = RoutingTable::from_registry(&SupplierRegistry::builtin().unwrap());
        assert_eq!(table.route("nobody"), None);
    }
}
