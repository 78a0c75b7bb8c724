//! Field-extraction schemas keyed by document type.
//!
//! Custom schemas registered at runtime shadow the built-in ones. Lookups are total: a type
//! with neither a custom nor a built-in schema resolves to the empty object `{}`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Schema returned for document types without any registered schema.
pub const EMPTY_SCHEMA: &str = "{}";

/// Label used when no classification method could decide a document type.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Document types with a built-in extraction schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownDocumentType {
    /// Production invoice.
    InvoiceProduction,
    /// Purchase order.
    PurchaseOrder,
    /// Production schedule.
    ScheduleProduction,
    /// Customs declaration.
    CustomsDeclaration,
}

impl KnownDocumentType {
    /// Every known type, in the order presented to the language model.
    pub const ALL: [KnownDocumentType; 4] = [
        KnownDocumentType::ScheduleProduction,
        KnownDocumentType::InvoiceProduction,
        KnownDocumentType::PurchaseOrder,
        KnownDocumentType::CustomsDeclaration,
    ];

    /// Wire label of the document type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvoiceProduction => "INVOICE_PRODUCTION",
            Self::PurchaseOrder => "PURCHASE_ORDER",
            Self::ScheduleProduction => "SCHEDULE_PRODUCTION",
            Self::CustomsDeclaration => "CUSTOMS_DECLARATION",
        }
    }

    /// Resolve a wire label; labels are case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }

    /// Built-in extraction schema for the type.
    pub fn builtin_schema(self) -> &'static str {
        match self {
            Self::InvoiceProduction => INVOICE_SCHEMA,
            Self::PurchaseOrder => PURCHASE_ORDER_SCHEMA,
            Self::ScheduleProduction => SCHEDULE_SCHEMA,
            Self::CustomsDeclaration => CUSTOMS_SCHEMA,
        }
    }
}

const INVOICE_SCHEMA: &str = r#"{
  "invoice_number": "string",
  "date": "string",
  "customer": "string",
  "total_amount": "string",
  "items": [{"name": "string", "amount": "string"}]
}
"#;

const PURCHASE_ORDER_SCHEMA: &str = r#"{
  "po_number": "string",
  "date": "string",
  "vendor": "string",
  "total_amount": "string",
  "items": [{"name": "string", "quantity": "string"}]
}
"#;

const SCHEDULE_SCHEMA: &str = r#"{
  "date": "string",
  "product": "string",
  "quantity": "string",
  "start_time": "string",
  "end_time": "string",
  "line": "string"
}
"#;

const CUSTOMS_SCHEMA: &str = r#"{
  "declaration_number": "string",
  "date": "string",
  "origin": "string",
  "destination": "string",
  "items": [{"description": "string", "value": "string"}]
}
"#;

/// Registry of custom and built-in extraction schemas.
///
/// Shared between the protocol handlers (`add_schema`, `get_schema`, `list_schemas`) and the
/// upload orchestrator, so it is safe for concurrent use behind an `Arc`.
#[derive(Default)]
pub struct SchemaRegistry {
    custom: RwLock<HashMap<String, String>>,
}

impl SchemaRegistry {
    /// Create a registry holding only the built-in schemas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the custom schema for `doc_type`.
    pub fn add(&self, doc_type: impl Into<String>, schema: impl Into<String>) {
        let doc_type = doc_type.into();
        tracing::info!(doc_type = %doc_type, "Custom schema registered");
        self.custom
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc_type, schema.into());
    }

    /// Resolve the schema for `doc_type`: custom first, then built-in, then `{}`.
    pub fn get(&self, doc_type: &str) -> String {
        if let Some(schema) = self
            .custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(doc_type)
        {
            return schema.clone();
        }
        KnownDocumentType::from_label(doc_type)
            .map(KnownDocumentType::builtin_schema)
            .unwrap_or(EMPTY_SCHEMA)
            .to_string()
    }

    /// Whether a custom schema has been registered for `doc_type`.
    pub fn has_custom(&self, doc_type: &str) -> bool {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(doc_type)
    }

    /// Snapshot of the custom schemas only, ordered by document type.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(doc_type, schema)| (doc_type.clone(), schema.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schema_is_returned_for_known_types() {
        let registry = SchemaRegistry::new();
        let schema = registry.get("INVOICE_PRODUCTION");
        assert!(schema.contains("invoice_number"));
        assert!(registry.get("PURCHASE_ORDER").contains("po_number"));
        assert!(registry.get("SCHEDULE_PRODUCTION").contains("start_time"));
        assert!(registry.get("CUSTOMS_DECLARATION").contains("declaration_number"));
    }

    #[test]
    fn unknown_type_resolves_to_empty_object() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.get("NOT_A_TYPE"), "{}");
        assert_eq!(registry.get(UNKNOWN_TYPE), "{}");
        assert_eq!(registry.get("invoice_production"), "{}");
    }

    #[test]
    fn custom_schema_shadows_builtin_immediately() {
        let registry = SchemaRegistry::new();
        registry.add("INVOICE_PRODUCTION", r#"{"custom": "string"}"#);
        assert_eq!(registry.get("INVOICE_PRODUCTION"), r#"{"custom": "string"}"#);
        assert!(registry.has_custom("INVOICE_PRODUCTION"));

        registry.add("INVOICE_PRODUCTION", r#"{"second": "string"}"#);
        assert_eq!(registry.get("INVOICE_PRODUCTION"), r#"{"second": "string"}"#);
    }

    #[test]
    fn lookups_are_idempotent() {
        let registry = SchemaRegistry::new();
        registry.add("CUSTOM_INVOICE", r#"{"a": "string"}"#);
        let first = registry.get("CUSTOM_INVOICE");
        let second = registry.get("CUSTOM_INVOICE");
        assert_eq!(first, second);
        assert_eq!(registry.get("PURCHASE_ORDER"), registry.get("PURCHASE_ORDER"));
    }

    #[test]
    fn list_returns_only_custom_entries() {
        let registry = SchemaRegistry::new();
        assert!(registry.list().is_empty());

        registry.add("B_TYPE", "{}");
        registry.add("A_TYPE", r#"{"x": "string"}"#);
        let listed: Vec<_> = registry.list().into_keys().collect();
        assert_eq!(listed, vec!["A_TYPE".to_string(), "B_TYPE".to_string()]);
        assert!(!registry.has_custom("INVOICE_PRODUCTION"));
    }

    #[test]
    fn list_is_a_snapshot() {
        let registry = SchemaRegistry::new();
        registry.add("A_TYPE", "{}");
        let snapshot = registry.list();
        registry.add("B_TYPE", "{}");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn known_types_round_trip_through_labels() {
        for kind in KnownDocumentType::ALL {
            assert_eq!(KnownDocumentType::from_label(kind.as_str()), Some(kind));
        }
        assert_eq!(KnownDocumentType::from_label(UNKNOWN_TYPE), None);
    }
}
