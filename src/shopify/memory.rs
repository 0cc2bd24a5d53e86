use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    AdminApi, BulkOperation, Customer, Metafield, MetafieldOwner, MetafieldType, NewMetafield,
    ShopifyError,
};

/// A write issued against the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CustomerTags {
        customer_id: u64,
        tags: String,
    },
    MetafieldCreated {
        owner: MetafieldOwner,
        namespace: String,
        key: String,
        value: String,
    },
    MetafieldUpdated {
        id: u64,
        value: String,
    },
    BulkExportStarted {
        query: String,
    },
}

#[derive(Default)]
struct Store {
    customers: BTreeMap<u64, Customer>,
    metafields: Vec<(MetafieldOwner, Metafield)>,
    next_metafield_id: u64,
    mutations: Vec<Mutation>,
    bulk_operation: Option<BulkOperation>,
    downloads: HashMap<String, String>,
    failing_customers: HashSet<u64>,
    failing_reads: HashSet<MetafieldOwner>,
    failing_writes: HashSet<MetafieldOwner>,
}

impl Store {
    fn owner_of(&self, metafield_id: u64) -> Option<MetafieldOwner> {
        self.metafields
            .iter()
            .find(|(_, f)| f.id == metafield_id)
            .map(|(owner, _)| *owner)
    }
}

fn unavailable() -> ShopifyError {
    ShopifyError::Status {
        status: 503,
        body: "injected failure".to_string(),
    }
}

/// In-process Admin API double. Records every mutation so callers can
/// assert on exactly what would have been written to the store.
#[derive(Default)]
pub struct MemoryShopify {
    store: Mutex<Store>,
}

impl MemoryShopify {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_customer(&self, id: u64, tags: &str, note: Option<&str>) {
        let mut store = self.lock();
        store.customers.insert(
            id,
            Customer {
                id,
                tags: tags.to_string(),
                note: note.map(String::from),
            },
        );
    }

    /// Seed a metafield without recording a mutation.
    pub fn seed_metafield(&self, owner: MetafieldOwner, namespace: &str, key: &str, value: &str) {
        let mut store = self.lock();
        store.next_metafield_id += 1;
        let id = store.next_metafield_id;
        store.metafields.push((
            owner,
            Metafield {
                id,
                namespace: namespace.to_string(),
                key: key.to_string(),
                value: value.to_string(),
                value_type: None,
            },
        ));
    }

    pub fn customer(&self, id: u64) -> Option<Customer> {
        self.lock().customers.get(&id).cloned()
    }

    /// Value of the last matching metafield, if any.
    pub fn metafield_value(&self, owner: MetafieldOwner, namespace: &str, key: &str) -> Option<String> {
        self.lock()
            .metafields
            .iter()
            .rev()
            .find(|(o, f)| *o == owner && f.is(namespace, key))
            .map(|(_, f)| f.value.clone())
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn set_bulk_operation(&self, operation: Option<BulkOperation>) {
        self.lock().bulk_operation = operation;
    }

    pub fn put_download(&self, url: &str, body: &str) {
        self.lock()
            .downloads
            .insert(url.to_string(), body.to_string());
    }

    /// Make `get_customer(id)` fail with a 503.
    pub fn fail_customer(&self, id: u64) {
        self.lock().failing_customers.insert(id);
    }

    /// Make metafield reads for `owner` fail with a 503.
    pub fn fail_metafield_reads(&self, owner: MetafieldOwner) {
        self.lock().failing_reads.insert(owner);
    }

    /// Make metafield creates/updates for `owner` fail with a 503.
    pub fn fail_metafield_writes(&self, owner: MetafieldOwner) {
        self.lock().failing_writes.insert(owner);
    }

    /// Undo every injected failure.
    pub fn clear_failures(&self) {
        let mut store = self.lock();
        store.failing_customers.clear();
        store.failing_reads.clear();
        store.failing_writes.clear();
    }
}

#[async_trait]
impl AdminApi for MemoryShopify {
    async fn get_customer(&self, id: u64) -> Result<Customer, ShopifyError> {
        let store = self.lock();
        if store.failing_customers.contains(&id) {
            return Err(unavailable());
        }
        store
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("customer {}", id)))
    }

    async fn update_customer_tags(&self, id: u64, tags: &str) -> Result<(), ShopifyError> {
        let mut store = self.lock();
        let customer = store
            .customers
            .get_mut(&id)
            .ok_or_else(|| ShopifyError::NotFound(format!("customer {}", id)))?;
        customer.tags = tags.to_string();
        store.mutations.push(Mutation::CustomerTags {
            customer_id: id,
            tags: tags.to_string(),
        });
        Ok(())
    }

    async fn metafields(&self, owner: MetafieldOwner) -> Result<Vec<Metafield>, ShopifyError> {
        let store = self.lock();
        if store.failing_reads.contains(&owner) {
            return Err(unavailable());
        }
        Ok(store
            .metafields
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, f)| f.clone())
            .collect())
    }

    async fn create_metafield(
        &self,
        owner: MetafieldOwner,
        field: &NewMetafield,
    ) -> Result<Metafield, ShopifyError> {
        let mut store = self.lock();
        if store.failing_writes.contains(&owner) {
            return Err(unavailable());
        }
        store.next_metafield_id += 1;
        let created = Metafield {
            id: store.next_metafield_id,
            namespace: field.namespace.clone(),
            key: field.key.clone(),
            value: field.value.clone(),
            value_type: Some(field.value_type.as_str().to_string()),
        };
        store.metafields.push((owner, created.clone()));
        store.mutations.push(Mutation::MetafieldCreated {
            owner,
            namespace: field.namespace.clone(),
            key: field.key.clone(),
            value: field.value.clone(),
        });
        Ok(created)
    }

    async fn update_metafield(
        &self,
        id: u64,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, ShopifyError> {
        let mut store = self.lock();
        if let Some(owner) = store.owner_of(id)
            && store.failing_writes.contains(&owner)
        {
            return Err(unavailable());
        }
        let updated = {
            let (_, field) = store
                .metafields
                .iter_mut()
                .find(|(_, f)| f.id == id)
                .ok_or_else(|| ShopifyError::NotFound(format!("metafield {}", id)))?;
            field.value = value.to_string();
            field.value_type = Some(value_type.as_str().to_string());
            field.clone()
        };
        store.mutations.push(Mutation::MetafieldUpdated {
            id,
            value: value.to_string(),
        });
        Ok(updated)
    }

    async fn start_bulk_export(&self, query: &str) -> Result<BulkOperation, ShopifyError> {
        let mut store = self.lock();
        if let Some(current) = &store.bulk_operation
            && (current.status == "CREATED" || current.status == "RUNNING")
        {
            return Err(ShopifyError::UserErrors(vec![
                "A bulk query operation for this app and shop is already in progress".into(),
            ]));
        }
        let operation = BulkOperation {
            id: format!("gid://shopify/BulkOperation/{}", store.mutations.len() + 1),
            status: "CREATED".to_string(),
            url: None,
            object_count: Some("0".to_string()),
            error_code: None,
        };
        store.bulk_operation = Some(operation.clone());
        store.mutations.push(Mutation::BulkExportStarted {
            query: query.to_string(),
        });
        Ok(operation)
    }

    async fn current_bulk_operation(&self) -> Result<Option<BulkOperation>, ShopifyError> {
        Ok(self.lock().bulk_operation.clone())
    }

    async fn download(&self, url: &str) -> Result<String, ShopifyError> {
        self.lock()
            .downloads
            .get(url)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(url.to_string()))
    }
}
