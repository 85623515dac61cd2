use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::monitoring::types::AlertTargets;
use crate::store::ContactListSource;

/// Insertion-ordered set of destinations keyed by a normalized form.
///
/// The first spelling seen is the one that gets contacted.
#[derive(Debug, Clone, Default)]
struct ContactBag {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl ContactBag {
    fn insert(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.seen.insert(trimmed.to_lowercase()) {
            self.values.push(trimmed.to_string());
        }
    }

    fn extend<'a>(&mut self, raw: impl IntoIterator<Item = &'a String>) {
        for value in raw {
            self.insert(value);
        }
    }
}

/// Deduplicated destinations for one alert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSet {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub webhooks: Vec<String>,
}

impl ContactSet {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.webhooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len() + self.phones.len() + self.webhooks.len()
    }
}

/// Expands a monitor's contact lists and merges them with its direct alerts
#[derive(Clone)]
pub struct ContactResolver {
    lists: Option<Arc<dyn ContactListSource>>,
}

impl ContactResolver {
    pub fn new(lists: Arc<dyn ContactListSource>) -> Self {
        Self { lists: Some(lists) }
    }

    /// Resolver that only ever returns the direct alert targets
    pub fn direct_only() -> Self {
        Self { lists: None }
    }

    /// Union of direct targets and every referenced list, without duplicates.
    ///
    /// A failed list lookup degrades to direct targets only; it never fails
    /// the caller.
    pub async fn resolve(&self, direct: &AlertTargets, contact_list_ids: &[Uuid]) -> ContactSet {
        let mut emails = ContactBag::default();
        let mut phones = ContactBag::default();
        let mut webhooks = ContactBag::default();

        emails.extend(&direct.email);
        phones.extend(&direct.phone);
        webhooks.extend(&direct.webhook);

        if !contact_list_ids.is_empty() {
            match &self.lists {
                Some(source) => match source.lookup_lists(contact_list_ids).await {
                    Ok(lists) => {
                        for list in &lists {
                            emails.extend(&list.emails);
                            phones.extend(&list.phones);
                            webhooks.extend(&list.webhooks);
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error expanding contact lists, using direct alerts only");
                    }
                },
                None => {
                    warn!(
                        lists = contact_list_ids.len(),
                        "No contact list source configured, using direct alerts only"
                    );
                }
            }
        }

        ContactSet { emails: emails.values, phones: phones.values, webhooks: webhooks.values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ContactList;
    use crate::test_support::MemoryStore;

    fn direct(emails: &[&str]) -> AlertTargets {
        AlertTargets {
            email: emails.iter().map(|e| e.to_string()).collect(),
            phone: Vec::new(),
            webhook: Vec::new(),
        }
    }

    #[tokio::test]
    async fn merges_direct_and_list_contacts_without_duplicates() {
        let store = Arc::new(MemoryStore::default());
        let list = ContactList::new("ops").with_emails(["a@x.com", "b@x.com"]).with_phones(["+1555"]);
        store.add_contact_list(list.clone());

        let resolver = ContactResolver::new(store);
        let contacts = resolver.resolve(&direct(&["a@x.com"]), &[list.id]).await;

        assert_eq!(contacts.emails, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
        assert_eq!(contacts.phones, vec!["+1555".to_string()]);
        assert!(contacts.webhooks.is_empty());
        assert_eq!(contacts.len(), 3);
    }

    #[tokio::test]
    async fn dedup_ignores_case_and_whitespace() {
        let store = Arc::new(MemoryStore::default());
        let first = ContactList::new("one").with_emails(["Ops@Example.com "]);
        let second = ContactList::new("two").with_emails(["ops@example.com", ""]);
        store.add_contact_list(first.clone());
        store.add_contact_list(second.clone());

        let resolver = ContactResolver::new(store);
        let contacts = resolver.resolve(&AlertTargets::default(), &[first.id, second.id]).await;

        assert_eq!(contacts.emails, vec!["Ops@Example.com".to_string()]);
    }

    #[tokio::test]
    async fn lookup_failure_falls_back_to_direct_alerts() {
        let store = Arc::new(MemoryStore::default());
        store.fail_contact_lookups(true);

        let resolver = ContactResolver::new(store);
        let contacts = resolver.resolve(&direct(&["a@x.com"]), &[Uuid::new_v4()]).await;

        assert_eq!(contacts.emails, vec!["a@x.com".to_string()]);
    }

    #[tokio::test]
    async fn no_lists_means_no_lookup() {
        let store = Arc::new(MemoryStore::default());
        store.fail_contact_lookups(true);

        let resolver = ContactResolver::new(store.clone());
        let contacts = resolver.resolve(&direct(&["a@x.com"]), &[]).await;

        assert_eq!(contacts.emails.len(), 1);
        assert_eq!(store.contact_lookups(), 0);
    }

    #[tokio::test]
    async fn direct_only_resolver_skips_lists() {
        let resolver = ContactResolver::direct_only();
        let contacts = resolver.resolve(&direct(&["a@x.com"]), &[Uuid::new_v4()]).await;
        assert_eq!(contacts.emails, vec!["a@x.com".to_string()]);
        assert!(!contacts.is_empty());
    }
}
