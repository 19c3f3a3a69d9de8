//! Phone-number linking between remote and local contacts.
//!
//! Tie-break: remote numbers are tried in their stored order, and for each
//! number the first local contact (in list order) holding it wins. Remote
//! contacts that would match several local contacts are not flagged.

use std::collections::HashMap;

use facesync_core::{Contact, PhoneNumber};

/// Lookup from phone number to the first local contact holding it.
pub struct PhoneIndex<'a> {
    by_number: HashMap<&'a PhoneNumber, &'a Contact>,
}

impl<'a> PhoneIndex<'a> {
    pub fn new(local: &'a [Contact]) -> Self {
        let mut by_number = HashMap::new();
        for contact in local {
            for number in contact.numbers.iter().filter(|n| !n.is_empty()) {
                by_number.entry(number).or_insert(contact);
            }
        }
        Self { by_number }
    }

    /// Local contact linked to `remote`, if any of its numbers is known.
    pub fn find(&self, remote: &Contact) -> Option<&'a Contact> {
        remote
            .numbers
            .iter()
            .filter(|number| !number.is_empty())
            .find_map(|number| self.by_number.get(number).copied())
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}
