// 🪪 Shooter Identity Resolver - two-tier name lookup
//
// Result exports carry names and a club, never a sid. Resolution runs in
// two phases:
//
//   1. build   - scan the registry once into an immutable IdentityIndex
//   2. resolve - per row: strong (first, last, club) → weak (first, last)
//
// Every key is lower-cased and trimmed. Preferred names are indexed as a
// second first-name form.

use crate::entities::shooter::{ShooterRegistryEntry, Sid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Matched on name and club
    Strong(Sid),

    /// Matched on name only, club ignored
    Weak(Sid),

    Unresolved,
}

impl Resolution {
    pub fn sid(&self) -> Option<Sid> {
        match self {
            Resolution::Strong(sid) | Resolution::Weak(sid) => Some(*sid),
            Resolution::Unresolved => None,
        }
    }
}

/// A name-only key claimed by more than one registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakCollision {
    pub first_name: String,
    pub last_name: String,
    pub kept: Sid,
    pub discarded: Sid,
}

// ============================================================================
// IDENTITY INDEX
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    strong: HashMap<(String, String, String), Sid>,
    weak: HashMap<(String, String), Sid>,
    collisions: Vec<WeakCollision>,
}

impl IdentityIndex {
    /// Build both indices from a registry snapshot.
    ///
    /// An entry without a club gets the empty club in its strong key. A
    /// later entry with the same strong key replaces an earlier one. Weak keys keep the first entry seen and
    /// record later claimants as collisions.
    pub fn build(registry: &[ShooterRegistryEntry]) -> Self {
        let mut index = IdentityIndex::default();

        for entry in registry {
            let first = norm(&entry.first_name);
            let last = norm(&entry.last_name);
            let preferred = entry
                .preferred_name
                .as_deref()
                .map(norm)
                .filter(|p| !p.is_empty() && *p != first);

            let mut first_names = vec![first];
            first_names.extend(preferred);

            let club = norm(entry.club_name.as_deref().unwrap_or(""));
            for name in &first_names {
                index
                    .strong
                    .insert((name.clone(), last.clone(), club.clone()), entry.sid);
            }

            for name in first_names {
                let key = (name, last.clone());
                let existing = index.weak.get(&key).copied();
                match existing {
                    None => {
                        index.weak.insert(key, entry.sid);
                    }
                    Some(kept) if kept != entry.sid => {
                        index.collisions.push(WeakCollision {
                            first_name: key.0,
                            last_name: key.1,
                            kept,
                            discarded: entry.sid,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        debug!(
            strong = index.strong.len(),
            weak = index.weak.len(),
            collisions = index.collisions.len(),
            "built shooter identity index"
        );

        index
    }

    /// Resolve one row's names. Never fails; misses are `Unresolved`.
    pub fn resolve(&self, first_name: &str, last_name: &str, club: &str) -> Resolution {
        let first = norm(first_name);
        let last = norm(last_name);
        let club = norm(club);

        if let Some(&sid) = self.strong.get(&(first.clone(), last.clone(), club)) {
            return Resolution::Strong(sid);
        }

        match self.weak.get(&(first, last)) {
            Some(&sid) => Resolution::Weak(sid),
            None => Resolution::Unresolved,
        }
    }

    pub fn resolve_identity(&self, first_name: &str, last_name: &str, club: &str) -> Option<Sid> {
        self.resolve(first_name, last_name, club).sid()
    }

    pub fn strong_len(&self) -> usize {
        self.strong.len()
    }

    pub fn weak_len(&self) -> usize {
        self.weak.len()
    }

    /// Name-only keys where a later registry entry lost to an earlier one
    pub fn collisions(&self) -> &[WeakCollision] {
        &self.collisions
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<ShooterRegistryEntry> {
        vec![
            ShooterRegistryEntry::new(7, "John", "Smith").with_club("ABC Rifle Club"),
            ShooterRegistryEntry::new(12, "Robert", "Brown")
                .with_preferred_name("Bob")
                .with_club("Belmont"),
            ShooterRegistryEntry::new(15, "Anh", "Nguyen"),
        ]
    }

    #[test]
    fn test_strong_match_ignores_case_and_whitespace() {
        let index = IdentityIndex::build(&registry());

        assert_eq!(
            index.resolve("  JOHN ", "smith", "abc rifle club  "),
            Resolution::Strong(7)
        );
        assert_eq!(index.resolve_identity("John", "Smith", "ABC Rifle Club"), Some(7));
    }

    #[test]
    fn test_unknown_club_falls_back_to_weak() {
        let index = IdentityIndex::build(&registry());

        assert_eq!(index.resolve("John", "Smith", "Other Club"), Resolution::Weak(7));
        assert_eq!(index.resolve("John", "Smith", ""), Resolution::Weak(7));
    }

    #[test]
    fn test_preferred_name_matches_both_tiers() {
        let index = IdentityIndex::build(&registry());

        assert_eq!(index.resolve("Bob", "Brown", "Belmont"), Resolution::Strong(12));
        assert_eq!(index.resolve("Robert", "Brown", "Belmont"), Resolution::Strong(12));
        assert_eq!(index.resolve("bob", "brown", "Elsewhere"), Resolution::Weak(12));
    }

    #[test]
    fn test_entry_without_club_matches_empty_club() {
        let index = IdentityIndex::build(&registry());

        assert_eq!(index.resolve("Anh", "Nguyen", ""), Resolution::Strong(15));
        assert_eq!(index.resolve("Anh", "Nguyen", " "), Resolution::Strong(15));
        assert_eq!(index.resolve("Anh", "Nguyen", "Belmont"), Resolution::Weak(15));
        assert_eq!(index.strong_len(), 4);
        assert_eq!(index.weak_len(), 4);
    }

    #[test]
    fn test_clubless_row_prefers_clubless_entry_over_earlier_namesake() {
        let entries = vec![
            ShooterRegistryEntry::new(1, "John", "Smith").with_club("ABC"),
            ShooterRegistryEntry::new(2, "John", "Smith"),
        ];
        let index = IdentityIndex::build(&entries);

        assert_eq!(index.resolve_identity("John", "Smith", ""), Some(2));
        assert_eq!(index.resolve_identity("John", "Smith", "ABC"), Some(1));
        assert_eq!(index.resolve("John", "Smith", "Elsewhere"), Resolution::Weak(1));
    }

    #[test]
    fn test_unresolved() {
        let index = IdentityIndex::build(&registry());

        assert_eq!(index.resolve("Jane", "Doe", "ABC Rifle Club"), Resolution::Unresolved);
        assert_eq!(index.resolve_identity("Jane", "Doe", ""), None);
    }

    #[test]
    fn test_weak_collision_first_entry_wins() {
        let mut entries = registry();
        entries.push(ShooterRegistryEntry::new(40, "John", "Smith").with_club("Wide Bay"));

        let index = IdentityIndex::build(&entries);

        // Club still separates them
        assert_eq!(index.resolve("John", "Smith", "Wide Bay"), Resolution::Strong(40));
        // Name alone goes to the first registry entry
        assert_eq!(index.resolve("John", "Smith", "Nowhere"), Resolution::Weak(7));
        assert_eq!(
            index.collisions(),
            &[WeakCollision {
                first_name: "john".to_string(),
                last_name: "smith".to_string(),
                kept: 7,
                discarded: 40,
            }]
        );
    }

    #[test]
    fn test_preferred_name_same_as_first_not_duplicated() {
        let entries = vec![ShooterRegistryEntry::new(3, "Sam", "Lee")
            .with_preferred_name(" sam ")
            .with_club("Northern")];
        let index = IdentityIndex::build(&entries);

        assert_eq!(index.strong_len(), 1);
        assert_eq!(index.weak_len(), 1);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let index = IdentityIndex::build(&registry());
        let first = index.resolve("John", "Smith", "Other");
        for _ in 0..10 {
            assert_eq!(index.resolve("John", "Smith", "Other"), first);
        }
    }
}
