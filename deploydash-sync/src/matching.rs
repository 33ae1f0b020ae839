//! Name matching between manifests, workflows, and stored records.
//!
//! Every lookup ranks candidates the same way: an exact case-insensitive
//! name first, then substring containment, with ties going to the longest
//! candidate name and then the lowest id. The result never depends on the
//! order rows come back from the store.

use std::cmp::Reverse;

use deploydash_core::{KubernetesResource, Microservice};

/// A record that can be matched by name.
pub trait Candidate {
    fn candidate_name(&self) -> &str;
    fn candidate_id(&self) -> i64;
}

impl Candidate for Microservice {
    fn candidate_name(&self) -> &str {
        &self.name
    }
    fn candidate_id(&self) -> i64 {
        self.id.0
    }
}

impl Candidate for KubernetesResource {
    fn candidate_name(&self) -> &str {
        &self.name
    }
    fn candidate_id(&self) -> i64 {
        self.id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Exact,
    Contains,
}

/// Candidate whose name equals `name`, or contains it, or is contained in it.
pub fn best_match<'a, T: Candidate>(name: &str, candidates: &'a [T]) -> Option<&'a T> {
    let needle = name.to_lowercase();
    if needle.is_empty() {
        return None;
    }
    rank(candidates, |candidate| {
        if candidate == needle {
            Some(Tier::Exact)
        } else if candidate.contains(&needle) || needle.contains(candidate) {
            Some(Tier::Contains)
        } else {
            None
        }
    })
}

/// Candidate whose name appears in any of `texts` (workflow name, branch).
pub fn best_mention<'a, T: Candidate>(texts: &[&str], candidates: &'a [T]) -> Option<&'a T> {
    let texts: Vec<String> = texts
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    rank(candidates, |candidate| {
        if texts.iter().any(|t| t == candidate) {
            Some(Tier::Exact)
        } else if texts.iter().any(|t| t.contains(candidate)) {
            Some(Tier::Contains)
        } else {
            None
        }
    })
}

fn rank<'a, T: Candidate>(
    candidates: &'a [T],
    tier_of: impl Fn(&str) -> Option<Tier>,
) -> Option<&'a T> {
    candidates
        .iter()
        .filter_map(|c| {
            let name = c.candidate_name().to_lowercase();
            if name.is_empty() {
                return None;
            }
            tier_of(&name).map(|tier| (tier, c))
        })
        .min_by_key(|(tier, c)| (*tier, Reverse(c.candidate_name().len()), c.candidate_id()))
        .map(|(_, c)| c)
}
