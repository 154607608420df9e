use uuid::Uuid;

/// Effective company / estate / division grants of a user.
///
/// Built top-down by the auth core: an estate id only appears here when its
/// company grant is active, a division id only when its estate grant is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeGrants {
    pub company_ids: Vec<Uuid>,
    pub estate_ids: Vec<Uuid>,
    pub division_ids: Vec<Uuid>,
}

impl ScopeGrants {
    pub fn new(
        company_ids: impl IntoIterator<Item = Uuid>,
        estate_ids: impl IntoIterator<Item = Uuid>,
        division_ids: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        Self {
            company_ids: dedup(company_ids),
            estate_ids: dedup(estate_ids),
            division_ids: dedup(division_ids),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.company_ids.is_empty()
            && self.estate_ids.is_empty()
            && self.division_ids.is_empty()
    }

    /// First company in assignment order; used as the `company_id` claim.
    pub fn primary_company(&self) -> Option<Uuid> {
        self.company_ids.first().copied()
    }
}

fn dedup(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let grants = ScopeGrants::new([b, a, b], [], []);
        assert_eq!(grants.company_ids, vec![b, a]);
        assert_eq!(grants.primary_company(), Some(b));
    }

    #[test]
    fn empty_grants_have_no_primary_company() {
        let grants = ScopeGrants::default();
        assert!(grants.is_empty());
        assert_eq!(grants.primary_company(), None);
    }
}
